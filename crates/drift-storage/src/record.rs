//! Migration history record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ===========================================================================
// MigrationStatus
// ===========================================================================

/// Lifecycle status of a recorded migration.
///
/// `Pending` is written before script generation; the record is updated to
/// `Success` (scripts written) or `DryRun` (report only) afterwards.
/// `RolledBack` and `Failed` are set by later operator actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationStatus {
    Pending,
    Success,
    Failed,
    RolledBack,
    DryRun,
}

impl MigrationStatus {
    /// Returns the uppercase string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::RolledBack => "ROLLED_BACK",
            Self::DryRun => "DRY_RUN",
        }
    }

    /// Returns `true` for states that represent a finished run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl Default for MigrationStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MigrationStatus {
    fn from(s: &str) -> Self {
        match s {
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            "ROLLED_BACK" => Self::RolledBack,
            "DRY_RUN" => Self::DryRun,
            _ => Self::Pending,
        }
    }
}

impl Serialize for MigrationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MigrationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

// ===========================================================================
// Records
// ===========================================================================

/// One row of the migration history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: i64,
    pub name: String,
    pub source_schema: String,
    pub dest_schema: String,
    pub executed_at: DateTime<Utc>,
    pub status: MigrationStatus,
    pub operations_count: i64,
    pub successful_operations: i64,
    pub failed_operations: i64,
    pub migration_file: String,
    pub rollback_file: String,
    pub safety_warnings: i64,
    pub notes: String,
}

/// Fields required to start tracking a migration.
#[derive(Debug, Clone)]
pub struct NewMigration {
    pub name: String,
    pub source_schema: String,
    pub dest_schema: String,
    pub operations_count: i64,
    pub migration_file: String,
    pub rollback_file: String,
    pub safety_warnings: i64,
}

/// One per-operation detail row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub migration_id: i64,
    pub operation_order: i64,
    pub operation: String,
    pub object_kind: String,
    pub object_name: String,
    pub sql_statement: String,
}

/// Aggregate statistics over the history log.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStatistics {
    pub total_migrations: i64,
    pub successful_migrations: i64,
    pub rolled_back_migrations: i64,
    /// Percentage of successful migrations, 0 when the log is empty.
    pub success_rate: f64,
}
