//! Top-level migration planning.
//!
//! [`plan_migration`] is the one-call entry point: given two schema
//! snapshots it produces the forward script, the rollback script, the
//! comparison report, the planned-operation list, and all advisory warnings
//! in a single deterministic pass. Everything is a pure function of the two
//! snapshots and the caller-supplied timestamp.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::diff::{self, Difference, SchemaComparison};
use crate::error::Result;
use crate::model::ObjectKind;
use crate::report;
use crate::safety::{self, SafetyWarning};
use crate::script::{self, ScriptContext};
use crate::snapshot::SchemaSnapshot;

// ===========================================================================
// Planned operations
// ===========================================================================

/// What a planned operation does to its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Create,
    Drop,
    Modify,
}

impl OperationKind {
    /// Returns the uppercase operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Drop => "DROP",
            Self::Modify => "MODIFY",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of planned work in the forward script.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedOperation {
    pub kind: ObjectKind,
    pub name: String,
    pub op: OperationKind,
    /// The emitted SQL (joined statements for multi-statement table
    /// modifications).
    pub sql: String,
}

// ===========================================================================
// MigrationPlan
// ===========================================================================

/// Everything produced by one planning run.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Per-kind identifier set differences.
    pub comparison: SchemaComparison,
    /// Ordered differences for every in-both table that needs work.
    pub table_changes: BTreeMap<String, Vec<Difference>>,
    /// Units of work in the forward script.
    pub operations: Vec<PlannedOperation>,
    /// The forward script.
    pub migration_sql: String,
    /// The rollback script.
    pub rollback_sql: String,
    /// The human-readable comparison report.
    pub report: String,
    /// Advisory safety findings (never block generation).
    pub safety_warnings: Vec<SafetyWarning>,
    /// Non-fatal problems hit along the way: unparseable tables, missing
    /// DDL, skipped clauses.
    pub issues: Vec<String>,
}

impl MigrationPlan {
    /// Returns `true` if the schemas are already in sync.
    pub fn is_noop(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Compares two snapshots and assembles forward script, rollback script and
/// report.
///
/// `generated_at` only feeds the header timestamp lines; for fixed inputs
/// and a fixed timestamp the output is byte-identical across runs.
pub fn plan_migration(
    source: &SchemaSnapshot,
    dest: &SchemaSnapshot,
    generated_at: DateTime<Utc>,
) -> Result<MigrationPlan> {
    let comparison = diff::compare_objects(source, dest);

    // Analyze every table present on both sides. A table that fails to parse
    // is excluded from its diff and reported; the rest continue.
    let mut table_changes: BTreeMap<String, Vec<Difference>> = BTreeMap::new();
    let mut issues: Vec<String> = Vec::new();
    let source_tables = source.names(ObjectKind::Tables);

    for name in &comparison.kind(ObjectKind::Tables).in_both {
        let source_ddl = source.ddl(ObjectKind::Tables, name);
        let dest_ddl = dest.ddl(ObjectKind::Tables, name);
        let (Some(source_ddl), Some(dest_ddl)) = (source_ddl, dest_ddl) else {
            issues.push(format!("table `{name}`: missing DDL on one side, skipped"));
            continue;
        };
        match diff::analyze_table_differences(name, source_ddl, dest_ddl) {
            Ok(analysis) => {
                for warning in &analysis.warnings {
                    issues.push(format!("table `{name}`: {warning}"));
                }
                // Foreign keys pointing at tables the source schema does not
                // have are recorded as warnings; generation continues.
                for diff in &analysis.differences {
                    let definition = match diff {
                        Difference::AddConstraint { definition, .. } => definition,
                        Difference::ModifyConstraint { new, .. } => new,
                        _ => continue,
                    };
                    if let Some(fk) = crate::parser::parse_foreign_key_definition(definition) {
                        if !source_tables.contains(&fk.referenced_table) {
                            let warning = crate::error::EngineError::InconsistentSchema {
                                table: name.clone(),
                                referenced: fk.referenced_table,
                            };
                            issues.push(format!("foreign key `{}`: {warning}", fk.name));
                        }
                    }
                }
                if !analysis.is_unchanged() {
                    table_changes.insert(name.clone(), analysis.differences);
                }
            }
            Err(err) => {
                warn!(table = %name, error = %err, "table excluded from diff");
                issues.push(format!("table `{name}` unparseable, excluded: {err}"));
            }
        }
    }

    let ctx = ScriptContext {
        source,
        dest,
        comparison: &comparison,
        table_changes: &table_changes,
        generated_at,
    };

    let migration = script::assemble_migration(&ctx);
    let rollback = script::assemble_rollback(&ctx);

    issues.extend(migration.issues.iter().cloned());
    issues.extend(rollback.issues.iter().cloned());

    // Safety: per-table structural findings, cross-object findings, plus
    // plan-time warnings (generated columns).
    let mut safety_warnings = Vec::new();
    for (table, differences) in &table_changes {
        safety_warnings.extend(safety::analyze_table(table, differences));
    }
    safety_warnings.extend(safety::analyze_operations(&migration.operations));
    safety_warnings.extend(migration.warnings.iter().cloned());

    let report = report::comparison_report(
        source.name(),
        dest.name(),
        generated_at,
        &comparison,
        &table_changes,
        &migration.operations,
        &safety_warnings,
        &issues,
    );

    debug!(
        operations = migration.operations.len(),
        warnings = safety_warnings.len(),
        issues = issues.len(),
        "migration planned"
    );

    Ok(MigrationPlan {
        comparison,
        table_changes,
        operations: migration.operations,
        migration_sql: migration.sql,
        rollback_sql: rollback.sql,
        report,
        safety_warnings,
        issues,
    })
}
