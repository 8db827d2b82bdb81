//! [`HistoryStore`] -- SQLite-backed migration history log.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use drift_core::plan::PlannedOperation;
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::record::{
    HistoryStatistics, MigrationRecord, MigrationStatus, NewMigration, OperationRecord,
};
use crate::schema;

/// Append-only migration history keyed by a generated migration id.
///
/// Wraps a [`rusqlite::Connection`] in a `Mutex` for thread safety. All
/// public methods acquire the lock, execute SQL, and release it.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Opens (or creates) the history database at the given path.
    ///
    /// Enables WAL mode and foreign keys, then initializes the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(?path, "opening history database");
        let conn = Connection::open(path).map_err(|e| {
            StorageError::Connection(format!("failed to open {}: {e}", path.display()))
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.configure_connection()?;
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory history database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        debug!("opening in-memory history database");
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("failed to open in-memory db: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.configure_connection()?;
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Connection(format!("mutex poisoned: {e}")))
    }

    /// Sets connection pragmas (WAL mode, foreign keys, busy timeout).
    fn configure_connection(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| StorageError::Connection(format!("failed to set pragmas: {e}")))?;
        Ok(())
    }

    /// Creates tables and indexes if they do not exist.
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        let version: std::result::Result<i32, _> = conn.query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| {
                let v: String = row.get(0)?;
                Ok(v.parse::<i32>().unwrap_or(0))
            },
        );
        if let Ok(v) = version {
            if v >= schema::CURRENT_SCHEMA_VERSION {
                debug!(version = v, "history schema already current, skipping init");
                return Ok(());
            }
        }

        for stmt in schema::SCHEMA_STATEMENTS {
            conn.execute_batch(stmt)
                .map_err(|e| StorageError::Migration {
                    name: "init_schema".into(),
                    reason: e.to_string(),
                })?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::CURRENT_SCHEMA_VERSION.to_string()],
        )
        .map_err(|e| StorageError::Migration {
            name: "schema_version".into(),
            reason: e.to_string(),
        })?;

        info!(
            version = schema::CURRENT_SCHEMA_VERSION,
            "history schema initialized"
        );
        Ok(())
    }

    // -- Writes --------------------------------------------------------------

    /// Starts tracking a migration with status `PENDING`. Returns the id.
    pub fn begin_migration(&self, new: &NewMigration) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO migrations (
                name, source_schema, dest_schema, executed_at, status,
                operations_count, migration_file, rollback_file, safety_warnings
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                new.name,
                new.source_schema,
                new.dest_schema,
                Utc::now().to_rfc3339(),
                MigrationStatus::Pending.as_str(),
                new.operations_count,
                new.migration_file,
                new.rollback_file,
                new.safety_warnings,
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(id, name = %new.name, "migration tracking started");
        Ok(id)
    }

    /// Records the planned operations for a migration, in order.
    pub fn record_operations(&self, migration_id: i64, operations: &[PlannedOperation]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Connection(format!("transaction failed: {e}")))?;
        for (order, op) in operations.iter().enumerate() {
            tx.execute(
                "INSERT INTO migration_operations (
                    migration_id, operation_order, operation, object_kind,
                    object_name, sql_statement
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    migration_id,
                    order as i64,
                    op.op.as_str(),
                    op.kind.as_str(),
                    op.name,
                    op.sql,
                ],
            )?;
        }
        tx.commit()
            .map_err(|e| StorageError::Connection(format!("commit failed: {e}")))?;
        Ok(())
    }

    /// Finishes tracking: updates status, operation counters and notes.
    pub fn complete_migration(
        &self,
        id: i64,
        status: MigrationStatus,
        successful_operations: i64,
        failed_operations: i64,
        notes: &str,
    ) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE migrations
             SET status = ?1, successful_operations = ?2, failed_operations = ?3, notes = ?4
             WHERE id = ?5",
            params![status.as_str(), successful_operations, failed_operations, notes, id],
        )?;
        if updated == 0 {
            return Err(StorageError::not_found("migration", id));
        }
        info!(id, status = %status, "migration tracking completed");
        Ok(())
    }

    /// Marks a migration as rolled back.
    pub fn mark_rolled_back(&self, id: i64, notes: &str) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE migrations SET status = ?1, notes = ?2 WHERE id = ?3",
            params![MigrationStatus::RolledBack.as_str(), notes, id],
        )?;
        if updated == 0 {
            return Err(StorageError::not_found("migration", id));
        }
        info!(id, "migration marked rolled back");
        Ok(())
    }

    // -- Reads ---------------------------------------------------------------

    /// Returns the most recent migrations, newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<MigrationRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, source_schema, dest_schema, executed_at, status,
                    operations_count, successful_operations, failed_operations,
                    migration_file, rollback_file, safety_warnings, notes
             FROM migrations
             ORDER BY executed_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Returns one migration by id.
    pub fn get(&self, id: i64) -> Result<MigrationRecord> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, source_schema, dest_schema, executed_at, status,
                    operations_count, successful_operations, failed_operations,
                    migration_file, rollback_file, safety_warnings, notes
             FROM migrations WHERE id = ?1",
            params![id],
            row_to_record,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("migration", id),
            other => StorageError::Query(other),
        })
    }

    /// Returns the detail rows of one migration, in execution order.
    pub fn operations(&self, migration_id: i64) -> Result<Vec<OperationRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT migration_id, operation_order, operation, object_kind,
                    object_name, sql_statement
             FROM migration_operations
             WHERE migration_id = ?1
             ORDER BY operation_order",
        )?;
        let rows = stmt.query_map(params![migration_id], |row| {
            Ok(OperationRecord {
                migration_id: row.get(0)?,
                operation_order: row.get(1)?,
                operation: row.get(2)?,
                object_kind: row.get(3)?,
                object_name: row.get(4)?,
                sql_statement: row.get(5)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Aggregate statistics over the whole log.
    pub fn statistics(&self) -> Result<HistoryStatistics> {
        let conn = self.lock()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM migrations", [], |r| r.get(0))?;
        let successful: i64 = conn.query_row(
            "SELECT COUNT(*) FROM migrations WHERE status = 'SUCCESS'",
            [],
            |r| r.get(0),
        )?;
        let rolled_back: i64 = conn.query_row(
            "SELECT COUNT(*) FROM migrations WHERE status = 'ROLLED_BACK'",
            [],
            |r| r.get(0),
        )?;
        Ok(HistoryStatistics {
            total_migrations: total,
            successful_migrations: successful,
            rolled_back_migrations: rolled_back,
            success_rate: if total > 0 {
                successful as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
    }

    /// Deletes records older than `days` days. Returns the number removed.
    pub fn cleanup_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = (Utc::now() - chrono::Duration::days(days)).to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM migration_operations WHERE migration_id IN (
                SELECT id FROM migrations WHERE executed_at < ?1
             )",
            params![cutoff],
        )?;
        let deleted = conn.execute("DELETE FROM migrations WHERE executed_at < ?1", params![cutoff])?;
        info!(deleted, days, "cleaned up old history records");
        Ok(deleted)
    }

    /// Exports the full history as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String> {
        let records = self.list(usize::MAX / 2)?;
        Ok(serde_json::to_string_pretty(&records)?)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<MigrationRecord> {
    let executed_at: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(MigrationRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        source_schema: row.get(2)?,
        dest_schema: row.get(3)?,
        executed_at: DateTime::parse_from_rfc3339(&executed_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default(),
        status: MigrationStatus::from(status.as_str()),
        operations_count: row.get(6)?,
        successful_operations: row.get(7)?,
        failed_operations: row.get(8)?,
        migration_file: row.get(9)?,
        rollback_file: row.get(10)?,
        safety_warnings: row.get(11)?,
        notes: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::model::ObjectKind;
    use drift_core::plan::OperationKind;
    use pretty_assertions::assert_eq;

    fn new_migration(name: &str) -> NewMigration {
        NewMigration {
            name: name.into(),
            source_schema: "app_next".into(),
            dest_schema: "app_prod".into(),
            operations_count: 2,
            migration_file: "migration.sql".into(),
            rollback_file: "rollback.sql".into(),
            safety_warnings: 1,
        }
    }

    #[test]
    fn begin_writes_pending_record() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.begin_migration(&new_migration("m1")).unwrap();
        let record = store.get(id).unwrap();
        assert_eq!(record.status, MigrationStatus::Pending);
        assert_eq!(record.name, "m1");
        assert_eq!(record.operations_count, 2);
        assert_eq!(record.safety_warnings, 1);
    }

    #[test]
    fn complete_updates_status_and_counters() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.begin_migration(&new_migration("m1")).unwrap();
        store
            .complete_migration(id, MigrationStatus::Success, 2, 0, "all good")
            .unwrap();
        let record = store.get(id).unwrap();
        assert_eq!(record.status, MigrationStatus::Success);
        assert_eq!(record.successful_operations, 2);
        assert_eq!(record.notes, "all good");
    }

    #[test]
    fn dry_run_status_is_persisted() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.begin_migration(&new_migration("m1")).unwrap();
        store
            .complete_migration(id, MigrationStatus::DryRun, 0, 0, "")
            .unwrap();
        assert_eq!(store.get(id).unwrap().status, MigrationStatus::DryRun);
    }

    #[test]
    fn mark_rolled_back() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.begin_migration(&new_migration("m1")).unwrap();
        store.mark_rolled_back(id, "reverted").unwrap();
        let record = store.get(id).unwrap();
        assert_eq!(record.status, MigrationStatus::RolledBack);
        assert_eq!(record.notes, "reverted");
    }

    #[test]
    fn missing_record_is_not_found() {
        let store = HistoryStore::open_in_memory().unwrap();
        let err = store.get(99).unwrap_err();
        assert!(err.is_not_found());
        assert!(store.mark_rolled_back(99, "").unwrap_err().is_not_found());
    }

    #[test]
    fn operations_are_recorded_in_order() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.begin_migration(&new_migration("m1")).unwrap();
        let operations = vec![
            PlannedOperation {
                kind: ObjectKind::Tables,
                name: "users".into(),
                op: OperationKind::Modify,
                sql: "ALTER TABLE `users` ADD COLUMN `a` int".into(),
            },
            PlannedOperation {
                kind: ObjectKind::Views,
                name: "v".into(),
                op: OperationKind::Drop,
                sql: "DROP VIEW IF EXISTS `v`".into(),
            },
        ];
        store.record_operations(id, &operations).unwrap();
        let rows = store.operations(id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].object_name, "users");
        assert_eq!(rows[0].operation, "MODIFY");
        assert_eq!(rows[1].object_kind, "views");
    }

    #[test]
    fn list_returns_newest_first() {
        let store = HistoryStore::open_in_memory().unwrap();
        let first = store.begin_migration(&new_migration("first")).unwrap();
        let second = store.begin_migration(&new_migration("second")).unwrap();
        let records = store.list(10).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second);
        assert_eq!(records[1].id, first);
    }

    #[test]
    fn statistics_counts_by_status() {
        let store = HistoryStore::open_in_memory().unwrap();
        let a = store.begin_migration(&new_migration("a")).unwrap();
        let b = store.begin_migration(&new_migration("b")).unwrap();
        store
            .complete_migration(a, MigrationStatus::Success, 2, 0, "")
            .unwrap();
        store.mark_rolled_back(b, "").unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_migrations, 2);
        assert_eq!(stats.successful_migrations, 1);
        assert_eq!(stats.rolled_back_migrations, 1);
        assert_eq!(stats.success_rate, 50.0);
    }

    #[test]
    fn export_json_contains_records() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.begin_migration(&new_migration("exported")).unwrap();
        let json = store.export_json().unwrap();
        assert!(json.contains("\"exported\""));
        assert!(json.contains("\"PENDING\""));
    }

    #[test]
    fn open_on_disk_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let store = HistoryStore::open(&path).unwrap();
            store.begin_migration(&new_migration("persisted")).unwrap();
        }
        let store = HistoryStore::open(&path).unwrap();
        let records = store.list(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "persisted");
    }
}
