//! DDL statements for the history database.
//!
//! Timestamps are stored as TEXT in ISO 8601 format (SQLite has no native
//! datetime type). Counters are INTEGER.

/// Current schema version. Bumped whenever DDL changes.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during schema initialization.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Migrations table ----------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS migrations (
        id                    INTEGER PRIMARY KEY AUTOINCREMENT,
        name                  TEXT NOT NULL,
        source_schema         TEXT NOT NULL,
        dest_schema           TEXT NOT NULL,
        executed_at           TEXT NOT NULL,
        status                TEXT NOT NULL DEFAULT 'PENDING',
        operations_count      INTEGER NOT NULL DEFAULT 0,
        successful_operations INTEGER NOT NULL DEFAULT 0,
        failed_operations     INTEGER NOT NULL DEFAULT 0,
        migration_file        TEXT DEFAULT '',
        rollback_file         TEXT DEFAULT '',
        safety_warnings       INTEGER NOT NULL DEFAULT 0,
        notes                 TEXT DEFAULT ''
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_migrations_executed_at ON migrations(executed_at)",
    "CREATE INDEX IF NOT EXISTS idx_migrations_status ON migrations(status)",
    // -- Per-operation detail rows -------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS migration_operations (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        migration_id    INTEGER NOT NULL,
        operation_order INTEGER NOT NULL,
        operation       TEXT NOT NULL,
        object_kind     TEXT NOT NULL,
        object_name     TEXT NOT NULL,
        sql_statement   TEXT NOT NULL,
        FOREIGN KEY (migration_id) REFERENCES migrations(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_operations_migration_id ON migration_operations(migration_id)",
    // -- Key-value metadata (schema version) ---------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS meta (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];
