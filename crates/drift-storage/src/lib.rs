//! Migration history storage for drift.
//!
//! An append-only SQLite log of planned migrations: one row per run with
//! status transitions (`PENDING` before generation, `SUCCESS`/`DRY_RUN`
//! after, `ROLLED_BACK`/`FAILED` on later operator action) plus per-operation
//! detail rows.

pub mod error;
pub mod record;
pub mod schema;
pub mod store;

pub use error::{Result, StorageError};
pub use record::{
    HistoryStatistics, MigrationRecord, MigrationStatus, NewMigration, OperationRecord,
};
pub use store::HistoryStore;
