//! Schema comparison and migration planning engine for MariaDB/MySQL.
//!
//! The engine takes two schema snapshots (source and destination), diffs
//! them at the level of columns, indexes and foreign keys, and emits a
//! forward migration script plus a matching rollback script. All core
//! operations are pure functions on in-memory values; fetching DDL and
//! persisting scripts belong to the caller.
//!
//! The usual entry point is [`plan::plan_migration`]:
//!
//! ```
//! use drift_core::model::ObjectKind;
//! use drift_core::snapshot::{MemorySource, SchemaSnapshot};
//!
//! let source = SchemaSnapshot::load(
//!     "app_next",
//!     &MemorySource::new().with(
//!         ObjectKind::Tables,
//!         "users",
//!         "CREATE TABLE `users` (`id` int NOT NULL, PRIMARY KEY (`id`))",
//!     ),
//! )
//! .unwrap();
//! let dest = SchemaSnapshot::load("app_prod", &MemorySource::new()).unwrap();
//!
//! let plan = drift_core::plan::plan_migration(&source, &dest, chrono::Utc::now()).unwrap();
//! assert!(plan.migration_sql.contains("CREATE TABLE `users`"));
//! assert!(plan.rollback_sql.contains("DROP TABLE IF EXISTS `users`"));
//! ```

pub mod alter;
pub mod diff;
pub mod error;
pub mod model;
pub mod parser;
pub mod plan;
pub mod report;
pub mod rollback;
pub mod safety;
pub mod script;
pub mod snapshot;

pub use error::{EngineError, Result};
