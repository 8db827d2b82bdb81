//! Engine error types.

use crate::model::ObjectKind;

/// Errors that can occur while parsing, comparing, or planning.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A DDL statement could not be parsed at all.
    ///
    /// Raised only for unrecoverable problems (missing object name, missing
    /// table body). Malformed sub-clauses are skipped and reported as
    /// warnings instead.
    #[error("failed to parse DDL for `{object}`: {reason}")]
    Parse {
        /// The object whose DDL was rejected.
        object: String,
        /// Why the parser gave up.
        reason: String,
    },

    /// A foreign key references a table that is missing from the schema.
    #[error("table `{table}` references missing table `{referenced}`")]
    InconsistentSchema {
        /// The table carrying the foreign key.
        table: String,
        /// The referenced table that could not be found.
        referenced: String,
    },

    /// An object was enumerated but its DDL could not be retrieved.
    #[error("no DDL available for {kind} `{name}`")]
    MissingDdl {
        /// The kind of the object.
        kind: ObjectKind,
        /// The object name.
        name: String,
    },

    /// Catch-all for unexpected internal conditions.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    // -- Constructors --------------------------------------------------------

    /// Creates an [`EngineError::Parse`] for the given object.
    pub fn parse(object: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            object: object.into(),
            reason: reason.into(),
        }
    }

    /// Creates an [`EngineError::MissingDdl`].
    pub fn missing_ddl(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::MissingDdl {
            kind,
            name: name.into(),
        }
    }

    // -- Predicates ----------------------------------------------------------

    /// Returns `true` if this is a parse failure.
    ///
    /// Parse failures are recoverable at the schema level: the affected
    /// object is excluded from its diff and comparison continues.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
