//! Structural model of schema objects.
//!
//! A [`TableModel`] is produced once by the parser from a `SHOW CREATE TABLE`
//! string and never mutated. Comparison and emission both work against this
//! model; raw definition text is retained alongside the parsed fields so
//! emitted SQL reproduces the server's own spelling.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// ===========================================================================
// ObjectKind
// ===========================================================================

/// The seven kinds of schema objects the engine compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum ObjectKind {
    Tables,
    Procedures,
    Functions,
    Triggers,
    Events,
    Views,
    Sequences,
}

impl ObjectKind {
    /// All kinds in the fixed order migration scripts emit them.
    pub const ALL: [ObjectKind; 7] = [
        Self::Tables,
        Self::Procedures,
        Self::Functions,
        Self::Triggers,
        Self::Events,
        Self::Views,
        Self::Sequences,
    ];

    /// Returns the lowercase plural name (`"tables"`, `"views"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::Procedures => "procedures",
            Self::Functions => "functions",
            Self::Triggers => "triggers",
            Self::Events => "events",
            Self::Views => "views",
            Self::Sequences => "sequences",
        }
    }

    /// Returns the SQL keyword used in `CREATE`/`DROP` statements.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            Self::Tables => "TABLE",
            Self::Procedures => "PROCEDURE",
            Self::Functions => "FUNCTION",
            Self::Triggers => "TRIGGER",
            Self::Events => "EVENT",
            Self::Views => "VIEW",
            Self::Sequences => "SEQUENCE",
        }
    }

    /// Returns the singular display name (`"table"`, `"view"`, ...).
    pub fn singular(&self) -> &'static str {
        match self {
            Self::Tables => "table",
            Self::Procedures => "procedure",
            Self::Functions => "function",
            Self::Triggers => "trigger",
            Self::Events => "event",
            Self::Views => "view",
            Self::Sequences => "sequence",
        }
    }

    /// Returns `true` for stored routines, which are emitted inside
    /// `DELIMITER` framing and replaced by drop-and-recreate.
    pub fn is_routine(&self) -> bool {
        matches!(
            self,
            Self::Procedures | Self::Functions | Self::Triggers | Self::Events
        )
    }

    /// Parses a lowercase plural kind name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tables" => Some(Self::Tables),
            "procedures" => Some(Self::Procedures),
            "functions" => Some(Self::Functions),
            "triggers" => Some(Self::Triggers),
            "events" => Some(Self::Events),
            "views" => Some(Self::Views),
            "sequences" => Some(Self::Sequences),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObjectKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl TryFrom<String> for ObjectKind {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("unknown object kind: {s}"))
    }
}

// ===========================================================================
// Column
// ===========================================================================

/// One column of a table.
///
/// `definition` holds the verbatim definition text (everything after the
/// column name up to the next top-level comma) and is what gets emitted in
/// `ADD COLUMN` / `MODIFY COLUMN` statements.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    /// The raw type spec, e.g. `varchar(255)` or `decimal(10,2)`.
    pub data_type: String,

    pub nullable: bool,

    /// The DEFAULT clause value, unquoted for plain literals.
    pub default: Option<String>,

    pub auto_increment: bool,

    pub charset: Option<String>,

    pub collation: Option<String>,

    pub comment: Option<String>,

    /// Zero-based declaration position within the table body.
    pub position: usize,

    /// Verbatim definition text, retained for emission.
    pub definition: String,
}

/// Column equality compares the name and the structural tuple
/// (data type, nullability, default, auto-increment, charset, collation).
/// Comment, position and the raw definition text do not participate.
impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.data_type == other.data_type
            && self.nullable == other.nullable
            && self.default == other.default
            && self.auto_increment == other.auto_increment
            && self.charset == other.charset
            && self.collation == other.collation
    }
}

// ===========================================================================
// Index
// ===========================================================================

/// One index of a table. The primary key carries the reserved name
/// `PRIMARY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,

    /// Indexed columns in order; prefix lengths are kept (`name(10)`).
    pub columns: Vec<String>,

    /// Index type: `BTREE` (default), `HASH`, `SPATIAL`, ...
    pub index_type: String,

    pub unique: bool,

    pub primary: bool,

    /// FULLTEXT indexes need `ADD FULLTEXT KEY` / `DROP KEY` emission.
    pub fulltext: bool,
}

impl Index {
    /// Reserved name of the primary key index.
    pub const PRIMARY_NAME: &'static str = "PRIMARY";

    /// Renders the index the way `SHOW CREATE TABLE` spells it, e.g.
    /// ``UNIQUE KEY `email_idx` (`email`)``.
    pub fn render(&self) -> String {
        let cols = quote_column_list(&self.columns);
        let mut out = if self.primary {
            format!("PRIMARY KEY ({cols})")
        } else if self.fulltext {
            format!("FULLTEXT KEY `{}` ({cols})", self.name)
        } else if self.unique {
            format!("UNIQUE KEY `{}` ({cols})", self.name)
        } else if self.index_type.eq_ignore_ascii_case("SPATIAL") {
            format!("SPATIAL KEY `{}` ({cols})", self.name)
        } else {
            format!("KEY `{}` ({cols})", self.name)
        };
        if self.index_type.eq_ignore_ascii_case("HASH") {
            out.push_str(" USING HASH");
        }
        out
    }

    /// Renders the clause used after `ALTER TABLE ... ADD`.
    ///
    /// Regular and unique indexes use the `INDEX` spelling there; primary,
    /// fulltext and spatial keys keep their `KEY` form.
    pub fn render_add_clause(&self) -> String {
        let cols = quote_column_list(&self.columns);
        let mut out = if self.primary {
            format!("PRIMARY KEY ({cols})")
        } else if self.fulltext {
            format!("FULLTEXT KEY `{}` ({cols})", self.name)
        } else if self.unique {
            format!("UNIQUE INDEX `{}` ({cols})", self.name)
        } else if self.index_type.eq_ignore_ascii_case("SPATIAL") {
            format!("SPATIAL KEY `{}` ({cols})", self.name)
        } else {
            format!("INDEX `{}` ({cols})", self.name)
        };
        if self.index_type.eq_ignore_ascii_case("HASH") {
            out.push_str(" USING HASH");
        }
        out
    }
}

// ===========================================================================
// ForeignKey
// ===========================================================================

/// One foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,

    /// Local columns, in constraint order.
    pub columns: Vec<String>,

    pub referenced_table: String,

    pub referenced_columns: Vec<String>,

    /// `ON DELETE` action, uppercased (`CASCADE`, `SET NULL`, ...).
    pub on_delete: Option<String>,

    /// `ON UPDATE` action, uppercased.
    pub on_update: Option<String>,
}

impl ForeignKey {
    /// Renders the full constraint clause, e.g.
    /// ``CONSTRAINT `fk_x` FOREIGN KEY (`a`) REFERENCES `t` (`id`) ON DELETE CASCADE``.
    pub fn render(&self) -> String {
        let mut out = format!(
            "CONSTRAINT `{}` FOREIGN KEY ({}) REFERENCES `{}` ({})",
            self.name,
            quote_column_list(&self.columns),
            self.referenced_table,
            quote_column_list(&self.referenced_columns),
        );
        if let Some(action) = &self.on_delete {
            out.push_str(&format!(" ON DELETE {action}"));
        }
        if let Some(action) = &self.on_update {
            out.push_str(&format!(" ON UPDATE {action}"));
        }
        out
    }

    /// Returns `true` if the constraint's local columns include `column`.
    pub fn references_local_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| base_column_name(c) == column)
    }
}

// ===========================================================================
// TableOptions
// ===========================================================================

/// Table-level options scanned from the DDL tail.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableOptions {
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
}

impl TableOptions {
    /// Engine with the server default applied.
    pub fn effective_engine(&self) -> &str {
        self.engine.as_deref().unwrap_or("InnoDB")
    }

    /// Default charset with the server default applied.
    pub fn effective_charset(&self) -> &str {
        self.charset.as_deref().unwrap_or("utf8mb4")
    }

    /// Default collation with the server default applied.
    pub fn effective_collation(&self) -> &str {
        self.collation.as_deref().unwrap_or("utf8mb4_general_ci")
    }
}

// ===========================================================================
// TableModel
// ===========================================================================

/// Parsed structural representation of one table.
///
/// Immutable once produced. Index and foreign-key maps are `BTreeMap` so
/// iteration (and therefore every downstream diff and script) is ordered by
/// name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableModel {
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<Column>,

    pub indexes: BTreeMap<String, Index>,

    pub foreign_keys: BTreeMap<String, ForeignKey>,

    pub options: TableOptions,
}

impl TableModel {
    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the primary key index, if the table has one.
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.get(Index::PRIMARY_NAME)
    }

    /// Foreign keys whose local columns include `column`.
    pub fn foreign_keys_on_column(&self, column: &str) -> Vec<&ForeignKey> {
        self.foreign_keys
            .values()
            .filter(|fk| fk.references_local_column(column))
            .collect()
    }
}

// ===========================================================================
// Helpers
// ===========================================================================

/// Joins column names as a backtick-quoted list: `` `a`, `b(10)` `` keeps
/// prefix lengths outside the quotes.
fn quote_column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_index_column(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quotes a single index column, preserving a `(len)` prefix suffix.
fn quote_index_column(column: &str) -> String {
    match column.find('(') {
        Some(pos) => {
            let (name, len) = column.split_at(pos);
            format!("`{}`{len}", name.trim())
        }
        None => format!("`{column}`"),
    }
}

/// Strips a `(len)` prefix suffix from an index column entry.
pub(crate) fn base_column_name(column: &str) -> &str {
    match column.find('(') {
        Some(pos) => column[..pos].trim(),
        None => column,
    }
}
