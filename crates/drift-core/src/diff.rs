//! Structural comparison of schemas and tables.
//!
//! [`compare_objects`] yields per-kind set differences between two schema
//! snapshots. [`analyze_table_differences`] diffs two parsed table models and
//! emits [`Difference`] records such that applying them to the destination
//! table yields the source table.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::Result;
use crate::model::ObjectKind;
use crate::parser::{self, ParsedTable};
use crate::snapshot::SchemaSnapshot;

// ===========================================================================
// Difference
// ===========================================================================

/// Table-level option subject to [`Difference::TableOption`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableOptionKind {
    Comment,
    Engine,
    Charset,
    Collate,
}

impl TableOptionKind {
    /// Returns the lowercase option name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Engine => "engine",
            Self::Charset => "charset",
            Self::Collate => "collate",
        }
    }
}

/// One structural change needed to turn the destination table into the
/// source table.
///
/// For every `Modify*` variant, `original` holds the destination-side
/// definition (what rollback restores) and `new` the source-side definition
/// (what the forward script applies). Definitions on `Remove*` variants come
/// from the destination so rollback can re-create them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difference {
    AddColumn {
        name: String,
        definition: String,
    },
    RemoveColumn {
        name: String,
        definition: String,
    },
    ModifyColumn {
        name: String,
        original: String,
        new: String,
    },
    AddIndex {
        name: String,
        definition: String,
    },
    RemoveIndex {
        name: String,
        definition: String,
    },
    ModifyIndex {
        name: String,
        original: String,
        new: String,
    },
    AddConstraint {
        name: String,
        definition: String,
    },
    RemoveConstraint {
        name: String,
        definition: String,
    },
    ModifyConstraint {
        name: String,
        original: String,
        new: String,
    },
    TableOption {
        option: TableOptionKind,
        original: String,
        new: String,
    },
}

impl Difference {
    /// Short human label used in reports.
    pub fn describe(&self) -> String {
        match self {
            Self::AddColumn { name, definition } => format!("Column ADDED: {name} ({definition})"),
            Self::RemoveColumn { name, .. } => format!("Column REMOVED: {name}"),
            Self::ModifyColumn { name, .. } => format!("Column MODIFIED: {name}"),
            Self::AddIndex { name, .. } => format!("Index ADDED: {name}"),
            Self::RemoveIndex { name, .. } => format!("Index REMOVED: {name}"),
            Self::ModifyIndex { name, .. } => format!("Index MODIFIED: {name}"),
            Self::AddConstraint { name, .. } => format!("Foreign key ADDED: {name}"),
            Self::RemoveConstraint { name, .. } => format!("Foreign key REMOVED: {name}"),
            Self::ModifyConstraint { name, .. } => format!("Foreign key MODIFIED: {name}"),
            Self::TableOption { option, .. } => {
                format!("Table {} MODIFIED", option.as_str().to_uppercase())
            }
        }
    }

    /// The `FROM`/`TO` pair shown in reports, when the variant has one.
    pub fn from_to(&self) -> Option<(&str, &str)> {
        match self {
            Self::ModifyColumn { original, new, .. }
            | Self::ModifyIndex { original, new, .. }
            | Self::ModifyConstraint { original, new, .. }
            | Self::TableOption { original, new, .. } => Some((original, new)),
            _ => None,
        }
    }
}

/// Returns `true` if an index definition string is a FULLTEXT index.
pub(crate) fn is_fulltext_definition(definition: &str) -> bool {
    definition.to_uppercase().contains("FULLTEXT")
}

// ===========================================================================
// Object-level comparison
// ===========================================================================

/// Identifier set differences for one object kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindDiff {
    pub only_in_source: BTreeSet<String>,
    pub only_in_dest: BTreeSet<String>,
    pub in_both: BTreeSet<String>,
}

impl KindDiff {
    /// Returns `true` if both sides hold the same identifier set.
    pub fn is_identical_sets(&self) -> bool {
        self.only_in_source.is_empty() && self.only_in_dest.is_empty()
    }
}

/// Per-kind set differences between two schemas.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaComparison {
    kinds: BTreeMap<ObjectKind, KindDiff>,
}

impl SchemaComparison {
    /// The set triple for one object kind.
    pub fn kind(&self, kind: ObjectKind) -> &KindDiff {
        static EMPTY: std::sync::OnceLock<KindDiff> = std::sync::OnceLock::new();
        self.kinds
            .get(&kind)
            .unwrap_or_else(|| EMPTY.get_or_init(KindDiff::default))
    }

    /// Total number of objects appearing on either side.
    pub fn object_count(&self) -> usize {
        self.kinds
            .values()
            .map(|d| d.only_in_source.len() + d.only_in_dest.len() + d.in_both.len())
            .sum()
    }
}

/// Computes `{only_in_source, only_in_dest, in_both}` for each of the seven
/// object kinds.
pub fn compare_objects(source: &SchemaSnapshot, dest: &SchemaSnapshot) -> SchemaComparison {
    let mut kinds = BTreeMap::new();
    for kind in ObjectKind::ALL {
        let source_names = source.names(kind);
        let dest_names = dest.names(kind);

        let diff = KindDiff {
            only_in_source: source_names.difference(&dest_names).cloned().collect(),
            only_in_dest: dest_names.difference(&source_names).cloned().collect(),
            in_both: source_names.intersection(&dest_names).cloned().collect(),
        };
        debug!(
            kind = %kind,
            source = source_names.len(),
            dest = dest_names.len(),
            only_in_source = diff.only_in_source.len(),
            only_in_dest = diff.only_in_dest.len(),
            "compared object sets"
        );
        kinds.insert(kind, diff);
    }
    SchemaComparison { kinds }
}

// ===========================================================================
// Table-level comparison
// ===========================================================================

/// Outcome of analyzing one table pair.
#[derive(Debug, Clone, Default)]
pub struct TableAnalysis {
    /// Ordered differences; empty when the models are equal.
    pub differences: Vec<Difference>,
    /// Parser warnings from either side.
    pub warnings: Vec<String>,
}

impl TableAnalysis {
    /// Returns `true` if no structural change is needed.
    pub fn is_unchanged(&self) -> bool {
        self.differences.is_empty()
    }
}

/// Normalizes SQL for equality comparison: comments stripped, whitespace
/// collapsed, lowercased. Definitions retained for emission stay verbatim.
pub fn normalize_sql(sql: &str) -> String {
    parser::collapse_ws(parser::strip_comments(sql).trim()).to_lowercase()
}

/// Returns `true` if two DDL strings are equal after normalization.
pub fn ddl_equal(a: &str, b: &str) -> bool {
    normalize_sql(a) == normalize_sql(b)
}

/// Parses both DDL strings and emits the ordered [`Difference`] list that
/// turns the destination table into the source table.
pub fn analyze_table_differences(
    table_name: &str,
    source_ddl: &str,
    dest_ddl: &str,
) -> Result<TableAnalysis> {
    let source = parser::parse_create_table(source_ddl)?;
    let dest = parser::parse_create_table(dest_ddl)?;
    Ok(diff_models(table_name, &source, &dest))
}

/// Diffs two already-parsed tables.
pub fn diff_models(table_name: &str, source: &ParsedTable, dest: &ParsedTable) -> TableAnalysis {
    let mut differences = Vec::new();
    let mut warnings = Vec::new();
    warnings.extend(source.warnings.iter().cloned());
    warnings.extend(dest.warnings.iter().cloned());

    let src = &source.table;
    let dst = &dest.table;

    // -- Columns -------------------------------------------------------------
    for column in &src.columns {
        match dst.column(&column.name) {
            None => differences.push(Difference::AddColumn {
                name: column.name.clone(),
                definition: column.definition.clone(),
            }),
            Some(dest_column) => {
                if normalize_sql(&column.definition) != normalize_sql(&dest_column.definition) {
                    differences.push(Difference::ModifyColumn {
                        name: column.name.clone(),
                        original: dest_column.definition.clone(),
                        new: column.definition.clone(),
                    });
                }
            }
        }
    }
    for column in &dst.columns {
        if src.column(&column.name).is_none() {
            differences.push(Difference::RemoveColumn {
                name: column.name.clone(),
                definition: column.definition.clone(),
            });
        }
    }

    // -- Indexes -------------------------------------------------------------
    for (name, index) in &src.indexes {
        match dst.indexes.get(name) {
            None => differences.push(Difference::AddIndex {
                name: name.clone(),
                definition: index.render(),
            }),
            Some(dest_index) => {
                let new = index.render();
                let original = dest_index.render();
                if normalize_sql(&new) != normalize_sql(&original) {
                    differences.push(Difference::ModifyIndex {
                        name: name.clone(),
                        original,
                        new,
                    });
                }
            }
        }
    }
    for (name, index) in &dst.indexes {
        if !src.indexes.contains_key(name) {
            differences.push(Difference::RemoveIndex {
                name: name.clone(),
                definition: index.render(),
            });
        }
    }

    // -- Foreign keys --------------------------------------------------------
    for (name, fk) in &src.foreign_keys {
        match dst.foreign_keys.get(name) {
            None => differences.push(Difference::AddConstraint {
                name: name.clone(),
                definition: fk.render(),
            }),
            Some(dest_fk) => {
                let new = fk.render();
                let original = dest_fk.render();
                if normalize_sql(&new) != normalize_sql(&original) {
                    differences.push(Difference::ModifyConstraint {
                        name: name.clone(),
                        original,
                        new,
                    });
                }
            }
        }
    }
    for (name, fk) in &dst.foreign_keys {
        if !src.foreign_keys.contains_key(name) {
            differences.push(Difference::RemoveConstraint {
                name: name.clone(),
                definition: fk.render(),
            });
        }
    }

    // -- Table options -------------------------------------------------------
    let src_comment = src.options.comment.clone().unwrap_or_default();
    let dst_comment = dst.options.comment.clone().unwrap_or_default();
    if src_comment != dst_comment {
        differences.push(Difference::TableOption {
            option: TableOptionKind::Comment,
            original: dst_comment,
            new: src_comment,
        });
    }
    if src.options.effective_engine() != dst.options.effective_engine() {
        differences.push(Difference::TableOption {
            option: TableOptionKind::Engine,
            original: dst.options.effective_engine().to_string(),
            new: src.options.effective_engine().to_string(),
        });
    }
    if src.options.effective_charset() != dst.options.effective_charset() {
        differences.push(Difference::TableOption {
            option: TableOptionKind::Charset,
            original: dst.options.effective_charset().to_string(),
            new: src.options.effective_charset().to_string(),
        });
    }
    if src.options.effective_collation() != dst.options.effective_collation() {
        differences.push(Difference::TableOption {
            option: TableOptionKind::Collate,
            original: dst.options.effective_collation().to_string(),
            new: src.options.effective_collation().to_string(),
        });
    }

    debug!(
        table = table_name,
        differences = differences.len(),
        "analyzed table differences"
    );

    TableAnalysis {
        differences,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analysis(source: &str, dest: &str) -> TableAnalysis {
        analyze_table_differences("t", source, dest).unwrap()
    }

    #[test]
    fn identical_tables_have_no_differences() {
        let ddl = "CREATE TABLE `t` (`id` int NOT NULL, PRIMARY KEY (`id`)) ENGINE=InnoDB";
        assert!(analysis(ddl, ddl).is_unchanged());
    }

    #[test]
    fn whitespace_and_case_do_not_count_as_differences() {
        let a = "CREATE TABLE `t` (`id` INT NOT NULL)";
        let b = "CREATE TABLE `t` (\n  `id`   int   not null\n)";
        assert!(analysis(a, b).is_unchanged());
    }

    #[test]
    fn added_and_removed_columns() {
        let source = "CREATE TABLE `t` (`id` int NOT NULL, `email` varchar(255) NOT NULL)";
        let dest = "CREATE TABLE `t` (`id` int NOT NULL, `legacy` text)";
        let analysis = analysis(source, dest);
        assert_eq!(analysis.differences.len(), 2);
        assert!(matches!(
            &analysis.differences[0],
            Difference::AddColumn { name, .. } if name == "email"
        ));
        assert!(matches!(
            &analysis.differences[1],
            Difference::RemoveColumn { name, definition } if name == "legacy" && definition == "text"
        ));
    }

    #[test]
    fn modified_column_keeps_both_definitions() {
        let source = "CREATE TABLE `t` (`n` bigint(20) NOT NULL)";
        let dest = "CREATE TABLE `t` (`n` int(11) NOT NULL)";
        let analysis = analysis(source, dest);
        match &analysis.differences[0] {
            Difference::ModifyColumn { name, original, new } => {
                assert_eq!(name, "n");
                assert_eq!(original, "int(11) NOT NULL");
                assert_eq!(new, "bigint(20) NOT NULL");
            }
            other => panic!("unexpected difference: {other:?}"),
        }
    }

    #[test]
    fn index_differences_by_name() {
        let source =
            "CREATE TABLE `t` (`a` int, `b` int, KEY `a_idx` (`a`), UNIQUE KEY `b_idx` (`b`))";
        let dest = "CREATE TABLE `t` (`a` int, `b` int, KEY `a_idx` (`a`, `b`), KEY `old_idx` (`b`))";
        let analysis = analysis(source, dest);

        let modify = analysis
            .differences
            .iter()
            .find(|d| matches!(d, Difference::ModifyIndex { name, .. } if name == "a_idx"))
            .expect("a_idx modified");
        let (original, new) = modify.from_to().unwrap();
        assert_eq!(original, "KEY `a_idx` (`a`, `b`)");
        assert_eq!(new, "KEY `a_idx` (`a`)");

        assert!(analysis
            .differences
            .iter()
            .any(|d| matches!(d, Difference::AddIndex { name, .. } if name == "b_idx")));
        assert!(analysis
            .differences
            .iter()
            .any(|d| matches!(d, Difference::RemoveIndex { name, .. } if name == "old_idx")));
    }

    #[test]
    fn constraint_differences() {
        let source = "CREATE TABLE `t` (`u` int, \
            CONSTRAINT `fk_u` FOREIGN KEY (`u`) REFERENCES `users` (`id`) ON DELETE CASCADE)";
        let dest = "CREATE TABLE `t` (`u` int, \
            CONSTRAINT `fk_u` FOREIGN KEY (`u`) REFERENCES `users` (`id`))";
        let analysis = analysis(source, dest);
        assert_eq!(analysis.differences.len(), 1);
        match &analysis.differences[0] {
            Difference::ModifyConstraint { name, original, new } => {
                assert_eq!(name, "fk_u");
                assert!(!original.contains("ON DELETE"));
                assert!(new.contains("ON DELETE CASCADE"));
            }
            other => panic!("unexpected difference: {other:?}"),
        }
    }

    #[test]
    fn table_option_differences() {
        let source = "CREATE TABLE `t` (`a` int) ENGINE=MyISAM DEFAULT CHARSET=utf8mb4 \
                      COLLATE=utf8mb4_unicode_ci COMMENT='fresh'";
        let dest = "CREATE TABLE `t` (`a` int) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 \
                    COLLATE=utf8mb4_general_ci";
        let analysis = analysis(source, dest);
        let options: Vec<_> = analysis
            .differences
            .iter()
            .filter_map(|d| match d {
                Difference::TableOption { option, original, new } => {
                    Some((*option, original.clone(), new.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            options,
            vec![
                (
                    TableOptionKind::Comment,
                    String::new(),
                    "fresh".to_string()
                ),
                (
                    TableOptionKind::Engine,
                    "InnoDB".to_string(),
                    "MyISAM".to_string()
                ),
                (
                    TableOptionKind::Collate,
                    "utf8mb4_general_ci".to_string(),
                    "utf8mb4_unicode_ci".to_string()
                ),
            ]
        );
    }

    #[test]
    fn fulltext_definition_detection() {
        assert!(is_fulltext_definition("FULLTEXT KEY `ft` (`a`)"));
        assert!(!is_fulltext_definition("KEY `k` (`a`)"));
    }
}
