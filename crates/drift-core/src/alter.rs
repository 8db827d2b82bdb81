//! Ordered ALTER planning for one table.
//!
//! Statements are emitted in five phases so dependent objects exist before
//! their referents and conflicting objects are removed before replacements:
//!
//! 0. preflight drops of foreign keys whose referenced columns are dropped,
//! 1. drop constraints and indexes,
//! 2. modify columns,
//! 3. drop columns,
//! 4. add columns, add indexes, add constraints, modify constraints, table
//!    options.
//!
//! Duplicate `DROP FOREIGN KEY` statements (preflight plus phase 1) are
//! suppressed before emission.

use std::collections::BTreeSet;

use tracing::debug;

use crate::diff::{Difference, TableOptionKind, is_fulltext_definition};
use crate::model::Index;
use crate::parser;
use crate::safety::{RiskLevel, SafetyWarning};

/// The ordered statements for one table plus any warnings raised while
/// planning.
#[derive(Debug, Clone, Default)]
pub struct TablePlan {
    /// `ALTER TABLE` statements without trailing semicolons, in execution
    /// order.
    pub statements: Vec<String>,
    /// Plan-time warnings (currently generated-column hazards).
    pub warnings: Vec<SafetyWarning>,
}

impl TablePlan {
    /// Returns `true` if the plan emits nothing.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Plans the forward ALTER statements that turn the destination table into
/// the source table.
///
/// `dest_table_ddl` is the destination's `CREATE TABLE`, consulted to find
/// existing foreign keys on columns that are being dropped.
pub fn plan_table_alter(
    table: &str,
    differences: &[Difference],
    dest_table_ddl: &str,
) -> TablePlan {
    let mut plan = TablePlan::default();
    let mut dropped_fks: BTreeSet<String> = BTreeSet::new();

    let dropped_columns: BTreeSet<String> = differences
        .iter()
        .filter_map(|d| match d {
            Difference::RemoveColumn { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();

    // -- Phase 0: preflight FK drops ----------------------------------------
    for name in foreign_keys_on_columns(differences, dest_table_ddl, &dropped_columns) {
        push_fk_drop(&mut plan.statements, &mut dropped_fks, table, &name);
    }

    // -- Phase 1: drop constraints and indexes ------------------------------
    for diff in differences {
        match diff {
            Difference::RemoveConstraint { name, .. } => {
                push_fk_drop(&mut plan.statements, &mut dropped_fks, table, name);
            }
            Difference::RemoveIndex { name, definition } => {
                plan.statements.push(format!(
                    "ALTER TABLE `{table}` {}",
                    index_drop_clause(name, definition, true)
                ));
            }
            Difference::ModifyIndex { name, original, .. } => {
                plan.statements.push(format!(
                    "ALTER TABLE `{table}` {}",
                    index_drop_clause(name, original, false)
                ));
            }
            _ => {}
        }
    }

    // -- Phase 2: modify columns --------------------------------------------
    for diff in differences {
        if let Difference::ModifyColumn { name, new, .. } = diff {
            if let Some(dropped) = generated_reference_to_dropped(new, &dropped_columns) {
                // Rewriting the expression would silently change its meaning,
                // so the statement goes out unchanged with a warning attached.
                plan.warnings.push(SafetyWarning {
                    risk_level: RiskLevel::High,
                    operation: "MODIFY COLUMN".to_string(),
                    object: table.to_string(),
                    description: format!(
                        "generated column '{name}' references '{dropped}', which this \
                         migration drops; the expression is emitted unchanged and will fail \
                         until it is rewritten"
                    ),
                    recommendation: "supply a replacement expression for the generated column"
                        .to_string(),
                });
            }
            plan.statements
                .push(format!("ALTER TABLE `{table}` MODIFY COLUMN `{name}` {new}"));
        }
    }

    // -- Phase 3: drop columns ----------------------------------------------
    for diff in differences {
        if let Difference::RemoveColumn { name, .. } = diff {
            plan.statements
                .push(format!("ALTER TABLE `{table}` DROP COLUMN IF EXISTS `{name}`"));
        }
    }

    // -- Phase 4: additions, constraint swaps, table options ----------------
    for diff in differences {
        if let Difference::AddColumn { name, definition } = diff {
            plan.statements
                .push(format!("ALTER TABLE `{table}` ADD COLUMN `{name}` {definition}"));
        }
    }
    for diff in differences {
        match diff {
            Difference::AddIndex { definition, .. } => {
                plan.statements.push(format!(
                    "ALTER TABLE `{table}` ADD {}",
                    index_add_clause(definition)
                ));
            }
            Difference::ModifyIndex { new, .. } => {
                plan.statements.push(format!(
                    "ALTER TABLE `{table}` ADD {}",
                    index_add_clause(new)
                ));
            }
            _ => {}
        }
    }
    for diff in differences {
        if let Difference::AddConstraint { definition, .. } = diff {
            plan.statements
                .push(format!("ALTER TABLE `{table}` ADD {definition}"));
        }
    }
    for diff in differences {
        if let Difference::ModifyConstraint { name, new, .. } = diff {
            push_fk_drop(&mut plan.statements, &mut dropped_fks, table, name);
            plan.statements
                .push(format!("ALTER TABLE `{table}` ADD {new}"));
        }
    }
    for diff in differences {
        if let Difference::TableOption { option, new, .. } = diff {
            plan.statements
                .push(table_option_statement(table, *option, new));
        }
    }

    debug!(
        table,
        statements = plan.statements.len(),
        warnings = plan.warnings.len(),
        "planned forward ALTERs"
    );
    plan
}

// ===========================================================================
// Shared helpers (also used by the rollback planner)
// ===========================================================================

/// Emits a de-duplicated `DROP FOREIGN KEY IF EXISTS` statement.
pub(crate) fn push_fk_drop(
    statements: &mut Vec<String>,
    seen: &mut BTreeSet<String>,
    table: &str,
    constraint: &str,
) {
    if seen.insert(constraint.to_string()) {
        statements.push(format!(
            "ALTER TABLE `{table}` DROP FOREIGN KEY IF EXISTS `{constraint}`"
        ));
    }
}

/// Collects names of foreign keys whose local columns intersect `columns`,
/// from constraint-bearing differences and from the table DDL.
///
/// Constraint definitions are parsed into [`crate::model::ForeignKey`]
/// values and matched on their column lists.
pub(crate) fn foreign_keys_on_columns(
    differences: &[Difference],
    table_ddl: &str,
    columns: &BTreeSet<String>,
) -> Vec<String> {
    let mut names = Vec::new();
    if columns.is_empty() {
        return names;
    }

    let mut consider = |definition: &str| {
        if let Some(fk) = parser::parse_foreign_key_definition(definition) {
            if columns.iter().any(|c| fk.references_local_column(c))
                && !names.contains(&fk.name)
            {
                names.push(fk.name);
            }
        }
    };

    for diff in differences {
        match diff {
            Difference::RemoveConstraint { definition, .. } => consider(definition),
            Difference::ModifyConstraint { original, .. } => consider(original),
            _ => {}
        }
    }

    if !table_ddl.is_empty() {
        if let Ok(parsed) = parser::parse_create_table(table_ddl) {
            for fk in parsed.table.foreign_keys.values() {
                if columns.iter().any(|c| fk.references_local_column(c))
                    && !names.contains(&fk.name)
                {
                    names.push(fk.name.clone());
                }
            }
        }
    }

    names
}

/// Renders the drop clause for one index.
///
/// The primary key has its own `DROP PRIMARY KEY` syntax (no name, no
/// `IF EXISTS`); FULLTEXT indexes drop via `DROP KEY`.
pub(crate) fn index_drop_clause(name: &str, definition: &str, if_exists: bool) -> String {
    if name == Index::PRIMARY_NAME {
        return "DROP PRIMARY KEY".to_string();
    }
    let exists = if if_exists { "IF EXISTS " } else { "" };
    if is_fulltext_definition(definition) {
        format!("DROP KEY {exists}`{name}`")
    } else {
        format!("DROP INDEX {exists}`{name}`")
    }
}

/// Rewrites a rendered index definition into its `ALTER TABLE ... ADD` form:
/// `KEY` becomes `INDEX`, `UNIQUE KEY` becomes `UNIQUE INDEX`; primary,
/// fulltext and spatial keys keep their spelling.
pub(crate) fn index_add_clause(definition: &str) -> String {
    let upper = definition.to_uppercase();
    if upper.starts_with("UNIQUE KEY") {
        format!("UNIQUE INDEX{}", &definition["UNIQUE KEY".len()..])
    } else if upper.starts_with("KEY") {
        format!("INDEX{}", &definition["KEY".len()..])
    } else {
        definition.to_string()
    }
}

/// Renders one table-option alteration.
pub(crate) fn table_option_statement(table: &str, option: TableOptionKind, value: &str) -> String {
    match option {
        TableOptionKind::Comment => {
            format!("ALTER TABLE `{table}` COMMENT='{}'", value.replace('\'', "''"))
        }
        TableOptionKind::Engine => format!("ALTER TABLE `{table}` ENGINE={value}"),
        TableOptionKind::Charset => format!("ALTER TABLE `{table}` DEFAULT CHARSET={value}"),
        TableOptionKind::Collate => {
            // The charset is the collation name up to the first underscore;
            // CONVERT updates both the table default and existing columns.
            let charset = value.split('_').next().unwrap_or(value);
            format!("ALTER TABLE `{table}` CONVERT TO CHARACTER SET {charset} COLLATE {value}")
        }
    }
}

/// If `definition` is a generated column whose expression references one of
/// `columns`, returns that column name.
pub(crate) fn generated_reference_to_dropped(
    definition: &str,
    columns: &BTreeSet<String>,
) -> Option<String> {
    let expression = generated_expression(definition)?;
    for column in columns {
        let quoted = format!("`{column}`");
        if expression.contains(&quoted) || contains_word(&expression, column) {
            return Some(column.clone());
        }
    }
    None
}

/// Extracts the expression of a generated column definition, if any.
fn generated_expression(definition: &str) -> Option<String> {
    let upper = definition.to_uppercase();
    let marker = if let Some(pos) = upper.find("GENERATED ALWAYS AS") {
        pos + "GENERATED ALWAYS AS".len()
    } else if let Some(pos) = upper.find(" AS (") {
        pos + " AS".len()
    } else {
        return None;
    };
    let rest = &definition[marker..];
    let open = rest.find('(')?;
    let rest = &rest[open..];
    let mut depth = 0;
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(rest[..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Whole-word containment check for bare (unquoted) identifiers.
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|token| token == word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DEST_WITH_FK: &str = "CREATE TABLE `users` (\
        `id` int NOT NULL, `email` varchar(255) NOT NULL, `tenant_id` int DEFAULT NULL, \
        PRIMARY KEY (`id`), \
        CONSTRAINT `fk_u_t` FOREIGN KEY (`tenant_id`) REFERENCES `tenants` (`id`)\
        ) ENGINE=InnoDB";

    #[test]
    fn drops_fk_before_referenced_column() {
        // Scenario: the source no longer has tenant_id, so the destination
        // column and its constraint both go away.
        let differences = vec![
            Difference::RemoveColumn {
                name: "tenant_id".into(),
                definition: "int DEFAULT NULL".into(),
            },
            Difference::RemoveConstraint {
                name: "fk_u_t".into(),
                definition:
                    "CONSTRAINT `fk_u_t` FOREIGN KEY (`tenant_id`) REFERENCES `tenants` (`id`)"
                        .into(),
            },
        ];
        let plan = plan_table_alter("users", &differences, DEST_WITH_FK);

        let fk_drop = plan
            .statements
            .iter()
            .position(|s| s.contains("DROP FOREIGN KEY IF EXISTS `fk_u_t`"))
            .expect("fk drop emitted");
        let col_drop = plan
            .statements
            .iter()
            .position(|s| s.contains("DROP COLUMN IF EXISTS `tenant_id`"))
            .expect("column drop emitted");
        assert!(fk_drop < col_drop);

        // Preflight and phase 1 must not both emit the drop.
        let drops = plan
            .statements
            .iter()
            .filter(|s| s.contains("DROP FOREIGN KEY IF EXISTS `fk_u_t`"))
            .count();
        assert_eq!(drops, 1);
    }

    #[test]
    fn preflight_finds_fk_in_dest_ddl_without_constraint_difference() {
        // The constraint never shows up as a difference, but the destination
        // DDL still carries it, so it has to be dropped first.
        let differences = vec![Difference::RemoveColumn {
            name: "tenant_id".into(),
            definition: "int DEFAULT NULL".into(),
        }];
        let plan = plan_table_alter("users", &differences, DEST_WITH_FK);
        assert!(plan.statements[0].contains("DROP FOREIGN KEY IF EXISTS `fk_u_t`"));
    }

    #[test]
    fn adds_column_before_constraint_citing_it() {
        let differences = vec![
            Difference::AddConstraint {
                name: "fk_e_d".into(),
                definition:
                    "CONSTRAINT `fk_e_d` FOREIGN KEY (`dept_id`) REFERENCES `departments` (`id`)"
                        .into(),
            },
            Difference::AddColumn {
                name: "dept_id".into(),
                definition: "int NOT NULL".into(),
            },
        ];
        let plan = plan_table_alter("employees", &differences, "");
        let add_col = plan
            .statements
            .iter()
            .position(|s| s.contains("ADD COLUMN `dept_id`"))
            .unwrap();
        let add_fk = plan
            .statements
            .iter()
            .position(|s| s.contains("ADD CONSTRAINT `fk_e_d`"))
            .unwrap();
        assert!(add_col < add_fk);
    }

    #[test]
    fn fulltext_index_uses_fulltext_add_and_key_drop() {
        let add = plan_table_alter(
            "articles",
            &[Difference::AddIndex {
                name: "ft_search".into(),
                definition: "FULLTEXT KEY `ft_search` (`title`, `body`)".into(),
            }],
            "",
        );
        assert_eq!(
            add.statements,
            vec!["ALTER TABLE `articles` ADD FULLTEXT KEY `ft_search` (`title`, `body`)"]
        );

        let drop = plan_table_alter(
            "articles",
            &[Difference::RemoveIndex {
                name: "ft_search".into(),
                definition: "FULLTEXT KEY `ft_search` (`title`, `body`)".into(),
            }],
            "",
        );
        assert_eq!(
            drop.statements,
            vec!["ALTER TABLE `articles` DROP KEY IF EXISTS `ft_search`"]
        );
    }

    #[test]
    fn primary_key_uses_dedicated_drop_syntax() {
        let drop = plan_table_alter(
            "t",
            &[Difference::RemoveIndex {
                name: "PRIMARY".into(),
                definition: "PRIMARY KEY (`id`)".into(),
            }],
            "",
        );
        assert_eq!(drop.statements, vec!["ALTER TABLE `t` DROP PRIMARY KEY"]);

        let add = plan_table_alter(
            "t",
            &[Difference::AddIndex {
                name: "PRIMARY".into(),
                definition: "PRIMARY KEY (`id`)".into(),
            }],
            "",
        );
        assert_eq!(add.statements, vec!["ALTER TABLE `t` ADD PRIMARY KEY (`id`)"]);
    }

    #[test]
    fn regular_index_add_uses_index_spelling() {
        let plan = plan_table_alter(
            "t",
            &[Difference::AddIndex {
                name: "a_idx".into(),
                definition: "KEY `a_idx` (`a`)".into(),
            }],
            "",
        );
        assert_eq!(plan.statements, vec!["ALTER TABLE `t` ADD INDEX `a_idx` (`a`)"]);
    }

    #[test]
    fn collation_change_emits_convert() {
        let plan = plan_table_alter(
            "t",
            &[Difference::TableOption {
                option: TableOptionKind::Collate,
                original: "utf8mb4_general_ci".into(),
                new: "utf8mb4_unicode_ci".into(),
            }],
            "",
        );
        assert_eq!(
            plan.statements,
            vec!["ALTER TABLE `t` CONVERT TO CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"]
        );
    }

    #[test]
    fn comment_value_is_escaped() {
        let plan = plan_table_alter(
            "t",
            &[Difference::TableOption {
                option: TableOptionKind::Comment,
                original: String::new(),
                new: "it's here".into(),
            }],
            "",
        );
        assert_eq!(
            plan.statements,
            vec!["ALTER TABLE `t` COMMENT='it''s here'"]
        );
    }

    #[test]
    fn modify_constraint_is_drop_then_add() {
        let plan = plan_table_alter(
            "t",
            &[Difference::ModifyConstraint {
                name: "fk_x".into(),
                original: "CONSTRAINT `fk_x` FOREIGN KEY (`a`) REFERENCES `p` (`id`)".into(),
                new: "CONSTRAINT `fk_x` FOREIGN KEY (`a`) REFERENCES `p` (`id`) ON DELETE CASCADE"
                    .into(),
            }],
            "",
        );
        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE `t` DROP FOREIGN KEY IF EXISTS `fk_x`",
                "ALTER TABLE `t` ADD CONSTRAINT `fk_x` FOREIGN KEY (`a`) REFERENCES `p` (`id`) ON DELETE CASCADE",
            ]
        );
    }

    #[test]
    fn generated_column_referencing_dropped_column_warns_and_emits_unchanged() {
        let differences = vec![
            Difference::RemoveColumn {
                name: "discount".into(),
                definition: "decimal(10,2) NOT NULL".into(),
            },
            Difference::ModifyColumn {
                name: "net".into(),
                original: "decimal(10,2) GENERATED ALWAYS AS (`price`) STORED".into(),
                new: "decimal(10,2) GENERATED ALWAYS AS (`price` - `discount`) STORED".into(),
            },
        ];
        let plan = plan_table_alter("orders", &differences, "");

        assert!(plan
            .statements
            .iter()
            .any(|s| s.contains("MODIFY COLUMN `net` decimal(10,2) GENERATED ALWAYS AS (`price` - `discount`) STORED")));
        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(plan.warnings[0].risk_level, RiskLevel::High);
        assert!(plan.warnings[0].description.contains("discount"));
    }

    #[test]
    fn modify_index_drops_then_adds() {
        let plan = plan_table_alter(
            "t",
            &[Difference::ModifyIndex {
                name: "a_idx".into(),
                original: "KEY `a_idx` (`a`)".into(),
                new: "KEY `a_idx` (`a`, `b`)".into(),
            }],
            "",
        );
        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE `t` DROP INDEX `a_idx`",
                "ALTER TABLE `t` ADD INDEX `a_idx` (`a`, `b`)",
            ]
        );
    }

    #[test]
    fn phases_run_in_order_for_mixed_differences() {
        let differences = vec![
            Difference::AddColumn {
                name: "new_col".into(),
                definition: "int NOT NULL DEFAULT 0".into(),
            },
            Difference::RemoveColumn {
                name: "old_col".into(),
                definition: "int".into(),
            },
            Difference::ModifyColumn {
                name: "kept".into(),
                original: "int".into(),
                new: "bigint".into(),
            },
            Difference::RemoveIndex {
                name: "old_idx".into(),
                definition: "KEY `old_idx` (`old_col`)".into(),
            },
            Difference::AddIndex {
                name: "new_idx".into(),
                definition: "KEY `new_idx` (`new_col`)".into(),
            },
        ];
        let plan = plan_table_alter("t", &differences, "");
        let pos = |needle: &str| {
            plan.statements
                .iter()
                .position(|s| s.contains(needle))
                .unwrap_or_else(|| panic!("missing: {needle}"))
        };
        assert!(pos("DROP INDEX IF EXISTS `old_idx`") < pos("MODIFY COLUMN `kept`"));
        assert!(pos("MODIFY COLUMN `kept`") < pos("DROP COLUMN IF EXISTS `old_col`"));
        assert!(pos("DROP COLUMN IF EXISTS `old_col`") < pos("ADD COLUMN `new_col`"));
        assert!(pos("ADD COLUMN `new_col`") < pos("ADD INDEX `new_idx`"));
    }
}
