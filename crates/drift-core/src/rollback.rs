//! Symmetric rollback planning for one table.
//!
//! Consumes the same difference list as the forward planner and produces the
//! inverse statements, ordered so that objects added by the forward script
//! are removed before the columns they depend on, and original objects are
//! restored only after their columns exist again:
//!
//! 1. preflight drops of foreign keys referencing columns the rollback drops,
//! 2. drop added constraints and indexes,
//! 3. drop added columns, restore modified columns,
//! 4. re-add removed columns,
//! 5. re-add removed indexes and constraints, restore modified ones,
//! 6. restore table options.

use std::collections::BTreeSet;

use tracing::debug;

use crate::alter::{
    TablePlan, index_add_clause, index_drop_clause, push_fk_drop, table_option_statement,
};
use crate::diff::Difference;
use crate::parser;

/// Plans the rollback statements that restore the destination table after
/// the forward migration ran.
///
/// `dest_table_ddl` is the original destination `CREATE TABLE` (the state
/// being restored).
pub fn plan_table_rollback(
    table: &str,
    differences: &[Difference],
    dest_table_ddl: &str,
) -> TablePlan {
    let mut plan = TablePlan::default();
    let mut dropped_fks: BTreeSet<String> = BTreeSet::new();

    // Columns the rollback will drop: everything the forward script added.
    let added_columns: BTreeSet<String> = differences
        .iter()
        .filter_map(|d| match d {
            Difference::AddColumn { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();

    // -- Priority 1: preflight FK drops -------------------------------------
    for name in foreign_keys_added_on_columns(differences, dest_table_ddl, &added_columns) {
        push_fk_drop(&mut plan.statements, &mut dropped_fks, table, &name);
    }

    // -- Priority 2: drop constraints and indexes the forward script added --
    for diff in differences {
        match diff {
            Difference::AddConstraint { name, .. } => {
                push_fk_drop(&mut plan.statements, &mut dropped_fks, table, name);
            }
            Difference::AddIndex { name, definition } => {
                plan.statements.push(format!(
                    "ALTER TABLE `{table}` {}",
                    index_drop_clause(name, definition, false)
                ));
            }
            Difference::ModifyIndex { name, new, .. } => {
                plan.statements.push(format!(
                    "ALTER TABLE `{table}` {}",
                    index_drop_clause(name, new, false)
                ));
            }
            _ => {}
        }
    }

    // -- Priority 3: undo column additions and modifications ----------------
    for diff in differences {
        match diff {
            Difference::AddColumn { name, .. } => {
                plan.statements
                    .push(format!("ALTER TABLE `{table}` DROP COLUMN IF EXISTS `{name}`"));
            }
            Difference::ModifyColumn { name, original, .. } => {
                plan.statements
                    .push(format!("ALTER TABLE `{table}` MODIFY COLUMN `{name}` {original}"));
            }
            _ => {}
        }
    }

    // -- Priority 4: re-add dropped columns ---------------------------------
    for diff in differences {
        if let Difference::RemoveColumn { name, definition } = diff {
            plan.statements
                .push(format!("ALTER TABLE `{table}` ADD COLUMN `{name}` {definition}"));
        }
    }

    // -- Priority 5: restore indexes and constraints ------------------------
    for diff in differences {
        match diff {
            Difference::RemoveIndex { definition, .. } => {
                plan.statements.push(format!(
                    "ALTER TABLE `{table}` ADD {}",
                    index_add_clause(definition)
                ));
            }
            Difference::ModifyIndex { original, .. } => {
                plan.statements.push(format!(
                    "ALTER TABLE `{table}` ADD {}",
                    index_add_clause(original)
                ));
            }
            _ => {}
        }
    }
    for diff in differences {
        match diff {
            Difference::RemoveConstraint { definition, .. } => {
                plan.statements
                    .push(format!("ALTER TABLE `{table}` ADD {definition}"));
            }
            Difference::ModifyConstraint { name, original, .. } => {
                push_fk_drop(&mut plan.statements, &mut dropped_fks, table, name);
                plan.statements
                    .push(format!("ALTER TABLE `{table}` ADD {original}"));
            }
            _ => {}
        }
    }

    // -- Priority 6: restore table options ----------------------------------
    for diff in differences {
        if let Difference::TableOption { option, original, .. } = diff {
            plan.statements
                .push(table_option_statement(table, *option, original));
        }
    }

    debug!(
        table,
        statements = plan.statements.len(),
        "planned rollback ALTERs"
    );
    plan
}

/// Foreign keys that would dangle once the rollback drops `columns`: those
/// the forward script added or rewrote, plus any in the destination DDL.
fn foreign_keys_added_on_columns(
    differences: &[Difference],
    dest_table_ddl: &str,
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
            Difference::AddConstraint { definition, .. } => consider(definition),
            Difference::ModifyConstraint { new, .. } => consider(new),
            _ => {}
        }
    }

    if !dest_table_ddl.is_empty() {
        if let Ok(parsed) = parser::parse_create_table(dest_table_ddl) {
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
