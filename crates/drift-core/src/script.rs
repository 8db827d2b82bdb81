//! Migration and rollback script assembly.
//!
//! Walks the seven object kinds in a fixed order and emits one SQL script
//! per direction, bracketed by `SET FOREIGN_KEY_CHECKS`. Tables are altered
//! in place through the planners; routines are replaced by drop-and-recreate
//! inside `DELIMITER` framing; views and sequences are dropped and recreated
//! when their DDL differs.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

use crate::alter;
use crate::diff::{self, Difference, SchemaComparison};
use crate::model::ObjectKind;
use crate::plan::{OperationKind, PlannedOperation};
use crate::report;
use crate::rollback;
use crate::safety::SafetyWarning;
use crate::snapshot::SchemaSnapshot;

/// Everything the assemblers need, borrowed from the planning pass.
pub struct ScriptContext<'a> {
    pub source: &'a SchemaSnapshot,
    pub dest: &'a SchemaSnapshot,
    pub comparison: &'a SchemaComparison,
    /// Differences for every in-both table that needs work.
    pub table_changes: &'a BTreeMap<String, Vec<Difference>>,
    pub generated_at: DateTime<Utc>,
}

/// One assembled script plus everything observed while assembling it.
#[derive(Debug, Clone, Default)]
pub struct AssembledScript {
    pub sql: String,
    /// Units of work, in emission order.
    pub operations: Vec<PlannedOperation>,
    /// Plan-time warnings from the table planners.
    pub warnings: Vec<SafetyWarning>,
    /// Objects that could not be emitted (missing DDL); the script carries
    /// an `-- ERROR:` comment at the corresponding position.
    pub issues: Vec<String>,
}

/// Assembles the forward migration script.
pub fn assemble_migration(ctx: &ScriptContext<'_>) -> AssembledScript {
    let mut out = AssembledScript::default();
    let mut lines = header_lines(
        "migration",
        ctx.source.name(),
        ctx.dest.name(),
        ctx.generated_at,
    );

    for kind in ObjectKind::ALL {
        let mut section: Vec<String> = Vec::new();
        let kind_diff = ctx.comparison.kind(kind);

        // Objects only in the destination are dropped first within a block,
        // mirroring the drop-before-create rule inside tables.
        for name in &kind_diff.only_in_dest {
            section.push(format!("-- Drop {}: {name}", kind.singular()));
            section.push(format!(
                "DROP {} IF EXISTS `{name}`;",
                kind.sql_keyword()
            ));
            out.operations.push(PlannedOperation {
                kind,
                name: name.clone(),
                op: OperationKind::Drop,
                sql: format!("DROP {} IF EXISTS `{name}`", kind.sql_keyword()),
            });
            section.push(String::new());
        }

        for name in &kind_diff.only_in_source {
            match ctx.source.ddl(kind, name) {
                Some(ddl) => {
                    section.push(format!("-- Create {}: {name}", kind.singular()));
                    if kind.is_routine() {
                        section.push(format!("DROP {} IF EXISTS `{name}`;", kind.sql_keyword()));
                    }
                    let sql = emit_create(kind, name, ddl, &mut section);
                    out.operations.push(PlannedOperation {
                        kind,
                        name: name.clone(),
                        op: OperationKind::Create,
                        sql,
                    });
                }
                None => {
                    section.push(format!(
                        "-- ERROR: missing source DDL for {} `{name}`",
                        kind.singular()
                    ));
                    out.issues
                        .push(format!("missing source DDL for {} `{name}`", kind.singular()));
                }
            }
            section.push(String::new());
        }

        for name in &kind_diff.in_both {
            if kind == ObjectKind::Tables {
                let Some(differences) = ctx.table_changes.get(name) else {
                    continue;
                };
                let dest_ddl = ctx.dest.ddl(kind, name).unwrap_or_default();
                let plan = alter::plan_table_alter(name, differences, dest_ddl);
                out.warnings.extend(plan.warnings.iter().cloned());

                section.push(format!("-- Modify table: {name}"));
                for line in report::table_differences_report(name, differences).lines() {
                    section.push(format!("-- {line}"));
                }
                for statement in &plan.statements {
                    section.push(format!("{statement};"));
                }
                out.operations.push(PlannedOperation {
                    kind,
                    name: name.clone(),
                    op: OperationKind::Modify,
                    sql: plan.statements.join(";\n"),
                });
                section.push(String::new());
            } else {
                let source_ddl = ctx.source.ddl(kind, name).unwrap_or_default();
                let dest_ddl = ctx.dest.ddl(kind, name).unwrap_or_default();
                if diff::ddl_equal(source_ddl, dest_ddl) {
                    continue;
                }
                section.push(format!("-- Update {}: {name}", kind.singular()));
                section.push(format!(
                    "DROP {} IF EXISTS `{name}`;",
                    kind.sql_keyword()
                ));
                let sql = emit_create(kind, name, source_ddl, &mut section);
                out.operations.push(PlannedOperation {
                    kind,
                    name: name.clone(),
                    op: OperationKind::Modify,
                    sql,
                });
                section.push(String::new());
            }
        }

        append_section(&mut lines, kind, section);
    }

    finish_script(&mut lines);
    out.sql = lines.join("\n");
    out
}

/// Assembles the rollback script: the inverse of every forward operation,
/// restoring the destination's original objects.
pub fn assemble_rollback(ctx: &ScriptContext<'_>) -> AssembledScript {
    let mut out = AssembledScript::default();
    let mut lines = header_lines(
        "rollback",
        ctx.source.name(),
        ctx.dest.name(),
        ctx.generated_at,
    );

    for kind in ObjectKind::ALL {
        let mut section: Vec<String> = Vec::new();
        let kind_diff = ctx.comparison.kind(kind);

        // Objects the forward script created are dropped again.
        for name in &kind_diff.only_in_source {
            section.push(format!("-- Drop created {}: {name}", kind.singular()));
            section.push(format!(
                "DROP {} IF EXISTS `{name}`;",
                kind.sql_keyword()
            ));
            out.operations.push(PlannedOperation {
                kind,
                name: name.clone(),
                op: OperationKind::Drop,
                sql: format!("DROP {} IF EXISTS `{name}`", kind.sql_keyword()),
            });
            section.push(String::new());
        }

        // Objects the forward script dropped are restored from the
        // destination's original DDL, verbatim.
        for name in &kind_diff.only_in_dest {
            match ctx.dest.ddl(kind, name) {
                Some(ddl) => {
                    section.push(format!("-- Restore {}: {name}", kind.singular()));
                    if kind.is_routine() {
                        section.push(format!("DROP {} IF EXISTS `{name}`;", kind.sql_keyword()));
                    }
                    let sql = emit_create(kind, name, ddl, &mut section);
                    out.operations.push(PlannedOperation {
                        kind,
                        name: name.clone(),
                        op: OperationKind::Create,
                        sql,
                    });
                }
                None => {
                    section.push(format!(
                        "-- ERROR: missing destination DDL for {} `{name}`",
                        kind.singular()
                    ));
                    out.issues.push(format!(
                        "missing destination DDL for {} `{name}`",
                        kind.singular()
                    ));
                }
            }
            section.push(String::new());
        }

        for name in &kind_diff.in_both {
            if kind == ObjectKind::Tables {
                let Some(differences) = ctx.table_changes.get(name) else {
                    continue;
                };
                let dest_ddl = ctx.dest.ddl(kind, name).unwrap_or_default();
                let plan = rollback::plan_table_rollback(name, differences, dest_ddl);
                out.warnings.extend(plan.warnings.iter().cloned());

                section.push(format!("-- Roll back table: {name}"));
                for statement in &plan.statements {
                    section.push(format!("{statement};"));
                }
                out.operations.push(PlannedOperation {
                    kind,
                    name: name.clone(),
                    op: OperationKind::Modify,
                    sql: plan.statements.join(";\n"),
                });
                section.push(String::new());
            } else {
                let source_ddl = ctx.source.ddl(kind, name).unwrap_or_default();
                let dest_ddl = ctx.dest.ddl(kind, name).unwrap_or_default();
                if diff::ddl_equal(source_ddl, dest_ddl) {
                    continue;
                }
                section.push(format!("-- Restore {}: {name}", kind.singular()));
                section.push(format!(
                    "DROP {} IF EXISTS `{name}`;",
                    kind.sql_keyword()
                ));
                let sql = emit_create(kind, name, dest_ddl, &mut section);
                out.operations.push(PlannedOperation {
                    kind,
                    name: name.clone(),
                    op: OperationKind::Modify,
                    sql,
                });
                section.push(String::new());
            }
        }

        append_section(&mut lines, kind, section);
    }

    finish_script(&mut lines);
    out.sql = lines.join("\n");
    out
}

// ===========================================================================
// Emission helpers
// ===========================================================================

/// Emits the CREATE for one object into `section` and returns the SQL used
/// for operation records. Routines get delimiter framing; everything else is
/// a single `;`-terminated statement.
fn emit_create(kind: ObjectKind, _name: &str, ddl: &str, section: &mut Vec<String>) -> String {
    if kind.is_routine() {
        let framed = frame_routine(ddl);
        section.push(framed.clone());
        framed
    } else {
        let trimmed = ddl.trim();
        let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
        section.push(format!("{trimmed};"));
        trimmed.to_string()
    }
}

/// Wraps a routine body in DELIMITER framing.
///
/// Bodies that contain the default `$$` delimiter switch to `$drift$` so the
/// framing never collides with the body text.
pub fn frame_routine(ddl: &str) -> String {
    let trimmed = ddl.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    let delimiter = if trimmed.contains("$$") { "$drift$" } else { "$$" };
    format!("DELIMITER {delimiter}\n{trimmed}{delimiter}\nDELIMITER ;")
}

fn header_lines(
    kind: &str,
    source_schema: &str,
    dest_schema: &str,
    generated_at: DateTime<Utc>,
) -> Vec<String> {
    vec![
        format!("-- drift {kind} script"),
        format!("-- Source schema: {source_schema}"),
        format!("-- Destination schema: {dest_schema}"),
        format!(
            "-- Generated: {}",
            generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        "--".to_string(),
        "-- Review this script carefully before executing!".to_string(),
        "-- It modifies the destination database structure.".to_string(),
        String::new(),
        "SET FOREIGN_KEY_CHECKS = 0;".to_string(),
        String::new(),
    ]
}

fn append_section(lines: &mut Vec<String>, kind: ObjectKind, section: Vec<String>) {
    if section.iter().all(|l| l.trim().is_empty()) {
        return;
    }
    lines.push(format!("-- {} CHANGES", kind.as_str().to_uppercase()));
    lines.push(format!("-- {}", "-".repeat(48)));
    lines.extend(section);
}

fn finish_script(lines: &mut Vec<String>) {
    lines.push("SET FOREIGN_KEY_CHECKS = 1;".to_string());
    lines.push(String::new());
    lines.push("-- Script completed.".to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{MemorySource, SchemaSnapshot};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn snapshot(name: &str, source: MemorySource) -> SchemaSnapshot {
        SchemaSnapshot::load(name, &source).unwrap()
    }

    fn context_scripts(
        source: MemorySource,
        dest: MemorySource,
    ) -> (AssembledScript, AssembledScript) {
        let source = snapshot("src", source);
        let dest = snapshot("dst", dest);
        let comparison = diff::compare_objects(&source, &dest);
        let mut table_changes = BTreeMap::new();
        for name in &comparison.kind(ObjectKind::Tables).in_both {
            let analysis = diff::analyze_table_differences(
                name,
                source.ddl(ObjectKind::Tables, name).unwrap(),
                dest.ddl(ObjectKind::Tables, name).unwrap(),
            )
            .unwrap();
            if !analysis.is_unchanged() {
                table_changes.insert(name.clone(), analysis.differences);
            }
        }
        let ctx = ScriptContext {
            source: &source,
            dest: &dest,
            comparison: &comparison,
            table_changes: &table_changes,
            generated_at: ts(),
        };
        (assemble_migration(&ctx), assemble_rollback(&ctx))
    }

    #[test]
    fn scripts_are_bracketed_by_fk_checks() {
        let (migration, rollback) = context_scripts(MemorySource::new(), MemorySource::new());
        for script in [&migration.sql, &rollback.sql] {
            let disable = script.find("SET FOREIGN_KEY_CHECKS = 0;").unwrap();
            let enable = script.find("SET FOREIGN_KEY_CHECKS = 1;").unwrap();
            assert!(disable < enable);
        }
    }

    #[test]
    fn dest_only_table_is_dropped_and_restored_verbatim() {
        let dest_ddl = "CREATE TABLE `temp_table` (`id` int NOT NULL)";
        let (migration, rollback) = context_scripts(
            MemorySource::new(),
            MemorySource::new().with(ObjectKind::Tables, "temp_table", dest_ddl),
        );
        assert!(migration.sql.contains("DROP TABLE IF EXISTS `temp_table`;"));
        assert!(rollback.sql.contains(&format!("{dest_ddl};")));

        assert_eq!(migration.operations.len(), 1);
        assert_eq!(migration.operations[0].op, OperationKind::Drop);
        assert_eq!(rollback.operations[0].op, OperationKind::Create);
    }

    #[test]
    fn source_only_table_is_created_and_rolled_back_with_drop() {
        let source_ddl = "CREATE TABLE `fresh` (`id` int NOT NULL);";
        let (migration, rollback) = context_scripts(
            MemorySource::new().with(ObjectKind::Tables, "fresh", source_ddl),
            MemorySource::new(),
        );
        assert!(migration
            .sql
            .contains("CREATE TABLE `fresh` (`id` int NOT NULL);"));
        assert!(rollback.sql.contains("DROP TABLE IF EXISTS `fresh`;"));
    }

    #[test]
    fn whitespace_only_routine_difference_is_not_emitted() {
        let source = MemorySource::new().with(
            ObjectKind::Procedures,
            "p",
            "CREATE PROCEDURE `p`()\nBEGIN\n  SELECT 1;\nEND",
        );
        let dest = MemorySource::new().with(
            ObjectKind::Procedures,
            "p",
            "CREATE PROCEDURE `p`() BEGIN SELECT 1; END",
        );
        let (migration, _) = context_scripts(source, dest);
        assert!(!migration.sql.contains("PROCEDURES CHANGES"));
        assert!(migration.operations.is_empty());
    }

    #[test]
    fn changed_procedure_is_dropped_and_recreated_with_delimiters() {
        let source_body = "CREATE PROCEDURE `p`() BEGIN SELECT 2; END";
        let source = MemorySource::new().with(ObjectKind::Procedures, "p", source_body);
        let dest = MemorySource::new().with(
            ObjectKind::Procedures,
            "p",
            "CREATE PROCEDURE `p`() BEGIN SELECT 1; END",
        );
        let (migration, rollback) = context_scripts(source, dest);

        assert!(migration.sql.contains("DROP PROCEDURE IF EXISTS `p`;"));
        assert!(migration
            .sql
            .contains(&format!("DELIMITER $$\n{source_body}$$\nDELIMITER ;")));
        // Rollback restores the destination's body.
        assert!(rollback.sql.contains("SELECT 1"));
        assert!(!rollback.sql.contains("SELECT 2"));
    }

    #[test]
    fn routine_body_containing_dollar_delimiter_switches_framing() {
        let body = "CREATE FUNCTION `f`() RETURNS int BEGIN RETURN '$$'; END";
        let framed = frame_routine(body);
        assert!(framed.starts_with("DELIMITER $drift$\n"));
        assert!(framed.ends_with("$drift$\nDELIMITER ;"));
    }

    #[test]
    fn view_change_is_drop_and_recreate() {
        let source = MemorySource::new().with(
            ObjectKind::Views,
            "v",
            "CREATE VIEW `v` AS SELECT `id`, `email` FROM `users`",
        );
        let dest = MemorySource::new().with(
            ObjectKind::Views,
            "v",
            "CREATE VIEW `v` AS SELECT `id` FROM `users`",
        );
        let (migration, rollback) = context_scripts(source, dest);
        assert!(migration.sql.contains("DROP VIEW IF EXISTS `v`;"));
        assert!(migration.sql.contains("`email`"));
        assert!(rollback.sql.contains("DROP VIEW IF EXISTS `v`;"));
        assert!(!rollback.sql.contains("`email`"));
    }

    #[test]
    fn table_modification_emits_planner_statements_in_order() {
        let source = MemorySource::new().with(
            ObjectKind::Tables,
            "users",
            "CREATE TABLE `users` (`id` int NOT NULL, `email` varchar(255) NOT NULL, PRIMARY KEY (`id`))",
        );
        let dest = MemorySource::new().with(
            ObjectKind::Tables,
            "users",
            "CREATE TABLE `users` (`id` int NOT NULL, `email` varchar(255) NOT NULL, \
             `tenant_id` int DEFAULT NULL, PRIMARY KEY (`id`), \
             CONSTRAINT `fk_u_t` FOREIGN KEY (`tenant_id`) REFERENCES `tenants` (`id`))",
        );
        let (migration, rollback) = context_scripts(source, dest);

        let fk = migration
            .sql
            .find("DROP FOREIGN KEY IF EXISTS `fk_u_t`")
            .unwrap();
        let col = migration
            .sql
            .find("DROP COLUMN IF EXISTS `tenant_id`")
            .unwrap();
        assert!(fk < col);

        let add_col = rollback
            .sql
            .find("ADD COLUMN `tenant_id` int DEFAULT NULL")
            .unwrap();
        let add_fk = rollback.sql.find("ADD CONSTRAINT `fk_u_t`").unwrap();
        assert!(add_col < add_fk);
    }

    #[test]
    fn deterministic_output_for_identical_inputs() {
        let build = || {
            context_scripts(
                MemorySource::new()
                    .with(ObjectKind::Tables, "b", "CREATE TABLE `b` (`id` int)")
                    .with(ObjectKind::Tables, "a", "CREATE TABLE `a` (`id` int)"),
                MemorySource::new(),
            )
        };
        let (m1, r1) = build();
        let (m2, r2) = build();
        assert_eq!(m1.sql, m2.sql);
        assert_eq!(r1.sql, r2.sql);
    }
}
