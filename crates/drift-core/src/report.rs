//! Human-readable comparison reporting.
//!
//! Two artifacts: a per-table difference listing (numbered bullets with
//! FROM/TO for modifications) and a tabular summary whose CREATE/DROP/MODIFY
//! counts come from the planned operations, not raw set sizes, so they
//! reflect only work actually emitted.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

use crate::diff::{Difference, SchemaComparison};
use crate::model::ObjectKind;
use crate::plan::{OperationKind, PlannedOperation};
use crate::safety::SafetyWarning;

/// Renders the numbered difference listing for one table.
pub fn table_differences_report(table: &str, differences: &[Difference]) -> String {
    if differences.is_empty() {
        return format!("Table '{table}': no differences found");
    }

    let mut lines = vec![format!("Table '{table}' differences:")];
    for (i, diff) in differences.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, diff.describe()));
        if let Some((from, to)) = diff.from_to() {
            lines.push(format!("      FROM: {from}"));
            lines.push(format!("      TO:   {to}"));
        }
    }
    lines.join("\n")
}

/// Renders the full comparison report.
#[allow(clippy::too_many_arguments)]
pub fn comparison_report(
    source_schema: &str,
    dest_schema: &str,
    generated_at: DateTime<Utc>,
    comparison: &SchemaComparison,
    table_changes: &BTreeMap<String, Vec<Difference>>,
    operations: &[PlannedOperation],
    safety_warnings: &[SafetyWarning],
    issues: &[String],
) -> String {
    let mut lines = vec![
        "drift schema comparison report".to_string(),
        "=".repeat(50),
        format!("Source schema: {source_schema}"),
        format!("Destination schema: {dest_schema}"),
        format!(
            "Generated: {}",
            generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        String::new(),
    ];

    lines.extend(summary_table(comparison, operations));

    if !table_changes.is_empty() {
        lines.push(String::new());
        lines.push("Detailed table changes:".to_string());
        lines.push("-".repeat(24));
        for (table, differences) in table_changes {
            for line in table_differences_report(table, differences).lines() {
                lines.push(line.to_string());
            }
            lines.push(String::new());
        }
    }

    lines.push(format!("Total migration operations: {}", operations.len()));
    lines.push(format!("Safety warnings: {}", safety_warnings.len()));

    if operations.is_empty() {
        lines.push(String::new());
        lines.push("Schemas are in sync - no migration operations required.".to_string());
    }

    if !issues.is_empty() {
        lines.push(String::new());
        lines.push("Issues:".to_string());
        for issue in issues {
            lines.push(format!("  - {issue}"));
        }
    }

    lines.join("\n")
}

/// The `{ObjectType, Source, Dest, Both, Create, Drop, Modify, Total}`
/// summary block.
pub fn summary_table(comparison: &SchemaComparison, operations: &[PlannedOperation]) -> Vec<String> {
    let mut lines = vec![
        "Schema Objects Summary".to_string(),
        "-".repeat(22),
        String::new(),
    ];

    let header = format!(
        "{:<12} {:<8} {:<8} {:<8} {:<8} {:<8} {:<8} {:<8}",
        "Object Type", "Source", "Dest", "Both", "Create", "Drop", "Modify", "Total"
    );
    let rule = "-".repeat(header.len());
    lines.push(header.clone());
    lines.push(rule.clone());

    let mut total_create = 0usize;
    let mut total_drop = 0usize;
    let mut total_modify = 0usize;

    for kind in ObjectKind::ALL {
        let kind_diff = comparison.kind(kind);
        let in_both = kind_diff.in_both.len();
        let source_total = kind_diff.only_in_source.len() + in_both;
        let dest_total = kind_diff.only_in_dest.len() + in_both;

        let creates = count_ops(operations, kind, OperationKind::Create);
        let drops = count_ops(operations, kind, OperationKind::Drop);
        let modifies = count_ops(operations, kind, OperationKind::Modify);
        total_create += creates;
        total_drop += drops;
        total_modify += modifies;

        lines.push(format!(
            "{:<12} {:<8} {:<8} {:<8} {:<8} {:<8} {:<8} {:<8}",
            kind_title(kind),
            source_total,
            dest_total,
            in_both,
            creates,
            drops,
            modifies,
            creates + drops + modifies,
        ));
    }

    lines.push(rule);
    lines.push(format!(
        "{:<12} {:<8} {:<8} {:<8} {:<8} {:<8} {:<8} {:<8}",
        "TOTAL",
        "",
        "",
        "",
        total_create,
        total_drop,
        total_modify,
        total_create + total_drop + total_modify,
    ));
    lines.push(String::new());
    lines.extend(
        [
            "Column Descriptions:",
            "  Source:    Total objects in source schema",
            "  Dest:      Total objects in destination schema",
            "  Both:      Objects existing in both schemas",
            "  Create:    Objects to be created in destination",
            "  Drop:      Objects to be dropped from destination",
            "  Modify:    Objects to be modified (same name, different definition)",
            "  Total:     All operations for this object type",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    lines
}

fn count_ops(operations: &[PlannedOperation], kind: ObjectKind, op: OperationKind) -> usize {
    operations
        .iter()
        .filter(|o| o.kind == kind && o.op == op)
        .count()
}

fn kind_title(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Tables => "Tables",
        ObjectKind::Procedures => "Procedures",
        ObjectKind::Functions => "Functions",
        ObjectKind::Triggers => "Triggers",
        ObjectKind::Events => "Events",
        ObjectKind::Views => "Views",
        ObjectKind::Sequences => "Sequences",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn table_report_numbers_differences_with_from_to() {
        let differences = vec![
            Difference::AddColumn {
                name: "dept_id".into(),
                definition: "int NOT NULL".into(),
            },
            Difference::ModifyColumn {
                name: "email".into(),
                original: "varchar(191) NOT NULL".into(),
                new: "varchar(255) NOT NULL".into(),
            },
        ];
        assert_snapshot!(table_differences_report("users", &differences), @r"
        Table 'users' differences:
          1. Column ADDED: dept_id (int NOT NULL)
          2. Column MODIFIED: email
              FROM: varchar(191) NOT NULL
              TO:   varchar(255) NOT NULL
        ");
    }

    #[test]
    fn empty_table_report() {
        assert_eq!(
            table_differences_report("users", &[]),
            "Table 'users': no differences found"
        );
    }

    #[test]
    fn summary_counts_come_from_operations() {
        use crate::snapshot::{MemorySource, SchemaSnapshot};

        let source = SchemaSnapshot::load(
            "s",
            &MemorySource::new()
                .with(ObjectKind::Tables, "a", "CREATE TABLE `a` (`id` int)")
                .with(ObjectKind::Tables, "b", "CREATE TABLE `b` (`id` int)"),
        )
        .unwrap();
        let dest = SchemaSnapshot::load(
            "d",
            &MemorySource::new().with(ObjectKind::Tables, "b", "CREATE TABLE `b` (`id` int)"),
        )
        .unwrap();
        let comparison = crate::diff::compare_objects(&source, &dest);

        // `b` is in both and unchanged: no operation, so Modify stays 0.
        let operations = vec![PlannedOperation {
            kind: ObjectKind::Tables,
            name: "a".into(),
            op: OperationKind::Create,
            sql: "CREATE TABLE `a` (`id` int)".into(),
        }];

        let lines = summary_table(&comparison, &operations);
        let tables_row = lines.iter().find(|l| l.starts_with("Tables")).unwrap();
        let fields: Vec<&str> = tables_row.split_whitespace().collect();
        assert_eq!(fields, vec!["Tables", "2", "1", "1", "1", "0", "0", "1"]);
    }
}
