//! Advisory safety analysis of planned operations.
//!
//! Warnings never block script generation; the caller decides what to do
//! with them. Data-dependent failures (e.g. a `NOT NULL` addition on a table
//! with existing NULL rows) are flagged, not verified.

use serde::Serialize;
use std::fmt;

use crate::diff::Difference;
use crate::model::ObjectKind;
use crate::plan::{OperationKind, PlannedOperation};

// ===========================================================================
// RiskLevel
// ===========================================================================

/// Risk grade for one warning. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Returns the uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===========================================================================
// SafetyWarning
// ===========================================================================

/// One advisory finding about a planned operation.
#[derive(Debug, Clone, Serialize)]
pub struct SafetyWarning {
    pub risk_level: RiskLevel,
    /// Short operation label, e.g. `DROP COLUMN`.
    pub operation: String,
    /// The table (or other object) the operation targets.
    pub object: String,
    pub description: String,
    pub recommendation: String,
}

impl SafetyWarning {
    fn new(
        risk_level: RiskLevel,
        operation: &str,
        object: &str,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            risk_level,
            operation: operation.to_string(),
            object: object.to_string(),
            description: description.into(),
            recommendation: recommendation.into(),
        }
    }
}

impl fmt::Display for SafetyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.risk_level, self.description)
    }
}

// ===========================================================================
// Analysis
// ===========================================================================

/// Type pairs that cannot be converted without data loss.
const INCOMPATIBLE_TYPES: &[(&str, &str)] = &[
    ("varchar", "int"),
    ("varchar", "bigint"),
    ("text", "int"),
    ("text", "bigint"),
    ("json", "varchar"),
    ("datetime", "varchar"),
    ("decimal", "int"),
];

/// Charset conversions that can truncate or corrupt text data.
const LOSSY_CHARSETS: &[(&str, &str)] = &[
    ("utf8mb4", "utf8"),
    ("utf8mb4", "latin1"),
    ("utf8", "latin1"),
];

/// Analyzes the differences planned for one table.
pub fn analyze_table(table: &str, differences: &[Difference]) -> Vec<SafetyWarning> {
    let mut warnings = Vec::new();

    for diff in differences {
        match diff {
            Difference::RemoveColumn { name, .. } => {
                warnings.push(SafetyWarning::new(
                    RiskLevel::Critical,
                    "DROP COLUMN",
                    table,
                    format!("dropping column '{name}' permanently deletes all data it holds"),
                    "back up the column data first; consider renaming instead of dropping",
                ));
            }
            Difference::ModifyColumn { name, original, new } => {
                warnings.extend(analyze_column_modification(table, name, original, new));
            }
            Difference::AddColumn { name, definition } => {
                let upper = definition.to_uppercase();
                if upper.contains("NOT NULL") && !upper.contains("DEFAULT") {
                    warnings.push(SafetyWarning::new(
                        RiskLevel::Medium,
                        "ADD COLUMN",
                        table,
                        format!(
                            "adding NOT NULL column '{name}' without a default may fail on \
                             existing rows (not verified against data)"
                        ),
                        "add a default value or make the column nullable",
                    ));
                }
            }
            Difference::RemoveIndex { name, definition } => {
                warnings.push(analyze_index_drop(table, name, definition));
            }
            Difference::TableOption { option, original, new } => match option {
                crate::diff::TableOptionKind::Engine => {
                    warnings.push(analyze_engine_change(table, original, new));
                }
                crate::diff::TableOptionKind::Charset => {
                    if let Some(w) = analyze_charset_change(table, original, new) {
                        warnings.push(w);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    warnings
}

/// Analyzes cross-object operations (table drops and the like).
pub fn analyze_operations(operations: &[PlannedOperation]) -> Vec<SafetyWarning> {
    let mut warnings = Vec::new();
    for op in operations {
        if op.op == OperationKind::Drop && op.kind == ObjectKind::Tables {
            warnings.push(SafetyWarning::new(
                RiskLevel::Critical,
                "DROP TABLE",
                &op.name,
                format!("dropping table '{}' permanently deletes all its rows", op.name),
                "back up the table before executing; the rollback script restores \
                 structure only, not data",
            ));
        }
    }
    warnings
}

fn analyze_column_modification(
    table: &str,
    column: &str,
    original: &str,
    new: &str,
) -> Vec<SafetyWarning> {
    let mut issues = Vec::new();
    let mut risk = RiskLevel::Low;

    let from_type = base_type(original);
    let to_type = base_type(new);

    if INCOMPATIBLE_TYPES.contains(&(from_type.as_str(), to_type.as_str())) {
        risk = RiskLevel::Critical;
        issues.push(format!("incompatible type conversion {from_type} -> {to_type}"));
    }

    if let (Some(from_size), Some(to_size)) = (type_size(original), type_size(new)) {
        if to_size < from_size {
            risk = risk.max(RiskLevel::High);
            issues.push(format!("size reduction {from_size} -> {to_size} may truncate data"));
        }
    }

    let from_nullable = !original.to_uppercase().contains("NOT NULL");
    let to_nullable = !new.to_uppercase().contains("NOT NULL");
    if from_nullable && !to_nullable {
        risk = risk.max(RiskLevel::High);
        issues.push(
            "NOT NULL added to a nullable column; fails if NULL rows exist (not verified)"
                .to_string(),
        );
    }

    if issues.is_empty() {
        return Vec::new();
    }

    vec![SafetyWarning::new(
        risk,
        "MODIFY COLUMN",
        table,
        format!("column '{column}' modification has risks: {}", issues.join("; ")),
        match risk {
            RiskLevel::Critical => "back up the data and test the conversion before executing",
            RiskLevel::High => "back up affected data and validate in staging",
            _ => "test in staging before production",
        },
    )]
}

fn analyze_index_drop(table: &str, name: &str, definition: &str) -> SafetyWarning {
    let upper = definition.to_uppercase();
    if upper.starts_with("PRIMARY KEY") {
        SafetyWarning::new(
            RiskLevel::Critical,
            "DROP INDEX",
            table,
            "dropping the PRIMARY KEY removes the table's primary key constraint".to_string(),
            "ensure a replacement primary key strategy exists",
        )
    } else if upper.starts_with("UNIQUE") {
        SafetyWarning::new(
            RiskLevel::High,
            "DROP INDEX",
            table,
            format!("dropping UNIQUE index '{name}' removes a uniqueness guarantee"),
            "verify that duplicate values are acceptable",
        )
    } else {
        SafetyWarning::new(
            RiskLevel::Medium,
            "DROP INDEX",
            table,
            format!("dropping index '{name}' may degrade query performance"),
            "monitor query performance after this change",
        )
    }
}

fn analyze_engine_change(table: &str, from: &str, to: &str) -> SafetyWarning {
    let (risk, detail) = if from.eq_ignore_ascii_case("InnoDB") && to.eq_ignore_ascii_case("MyISAM")
    {
        (
            RiskLevel::High,
            "; loses transactions, foreign keys and crash recovery",
        )
    } else {
        (RiskLevel::Medium, "; the table is rebuilt and locked during conversion")
    };
    SafetyWarning::new(
        risk,
        "CHANGE ENGINE",
        table,
        format!("changing storage engine from {from} to {to}{detail}"),
        "test thoroughly in a staging environment",
    )
}

fn analyze_charset_change(table: &str, from: &str, to: &str) -> Option<SafetyWarning> {
    if LOSSY_CHARSETS.contains(&(from, to)) {
        return Some(SafetyWarning::new(
            RiskLevel::High,
            "CHANGE CHARSET",
            table,
            format!("charset change {from} -> {to} can lose or corrupt text data"),
            "verify all data is representable in the target character set",
        ));
    }
    None
}

/// Lowercased base type name from a definition (`varchar(255) NOT NULL` ->
/// `varchar`).
fn base_type(definition: &str) -> String {
    definition
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// First parenthesized size in a definition's type spec, when numeric.
fn type_size(definition: &str) -> Option<u64> {
    let open = definition.find('(')?;
    let close = definition[open..].find(')')? + open;
    definition[open + 1..close].trim().parse().ok()
}

// ===========================================================================
// Report
// ===========================================================================

/// Renders a plain-text safety report grouped by severity.
pub fn safety_report(warnings: &[SafetyWarning]) -> String {
    if warnings.is_empty() {
        return "No safety issues detected.".to_string();
    }

    let mut lines = vec![
        "Safety Analysis".to_string(),
        "=".repeat(40),
        String::new(),
    ];

    for level in [
        RiskLevel::Critical,
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
    ] {
        let group: Vec<&SafetyWarning> =
            warnings.iter().filter(|w| w.risk_level == level).collect();
        if group.is_empty() {
            continue;
        }
        lines.push(format!("{} RISK:", level.as_str()));
        for warning in group {
            lines.push(format!("  [{}] {}", warning.object, warning.description));
            lines.push(format!("      -> {}", warning.recommendation));
        }
        lines.push(String::new());
    }

    let critical = warnings
        .iter()
        .filter(|w| w.risk_level == RiskLevel::Critical)
        .count();
    lines.push(format!(
        "Total warnings: {} ({} critical)",
        warnings.len(),
        critical
    ));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(RiskLevel::Critical.as_str(), "CRITICAL");
    }

    #[test]
    fn column_drop_is_critical() {
        let warnings = analyze_table(
            "users",
            &[Difference::RemoveColumn {
                name: "email".into(),
                definition: "varchar(255)".into(),
            }],
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].risk_level, RiskLevel::Critical);
        assert_eq!(warnings[0].operation, "DROP COLUMN");
    }

    #[test]
    fn not_null_tightening_is_high() {
        let warnings = analyze_table(
            "users",
            &[Difference::ModifyColumn {
                name: "email".into(),
                original: "varchar(255) DEFAULT NULL".into(),
                new: "varchar(255) NOT NULL".into(),
            }],
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].risk_level, RiskLevel::High);
        assert!(warnings[0].description.contains("NOT NULL"));
    }

    #[test]
    fn size_reduction_is_flagged() {
        let warnings = analyze_table(
            "users",
            &[Difference::ModifyColumn {
                name: "name".into(),
                original: "varchar(255) NOT NULL".into(),
                new: "varchar(50) NOT NULL".into(),
            }],
        );
        assert_eq!(warnings[0].risk_level, RiskLevel::High);
        assert!(warnings[0].description.contains("size reduction"));
    }

    #[test]
    fn compatible_modify_produces_no_warning() {
        let warnings = analyze_table(
            "users",
            &[Difference::ModifyColumn {
                name: "n".into(),
                original: "int(11) NOT NULL".into(),
                new: "bigint(20) NOT NULL".into(),
            }],
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn unique_index_drop_outranks_regular() {
        let unique = analyze_table(
            "t",
            &[Difference::RemoveIndex {
                name: "u".into(),
                definition: "UNIQUE KEY `u` (`a`)".into(),
            }],
        );
        let regular = analyze_table(
            "t",
            &[Difference::RemoveIndex {
                name: "k".into(),
                definition: "KEY `k` (`a`)".into(),
            }],
        );
        assert_eq!(unique[0].risk_level, RiskLevel::High);
        assert_eq!(regular[0].risk_level, RiskLevel::Medium);
    }

    #[test]
    fn innodb_to_myisam_is_high() {
        let warnings = analyze_table(
            "t",
            &[Difference::TableOption {
                option: crate::diff::TableOptionKind::Engine,
                original: "InnoDB".into(),
                new: "MyISAM".into(),
            }],
        );
        assert_eq!(warnings[0].risk_level, RiskLevel::High);
    }

    #[test]
    fn report_groups_by_severity() {
        let warnings = vec![
            SafetyWarning::new(RiskLevel::Medium, "DROP INDEX", "t", "m", "r"),
            SafetyWarning::new(RiskLevel::Critical, "DROP COLUMN", "t", "c", "r"),
        ];
        let report = safety_report(&warnings);
        let critical_pos = report.find("CRITICAL RISK:").unwrap();
        let medium_pos = report.find("MEDIUM RISK:").unwrap();
        assert!(critical_pos < medium_pos);
        assert!(report.contains("Total warnings: 2 (1 critical)"));
    }

    #[test]
    fn empty_report() {
        assert_eq!(safety_report(&[]), "No safety issues detected.");
    }
}
