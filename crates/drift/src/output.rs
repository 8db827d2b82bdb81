//! Output helpers for the `drift` CLI.
//!
//! Script/report file writing plus the human and JSON plan summaries.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use drift_core::plan::MigrationPlan;
use drift_core::safety::RiskLevel;
use owo_colors::OwoColorize;

use crate::context::RuntimeContext;

/// Paths of the three written artifacts.
#[derive(Debug, Clone)]
pub struct WrittenFiles {
    pub migration: PathBuf,
    pub rollback: PathBuf,
    pub report: PathBuf,
}

/// Writes migration script, rollback script and report into `dir`.
pub fn write_outputs(
    dir: &Path,
    ctx: &RuntimeContext,
    plan: &MigrationPlan,
) -> anyhow::Result<WrittenFiles> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let files = WrittenFiles {
        migration: dir.join(&ctx.config.output.migration_file),
        rollback: dir.join(&ctx.config.output.rollback_file),
        report: dir.join(&ctx.config.output.report_file),
    };

    std::fs::write(&files.migration, &plan.migration_sql)
        .with_context(|| format!("writing {}", files.migration.display()))?;
    std::fs::write(&files.rollback, &plan.rollback_sql)
        .with_context(|| format!("writing {}", files.rollback.display()))?;
    std::fs::write(&files.report, &plan.report)
        .with_context(|| format!("writing {}", files.report.display()))?;

    Ok(files)
}

/// Prints the human-readable plan summary.
pub fn print_plan_summary(ctx: &RuntimeContext, plan: &MigrationPlan, files: Option<&WrittenFiles>) {
    if ctx.quiet {
        return;
    }

    if plan.is_noop() {
        println!("{}", "Schemas are in sync - nothing to do.".green());
    } else {
        println!(
            "Planned {} operation(s) across {} changed table(s).",
            plan.operations.len().to_string().bold(),
            plan.table_changes.len()
        );
    }

    let critical = plan
        .safety_warnings
        .iter()
        .filter(|w| w.risk_level == RiskLevel::Critical)
        .count();
    if !plan.safety_warnings.is_empty() {
        let line = format!(
            "{} safety warning(s), {critical} critical",
            plan.safety_warnings.len()
        );
        if critical > 0 {
            println!("{}", line.red());
        } else {
            println!("{}", line.yellow());
        }
    }
    for issue in &plan.issues {
        println!("{} {issue}", "issue:".yellow());
    }

    if let Some(files) = files {
        println!("Migration script: {}", files.migration.display());
        println!("Rollback script:  {}", files.rollback.display());
        println!("Report:           {}", files.report.display());
    }
}

/// Prints the machine-readable plan summary.
pub fn print_plan_json(
    plan: &MigrationPlan,
    files: Option<&WrittenFiles>,
    history_id: Option<i64>,
) -> anyhow::Result<()> {
    let json = serde_json::json!({
        "operations": plan.operations,
        "safety_warnings": plan.safety_warnings,
        "issues": plan.issues,
        "in_sync": plan.is_noop(),
        "history_id": history_id,
        "files": files.map(|f| serde_json::json!({
            "migration": f.migration.display().to_string(),
            "rollback": f.rollback.display().to_string(),
            "report": f.report.display().to_string(),
        })),
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
