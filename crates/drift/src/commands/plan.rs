//! `drift plan` -- compare two schema dumps and generate scripts.

use anyhow::Context as _;
use chrono::Utc;
use drift_core::plan::plan_migration;
use drift_core::snapshot::SchemaSnapshot;
use drift_storage::{HistoryStore, MigrationStatus, NewMigration};
use tracing::info;

use crate::cli::PlanArgs;
use crate::context::RuntimeContext;
use crate::output;
use crate::source::DumpSource;

pub fn run(ctx: &RuntimeContext, args: &PlanArgs) -> anyhow::Result<()> {
    let source_dump = DumpSource::open(&args.source)
        .with_context(|| format!("opening source dump {}", args.source.display()))?;
    let dest_dump = DumpSource::open(&args.dest)
        .with_context(|| format!("opening destination dump {}", args.dest.display()))?;

    let source_label = resolve_label(ctx, args.source_profile.as_deref(), &args.source_name, &source_dump)?;
    let dest_label = resolve_label(ctx, args.dest_profile.as_deref(), &args.dest_name, &dest_dump)?;

    let source = SchemaSnapshot::load(source_label.as_str(), &source_dump)?;
    let dest = SchemaSnapshot::load(dest_label.as_str(), &dest_dump)?;
    info!(
        source = %source_label,
        dest = %dest_label,
        source_objects = source.object_count(),
        dest_objects = dest.object_count(),
        "schemas loaded"
    );

    let generated_at = Utc::now();
    let plan = plan_migration(&source, &dest, generated_at)?;

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| ctx.config.output.dir.clone().into());

    let migration_name = args.name.clone().unwrap_or_else(|| {
        format!("{source_label}_to_{dest_label}_{}", generated_at.format("%Y%m%d_%H%M%S"))
    });

    // History is recorded PENDING before any file is produced, then updated
    // once the run finishes.
    let history = if ctx.config.history.enabled {
        let store = HistoryStore::open(ctx.history_path())
            .with_context(|| format!("opening history database {}", ctx.history_path().display()))?;
        let id = store.begin_migration(&NewMigration {
            name: migration_name.clone(),
            source_schema: source_label.clone(),
            dest_schema: dest_label.clone(),
            operations_count: plan.operations.len() as i64,
            migration_file: ctx.config.output.migration_file.clone(),
            rollback_file: ctx.config.output.rollback_file.clone(),
            safety_warnings: plan.safety_warnings.len() as i64,
        })?;
        store.record_operations(id, &plan.operations)?;
        Some((store, id))
    } else {
        None
    };

    let files = if args.dry_run {
        None
    } else {
        Some(output::write_outputs(&output_dir, ctx, &plan)?)
    };

    if let Some((store, id)) = &history {
        let (status, successful) = if args.dry_run {
            (MigrationStatus::DryRun, 0)
        } else {
            (MigrationStatus::Success, plan.operations.len() as i64)
        };
        store.complete_migration(*id, status, successful, 0, "")?;
    }

    if ctx.json {
        output::print_plan_json(&plan, files.as_ref(), history.as_ref().map(|(_, id)| *id))?;
        return Ok(());
    }

    if args.dry_run && !ctx.quiet {
        println!("{}", plan.report);
        if ctx.config.safety.enabled && !plan.safety_warnings.is_empty() {
            println!();
            println!("{}", drift_core::safety::safety_report(&plan.safety_warnings));
        }
        println!();
    }
    output::print_plan_summary(ctx, &plan, files.as_ref());

    Ok(())
}

/// Resolves the schema label for one side: profile schema > explicit name >
/// dump directory name.
fn resolve_label(
    ctx: &RuntimeContext,
    profile: Option<&str>,
    explicit: &Option<String>,
    dump: &DumpSource,
) -> anyhow::Result<String> {
    if let Some(profile_name) = profile {
        let store = drift_config::ProfileStore::load(ctx.profiles_path())?;
        let profile = store
            .get(profile_name)
            .with_context(|| format!("profile '{profile_name}' not found"))?;
        return Ok(profile.schema.clone());
    }
    Ok(explicit.clone().unwrap_or_else(|| dump.label()))
}
