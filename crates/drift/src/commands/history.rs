//! `drift history` -- inspect and maintain the migration history log.

use anyhow::Context as _;
use drift_storage::HistoryStore;

use crate::cli::{HistoryArgs, HistoryCommands};
use crate::context::RuntimeContext;

pub fn run(ctx: &RuntimeContext, args: &HistoryArgs) -> anyhow::Result<()> {
    let store = HistoryStore::open(ctx.history_path())
        .with_context(|| format!("opening history database {}", ctx.history_path().display()))?;

    match &args.command {
        HistoryCommands::List { limit } => list(ctx, &store, *limit),
        HistoryCommands::Show { id } => show(ctx, &store, *id),
        HistoryCommands::Stats => stats(ctx, &store),
        HistoryCommands::MarkRolledBack { id, notes } => {
            store.mark_rolled_back(*id, notes)?;
            if !ctx.quiet {
                println!("Migration {id} marked as rolled back.");
            }
            Ok(())
        }
        HistoryCommands::Cleanup { days } => {
            let deleted = store.cleanup_older_than(*days)?;
            if !ctx.quiet {
                println!("Deleted {deleted} record(s) older than {days} day(s).");
            }
            Ok(())
        }
        HistoryCommands::Export { output } => {
            let json = store.export_json()?;
            match output {
                Some(path) => {
                    std::fs::write(path, &json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    if !ctx.quiet {
                        println!("History exported to {}", path.display());
                    }
                }
                None => println!("{json}"),
            }
            Ok(())
        }
    }
}

fn list(ctx: &RuntimeContext, store: &HistoryStore, limit: usize) -> anyhow::Result<()> {
    let records = store.list(limit)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No migrations recorded.");
        return Ok(());
    }

    println!(
        "{:<6} {:<24} {:<14} {:<14} {:<12} {:<6}",
        "ID", "NAME", "SOURCE", "DEST", "STATUS", "OPS"
    );
    for record in records {
        println!(
            "{:<6} {:<24} {:<14} {:<14} {:<12} {:<6}",
            record.id,
            truncate(&record.name, 24),
            truncate(&record.source_schema, 14),
            truncate(&record.dest_schema, 14),
            record.status,
            record.operations_count,
        );
    }
    Ok(())
}

fn show(ctx: &RuntimeContext, store: &HistoryStore, id: i64) -> anyhow::Result<()> {
    let record = store.get(id)?;
    let operations = store.operations(id)?;

    if ctx.json {
        let json = serde_json::json!({
            "migration": record,
            "operations": operations,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Migration {id}: {}", record.name);
    println!("  Source:      {}", record.source_schema);
    println!("  Destination: {}", record.dest_schema);
    println!("  Executed at: {}", record.executed_at.to_rfc3339());
    println!("  Status:      {}", record.status);
    println!(
        "  Operations:  {} ({} successful, {} failed)",
        record.operations_count, record.successful_operations, record.failed_operations
    );
    println!("  Warnings:    {}", record.safety_warnings);
    if !record.notes.is_empty() {
        println!("  Notes:       {}", record.notes);
    }
    if !operations.is_empty() {
        println!();
        println!("Planned operations:");
        for op in operations {
            println!(
                "  {:>3}. {} {} `{}`",
                op.operation_order + 1,
                op.operation,
                op.object_kind.trim_end_matches('s'),
                op.object_name
            );
        }
    }
    Ok(())
}

fn stats(ctx: &RuntimeContext, store: &HistoryStore) -> anyhow::Result<()> {
    let stats = store.statistics()?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("Total migrations:       {}", stats.total_migrations);
    println!("Successful:             {}", stats.successful_migrations);
    println!("Rolled back:            {}", stats.rolled_back_migrations);
    println!("Success rate:           {:.1}%", stats.success_rate);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
