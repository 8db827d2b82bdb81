//! `drift` -- schema migration planner for MariaDB/MySQL.
//!
//! This is the CLI entry point. It parses arguments with clap, resolves the
//! runtime context, and dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;
mod source;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

fn main() {
    // First Ctrl+C: exit cleanly. Second: force exit.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        std::process::exit(0);
    });

    let cli = Cli::parse();

    if cli.global.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("drift=debug,drift_core=debug,drift_storage=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let ctx = match RuntimeContext::from_global_args(&cli.global) {
        Ok(ctx) => ctx,
        Err(e) => {
            report_error(cli.global.json, &e);
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Some(Commands::Plan(args)) => commands::plan::run(&ctx, args),
        Some(Commands::History(args)) => commands::history::run(&ctx, args),
        Some(Commands::Profile(args)) => commands::profile::run(&ctx, args),
        Some(Commands::Completion(args)) => commands::completion::run(&ctx, args),
        Some(Commands::Version) => commands::version::run(&ctx),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        report_error(ctx.json, &e);
        std::process::exit(1);
    }
}

fn report_error(json: bool, error: &anyhow::Error) {
    if json {
        let err_json = serde_json::json!({ "error": format!("{error:#}") });
        if let Ok(s) = serde_json::to_string_pretty(&err_json) {
            eprintln!("{s}");
        }
    } else {
        eprintln!("Error: {error:#}");
    }
}
