//! Clap CLI definitions for the `drift` command.
//!
//! This module defines the complete CLI structure using clap 4 derive
//! macros.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// drift -- schema migration planner for MariaDB/MySQL.
///
/// Compares a source and a destination schema and produces a forward
/// migration script, a matching rollback script and a comparison report.
#[derive(Parser, Debug)]
#[command(
    name = "drift",
    about = "Schema migration planner for MariaDB/MySQL",
    long_about = "Compares two schemas and generates a forward migration script plus a \
                  matching rollback script, preserving referential-integrity ordering.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file (default: ./drift.yaml).
    #[arg(long, global = true, env = "DRIFT_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare two schema dumps and generate migration + rollback scripts.
    #[command(alias = "compare")]
    Plan(PlanArgs),

    /// Inspect and maintain the migration history log.
    History(HistoryArgs),

    /// Manage saved connection profiles.
    Profile(ProfileArgs),

    /// Generate shell completions.
    Completion(CompletionArgs),

    /// Print version information.
    Version,
}

/// Arguments for `drift plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Directory holding the source schema dump
    /// (<dir>/{tables,views,procedures,functions,triggers,events,sequences}/<name>.sql).
    #[arg(long)]
    pub source: PathBuf,

    /// Directory holding the destination schema dump.
    #[arg(long)]
    pub dest: PathBuf,

    /// Source schema label (default: profile schema or dump directory name).
    #[arg(long)]
    pub source_name: Option<String>,

    /// Destination schema label.
    #[arg(long)]
    pub dest_name: Option<String>,

    /// Saved profile to label the source side.
    #[arg(long, conflicts_with = "source_name")]
    pub source_profile: Option<String>,

    /// Saved profile to label the destination side.
    #[arg(long, conflicts_with = "dest_name")]
    pub dest_profile: Option<String>,

    /// Output directory (default: from config).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Migration name recorded in history (default: generated).
    #[arg(long)]
    pub name: Option<String>,

    /// Analyze and report only; write no script files.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for `drift history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List recent migrations.
    List {
        /// Maximum number of rows.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show one migration with its planned operations.
    Show {
        /// Migration id.
        id: i64,
    },

    /// Show aggregate statistics.
    Stats,

    /// Mark a migration as rolled back.
    MarkRolledBack {
        /// Migration id.
        id: i64,

        /// Free-form note stored with the status change.
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Delete history records older than N days.
    Cleanup {
        /// Retention window in days.
        #[arg(long, default_value_t = 90)]
        days: i64,
    },

    /// Export the full history as JSON.
    Export {
        /// Output file (default: stdout).
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

/// Arguments for `drift profile`.
#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List saved profiles.
    List,

    /// Show one profile.
    Show {
        /// Profile name.
        name: String,
    },

    /// Save (or replace) a profile.
    Save {
        /// Profile name.
        name: String,

        #[arg(long, default_value = "localhost")]
        host: String,

        #[arg(long, default_value_t = 3306)]
        port: u16,

        #[arg(long, default_value = "")]
        user: String,

        /// Schema (database) name.
        #[arg(long)]
        schema: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Delete a profile.
    Delete {
        /// Profile name.
        name: String,
    },
}

/// Arguments for `drift completion`.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Target shell.
    pub shell: Shell,
}
