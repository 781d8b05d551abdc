//! CLI command definitions for hive-cli
//!
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod project;
pub mod task;

use clap::{Parser, Subcommand};
use project::ProjectCommand;
use std::path::PathBuf;
use task::{CreateArgs, ListArgs, ProvideArgs, StaleArgs, UpdateArgs, WaitArgs};

/// Task lifecycle CLI for a hive of agents
#[derive(Parser, Debug)]
#[command(name = "hive-cli", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory (overrides config)
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Acting agent recorded in task logs (overrides config)
    #[arg(short, long, global = true)]
    pub agent: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new task
    Create(CreateArgs),

    /// List active tasks
    List(ListArgs),

    /// Show task details, children and recent log
    Show {
        task_id: String,
    },

    /// Update a task's status or fields
    Update(UpdateArgs),

    /// Provide human input to a blocked task
    Provide(ProvideArgs),

    /// List tasks of a type that can be claimed now
    Ready {
        /// Agent (task) type
        agent_type: String,
    },

    /// Show task board summary
    Summary,

    /// Report pending tasks whose dependencies failed or were abandoned
    Stranded,

    /// Report in-progress tasks that exceeded their time limit
    Stale(StaleArgs),

    /// Block until a task completes, fails or is abandoned
    Wait(WaitArgs),

    /// Move completed, failed and abandoned tasks to the archive
    Archive,

    /// Project operations
    #[command(subcommand)]
    Project(ProjectCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["hive-cli", "summary", "--json", "--agent", "w1"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.agent.as_deref(), Some("w1"));
        assert_eq!(cli.log, "2");
        assert!(matches!(cli.command, Command::Summary));
    }

    #[test]
    fn update_collects_repeated_meta() {
        let cli = Cli::try_parse_from([
            "hive-cli", "update", "t1", "--status", "blocked", "--blocked-on", "human",
            "--meta", "a=1", "--meta", "b=",
        ])
        .unwrap();
        let Command::Update(args) = cli.command else {
            panic!("expected update");
        };
        assert_eq!(args.meta, vec!["a=1", "b="]);
        assert_eq!(args.blocked_on.as_deref(), Some("human"));
    }
}
