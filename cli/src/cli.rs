//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;
use crate::infra::config::YamlConfigStore;

/// End-to-end validation for freshly provisioned RKE2 clusters
#[derive(Parser)]
#[command(
    name = "clustervet",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = FalseyValueParser::new())]
    pub no_color: bool,

    /// Log every poll attempt and command
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default ~/.clustervet/config.yaml)
    #[arg(long, global = true, env = "CLUSTERVET_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision a cluster and run every validation scenario
    Run(commands::run::RunArgs),

    /// Show the nodes of a running cluster
    Nodes(commands::SnapshotArgs),

    /// Show the pods of a running cluster
    Pods(commands::SnapshotArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            config,
            command,
            ..
        } = self;
        let app = AppContext::new(&OutputFlags {
            no_color,
            quiet,
            json,
        });
        match command {
            Command::Version => commands::version::run(&app),
            Command::Run(args) => {
                commands::run::run(&app, &args, &YamlConfigStore::new(config)).await
            }
            Command::Nodes(args) => commands::nodes::run_local(&app, &args).await,
            Command::Pods(args) => commands::pods::run_local(&app, &args).await,
        }
    }
}
