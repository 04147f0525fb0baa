//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;

/// Install and configure Consul agents locally or over SSH
#[derive(Parser)]
#[command(
    name = "consul-up",
    version,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Diagnostic log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
#[allow(clippy::large_enum_variant)]
pub enum Command {
    /// Install or update a Consul agent on a target
    Install(commands::install::InstallArgs),

    /// Manage persisted defaults
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,

    #[command(hide = true, name = "_reconcile")]
    Reconcile(commands::reconcile::ReconcileArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            quiet,
            no_color,
            command,
            ..
        } = self;
        let app = AppContext::new(&OutputFlags { no_color, quiet });
        match command {
            Command::Install(args) => commands::install::run(&app, args).await,
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => {
                commands::version::run();
                Ok(ExitCode::SUCCESS)
            }
            Command::Reconcile(args) => commands::reconcile::run(args).await,
        }
    }
}
