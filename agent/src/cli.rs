//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::App;
use crate::commands;
use crate::infra::config::load_config;
use crate::output::OutputContext;

/// Self-updating background agent
#[derive(Parser)]
#[command(
    name = "outpost",
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
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the agent: deliver pending notices and check for releases periodically
    Run,

    /// Update to the latest release now
    Update(commands::update::UpdateArgs),

    /// Compare the running version with the latest release
    Check,

    /// List known subscribers
    Subscribers,

    /// Record an interaction from a subscriber
    Seen(commands::seen::SeenArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            command,
        } = self;
        let app = || -> Result<App> {
            App::new(load_config()?, OutputContext::new(no_color, quiet), json)
        };
        match command {
            Command::Version => commands::version::run(json),
            Command::Run => commands::run::run(&app()?).await,
            Command::Update(args) => commands::update::run(&app()?, &args).await,
            Command::Check => commands::check::run(&app()?).await,
            Command::Subscribers => commands::subscribers::run(&app()?),
            Command::Seen(args) => commands::seen::run(&app()?, &args),
        }
    }
}
