use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::args::{Args, Commands};
use crate::cli::commands::handle_avatar_command;
use crate::config::TermonautConfig;

pub struct RootCommand;

impl RootCommand {
    pub async fn execute() -> Result<()> {
        let args = Args::parse();

        let config = TermonautConfig::load_with_precedence(args.config.as_deref())
            .context("Failed to load configuration")?;

        match &args.command {
            Commands::Avatar { action } => {
                handle_avatar_command(action, &config, args.config.as_deref(), args.verbosity).await
            }
        }
    }
}
