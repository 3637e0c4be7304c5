use anyhow::Result;

use super::attributes::cmd_attributes;
use super::env::CliArgs;
use super::find::cmd_find;
use super::source::cmd_source;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Source(args) => cmd_source(args, ctx, cli.output).await,
        Commands::Find(args) => cmd_find(args, ctx, cli.output).await,
        Commands::Attributes => cmd_attributes(cli.output),
    }
}
