use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use element_locator::{ElementFinder, SearchScope, SourceFormat, SourceOptions};
use serde::Serialize;
use tracing::warn;

use super::context::CliContext;
use super::output::{emit, partial_reports, OutputFormat, PartialReport};
use super::runtime::{locator_failure, open_session, resolve_fixture};

#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// Recorded hierarchy to serve (JSON or YAML)
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Dump format: xml or description
    #[arg(long, default_value = "xml")]
    pub format: SourceFormat,

    /// Include the positional indexPath attribute
    #[arg(long)]
    pub index_paths: bool,
}

#[derive(Debug, Serialize)]
struct SourceReport {
    format: SourceFormat,
    source: String,
    partial: Vec<PartialReport>,
}

pub async fn cmd_source(args: SourceArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let fixture = resolve_fixture(args.fixture.as_deref(), ctx.config())?;
    let session = open_session(&fixture)?;
    let options = SourceOptions {
        format: args.format,
        include_index_paths: args.index_paths || ctx.config().include_index_paths,
    };
    let dump = session
        .describe(SearchScope::Root, options)
        .await
        .map_err(locator_failure)?;
    session.shutdown();

    for partial in &dump.partial {
        warn!(
            index_path = %partial.index_path,
            reason = %partial.reason,
            "subtree missing from source dump"
        );
    }

    let report = SourceReport {
        format: args.format,
        partial: partial_reports(&dump.partial),
        source: dump.source,
    };
    emit(output, &report, |report| {
        print!("{}", report.source);
        if !report.source.ends_with('\n') {
            println!();
        }
    })
}
