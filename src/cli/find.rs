use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use element_locator::{
    BindingStrategy, ElementFinder, MatchMode, MetricsSnapshot, SearchScope, Selector,
};
use hierarchy_snapshot::CanonicalValue;
use serde::Serialize;
use tracing::debug;

use super::context::CliContext;
use super::output::{emit, partial_reports, OutputFormat, PartialReport};
use super::runtime::{locator_failure, open_session, resolve_fixture};

#[derive(Args, Clone, Debug)]
pub struct FindArgs {
    /// Recorded hierarchy to serve (JSON or YAML)
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Locator strategy: xpath, class name or accessibility id
    #[arg(long, default_value = "xpath")]
    pub using: String,

    /// Locator value
    #[arg(long)]
    pub value: String,

    /// Return every match
    #[arg(long, conflicts_with = "first")]
    pub all: bool,

    /// Return only the first match
    #[arg(long)]
    pub first: bool,

    /// Bind keys to positions instead of accessibility references
    #[arg(long)]
    pub by_index: bool,

    /// Attribute to read from every match (repeatable)
    #[arg(long = "attribute", value_name = "NAME")]
    pub attributes: Vec<String>,

    /// Print locator counters after the query
    #[arg(long)]
    pub stats: bool,
}

#[derive(Debug, Serialize)]
struct MatchReport {
    key: String,
    index_path: String,
    element_type: String,
    attributes: BTreeMap<String, CanonicalValue>,
}

#[derive(Debug, Serialize)]
struct FindReport {
    selector: String,
    mode: MatchMode,
    binding: BindingStrategy,
    matches: Vec<MatchReport>,
    partial: Vec<PartialReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<MetricsSnapshot>,
}

pub async fn cmd_find(args: FindArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let fixture = resolve_fixture(args.fixture.as_deref(), ctx.config())?;
    let mut options = ctx.config().locate_options();
    if args.all {
        options.mode = MatchMode::All;
    } else if args.first {
        options.mode = MatchMode::First;
    }
    if args.by_index {
        options.binding = BindingStrategy::Index;
    }

    let selector = Selector::new(args.using.clone(), args.value.clone());
    debug!(selector = %selector, mode = %options.mode, "locating elements");

    let session = open_session(&fixture)?;
    let outcome = session
        .locate(SearchScope::Root, selector.clone(), options)
        .await
        .map_err(locator_failure)?;

    let mut matches = Vec::with_capacity(outcome.len());
    for element in &outcome.elements {
        let mut attributes = BTreeMap::new();
        for name in &args.attributes {
            let value = session
                .attribute_value(element.key.clone(), name.clone())
                .await
                .map_err(locator_failure)?;
            attributes.insert(name.clone(), value);
        }
        matches.push(MatchReport {
            key: element.key.to_string(),
            index_path: element.index_path.to_string(),
            element_type: element.kind.type_name().to_string(),
            attributes,
        });
    }
    let stats = if args.stats {
        Some(session.metrics().await.map_err(locator_failure)?)
    } else {
        None
    };
    session.shutdown();

    let report = FindReport {
        selector: selector.to_string(),
        mode: options.mode,
        binding: options.binding,
        matches,
        partial: partial_reports(&outcome.partial),
        stats,
    };
    emit(output, &report, |report| print_human(report, &args.attributes))
}

fn print_human(report: &FindReport, requested: &[String]) {
    println!("{} match(es) for {}", report.matches.len(), report.selector);
    for found in &report.matches {
        let mut line = format!("{}  {}  {}", found.key, found.index_path, found.element_type);
        for name in requested {
            if let Some(value) = found.attributes.get(name) {
                line.push_str(&format!("  {name}={value}"));
            }
        }
        println!("{line}");
    }
    for partial in &report.partial {
        println!("partial: {} ({})", partial.index_path, partial.reason);
    }
    if let Some(stats) = &report.stats {
        println!();
        println!(
            "locate calls: {} (avg {:.3} ms)",
            stats.locate.total, stats.locate.avg_ms
        );
        println!("matches: {}", stats.matches);
        println!("stale lookups: {}", stats.stale_lookups);
        println!("invalid keys: {}", stats.invalid_keys);
        println!("partial captures: {}", stats.partial_captures);
        println!("resets: {}", stats.resets);
    }
}
