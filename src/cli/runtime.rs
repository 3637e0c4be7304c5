use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use element_locator::{spawn_session, ElementLocator, LocatorError, SessionHandle};
use hierarchy_snapshot::{load_fixture, MemoryHierarchy};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::BridgeConfig;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Installs the global subscriber. Logs go to stderr so structured command
/// output on stdout stays machine-readable.
pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
    .context("Failed to install log subscriber")?;

    Ok(())
}

/// Fixture from the command line, else from the configuration.
pub fn resolve_fixture(explicit: Option<&Path>, config: &BridgeConfig) -> Result<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.fixture.clone())
        .ok_or_else(|| {
            anyhow!("No hierarchy fixture given; pass --fixture or set `fixture` in the config")
        })
}

pub fn open_session(fixture: &Path) -> Result<SessionHandle> {
    let root = load_fixture(fixture)
        .with_context(|| format!("Failed to load fixture {}", fixture.display()))?;
    let hierarchy = MemoryHierarchy::from_fixture(root);
    info!(
        fixture = %fixture.display(),
        elements = hierarchy.len(),
        "Serving recorded hierarchy"
    );
    spawn_session(ElementLocator::new(hierarchy)).context("Failed to start hierarchy session")
}

/// Attaches the protocol error code to a locator failure.
pub fn locator_failure(err: LocatorError) -> anyhow::Error {
    let code = err.code();
    anyhow::Error::new(err).context(code)
}
