//! Error taxonomy surfaced to the request layer.

use axbridge_core_types::{ElementKey, IndexPath};
use hierarchy_snapshot::{HostError, SnapshotError};
use path_query::QueryError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Malformed selector or query expression.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The element behind a cached key left the live hierarchy.
    #[error("stale element reference: {0}")]
    StaleElement(ElementKey),

    /// Live descent along a matched index path failed.
    #[error("stale snapshot: cannot reach {index_path}: {reason}")]
    StaleSnapshot { index_path: IndexPath, reason: String },

    /// Key was never issued or was cleared by a reset.
    #[error("unknown element key: {0}")]
    InvalidKey(ElementKey),

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("root element is unreachable: {0}")]
    RootUnreachable(String),

    #[error("element at {0} has no stable accessibility reference")]
    NoStableReference(String),

    #[error("document render failed: {0}")]
    Render(String),

    #[error("hierarchy worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error(transparent)]
    Host(#[from] HostError),
}

impl From<SnapshotError> for LocatorError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::RootUnreachable(reason) => LocatorError::RootUnreachable(reason),
            SnapshotError::UnknownAttribute(name) => LocatorError::UnknownAttribute(name),
            SnapshotError::UnknownElementKind(name) => LocatorError::Query(QueryError::syntax(
                &name,
                0,
                "unknown element type",
            )),
            SnapshotError::Render(reason) => LocatorError::Render(reason),
            SnapshotError::Host(err) => LocatorError::Host(err),
        }
    }
}

impl LocatorError {
    /// Nothing in this taxonomy is retried internally; staleness is surfaced
    /// and the caller decides whether to query again.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::NoStableReference(_) | LocatorError::Render(_) => 3,
            LocatorError::Host(_)
            | LocatorError::RootUnreachable(_)
            | LocatorError::WorkerUnavailable(_) => 2,
            LocatorError::StaleElement(_) | LocatorError::StaleSnapshot { .. } => 1,
            LocatorError::Query(_)
            | LocatorError::InvalidKey(_)
            | LocatorError::UnknownAttribute(_) => 0,
        }
    }

    /// Protocol error code for the request layer.
    pub fn code(&self) -> &'static str {
        match self {
            LocatorError::StaleElement(_) | LocatorError::StaleSnapshot { .. } => {
                "stale element reference"
            }
            LocatorError::InvalidKey(_) => "no such element",
            LocatorError::Query(_) => "invalid selector",
            LocatorError::UnknownAttribute(_) => "invalid argument",
            _ => "unknown error",
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            LocatorError::StaleElement(_) | LocatorError::StaleSnapshot { .. }
        )
    }
}
