use thiserror::Error;

use crate::ports::HostError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("root element is unreachable: {0}")]
    RootUnreachable(String),
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),
    #[error("unknown element type '{0}'")]
    UnknownElementKind(String),
    #[error("document render failed: {0}")]
    Render(String),
    #[error(transparent)]
    Host(#[from] HostError),
}

impl SnapshotError {
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
