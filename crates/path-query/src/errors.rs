use thiserror::Error;

/// Failure to compile or evaluate a path query. Always carries the
/// expression verbatim so it can be surfaced to the caller unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("invalid path query '{expression}' at offset {offset}: {reason}")]
    Syntax {
        expression: String,
        offset: usize,
        reason: String,
    },
    #[error("cannot evaluate path query '{expression}': {reason}")]
    Evaluation { expression: String, reason: String },
}

impl QueryError {
    pub fn syntax(expression: &str, offset: usize, reason: impl Into<String>) -> Self {
        Self::Syntax {
            expression: expression.to_string(),
            offset,
            reason: reason.into(),
        }
    }

    pub fn evaluation(expression: &str, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub fn expression(&self) -> &str {
        match self {
            Self::Syntax { expression, .. } | Self::Evaluation { expression, .. } => expression,
        }
    }
}
