//! Per-request location options.

use path_query::MatchMode;
use serde::{Deserialize, Serialize};

/// How an issued key binds to its live element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingStrategy {
    /// Bind to the element's accessibility reference.
    #[default]
    Reference,
    /// Bind to the index path under the search scope; the key follows
    /// whatever element occupies that position at resolution time.
    Index,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateOptions {
    pub mode: MatchMode,
    pub binding: BindingStrategy,
}

impl LocateOptions {
    pub fn first() -> Self {
        Self {
            mode: MatchMode::First,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self {
            mode: MatchMode::All,
            ..Self::default()
        }
    }

    pub fn with_binding(mut self, binding: BindingStrategy) -> Self {
        self.binding = binding;
        self
    }
}
