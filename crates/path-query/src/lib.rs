//! Path-query evaluation over serialized hierarchy documents.
//!
//! Supports the XPath 1.0 location-path subset used by UI automation
//! clients: all axes except namespace, name/wildcard/`node()` tests,
//! predicates (numeric predicates select by position), unions, boolean,
//! relational and arithmetic operators, and the common core functions.

mod ast;
mod attributes;
mod errors;
mod eval;
mod lexer;
mod parser;

use std::fmt;
use std::str::FromStr;

use hierarchy_snapshot::{AttributeSet, Document};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub use ast::{Axis, BinaryOp, Expr, Function, LocationPath, NodeTest, Step};
pub use errors::QueryError;

/// Evaluation mode of a query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// At most one node: the first in document order.
    First,
    /// Every matching node, in document order.
    #[default]
    All,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::First => f.write_str("first"),
            MatchMode::All => f.write_str("all"),
        }
    }
}

/// Compiled path query. Immutable and reusable across documents.
#[derive(Clone, Debug, PartialEq)]
pub struct PathQuery {
    source: String,
    expr: Expr,
}

impl PathQuery {
    /// Compiles `source`; a malformed expression fails without evaluating.
    pub fn compile(source: &str) -> Result<Self, QueryError> {
        let expr = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Attributes a snapshot must expose for this query to see every value
    /// it can compare. Always includes kind and frame.
    pub fn referenced_attributes(&self) -> AttributeSet {
        attributes::referenced_attributes(&self.expr)
    }

    /// Matched document indices in document order. Zero matches is an empty
    /// result, not an error; a result that is not a set of elements is.
    pub fn select(&self, document: &Document, mode: MatchMode) -> Result<Vec<usize>, QueryError> {
        let mut matches = eval::Evaluator::new(document, &self.source).select(&self.expr)?;
        trace!(
            target: "path-query",
            query = %self.source,
            %mode,
            matches = matches.len(),
            "query evaluated"
        );
        if mode == MatchMode::First {
            matches.truncate(1);
        }
        Ok(matches)
    }
}

impl FromStr for PathQuery {
    type Err = QueryError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::compile(source)
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compiles and evaluates `expression` in one go.
pub fn select(
    document: &Document,
    expression: &str,
    mode: MatchMode,
) -> Result<Vec<usize>, QueryError> {
    PathQuery::compile(expression)?.select(document, mode)
}
