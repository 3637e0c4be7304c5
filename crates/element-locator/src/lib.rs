//! Element location over a live UI hierarchy.
//!
//! [`ElementLocator`] snapshots the hierarchy, evaluates a path query, and
//! hands out opaque [`ElementKey`](axbridge_core_types::ElementKey)s that
//! stay bound to the matched live elements. [`spawn_session`] moves a
//! locator onto its own worker thread so that every hierarchy access of a
//! session is serialized.

pub mod cache;
pub mod errors;
pub mod locator;
pub mod metrics;
pub mod policy;
pub mod resolver;
pub mod session;
pub mod strategy;

pub use cache::{ElementCache, IndexAnchor};
pub use errors::LocatorError;
pub use locator::{
    DescribeOutcome, ElementLocator, LocateOutcome, LocatedElement, SearchScope, SourceFormat,
    SourceOptions,
};
pub use metrics::{LocatorMetrics, MetricCounter, MetricsSnapshot};
pub use policy::{BindingStrategy, LocateOptions};
pub use resolver::IndexPathResolver;
pub use session::{spawn_session, ElementFinder, SessionHandle};
pub use strategy::{Selector, Strategy};

pub use path_query::MatchMode;
