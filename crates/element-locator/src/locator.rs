//! Find-elements, describe and attribute-read operations over one live
//! hierarchy.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use axbridge_core_types::{AxRef, ElementKey, IndexPath};
use hierarchy_snapshot::{
    canonicalize, name_for, AttributeSet, CanonicalValue, Document, ElementKind, LiveHierarchy,
    PartialCapture, SnapshotBuilder, XmlOptions,
};
use path_query::PathQuery;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{ElementCache, IndexAnchor};
use crate::errors::LocatorError;
use crate::metrics::{LocatorMetrics, MetricsSnapshot};
use crate::policy::{BindingStrategy, LocateOptions};
use crate::resolver::IndexPathResolver;
use crate::strategy::Selector;

/// Subtree a query or dump is evaluated against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SearchScope {
    /// The whole application.
    #[default]
    Root,
    /// The subtree under a previously located element.
    Element(ElementKey),
}

/// One match of a locate call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedElement {
    pub key: ElementKey,
    /// Position relative to the search scope at capture time.
    pub index_path: IndexPath,
    pub kind: ElementKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocateOutcome {
    /// One fresh key per match, in document order.
    pub elements: Vec<LocatedElement>,
    /// Subtrees that could not be enumerated during capture.
    pub partial: Vec<PartialCapture>,
}

impl LocateOutcome {
    pub fn keys(&self) -> Vec<ElementKey> {
        self.elements.iter().map(|element| element.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Xml,
    Description,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Xml => f.write_str("xml"),
            SourceFormat::Description => f.write_str("description"),
        }
    }
}

impl FromStr for SourceFormat {
    type Err = LocatorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "xml" => Ok(SourceFormat::Xml),
            "description" => Ok(SourceFormat::Description),
            other => Err(LocatorError::Render(format!("unsupported source format '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    pub format: SourceFormat,
    pub include_index_paths: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescribeOutcome {
    pub source: String,
    pub partial: Vec<PartialCapture>,
}

/// Owns the live hierarchy, the element cache and the per-locator counters.
///
/// Not synchronized beyond its cache; callers serialize access through a
/// single worker.
pub struct ElementLocator<L: LiveHierarchy> {
    hierarchy: L,
    builder: SnapshotBuilder,
    cache: ElementCache<L::Handle>,
    metrics: LocatorMetrics,
}

impl<L: LiveHierarchy> ElementLocator<L> {
    pub fn new(hierarchy: L) -> Self {
        Self::with_attributes(hierarchy, AttributeSet::all())
    }

    /// Locator whose snapshots expose only `attributes` (plus the required
    /// kind and frame).
    pub fn with_attributes(hierarchy: L, attributes: AttributeSet) -> Self {
        Self {
            hierarchy,
            builder: SnapshotBuilder::with_attributes(attributes),
            cache: ElementCache::new(),
            metrics: LocatorMetrics::default(),
        }
    }

    pub fn hierarchy(&self) -> &L {
        &self.hierarchy
    }

    pub fn cache(&self) -> &ElementCache<L::Handle> {
        &self.cache
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Compiles `selector` and runs it against a fresh snapshot of `scope`.
    ///
    /// A malformed selector fails before the hierarchy is touched.
    pub fn locate(
        &self,
        scope: &SearchScope,
        selector: &Selector,
        options: LocateOptions,
    ) -> Result<LocateOutcome, LocatorError> {
        let query = selector.compile()?;
        self.locate_query(scope, &query, options)
    }

    pub fn locate_query(
        &self,
        scope: &SearchScope,
        query: &PathQuery,
        options: LocateOptions,
    ) -> Result<LocateOutcome, LocatorError> {
        let started = Instant::now();
        let root = self.scope_root(scope)?;
        let attributes = query
            .referenced_attributes()
            .intersection(self.builder.attributes());
        let tree =
            SnapshotBuilder::with_attributes(attributes).capture(&self.hierarchy, root.clone());
        let document = Document::from_tree(&tree);
        let matches = query.select(&document, options.mode)?;

        let resolver = IndexPathResolver::new(&self.hierarchy);
        let mut bindings = Vec::with_capacity(matches.len());
        for index in matches {
            let id = document.snapshot_id(index);
            let live = resolver.resolve_match(&tree, id).map_err(|err| {
                self.metrics.record_stale();
                err
            })?;
            let path = tree.node(id).index_path().clone();
            let binding = match options.binding {
                BindingStrategy::Reference => {
                    let reference = self
                        .hierarchy
                        .accessibility_ref(&live)
                        .ok_or_else(|| LocatorError::NoStableReference(path.to_string()))?;
                    Pending::Reference(reference)
                }
                BindingStrategy::Index => Pending::Index(path.clone()),
            };
            bindings.push((binding, path, document.node(index).kind()));
        }

        let anchor = match scope {
            SearchScope::Root => IndexAnchor::Root,
            SearchScope::Element(_) => IndexAnchor::Element(root),
        };
        let elements: Vec<LocatedElement> = bindings
            .into_iter()
            .map(|(binding, index_path, kind)| {
                let key = match binding {
                    Pending::Reference(reference) => self.cache.store_reference(reference),
                    Pending::Index(path) => self.cache.store_indexed(anchor.clone(), path),
                };
                LocatedElement {
                    key,
                    index_path,
                    kind,
                }
            })
            .collect();

        let partial = tree.failures().to_vec();
        if !partial.is_empty() {
            warn!(
                target: "element-locator",
                query = %query,
                failed_subtrees = partial.len(),
                "query evaluated against a partial snapshot"
            );
        }
        self.metrics
            .record_locate(started.elapsed(), elements.len(), !partial.is_empty());
        debug!(
            target: "element-locator",
            query = %query,
            mode = %options.mode,
            nodes = tree.len(),
            attributes = attributes.len(),
            matches = elements.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "locate finished"
        );
        Ok(LocateOutcome { elements, partial })
    }

    /// Renders a fresh snapshot of `scope`.
    pub fn describe(
        &self,
        scope: &SearchScope,
        options: SourceOptions,
    ) -> Result<DescribeOutcome, LocatorError> {
        let root = self.scope_root(scope)?;
        let tree = self.builder.capture(&self.hierarchy, root);
        let document = Document::from_tree(&tree);
        let source = match options.format {
            SourceFormat::Xml => document.to_xml(XmlOptions {
                include_index_paths: options.include_index_paths,
            })?,
            SourceFormat::Description => document.to_description(),
        };
        Ok(DescribeOutcome {
            source,
            partial: tree.failures().to_vec(),
        })
    }

    /// Canonical value of `name` on the element behind `key`.
    ///
    /// The key is resolved first, so a stale element wins over an unknown
    /// attribute name.
    pub fn attribute_value(
        &self,
        key: &ElementKey,
        name: &str,
    ) -> Result<CanonicalValue, LocatorError> {
        let handle = self.resolve(key)?;
        let attribute = name_for(name)?;
        let value = self.hierarchy.attribute(&handle, attribute)?;
        Ok(canonicalize(&value))
    }

    pub fn resolve(&self, key: &ElementKey) -> Result<L::Handle, LocatorError> {
        self.cache.resolve(&self.hierarchy, key).map_err(|err| {
            match &err {
                LocatorError::InvalidKey(_) => self.metrics.record_invalid_key(),
                LocatorError::StaleElement(_) => self.metrics.record_stale(),
                _ => {}
            }
            err
        })
    }

    pub fn contains(&self, key: &ElementKey) -> bool {
        self.cache.contains(key)
    }

    pub fn reset(&self) {
        self.cache.reset();
        self.metrics.record_reset();
    }

    fn scope_root(&self, scope: &SearchScope) -> Result<L::Handle, LocatorError> {
        match scope {
            SearchScope::Root => self
                .hierarchy
                .root()
                .map_err(|err| LocatorError::RootUnreachable(err.to_string())),
            SearchScope::Element(key) => self.resolve(key),
        }
    }
}

enum Pending {
    Reference(AxRef),
    Index(IndexPath),
}
