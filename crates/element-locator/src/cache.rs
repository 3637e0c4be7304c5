//! Opaque element keys bound to live elements.
//!
//! Keys are capabilities: they are only ever handed out here, never derived
//! from element contents, and a key is never reused for another element.

use std::fmt;

use axbridge_core_types::{AxRef, ElementKey, IndexPath};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hierarchy_snapshot::LiveHierarchy;
use tracing::{debug, info};

use crate::errors::LocatorError;
use crate::resolver::IndexPathResolver;

/// Where an index-bound key starts its descent.
#[derive(Clone, Debug)]
pub enum IndexAnchor<H> {
    /// The hierarchy root, fetched anew on every resolution.
    Root,
    Element(H),
}

#[derive(Clone, Debug)]
enum Binding<H> {
    Reference(AxRef),
    Index { anchor: IndexAnchor<H>, path: IndexPath },
}

pub struct ElementCache<H> {
    entries: DashMap<ElementKey, Binding<H>>,
}

impl<H> Default for ElementCache<H> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<H: Clone + fmt::Debug> ElementCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a key bound to the element's accessibility reference.
    pub fn store<L>(&self, hierarchy: &L, handle: &H) -> Result<ElementKey, LocatorError>
    where
        L: LiveHierarchy<Handle = H>,
    {
        let reference = hierarchy
            .accessibility_ref(handle)
            .ok_or_else(|| LocatorError::NoStableReference(format!("{handle:?}")))?;
        Ok(self.store_reference(reference))
    }

    pub fn store_reference(&self, reference: AxRef) -> ElementKey {
        self.insert(Binding::Reference(reference))
    }

    /// Issues a key bound to a position under `anchor`.
    pub fn store_indexed(&self, anchor: IndexAnchor<H>, path: IndexPath) -> ElementKey {
        self.insert(Binding::Index { anchor, path })
    }

    fn insert(&self, binding: Binding<H>) -> ElementKey {
        loop {
            let key = ElementKey::generate();
            if let Entry::Vacant(slot) = self.entries.entry(key.clone()) {
                slot.insert(binding);
                return key;
            }
        }
    }

    /// Live element for `key` as of now.
    pub fn resolve<L>(&self, hierarchy: &L, key: &ElementKey) -> Result<H, LocatorError>
    where
        L: LiveHierarchy<Handle = H>,
    {
        let binding = self
            .entries
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LocatorError::InvalidKey(key.clone()))?;

        let resolved = match binding {
            Binding::Reference(reference) => hierarchy.relocate(&reference),
            Binding::Index { anchor, path } => {
                let anchor = match anchor {
                    IndexAnchor::Root => hierarchy.root().ok(),
                    IndexAnchor::Element(handle) => Some(handle),
                };
                anchor.and_then(|anchor| {
                    IndexPathResolver::new(hierarchy)
                        .descend(anchor, &path)
                        .ok()
                })
            }
        };
        resolved.ok_or_else(|| {
            debug!(target: "element-locator", key = %key, "cached element is stale");
            LocatorError::StaleElement(key.clone())
        })
    }

    pub fn contains(&self, key: &ElementKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invalidates every issued key. Idempotent.
    pub fn reset(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        info!(target: "element-locator", dropped, "element cache reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hierarchy_snapshot::{ElementKind, FixtureNode, MemoryHierarchy};

    fn hierarchy() -> MemoryHierarchy {
        MemoryHierarchy::from_fixture(
            FixtureNode::new(ElementKind::Application)
                .with_child(FixtureNode::new(ElementKind::Button).with_text("OK"))
                .with_child(FixtureNode::new(ElementKind::Button).with_text("Cancel")),
        )
    }

    #[test]
    fn keys_are_distinct_per_store() {
        let hierarchy = hierarchy();
        let cache = ElementCache::new();
        let ok = hierarchy.find_by_text("OK").unwrap();
        let first = cache.store(&hierarchy, &ok).unwrap();
        let second = cache.store(&hierarchy, &ok).unwrap();
        assert_ne!(first, second);
        assert_eq!(cache.resolve(&hierarchy, &first).unwrap(), ok);
        assert_eq!(cache.resolve(&hierarchy, &second).unwrap(), ok);
    }

    #[test]
    fn removed_element_is_stale() {
        let hierarchy = hierarchy();
        let cache = ElementCache::new();
        let ok = hierarchy.find_by_text("OK").unwrap();
        let key = cache.store(&hierarchy, &ok).unwrap();
        assert!(hierarchy.remove(ok));
        assert!(matches!(
            cache.resolve(&hierarchy, &key),
            Err(LocatorError::StaleElement(stale)) if stale == key
        ));
        assert!(cache.contains(&key));
    }

    #[test]
    fn missing_reference_is_refused() {
        let hierarchy = hierarchy();
        let cache = ElementCache::new();
        let ok = hierarchy.find_by_text("OK").unwrap();
        hierarchy.withhold_reference(ok);
        assert!(matches!(
            cache.store(&hierarchy, &ok),
            Err(LocatorError::NoStableReference(_))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn index_binding_follows_position() {
        let hierarchy = hierarchy();
        let cache = ElementCache::new();
        let key = cache.store_indexed(IndexAnchor::Root, IndexPath::from_offsets(vec![0]));
        let ok = hierarchy.find_by_text("OK").unwrap();
        assert_eq!(cache.resolve(&hierarchy, &key).unwrap(), ok);

        hierarchy.remove(ok);
        let cancel = hierarchy.find_by_text("Cancel").unwrap();
        assert_eq!(cache.resolve(&hierarchy, &key).unwrap(), cancel);

        hierarchy.remove(cancel);
        assert!(matches!(
            cache.resolve(&hierarchy, &key),
            Err(LocatorError::StaleElement(_))
        ));
    }

    #[test]
    fn reset_is_idempotent() {
        let hierarchy = hierarchy();
        let cache = ElementCache::new();
        let ok = hierarchy.find_by_text("OK").unwrap();
        let key = cache.store(&hierarchy, &ok).unwrap();
        cache.reset();
        cache.reset();
        assert!(!cache.contains(&key));
        assert!(matches!(
            cache.resolve(&hierarchy, &key),
            Err(LocatorError::InvalidKey(_))
        ));
        assert!(matches!(
            cache.resolve(&hierarchy, &ElementKey::from("never-issued")),
            Err(LocatorError::InvalidKey(_))
        ));
    }
}
