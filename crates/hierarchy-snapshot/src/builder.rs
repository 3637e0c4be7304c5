//! Single-pass capture of the live hierarchy into a [`SnapshotTree`].

use std::time::Instant;

use axbridge_core_types::IndexPath;
use tracing::{debug, warn};

use crate::attributes::AttributeSet;
use crate::errors::SnapshotError;
use crate::model::{NodeId, SnapshotNode, SnapshotTree};
use crate::ports::LiveHierarchy;

/// Walks the live hierarchy once, top-down.
///
/// The capture is best-effort rather than linearizable: nodes are read one
/// after another, so the native layer may change while the walk is running.
/// Attribute values are not read during the walk at all; they are faulted in
/// on first access.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotBuilder {
    attributes: AttributeSet,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self {
            attributes: AttributeSet::all(),
        }
    }
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the exposed attribute set. Kind and frame are always kept.
    pub fn with_attributes(attributes: AttributeSet) -> Self {
        let required = AttributeSet::required();
        Self {
            attributes: attributes
                .iter()
                .chain(required.iter())
                .collect::<AttributeSet>(),
        }
    }

    pub fn attributes(&self) -> AttributeSet {
        self.attributes
    }

    /// Captures the whole application starting from the hierarchy root.
    pub fn capture_root<'h, L: LiveHierarchy>(
        &self,
        hierarchy: &'h L,
    ) -> Result<SnapshotTree<'h, L>, SnapshotError> {
        let root = hierarchy
            .root()
            .map_err(|err| SnapshotError::RootUnreachable(err.to_string()))?;
        Ok(self.capture(hierarchy, root))
    }

    /// Captures `root` and every descendant reachable right now.
    ///
    /// A node whose children cannot be enumerated is kept with a failure
    /// marker; the walk continues with its siblings.
    pub fn capture<'h, L: LiveHierarchy>(
        &self,
        hierarchy: &'h L,
        root: L::Handle,
    ) -> SnapshotTree<'h, L> {
        let started = Instant::now();
        let mut tree = SnapshotTree::new(hierarchy, self.attributes);
        let mut stack: Vec<(L::Handle, IndexPath, Option<NodeId>)> =
            vec![(root, IndexPath::root(), None)];

        while let Some((handle, path, parent)) = stack.pop() {
            let ax_ref = hierarchy.accessibility_ref(&handle);
            let children = hierarchy.children(&handle);
            let id = tree.push(SnapshotNode::new(handle, path.clone(), ax_ref));
            if let Some(parent) = parent {
                tree.link(parent, id);
            }

            match children {
                Ok(children) => {
                    // Reverse push keeps pre-order numbering in child order.
                    for (offset, child) in children.into_iter().enumerate().rev() {
                        stack.push((child, path.child(offset), Some(id)));
                    }
                }
                Err(err) => {
                    warn!(
                        target: "hierarchy-snapshot",
                        index_path = %path,
                        %err,
                        "children enumeration failed; keeping partial subtree"
                    );
                    tree.mark_failed(id, err.to_string());
                }
            }
        }

        debug!(
            target: "hierarchy-snapshot",
            nodes = tree.len(),
            partial = tree.failures().len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "snapshot captured"
        );
        tree
    }
}
