//! Re-descent from a scope root to the live element at an index path.

use axbridge_core_types::IndexPath;
use hierarchy_snapshot::{LiveHierarchy, NodeId, SnapshotTree};
use tracing::debug;

use crate::errors::LocatorError;

pub struct IndexPathResolver<'h, L: LiveHierarchy> {
    hierarchy: &'h L,
}

impl<'h, L: LiveHierarchy> IndexPathResolver<'h, L> {
    pub fn new(hierarchy: &'h L) -> Self {
        Self { hierarchy }
    }

    /// Walks `path` from `anchor` through the live children lists.
    pub fn descend(&self, anchor: L::Handle, path: &IndexPath) -> Result<L::Handle, LocatorError> {
        let mut current = anchor;
        for (depth, offset) in path.offsets().iter().copied().enumerate() {
            let children = self
                .hierarchy
                .children(&current)
                .map_err(|err| stale(path, err.to_string()))?;
            let present = children.len();
            current = children.into_iter().nth(offset).ok_or_else(|| {
                stale(
                    path,
                    format!("depth {depth} has {present} children, offset {offset} requested"),
                )
            })?;
        }
        Ok(current)
    }

    /// Live element behind snapshot node `id`, reached from the snapshot root.
    ///
    /// When the snapshot recorded a reference for the node, the live element
    /// must still carry the same one.
    pub fn resolve_match(
        &self,
        tree: &SnapshotTree<'_, L>,
        id: NodeId,
    ) -> Result<L::Handle, LocatorError> {
        let anchor = tree.node(tree.root()).handle().clone();
        let node = tree.node(id);
        let live = self.descend(anchor, node.index_path())?;
        if let Some(expected) = node.ax_ref() {
            match self.hierarchy.accessibility_ref(&live) {
                Some(actual) if &actual == expected => {}
                actual => {
                    debug!(
                        target: "element-locator",
                        path = %node.index_path(),
                        expected = %expected,
                        actual = ?actual,
                        "element replaced since capture"
                    );
                    return Err(stale(
                        node.index_path(),
                        "element was replaced since the snapshot".to_string(),
                    ));
                }
            }
        }
        Ok(live)
    }
}

fn stale(path: &IndexPath, reason: String) -> LocatorError {
    LocatorError::StaleSnapshot {
        index_path: path.clone(),
        reason,
    }
}
