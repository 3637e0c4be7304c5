use std::collections::HashMap;

use axbridge_core_types::{AxRef, IndexPath, Rect};
use once_cell::unsync::OnceCell;

use crate::attributes::{Attribute, AttributeSet, NativeValue};
use crate::kinds::ElementKind;
use crate::ports::{HostError, LiveHierarchy};

/// Arena index of a node inside one [`SnapshotTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A subtree the native layer could not enumerate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialCapture {
    pub index_path: IndexPath,
    pub reason: String,
}

pub struct SnapshotNode<H> {
    pub(crate) handle: H,
    pub(crate) index_path: IndexPath,
    pub(crate) ax_ref: Option<AxRef>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) capture_failure: Option<String>,
    slots: [OnceCell<Result<NativeValue, HostError>>; Attribute::COUNT],
}

impl<H> SnapshotNode<H> {
    pub(crate) fn new(handle: H, index_path: IndexPath, ax_ref: Option<AxRef>) -> Self {
        Self {
            handle,
            index_path,
            ax_ref,
            children: Vec::new(),
            capture_failure: None,
            slots: std::array::from_fn(|_| OnceCell::new()),
        }
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn index_path(&self) -> &IndexPath {
        &self.index_path
    }

    pub fn ax_ref(&self) -> Option<&AxRef> {
        self.ax_ref.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Set when the children of this node could not be enumerated.
    pub fn capture_failure(&self) -> Option<&str> {
        self.capture_failure.as_deref()
    }

    pub fn is_faulted(&self, attribute: Attribute) -> bool {
        self.slots[attribute.index()].get().is_some()
    }
}

/// Immutable point-in-time capture of a UI subtree.
///
/// Nodes live in one arena in pre-order; children are arena indices and the
/// parent of a node is recovered from its index path. Attribute values are
/// fetched from the live hierarchy on first read and memoized for the
/// lifetime of the tree.
pub struct SnapshotTree<'h, L: LiveHierarchy> {
    hierarchy: &'h L,
    nodes: Vec<SnapshotNode<L::Handle>>,
    by_path: HashMap<IndexPath, NodeId>,
    failures: Vec<PartialCapture>,
    attributes: AttributeSet,
}

impl<'h, L: LiveHierarchy> SnapshotTree<'h, L> {
    pub(crate) fn new(hierarchy: &'h L, attributes: AttributeSet) -> Self {
        Self {
            hierarchy,
            nodes: Vec::new(),
            by_path: HashMap::new(),
            failures: Vec::new(),
            attributes,
        }
    }

    pub(crate) fn push(&mut self, node: SnapshotNode<L::Handle>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.by_path.insert(node.index_path.clone(), id);
        self.nodes.push(node);
        id
    }

    pub(crate) fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    pub(crate) fn mark_failed(&mut self, id: NodeId, reason: String) {
        let node = &mut self.nodes[id.0];
        node.capture_failure = Some(reason.clone());
        self.failures.push(PartialCapture {
            index_path: node.index_path.clone(),
            reason,
        });
    }

    pub fn hierarchy(&self) -> &'h L {
        self.hierarchy
    }

    /// Attributes a caller asked to have exposed for this capture.
    pub fn attributes(&self) -> AttributeSet {
        self.attributes
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SnapshotNode<L::Handle> {
        &self.nodes[id.0]
    }

    /// Node ids in document (pre-order) order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node_by_path(&self, path: &IndexPath) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let parent_path = self.nodes[id.0].index_path.parent()?;
        self.node_by_path(&parent_path)
    }

    pub fn failures(&self) -> &[PartialCapture] {
        &self.failures
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Reads an attribute, faulting it in from the live hierarchy on first use.
    pub fn attribute(&self, id: NodeId, attribute: Attribute) -> Result<&NativeValue, HostError> {
        let node = &self.nodes[id.0];
        node.slots[attribute.index()]
            .get_or_init(|| self.hierarchy.attribute(&node.handle, attribute))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn kind(&self, id: NodeId) -> ElementKind {
        self.attribute(id, Attribute::ElementType)
            .ok()
            .and_then(NativeValue::as_kind)
            .unwrap_or_default()
    }

    pub fn frame(&self, id: NodeId) -> Option<Rect> {
        self.attribute(id, Attribute::Frame)
            .ok()
            .and_then(NativeValue::as_rect)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.attribute(id, Attribute::Text)
            .ok()
            .and_then(NativeValue::as_text)
    }
}
