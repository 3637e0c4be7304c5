//! Structured document rendering of a snapshot tree.
//!
//! The document mirrors the snapshot 1:1 and in the same pre-order, so the
//! document index of a node equals its snapshot [`NodeId`] index. Every node
//! carries its index path under [`INDEX_PATH_ATTRIBUTE`], which is never a
//! protocol attribute and therefore cannot collide with UI data.

use std::collections::HashMap;
use std::io::Cursor;

use axbridge_core_types::IndexPath;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::debug;

use crate::attributes::{canonicalize, Attribute, CanonicalValue};
use crate::errors::SnapshotError;
use crate::kinds::ElementKind;
use crate::model::{NodeId, SnapshotTree};
use crate::ports::LiveHierarchy;

/// Positional attribute carrying the rendered index path.
pub const INDEX_PATH_ATTRIBUTE: &str = "indexPath";

/// Attributes that appear in the one-line description dump, in order.
const DESCRIPTION_ATTRIBUTES: [&str; 5] =
    ["identifier", "label", "title", "value", "placeholderValue"];

#[derive(Clone, Debug, PartialEq)]
pub struct DocNode {
    kind: ElementKind,
    attributes: Vec<(&'static str, String)>,
    children: Vec<usize>,
    index_path: IndexPath,
}

impl DocNode {
    pub fn tag(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Resolved attributes in table order. The positional attribute is not
    /// part of this list; see [`DocNode::attribute`].
    pub fn attributes(&self) -> &[(&'static str, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attribute, _)| *attribute == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub fn index_path(&self) -> &IndexPath {
        &self.index_path
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct XmlOptions {
    /// Emit the positional attribute on every element.
    pub include_index_paths: bool,
}

/// Serialized document built fresh for one query.
#[derive(Clone, Debug, Default)]
pub struct Document {
    nodes: Vec<DocNode>,
    by_path: HashMap<IndexPath, usize>,
}

impl Document {
    pub fn from_tree<L: LiveHierarchy>(tree: &SnapshotTree<'_, L>) -> Self {
        let mut nodes = Vec::with_capacity(tree.len());
        let mut by_path = HashMap::with_capacity(tree.len());

        for id in tree.ids() {
            let snapshot = tree.node(id);
            by_path.insert(snapshot.index_path().clone(), nodes.len());
            nodes.push(DocNode {
                kind: tree.kind(id),
                attributes: resolved_attributes(tree, id),
                children: snapshot.children().iter().map(|child| child.index()).collect(),
                index_path: snapshot.index_path().clone(),
            });
        }

        Self { nodes, by_path }
    }

    /// Index of the top element.
    pub fn root(&self) -> usize {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> &DocNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[DocNode] {
        &self.nodes
    }

    pub fn children(&self, index: usize) -> &[usize] {
        &self.nodes[index].children
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        let parent = self.nodes[index].index_path.parent()?;
        self.find_by_index_path(&parent)
    }

    pub fn find_by_index_path(&self, path: &IndexPath) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    pub fn index_path(&self, index: usize) -> &IndexPath {
        &self.nodes[index].index_path
    }

    /// Snapshot node the document node was rendered from.
    pub fn snapshot_id(&self, index: usize) -> NodeId {
        NodeId(index)
    }

    pub fn to_xml(&self, options: XmlOptions) -> Result<String, SnapshotError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|err| SnapshotError::render(err.to_string()))?;
        if !self.nodes.is_empty() {
            self.write_elements(&mut writer, options)?;
        }
        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|err| SnapshotError::render(err.to_string()))
    }

    /// Emits every element with an explicit stack; `Close` entries end an
    /// element after its children.
    fn write_elements(
        &self,
        writer: &mut Writer<Cursor<Vec<u8>>>,
        options: XmlOptions,
    ) -> Result<(), SnapshotError> {
        enum Pending {
            Open(usize),
            Close(usize),
        }

        let mut stack = vec![Pending::Open(self.root())];
        while let Some(pending) = stack.pop() {
            let event = match pending {
                Pending::Close(index) => Event::End(BytesEnd::new(self.nodes[index].tag())),
                Pending::Open(index) => {
                    let node = &self.nodes[index];
                    let mut start = BytesStart::new(node.tag());
                    for (name, value) in &node.attributes {
                        start.push_attribute((*name, value.as_str()));
                    }
                    if options.include_index_paths {
                        let index_path = node.index_path.to_string();
                        start.push_attribute((INDEX_PATH_ATTRIBUTE, index_path.as_str()));
                    }
                    if node.children.is_empty() {
                        Event::Empty(start)
                    } else {
                        stack.push(Pending::Close(index));
                        stack.extend(
                            node.children.iter().rev().map(|child| Pending::Open(*child)),
                        );
                        Event::Start(start)
                    }
                }
            };
            writer
                .write_event(event)
                .map_err(|err| SnapshotError::render(err.to_string()))?;
        }
        Ok(())
    }

    /// Indented one-line-per-element dump.
    pub fn to_description(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            let indent = "  ".repeat(node.index_path.depth());
            let field = |name: &str| node.attribute(name).unwrap_or("0");
            out.push_str(&format!(
                "{indent}{}, {{{{{}, {}}}, {{{}, {}}}}}",
                node.kind.short_name(),
                field("x"),
                field("y"),
                field("width"),
                field("height"),
            ));
            for name in DESCRIPTION_ATTRIBUTES {
                if let Some(value) = node.attribute(name).filter(|value| !value.is_empty()) {
                    out.push_str(&format!(", {name}: '{value}'"));
                }
            }
            if node.attribute("enabled") == Some("false") {
                out.push_str(", Disabled");
            }
            if node.attribute("selected") == Some("true") {
                out.push_str(", Selected");
            }
            if node.attribute("hasFocus") == Some("true") {
                out.push_str(", Focused");
            }
            out.push('\n');
        }
        out
    }
}

fn resolved_attributes<L: LiveHierarchy>(
    tree: &SnapshotTree<'_, L>,
    id: NodeId,
) -> Vec<(&'static str, String)> {
    let mut resolved = Vec::new();
    for attribute in tree.attributes().iter() {
        match tree.attribute(id, attribute) {
            Ok(value) => push_canonical(&mut resolved, attribute, canonicalize(value)),
            Err(err) => {
                debug!(
                    target: "hierarchy-snapshot",
                    index_path = %tree.node(id).index_path(),
                    %attribute,
                    %err,
                    "attribute unavailable; omitted from document"
                );
            }
        }
    }
    resolved
}

fn push_canonical(
    resolved: &mut Vec<(&'static str, String)>,
    attribute: Attribute,
    value: CanonicalValue,
) {
    match value {
        CanonicalValue::Null => {}
        CanonicalValue::Scalar(value) => resolved.push((attribute.protocol_name(), value)),
        CanonicalValue::Record(fields) => resolved.extend(fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeSet;
    use crate::builder::SnapshotBuilder;
    use crate::memory::{FixtureNode, MemoryHierarchy};
    use axbridge_core_types::Rect;

    fn hierarchy() -> MemoryHierarchy {
        MemoryHierarchy::from_fixture(
            FixtureNode::new(ElementKind::Application)
                .with_title("Demo")
                .with_frame(Rect::new(0.0, 0.0, 800.0, 600.0))
                .with_child(
                    FixtureNode::new(ElementKind::Button)
                        .with_identifier("ok")
                        .with_text("OK <&> \"quoted\"")
                        .with_frame(Rect::new(10.0, 20.0, 30.0, 40.0)),
                )
                .with_child(FixtureNode::new(ElementKind::Button).with_text("Cancel").disabled()),
        )
    }

    #[test]
    fn document_mirrors_tree_order() {
        let hierarchy = hierarchy();
        let tree = SnapshotBuilder::new().capture_root(&hierarchy).unwrap();
        let document = Document::from_tree(&tree);
        assert_eq!(document.len(), tree.len());
        assert_eq!(document.children(document.root()), &[1, 2]);
        assert_eq!(document.node(1).tag(), "XCUIElementTypeButton");
        assert_eq!(document.node(1).attribute("x"), Some("10"));
        assert_eq!(document.node(1).attribute("height"), Some("40"));
        assert_eq!(document.node(1).attribute("elementType"), Some("9"));
        assert_eq!(document.node(2).attribute("enabled"), Some("false"));
        assert_eq!(document.parent(2), Some(0));
        assert_eq!(
            document.find_by_index_path(&"/1".parse().unwrap()),
            Some(2)
        );
        assert_eq!(document.node(0).attribute("label"), None);
    }

    #[test]
    fn xml_escapes_reserved_characters() {
        let hierarchy = hierarchy();
        let tree = SnapshotBuilder::new().capture_root(&hierarchy).unwrap();
        let xml = Document::from_tree(&tree)
            .to_xml(XmlOptions {
                include_index_paths: true,
            })
            .unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("text=\"OK &lt;&amp;&gt; &quot;quoted&quot;\""));
        assert!(xml.contains("indexPath=\"/0\""));
        assert!(xml.contains("</XCUIElementTypeApplication>"));
    }

    #[test]
    fn index_paths_can_be_left_out() {
        let hierarchy = hierarchy();
        let tree = SnapshotBuilder::new().capture_root(&hierarchy).unwrap();
        let xml = Document::from_tree(&tree)
            .to_xml(XmlOptions::default())
            .unwrap();
        assert!(!xml.contains(INDEX_PATH_ATTRIBUTE));
    }

    #[test]
    fn xml_keeps_siblings_in_order_and_nests_children() {
        let hierarchy = hierarchy();
        let tree = SnapshotBuilder::new().capture_root(&hierarchy).unwrap();
        let xml = Document::from_tree(&tree)
            .to_xml(XmlOptions::default())
            .unwrap();
        let ok = xml.find("identifier=\"ok\"").unwrap();
        let cancel = xml.find("text=\"Cancel\"").unwrap();
        let close = xml.find("</XCUIElementTypeApplication>").unwrap();
        assert!(ok < cancel && cancel < close);
        assert_eq!(xml.matches("<XCUIElementTypeButton").count(), 2);
        assert!(xml.contains("\n  <XCUIElementTypeButton"));
    }

    #[test]
    fn deep_chains_render_on_a_small_stack() {
        const DEPTH: usize = 2_000;
        let hierarchy = MemoryHierarchy::from_fixture(FixtureNode::new(ElementKind::Application));
        let mut parent = hierarchy.root_handle();
        for _ in 0..DEPTH {
            parent = hierarchy
                .insert_child(parent, 0, FixtureNode::new(ElementKind::Group))
                .unwrap();
        }
        let tree = SnapshotBuilder::with_attributes(AttributeSet::required())
            .capture_root(&hierarchy)
            .unwrap();
        let document = Document::from_tree(&tree);
        assert_eq!(document.len(), DEPTH + 1);

        let xml = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(move || document.to_xml(XmlOptions::default()))
            .unwrap()
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(xml.matches("<XCUIElementTypeGroup").count(), DEPTH);
        assert_eq!(xml.matches("</XCUIElementTypeGroup>").count(), DEPTH - 1);
        assert!(xml.trim_end().ends_with("</XCUIElementTypeApplication>"));
    }

    #[test]
    fn description_lists_one_line_per_element() {
        let hierarchy = hierarchy();
        let tree = SnapshotBuilder::new().capture_root(&hierarchy).unwrap();
        let description = Document::from_tree(&tree).to_description();
        let lines: Vec<&str> = description.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Application, {{0, 0}, {800, 600}}, title: 'Demo'");
        assert_eq!(
            lines[1],
            "  Button, {{10, 20}, {30, 40}}, identifier: 'ok'"
        );
        assert!(lines[2].ends_with(", Disabled"));
    }
}
