//! In-memory live hierarchy backed by a recorded fixture.
//!
//! Used by the CLI to replay a captured hierarchy and by tests to mutate the
//! "live" UI between snapshots. Handles stay valid until their element is
//! removed; accessibility references have the form `mem:<id>`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use axbridge_core_types::{AxRef, Rect};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attributes::{Attribute, NativeValue};
use crate::kinds::ElementKind;
use crate::ports::{HostError, LiveHierarchy};

const REFERENCE_PREFIX: &str = "mem:";

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixture: {0}")]
    Parse(String),
}

/// Recorded element and its subtree, as stored in JSON or YAML fixtures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixtureNode {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub enabled: bool,
    pub selected: bool,
    #[serde(alias = "focused")]
    pub has_focus: bool,
    pub frame: Rect,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FixtureNode>,
}

impl Default for FixtureNode {
    fn default() -> Self {
        Self {
            kind: ElementKind::Other,
            identifier: None,
            label: None,
            title: None,
            value: None,
            placeholder_value: None,
            text: None,
            enabled: true,
            selected: false,
            has_focus: false,
            frame: Rect::default(),
            children: Vec::new(),
        }
    }
}

impl FixtureNode {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_child(mut self, child: FixtureNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    pub fn focused(mut self) -> Self {
        self.has_focus = true;
        self
    }

    fn value_of(&self, attribute: Attribute) -> NativeValue {
        match attribute {
            Attribute::ElementType => NativeValue::Kind(self.kind),
            Attribute::Identifier => NativeValue::text(self.identifier.as_deref()),
            Attribute::Label => NativeValue::text(self.label.as_deref()),
            Attribute::Title => NativeValue::text(self.title.as_deref()),
            Attribute::Value => NativeValue::text(self.value.as_deref()),
            Attribute::PlaceholderValue => NativeValue::text(self.placeholder_value.as_deref()),
            Attribute::Text => NativeValue::text(self.text.as_deref()),
            Attribute::Enabled => NativeValue::Bool(self.enabled),
            Attribute::Selected => NativeValue::Bool(self.selected),
            Attribute::HasFocus => NativeValue::Bool(self.has_focus),
            Attribute::Frame => NativeValue::Rect(self.frame),
        }
    }
}

/// Parses a fixture, trying JSON first and YAML second.
pub fn parse_fixture_str(raw: &str) -> Result<FixtureNode, FixtureError> {
    match serde_json::from_str(raw) {
        Ok(fixture) => Ok(fixture),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            FixtureError::Parse(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        }),
    }
}

pub fn load_fixture(path: impl AsRef<Path>) -> Result<FixtureNode, FixtureError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_fixture_str(&raw)
}

/// Opaque handle into a [`MemoryHierarchy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemHandle(u64);

struct MemNode {
    props: FixtureNode,
    parent: Option<u64>,
    children: Vec<u64>,
    children_fault: Option<String>,
    has_reference: bool,
}

struct MemoryState {
    nodes: HashMap<u64, MemNode>,
    root: u64,
    next_id: u64,
    root_fault: Option<String>,
}

impl MemoryState {
    fn insert_subtree(&mut self, mut fixture: FixtureNode, parent: Option<u64>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let children = std::mem::take(&mut fixture.children);
        self.nodes.insert(
            id,
            MemNode {
                props: fixture,
                parent,
                children: Vec::new(),
                children_fault: None,
                has_reference: true,
            },
        );
        let child_ids: Vec<u64> = children
            .into_iter()
            .map(|child| self.insert_subtree(child, Some(id)))
            .collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = child_ids;
        }
        id
    }

    fn remove_subtree(&mut self, id: u64) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                pending.extend(node.children);
            }
        }
    }

    fn detach(&mut self, id: u64) -> Option<(u64, usize)> {
        let parent = self.nodes.get(&id)?.parent?;
        let siblings = &mut self.nodes.get_mut(&parent)?.children;
        let offset = siblings.iter().position(|child| *child == id)?;
        siblings.remove(offset);
        Some((parent, offset))
    }

    fn is_attached(&self, id: u64) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes.get(&current).and_then(|node| node.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn pre_order(&self) -> Vec<u64> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                order.push(id);
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }
}

/// Mutable in-memory UI hierarchy.
pub struct MemoryHierarchy {
    state: RwLock<MemoryState>,
}

impl MemoryHierarchy {
    pub fn from_fixture(root: FixtureNode) -> Self {
        let mut state = MemoryState {
            nodes: HashMap::new(),
            root: 0,
            next_id: 0,
            root_fault: None,
        };
        state.root = state.insert_subtree(root, None);
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn root_handle(&self) -> MemHandle {
        MemHandle(self.state.read().root)
    }

    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().nodes.is_empty()
    }

    pub fn contains(&self, handle: MemHandle) -> bool {
        self.state.read().nodes.contains_key(&handle.0)
    }

    /// Removes `handle` and its subtree. Removing the root is refused.
    pub fn remove(&self, handle: MemHandle) -> bool {
        let mut state = self.state.write();
        if handle.0 == state.root || state.detach(handle.0).is_none() {
            return false;
        }
        state.remove_subtree(handle.0);
        true
    }

    /// Swaps `handle` for a freshly built element at the same position.
    pub fn replace(&self, handle: MemHandle, fixture: FixtureNode) -> Option<MemHandle> {
        let mut state = self.state.write();
        let (parent, offset) = state.detach(handle.0)?;
        state.remove_subtree(handle.0);
        let id = state.insert_subtree(fixture, Some(parent));
        state.nodes.get_mut(&parent)?.children.insert(offset, id);
        Some(MemHandle(id))
    }

    pub fn insert_child(
        &self,
        parent: MemHandle,
        offset: usize,
        fixture: FixtureNode,
    ) -> Option<MemHandle> {
        let mut state = self.state.write();
        let len = state.nodes.get(&parent.0)?.children.len();
        let id = state.insert_subtree(fixture, Some(parent.0));
        state
            .nodes
            .get_mut(&parent.0)?
            .children
            .insert(offset.min(len), id);
        Some(MemHandle(id))
    }

    pub fn set_text(&self, handle: MemHandle, text: Option<&str>) -> bool {
        match self.state.write().nodes.get_mut(&handle.0) {
            Some(node) => {
                node.props.text = text.map(str::to_string);
                true
            }
            None => false,
        }
    }

    /// Makes children enumeration of `handle` fail until faults are cleared.
    pub fn fail_children(&self, handle: MemHandle, reason: impl Into<String>) {
        if let Some(node) = self.state.write().nodes.get_mut(&handle.0) {
            node.children_fault = Some(reason.into());
        }
    }

    pub fn fail_root(&self, reason: impl Into<String>) {
        self.state.write().root_fault = Some(reason.into());
    }

    pub fn clear_faults(&self) {
        let mut state = self.state.write();
        state.root_fault = None;
        for node in state.nodes.values_mut() {
            node.children_fault = None;
        }
    }

    /// Stops `handle` from producing an accessibility reference.
    pub fn withhold_reference(&self, handle: MemHandle) {
        if let Some(node) = self.state.write().nodes.get_mut(&handle.0) {
            node.has_reference = false;
        }
    }

    pub fn find(&self, predicate: impl Fn(&FixtureNode) -> bool) -> Option<MemHandle> {
        let state = self.state.read();
        state
            .pre_order()
            .into_iter()
            .find(|id| {
                state
                    .nodes
                    .get(id)
                    .map(|node| predicate(&node.props))
                    .unwrap_or(false)
            })
            .map(MemHandle)
    }

    pub fn find_by_identifier(&self, identifier: &str) -> Option<MemHandle> {
        self.find(|props| props.identifier.as_deref() == Some(identifier))
    }

    pub fn find_by_text(&self, text: &str) -> Option<MemHandle> {
        self.find(|props| props.text.as_deref() == Some(text))
    }

    pub fn find_by_kind(&self, kind: ElementKind) -> Option<MemHandle> {
        self.find(|props| props.kind == kind)
    }
}

fn missing(operation: &'static str, handle: &MemHandle) -> HostError {
    HostError::new(operation, format!("element {} no longer exists", handle.0))
}

impl LiveHierarchy for MemoryHierarchy {
    type Handle = MemHandle;

    fn root(&self) -> Result<MemHandle, HostError> {
        let state = self.state.read();
        match &state.root_fault {
            Some(reason) => Err(HostError::new("root", reason.clone())),
            None => Ok(MemHandle(state.root)),
        }
    }

    fn children(&self, element: &MemHandle) -> Result<Vec<MemHandle>, HostError> {
        let state = self.state.read();
        let node = state
            .nodes
            .get(&element.0)
            .ok_or_else(|| missing("children", element))?;
        if let Some(reason) = &node.children_fault {
            return Err(HostError::new("children", reason.clone()));
        }
        Ok(node.children.iter().copied().map(MemHandle).collect())
    }

    fn attribute(
        &self,
        element: &MemHandle,
        attribute: Attribute,
    ) -> Result<NativeValue, HostError> {
        self.state
            .read()
            .nodes
            .get(&element.0)
            .map(|node| node.props.value_of(attribute))
            .ok_or_else(|| missing("attribute", element))
    }

    fn accessibility_ref(&self, element: &MemHandle) -> Option<AxRef> {
        let state = self.state.read();
        let node = state.nodes.get(&element.0)?;
        node.has_reference
            .then(|| AxRef::new(format!("{REFERENCE_PREFIX}{}", element.0)))
    }

    fn relocate(&self, reference: &AxRef) -> Option<MemHandle> {
        let id: u64 = reference.0.strip_prefix(REFERENCE_PREFIX)?.parse().ok()?;
        let state = self.state.read();
        let node = state.nodes.get(&id)?;
        (node.has_reference && state.is_attached(id)).then_some(MemHandle(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buttons() -> MemoryHierarchy {
        MemoryHierarchy::from_fixture(
            FixtureNode::new(ElementKind::Window)
                .with_child(FixtureNode::new(ElementKind::Button).with_text("OK"))
                .with_child(FixtureNode::new(ElementKind::Button).with_text("Cancel")),
        )
    }

    #[test]
    fn parses_json_and_yaml_fixtures() {
        let json = r#"{"type":"XCUIElementTypeWindow","children":[{"type":"Button","text":"OK","frame":{"x":1,"y":2,"width":3,"height":4}}]}"#;
        let from_json = parse_fixture_str(json).unwrap();
        assert_eq!(from_json.kind, ElementKind::Window);
        assert_eq!(from_json.children[0].frame, Rect::new(1.0, 2.0, 3.0, 4.0));
        assert!(from_json.children[0].enabled);

        let yaml = "type: Window\nchildren:\n  - type: 9\n    text: OK\n    focused: true\n";
        let from_yaml = parse_fixture_str(yaml).unwrap();
        assert_eq!(from_yaml.children[0].kind, ElementKind::Button);
        assert!(from_yaml.children[0].has_focus);

        assert!(matches!(
            parse_fixture_str("type: [unclosed"),
            Err(FixtureError::Parse(_))
        ));
    }

    #[test]
    fn removed_elements_cannot_be_relocated() {
        let hierarchy = buttons();
        let ok = hierarchy.find_by_text("OK").unwrap();
        let reference = hierarchy.accessibility_ref(&ok).unwrap();
        assert_eq!(hierarchy.relocate(&reference), Some(ok));

        assert!(hierarchy.remove(ok));
        assert_eq!(hierarchy.relocate(&reference), None);
        assert!(hierarchy.attribute(&ok, Attribute::Text).is_err());
        assert_eq!(hierarchy.children(&hierarchy.root_handle()).unwrap().len(), 1);
    }

    #[test]
    fn replacement_gets_a_new_reference() {
        let hierarchy = buttons();
        let ok = hierarchy.find_by_text("OK").unwrap();
        let old = hierarchy.accessibility_ref(&ok).unwrap();
        let fresh = hierarchy
            .replace(ok, FixtureNode::new(ElementKind::Button).with_text("OK"))
            .unwrap();
        assert_ne!(hierarchy.accessibility_ref(&fresh).unwrap(), old);
        assert_eq!(hierarchy.relocate(&old), None);
        assert_eq!(hierarchy.find_by_text("OK"), Some(fresh));
    }

    #[test]
    fn root_cannot_be_removed() {
        let hierarchy = buttons();
        assert!(!hierarchy.remove(hierarchy.root_handle()));
        assert_eq!(hierarchy.len(), 3);
    }

    #[test]
    fn withheld_reference_is_absent() {
        let hierarchy = buttons();
        let cancel = hierarchy.find_by_text("Cancel").unwrap();
        hierarchy.withhold_reference(cancel);
        assert_eq!(hierarchy.accessibility_ref(&cancel), None);
    }

    #[test]
    fn inserted_child_lands_at_clamped_offset() {
        let hierarchy = buttons();
        let root = hierarchy.root_handle();
        let first = hierarchy
            .insert_child(root, 0, FixtureNode::new(ElementKind::StaticText).with_label("Title"))
            .unwrap();
        let last = hierarchy
            .insert_child(root, 99, FixtureNode::new(ElementKind::CheckBox).selected().focused())
            .unwrap();

        let children = hierarchy.children(&root).unwrap();
        assert_eq!(children.len(), 4);
        assert_eq!(children[0], first);
        assert_eq!(children[3], last);
        assert_eq!(
            hierarchy.attribute(&first, Attribute::Label).unwrap(),
            NativeValue::Text("Title".into())
        );
        assert_eq!(
            hierarchy.attribute(&last, Attribute::Selected).unwrap(),
            NativeValue::Bool(true)
        );
        assert_eq!(
            hierarchy.attribute(&last, Attribute::HasFocus).unwrap(),
            NativeValue::Bool(true)
        );
        assert_eq!(
            hierarchy.attribute(&first, Attribute::Selected).unwrap(),
            NativeValue::Bool(false)
        );
        assert!(hierarchy.accessibility_ref(&last).is_some());

        let ok = hierarchy.find_by_text("OK").unwrap();
        assert!(hierarchy.remove(ok));
        assert_eq!(
            hierarchy.insert_child(ok, 0, FixtureNode::new(ElementKind::Button)),
            None
        );
    }
}
