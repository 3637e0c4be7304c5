//! Determinism and first/all mode contract over random hierarchies.

use hierarchy_snapshot::{Document, ElementKind, FixtureNode, MemoryHierarchy, SnapshotBuilder};
use path_query::{MatchMode, PathQuery};
use proptest::prelude::*;

const EXPRESSIONS: &[&str] = &[
    "//XCUIElementTypeButton",
    "//*[@enabled='false']",
    "//XCUIElementTypeGroup/*[1]",
    "//XCUIElementTypeButton[@text='a'] | //XCUIElementTypeStaticText",
    "//*[@text]/..",
    "//XCUIElementTypeGroup//XCUIElementTypeButton[last()]",
    "//*[starts-with(@text, 'b')]/following-sibling::*",
    "//XCUIElementTypeStaticText/ancestor::*[2]",
    "//*[count(*) > 1]",
    "//XCUIElementTypeSlider",
];

fn node_strategy() -> impl Strategy<Value = FixtureNode> {
    (
        prop::sample::select(vec![
            ElementKind::Group,
            ElementKind::Button,
            ElementKind::StaticText,
        ]),
        prop::option::of("[abc]{1,2}"),
        any::<bool>(),
    )
        .prop_map(|(kind, text, enabled)| {
            let mut node = FixtureNode::new(kind);
            node.text = text;
            node.enabled = enabled;
            node
        })
}

fn tree_strategy() -> impl Strategy<Value = FixtureNode> {
    node_strategy().prop_recursive(4, 40, 4, |inner| {
        (node_strategy(), prop::collection::vec(inner, 0..4)).prop_map(|(mut node, children)| {
            node.children = children;
            node
        })
    })
}

fn document_for(fixture: FixtureNode) -> Document {
    let hierarchy = MemoryHierarchy::from_fixture(
        FixtureNode::new(ElementKind::Application).with_child(fixture),
    );
    let tree = SnapshotBuilder::new().capture_root(&hierarchy).unwrap();
    Document::from_tree(&tree)
}

proptest! {
    /// Same expression, same document, same ordered result.
    #[test]
    fn prop_evaluation_is_deterministic(
        fixture in tree_strategy(),
        which in 0..EXPRESSIONS.len(),
    ) {
        let document = document_for(fixture);
        let query = PathQuery::compile(EXPRESSIONS[which]).unwrap();
        let first_run = query.select(&document, MatchMode::All).unwrap();
        let second_run = query.select(&document, MatchMode::All).unwrap();
        prop_assert_eq!(&first_run, &second_run);
        prop_assert!(first_run.windows(2).all(|pair| pair[0] < pair[1]));
    }

    /// First-match equals the head of all-matches, and is empty when it is.
    #[test]
    fn prop_first_is_head_of_all(
        fixture in tree_strategy(),
        which in 0..EXPRESSIONS.len(),
    ) {
        let document = document_for(fixture);
        let query = PathQuery::compile(EXPRESSIONS[which]).unwrap();
        let all = query.select(&document, MatchMode::All).unwrap();
        let first = query.select(&document, MatchMode::First).unwrap();
        prop_assert!(first.len() <= 1);
        prop_assert_eq!(first.first(), all.first());
    }
}
