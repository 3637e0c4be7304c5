use axbridge_core_types::{ElementKey, IndexPath, Rect};
use element_locator::{
    BindingStrategy, ElementLocator, LocateOptions, LocatorError, SearchScope, Selector,
    SourceFormat, SourceOptions,
};
use hierarchy_snapshot::{ElementKind, FixtureNode, MemoryHierarchy};

fn two_buttons() -> ElementLocator<MemoryHierarchy> {
    ElementLocator::new(MemoryHierarchy::from_fixture(
        FixtureNode::new(ElementKind::Application)
            .with_child(
                FixtureNode::new(ElementKind::Button)
                    .with_identifier("ButtonA")
                    .with_text("OK")
                    .with_frame(Rect::new(10.0, 10.0, 80.0, 24.0)),
            )
            .with_child(
                FixtureNode::new(ElementKind::Button)
                    .with_identifier("ButtonB")
                    .with_text("Cancel"),
            ),
    ))
}

const OK_BUTTON: &str = r#"//XCUIElementTypeButton[@text="OK"]"#;

#[test]
fn locate_read_stale_then_reset() {
    let locator = two_buttons();
    let outcome = locator
        .locate(&SearchScope::Root, &Selector::xpath(OK_BUTTON), LocateOptions::first())
        .unwrap();
    assert_eq!(outcome.len(), 1);
    assert!(outcome.partial.is_empty());
    let key = outcome.keys().remove(0);
    assert_eq!(outcome.elements[0].kind, ElementKind::Button);
    assert_eq!(outcome.elements[0].index_path.to_string(), "/0");

    let text = locator.attribute_value(&key, "text").unwrap();
    assert_eq!(text.as_scalar(), Some("OK"));

    let button_a = locator.hierarchy().find_by_identifier("ButtonA").unwrap();
    assert!(locator.hierarchy().remove(button_a));
    let err = locator.attribute_value(&key, "text").unwrap_err();
    assert!(matches!(err, LocatorError::StaleElement(ref stale) if *stale == key));
    assert_eq!(err.code(), "stale element reference");

    locator.reset();
    assert!(matches!(
        locator.attribute_value(&key, "text"),
        Err(LocatorError::InvalidKey(_))
    ));

    let metrics = locator.metrics();
    assert_eq!(metrics.locate.total, 1);
    assert_eq!(metrics.matches, 1);
    assert_eq!(metrics.stale_lookups, 1);
    assert_eq!(metrics.invalid_keys, 1);
    assert_eq!(metrics.resets, 1);
}

#[test]
fn repeated_locate_issues_fresh_keys_for_same_element() {
    let locator = two_buttons();
    let selector = Selector::xpath(OK_BUTTON);
    let first = locator
        .locate(&SearchScope::Root, &selector, LocateOptions::first())
        .unwrap();
    let second = locator
        .locate(&SearchScope::Root, &selector, LocateOptions::first())
        .unwrap();
    assert_ne!(first.keys(), second.keys());
    assert_eq!(
        locator.resolve(&first.keys()[0]).unwrap(),
        locator.resolve(&second.keys()[0]).unwrap()
    );
}

#[test]
fn all_mode_returns_document_order() {
    let locator = two_buttons();
    let outcome = locator
        .locate(
            &SearchScope::Root,
            &Selector::class_name("XCUIElementTypeButton"),
            LocateOptions::all(),
        )
        .unwrap();
    let texts: Vec<String> = outcome
        .keys()
        .iter()
        .map(|key| locator.attribute_value(key, "text").unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["OK", "Cancel"]);
}

#[test]
fn zero_matches_is_empty_not_error() {
    let locator = two_buttons();
    let outcome = locator
        .locate(
            &SearchScope::Root,
            &Selector::accessibility_id("missing"),
            LocateOptions::all(),
        )
        .unwrap();
    assert!(outcome.is_empty());
    assert!(locator.cache().is_empty());
}

#[test]
fn malformed_selector_fails_before_touching_hierarchy() {
    let locator = two_buttons();
    locator.hierarchy().fail_root("hierarchy unavailable");
    let err = locator
        .locate(
            &SearchScope::Root,
            &Selector::xpath("//XCUIElementTypeButton["),
            LocateOptions::all(),
        )
        .unwrap_err();
    assert!(matches!(err, LocatorError::Query(_)));
    assert_eq!(err.code(), "invalid selector");
    assert_eq!(locator.metrics().locate.total, 0);
}

#[test]
fn unreachable_root_fails_locate() {
    let locator = two_buttons();
    locator.hierarchy().fail_root("accessibility disabled");
    assert!(matches!(
        locator.locate(&SearchScope::Root, &Selector::xpath("//*"), LocateOptions::all()),
        Err(LocatorError::RootUnreachable(_))
    ));
}

#[test]
fn unknown_attribute_and_unknown_key() {
    let locator = two_buttons();
    let key = locator
        .locate(&SearchScope::Root, &Selector::xpath(OK_BUTTON), LocateOptions::first())
        .unwrap()
        .keys()
        .remove(0);
    let err = locator.attribute_value(&key, "frobnicate").unwrap_err();
    assert!(matches!(err, LocatorError::UnknownAttribute(ref name) if name == "frobnicate"));

    // Key resolution is checked before the attribute name.
    let bogus = ElementKey::from("not-a-key");
    assert!(matches!(
        locator.attribute_value(&bogus, "frobnicate"),
        Err(LocatorError::InvalidKey(_))
    ));
}

#[test]
fn frame_reads_as_record() {
    let locator = two_buttons();
    let key = locator
        .locate(
            &SearchScope::Root,
            &Selector::accessibility_id("ButtonA"),
            LocateOptions::first(),
        )
        .unwrap()
        .keys()
        .remove(0);
    let frame = locator.attribute_value(&key, "frame").unwrap();
    assert_eq!(frame.field("x"), Some("10"));
    assert_eq!(frame.field("width"), Some("80"));
    assert_eq!(
        locator.attribute_value(&key, "enabled").unwrap().as_scalar(),
        Some("true")
    );
}

#[test]
fn element_scope_limits_search() {
    let locator = ElementLocator::new(MemoryHierarchy::from_fixture(
        FixtureNode::new(ElementKind::Application)
            .with_child(
                FixtureNode::new(ElementKind::Window)
                    .with_identifier("left")
                    .with_child(FixtureNode::new(ElementKind::Button).with_text("L")),
            )
            .with_child(
                FixtureNode::new(ElementKind::Window)
                    .with_identifier("right")
                    .with_child(FixtureNode::new(ElementKind::Button).with_text("R")),
            ),
    ));
    let right = locator
        .locate(
            &SearchScope::Root,
            &Selector::accessibility_id("right"),
            LocateOptions::first(),
        )
        .unwrap()
        .keys()
        .remove(0);
    let scoped = locator
        .locate(
            &SearchScope::Element(right),
            &Selector::xpath("//XCUIElementTypeButton"),
            LocateOptions::all(),
        )
        .unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped.elements[0].index_path, IndexPath::from_offsets(vec![0]));
    assert_eq!(
        locator
            .attribute_value(&scoped.keys()[0], "text")
            .unwrap()
            .as_scalar(),
        Some("R")
    );
}

#[test]
fn stale_scope_key_is_reported() {
    let locator = two_buttons();
    let key = locator
        .locate(&SearchScope::Root, &Selector::xpath(OK_BUTTON), LocateOptions::first())
        .unwrap()
        .keys()
        .remove(0);
    let handle = locator.resolve(&key).unwrap();
    locator.hierarchy().remove(handle);
    assert!(matches!(
        locator.locate(
            &SearchScope::Element(key),
            &Selector::xpath("//*"),
            LocateOptions::all()
        ),
        Err(LocatorError::StaleElement(_))
    ));
}

#[test]
fn missing_reference_fails_reference_binding_only() {
    let locator = two_buttons();
    let ok = locator.hierarchy().find_by_text("OK").unwrap();
    locator.hierarchy().withhold_reference(ok);

    let err = locator
        .locate(&SearchScope::Root, &Selector::xpath(OK_BUTTON), LocateOptions::first())
        .unwrap_err();
    assert!(matches!(err, LocatorError::NoStableReference(ref path) if path == "/0"));
    assert!(locator.cache().is_empty());

    let indexed = locator
        .locate(
            &SearchScope::Root,
            &Selector::xpath(OK_BUTTON),
            LocateOptions::first().with_binding(BindingStrategy::Index),
        )
        .unwrap();
    assert_eq!(locator.resolve(&indexed.keys()[0]).unwrap(), ok);
}

#[test]
fn partial_capture_is_flagged() {
    let locator = ElementLocator::new(MemoryHierarchy::from_fixture(
        FixtureNode::new(ElementKind::Application)
            .with_child(
                FixtureNode::new(ElementKind::Group)
                    .with_identifier("broken")
                    .with_child(FixtureNode::new(ElementKind::Button).with_text("hidden")),
            )
            .with_child(FixtureNode::new(ElementKind::Button).with_text("visible")),
    ));
    let broken = locator.hierarchy().find_by_identifier("broken").unwrap();
    locator.hierarchy().fail_children(broken, "timed out");

    let outcome = locator
        .locate(
            &SearchScope::Root,
            &Selector::class_name("Button"),
            LocateOptions::all(),
        )
        .unwrap();
    assert_eq!(outcome.len(), 1);
    assert_eq!(outcome.partial.len(), 1);
    assert_eq!(outcome.partial[0].index_path.to_string(), "/0");
    assert_eq!(locator.metrics().partial_captures, 1);
}

#[test]
fn describe_renders_both_formats() {
    let locator = two_buttons();
    let xml = locator
        .describe(&SearchScope::Root, SourceOptions::default())
        .unwrap();
    assert!(xml.source.starts_with("<?xml"));
    assert!(xml.source.contains("<XCUIElementTypeButton"));
    assert!(!xml.source.contains("indexPath"));

    let with_paths = locator
        .describe(
            &SearchScope::Root,
            SourceOptions {
                format: SourceFormat::Xml,
                include_index_paths: true,
            },
        )
        .unwrap();
    assert!(with_paths.source.contains(r#"indexPath="/1""#));

    let description = locator
        .describe(
            &SearchScope::Root,
            SourceOptions {
                format: SourceFormat::Description,
                include_index_paths: false,
            },
        )
        .unwrap();
    assert!(description.source.starts_with("Application"));
    assert!(description.source.contains("identifier: 'ButtonB'"));
}
