//! Attribute resolution: protocol names, native attribute identifiers and
//! canonical string forms of native values.

use std::fmt;

use axbridge_core_types::Rect;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::errors::SnapshotError;
use crate::kinds::ElementKind;

/// Native attribute identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    ElementType,
    Identifier,
    Label,
    Title,
    Value,
    PlaceholderValue,
    Text,
    Enabled,
    Selected,
    HasFocus,
    Frame,
}

/// Names of the four numeric fields a rectangle canonicalizes into.
pub const RECT_FIELDS: [&str; 4] = ["x", "y", "width", "height"];

/// Protocol name table: every accepted spelling and the attribute it maps to.
/// Canonical names come first for each attribute.
const PROTOCOL_TABLE: &[(&str, Attribute)] = &[
    ("elementType", Attribute::ElementType),
    ("type", Attribute::ElementType),
    ("identifier", Attribute::Identifier),
    ("name", Attribute::Identifier),
    ("label", Attribute::Label),
    ("title", Attribute::Title),
    ("value", Attribute::Value),
    ("placeholderValue", Attribute::PlaceholderValue),
    ("text", Attribute::Text),
    ("enabled", Attribute::Enabled),
    ("selected", Attribute::Selected),
    ("hasFocus", Attribute::HasFocus),
    ("focused", Attribute::HasFocus),
    ("frame", Attribute::Frame),
    ("rect", Attribute::Frame),
];

impl Attribute {
    pub const COUNT: usize = 11;

    pub const ALL: [Attribute; Attribute::COUNT] = [
        Attribute::ElementType,
        Attribute::Identifier,
        Attribute::Label,
        Attribute::Title,
        Attribute::Value,
        Attribute::PlaceholderValue,
        Attribute::Text,
        Attribute::Enabled,
        Attribute::Selected,
        Attribute::HasFocus,
        Attribute::Frame,
    ];

    /// Canonical protocol-level name.
    pub const fn protocol_name(self) -> &'static str {
        match self {
            Attribute::ElementType => "elementType",
            Attribute::Identifier => "identifier",
            Attribute::Label => "label",
            Attribute::Title => "title",
            Attribute::Value => "value",
            Attribute::PlaceholderValue => "placeholderValue",
            Attribute::Text => "text",
            Attribute::Enabled => "enabled",
            Attribute::Selected => "selected",
            Attribute::HasFocus => "hasFocus",
            Attribute::Frame => "frame",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.protocol_name())
    }
}

/// Maps a protocol attribute name to its native attribute.
pub fn name_for(protocol_name: &str) -> Result<Attribute, SnapshotError> {
    PROTOCOL_TABLE
        .iter()
        .find(|(name, _)| *name == protocol_name)
        .map(|(_, attribute)| *attribute)
        .ok_or_else(|| SnapshotError::UnknownAttribute(protocol_name.to_string()))
}

/// Every accepted protocol name, aliases included.
pub fn protocol_names() -> impl Iterator<Item = &'static str> {
    PROTOCOL_TABLE.iter().map(|(name, _)| *name)
}

/// Aliases accepted for `attribute` besides its canonical name.
pub fn aliases(attribute: Attribute) -> impl Iterator<Item = &'static str> {
    PROTOCOL_TABLE
        .iter()
        .filter(move |(name, mapped)| *mapped == attribute && *name != attribute.protocol_name())
        .map(|(name, _)| *name)
}

/// Small bit set of attributes a caller wants captured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AttributeSet(u16);

impl AttributeSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Attribute::ALL
            .iter()
            .fold(Self::empty(), |set, attribute| set.with(*attribute))
    }

    /// The minimum every snapshot carries: kind and frame.
    pub const fn required() -> Self {
        Self(Attribute::ElementType.bit() | Attribute::Frame.bit())
    }

    #[must_use]
    pub const fn with(self, attribute: Attribute) -> Self {
        Self(self.0 | attribute.bit())
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn contains(self, attribute: Attribute) -> bool {
        self.0 & attribute.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Attribute> {
        Attribute::ALL
            .into_iter()
            .filter(move |attribute| self.contains(*attribute))
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, attribute| set.with(attribute))
    }
}

/// Value shapes the native layer can produce.
#[derive(Clone, Debug, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Rect(Rect),
    Kind(ElementKind),
}

impl NativeValue {
    pub fn text(value: Option<&str>) -> Self {
        value
            .map(|text| NativeValue::Text(text.to_string()))
            .unwrap_or(NativeValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Bool(value) => Some(*value),
            NativeValue::Int(value) => Some(*value != 0),
            _ => None,
        }
    }

    pub fn as_rect(&self) -> Option<Rect> {
        match self {
            NativeValue::Rect(rect) => Some(*rect),
            _ => None,
        }
    }

    pub fn as_kind(&self) -> Option<ElementKind> {
        match self {
            NativeValue::Kind(kind) => Some(*kind),
            NativeValue::Int(raw) => u32::try_from(*raw).ok().and_then(ElementKind::from_raw),
            NativeValue::Text(name) => name.parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NativeValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Canonical string form of a native value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanonicalValue {
    Null,
    Scalar(String),
    /// Structured value flattened into independently named fields.
    Record(Vec<(&'static str, String)>),
}

impl CanonicalValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            CanonicalValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            CanonicalValue::Record(fields) => fields
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CanonicalValue::Null)
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalValue::Null => Ok(()),
            CanonicalValue::Scalar(value) => f.write_str(value),
            CanonicalValue::Record(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect();
                f.write_str(&parts.join(" "))
            }
        }
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CanonicalValue::Null => serializer.serialize_none(),
            CanonicalValue::Scalar(value) => serializer.serialize_str(value),
            CanonicalValue::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

/// Total canonicalization over every native value shape.
pub fn canonicalize(value: &NativeValue) -> CanonicalValue {
    match value {
        NativeValue::Null => CanonicalValue::Null,
        NativeValue::Bool(flag) => CanonicalValue::Scalar(canonical_bool(*flag).to_string()),
        NativeValue::Int(number) => CanonicalValue::Scalar(number.to_string()),
        NativeValue::Float(number) => CanonicalValue::Scalar(canonical_number(*number)),
        NativeValue::Text(text) => CanonicalValue::Scalar(text.clone()),
        NativeValue::Kind(kind) => CanonicalValue::Scalar(kind.raw_value().to_string()),
        NativeValue::Rect(rect) => CanonicalValue::Record(
            RECT_FIELDS
                .iter()
                .zip([rect.x, rect.y, rect.width, rect.height])
                .map(|(name, number)| (*name, canonical_number(number)))
                .collect(),
        ),
    }
}

pub const fn canonical_bool(flag: bool) -> &'static str {
    if flag {
        "true"
    } else {
        "false"
    }
}

/// Integral values print without a fractional part; everything else uses the
/// shortest representation that parses back to the same `f64`.
pub fn canonical_number(number: f64) -> String {
    const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;
    if number.is_nan() {
        return "NaN".to_string();
    }
    if number.fract() == 0.0 && number.abs() < EXACT_LIMIT {
        return format!("{}", number as i64);
    }
    format!("{number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_canonical_names_and_aliases() {
        assert_eq!(name_for("text").unwrap(), Attribute::Text);
        assert_eq!(name_for("name").unwrap(), Attribute::Identifier);
        assert_eq!(name_for("focused").unwrap(), Attribute::HasFocus);
        assert_eq!(name_for("rect").unwrap(), Attribute::Frame);
        assert!(matches!(
            name_for("indexPath"),
            Err(SnapshotError::UnknownAttribute(name)) if name == "indexPath"
        ));
        assert!(name_for("Text").is_err());
    }

    #[test]
    fn every_attribute_has_exactly_one_canonical_entry() {
        for attribute in Attribute::ALL {
            let canonical = PROTOCOL_TABLE
                .iter()
                .filter(|(name, mapped)| *mapped == attribute && *name == attribute.protocol_name())
                .count();
            assert_eq!(canonical, 1, "{attribute}");
        }
        assert_eq!(aliases(Attribute::Frame).collect::<Vec<_>>(), vec!["rect"]);
        assert_eq!(aliases(Attribute::Label).count(), 0);
    }

    #[test]
    fn rect_canonicalizes_to_four_exact_fields() {
        let value = canonicalize(&NativeValue::Rect(Rect::new(10.0, 20.0, 30.0, 40.0)));
        assert_eq!(value.field("x"), Some("10"));
        assert_eq!(value.field("y"), Some("20"));
        assert_eq!(value.field("width"), Some("30"));
        assert_eq!(value.field("height"), Some("40"));
        assert_eq!(value.as_scalar(), None);
    }

    #[test]
    fn scalars_canonicalize() {
        assert_eq!(
            canonicalize(&NativeValue::Bool(true)),
            CanonicalValue::Scalar("true".into())
        );
        assert_eq!(
            canonicalize(&NativeValue::Bool(false)),
            CanonicalValue::Scalar("false".into())
        );
        assert_eq!(
            canonicalize(&NativeValue::Kind(ElementKind::Button)),
            CanonicalValue::Scalar("9".into())
        );
        assert_eq!(
            canonicalize(&NativeValue::Float(0.5)),
            CanonicalValue::Scalar("0.5".into())
        );
        assert_eq!(
            canonicalize(&NativeValue::Float(-0.0)),
            CanonicalValue::Scalar("0".into())
        );
        assert!(canonicalize(&NativeValue::Null).is_null());
        assert!(!canonicalize(&NativeValue::Text(String::new())).is_null());
    }

    #[test]
    fn attribute_set_always_iterates_in_table_order() {
        let set: AttributeSet = [Attribute::Frame, Attribute::Text, Attribute::ElementType]
            .into_iter()
            .collect();
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Attribute::ElementType, Attribute::Text, Attribute::Frame]
        );
        assert_eq!(AttributeSet::all().len(), Attribute::COUNT);
        assert!(AttributeSet::required().contains(Attribute::Frame));
    }

    #[test]
    fn attribute_set_intersection_keeps_shared_members() {
        let wanted = AttributeSet::required().with(Attribute::Label);
        let exposed = AttributeSet::empty()
            .with(Attribute::Label)
            .with(Attribute::Value);
        let shared = wanted.intersection(exposed);
        assert_eq!(shared.iter().collect::<Vec<_>>(), vec![Attribute::Label]);
        assert!(AttributeSet::all().intersection(AttributeSet::empty()).is_empty());
    }

    #[test]
    fn canonical_record_serializes_as_map() {
        let value = canonicalize(&NativeValue::Rect(Rect::new(1.0, 2.5, 3.0, 4.0)));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["y"], "2.5");
        assert_eq!(json["height"], "4");
    }
}
