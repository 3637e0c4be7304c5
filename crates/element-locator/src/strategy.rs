//! Locator strategies compiled down to path queries.

use std::fmt;
use std::str::FromStr;

use hierarchy_snapshot::ElementKind;
use path_query::{PathQuery, QueryError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "xpath")]
    XPath,
    #[serde(rename = "class name")]
    ClassName,
    #[serde(rename = "accessibility id")]
    AccessibilityId,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::XPath, Strategy::ClassName, Strategy::AccessibilityId];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::XPath => "xpath",
            Strategy::ClassName => "class name",
            Strategy::AccessibilityId => "accessibility id",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = QueryError;

    fn from_str(using: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.name() == using)
            .ok_or_else(|| QueryError::syntax(using, 0, "unsupported locator strategy"))
    }
}

/// Client-facing locator: a strategy name plus its value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub using: String,
    pub value: String,
}

impl Selector {
    pub fn new(using: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            using: using.into(),
            value: value.into(),
        }
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::new(Strategy::XPath.name(), expression)
    }

    pub fn class_name(kind: impl Into<String>) -> Self {
        Self::new(Strategy::ClassName.name(), kind)
    }

    pub fn accessibility_id(identifier: impl Into<String>) -> Self {
        Self::new(Strategy::AccessibilityId.name(), identifier)
    }

    /// Path expression this selector stands for.
    pub fn expression(&self) -> Result<String, QueryError> {
        match self.using.parse::<Strategy>()? {
            Strategy::XPath => Ok(self.value.clone()),
            Strategy::ClassName => {
                let kind = ElementKind::from_type_name(&self.value)
                    .or_else(|| ElementKind::from_short_name(&self.value))
                    .ok_or_else(|| QueryError::syntax(&self.value, 0, "unknown element type"))?;
                Ok(format!("//{}", kind.type_name()))
            }
            Strategy::AccessibilityId => {
                Ok(format!("//*[@identifier={}]", string_literal(&self.value)))
            }
        }
    }

    pub fn compile(&self) -> Result<PathQuery, QueryError> {
        PathQuery::compile(&self.expression()?)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.using, self.value)
    }
}

/// Quotes `value` as a path-query string literal. A value containing both
/// quote characters is spelled as a `concat()` call.
fn string_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xpath_is_passed_through() {
        let selector = Selector::xpath("//XCUIElementTypeButton[1]");
        assert_eq!(selector.expression().unwrap(), "//XCUIElementTypeButton[1]");
    }

    #[test]
    fn class_name_accepts_both_spellings() {
        assert_eq!(
            Selector::class_name("XCUIElementTypeButton").expression().unwrap(),
            "//XCUIElementTypeButton"
        );
        assert_eq!(
            Selector::class_name("Button").expression().unwrap(),
            "//XCUIElementTypeButton"
        );
        assert!(Selector::class_name("XCUIElementTypeBogus").compile().is_err());
    }

    #[test]
    fn accessibility_id_quoting() {
        assert_eq!(
            Selector::accessibility_id("ok").expression().unwrap(),
            r#"//*[@identifier="ok"]"#
        );
        assert_eq!(
            Selector::accessibility_id(r#"say "hi""#).expression().unwrap(),
            r#"//*[@identifier='say "hi"']"#
        );
        let mixed = Selector::accessibility_id(r#"it's "x""#);
        assert_eq!(
            mixed.expression().unwrap(),
            r#"//*[@identifier=concat("it's ", '"', "x", '"', "")]"#
        );
        assert!(mixed.compile().is_ok());
    }

    #[test]
    fn unknown_strategy_is_a_query_error() {
        let err = Selector::new("css selector", "button").compile().unwrap_err();
        assert_eq!(err.expression(), "css selector");
    }
}
