//! Static table of UI control categories.
//!
//! Raw codes follow the native element type enumeration, so the
//! `elementType` attribute of a button reads `9` and of a pop-up button `14`.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::SnapshotError;

const TAG_PREFIX: &str = "XCUIElementType";

macro_rules! element_kinds {
    ($($name:ident = $raw:expr),+ $(,)?) => {
        /// Category of a UI element.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ElementKind {
            $($name),+
        }

        impl ElementKind {
            /// Every kind, in raw-code order.
            pub const ALL: &'static [ElementKind] = &[$(ElementKind::$name),+];

            pub const fn raw_value(self) -> u32 {
                match self {
                    $(ElementKind::$name => $raw),+
                }
            }

            pub const fn short_name(self) -> &'static str {
                match self {
                    $(ElementKind::$name => stringify!($name)),+
                }
            }

            /// Document tag name, e.g. `XCUIElementTypeButton`.
            pub const fn type_name(self) -> &'static str {
                match self {
                    $(ElementKind::$name => concat!("XCUIElementType", stringify!($name))),+
                }
            }
        }
    };
}

element_kinds! {
    Any = 0,
    Other = 1,
    Application = 2,
    Group = 3,
    Window = 4,
    Sheet = 5,
    Drawer = 6,
    Alert = 7,
    Dialog = 8,
    Button = 9,
    RadioButton = 10,
    RadioGroup = 11,
    CheckBox = 12,
    DisclosureTriangle = 13,
    PopUpButton = 14,
    ComboBox = 15,
    MenuButton = 16,
    ToolbarButton = 17,
    Popover = 18,
    Keyboard = 19,
    Key = 20,
    NavigationBar = 21,
    TabBar = 22,
    TabGroup = 23,
    Toolbar = 24,
    StatusBar = 25,
    Table = 26,
    TableRow = 27,
    TableColumn = 28,
    Outline = 29,
    OutlineRow = 30,
    Browser = 31,
    CollectionView = 32,
    Slider = 33,
    PageIndicator = 34,
    ProgressIndicator = 35,
    ActivityIndicator = 36,
    SegmentedControl = 37,
    Picker = 38,
    PickerWheel = 39,
    Switch = 40,
    Toggle = 41,
    Link = 42,
    Image = 43,
    Icon = 44,
    SearchField = 45,
    ScrollView = 46,
    ScrollBar = 47,
    StaticText = 48,
    TextField = 49,
    SecureTextField = 50,
    DatePicker = 51,
    TextView = 52,
    Menu = 53,
    MenuItem = 54,
    MenuBar = 55,
    MenuBarItem = 56,
    Map = 57,
    WebView = 58,
    IncrementArrow = 59,
    DecrementArrow = 60,
    Timeline = 61,
    RatingIndicator = 62,
    ValueIndicator = 63,
    SplitGroup = 64,
    Splitter = 65,
    RelevanceIndicator = 66,
    ColorWell = 67,
    HelpTag = 68,
    Matte = 69,
    DockItem = 70,
    Ruler = 71,
    RulerMarker = 72,
    Grid = 73,
    LevelIndicator = 74,
    Cell = 75,
    LayoutArea = 76,
    LayoutItem = 77,
    Handle = 78,
    Stepper = 79,
    Tab = 80,
    TouchBar = 81,
    StatusItem = 82,
}

impl ElementKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.raw_value() == raw)
    }

    /// Resolves a document tag name (`XCUIElementTypeButton`) to its kind.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let short = name.strip_prefix(TAG_PREFIX)?;
        Self::from_short_name(short)
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.short_name() == name)
    }
}

impl Default for ElementKind {
    fn default() -> Self {
        ElementKind::Other
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ElementKind {
    type Err = SnapshotError;

    /// Accepts the tag name, the short name or the raw code.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Self::from_type_name(trimmed)
            .or_else(|| Self::from_short_name(trimmed))
            .or_else(|| trimmed.parse::<u32>().ok().and_then(Self::from_raw))
            .ok_or_else(|| SnapshotError::UnknownElementKind(raw.to_string()))
    }
}

impl Serialize for ElementKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.type_name())
    }
}

impl<'de> Deserialize<'de> for ElementKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KindVisitor;

        impl<'de> Visitor<'de> for KindVisitor {
            type Value = ElementKind;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an element type name or raw element type code")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ElementKind, E> {
                value.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<ElementKind, E> {
                u32::try_from(value)
                    .ok()
                    .and_then(ElementKind::from_raw)
                    .ok_or_else(|| E::custom(format!("unknown element type code {value}")))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<ElementKind, E> {
                u64::try_from(value)
                    .map_err(|_| E::custom(format!("unknown element type code {value}")))
                    .and_then(|raw| self.visit_u64(raw))
            }
        }

        deserializer.deserialize_any(KindVisitor)
    }
}
