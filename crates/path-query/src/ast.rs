/// Parsed path-query expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Path(LocationPath),
    /// Primary expression with predicates and an optional path continuation,
    /// e.g. `(//Button)[2]/..`.
    Filter {
        base: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Union(Box<Expr>, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Call(Function, Vec<Expr>),
    Literal(String),
    Number(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    /// The implicit `descendant-or-self::node()` step behind `//`.
    pub(crate) fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    SelfNode,
    Attribute,
}

impl Axis {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            "self" => Axis::SelfNode,
            "attribute" => Axis::Attribute,
            _ => return None,
        })
    }

    /// Reverse axes number their nodes nearest-first for predicates.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent
                | Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::PrecedingSibling
                | Axis::Preceding
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeTest {
    Name(String),
    Wildcard,
    Node,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Core function library. Names and arities are checked while parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    Position,
    Last,
    Count,
    Not,
    True,
    False,
    Boolean,
    Contains,
    StartsWith,
    String,
    StringLength,
    NormalizeSpace,
    Concat,
    Substring,
    Translate,
    Number,
    Name,
    LocalName,
}

impl Function {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "position" => Function::Position,
            "last" => Function::Last,
            "count" => Function::Count,
            "not" => Function::Not,
            "true" => Function::True,
            "false" => Function::False,
            "boolean" => Function::Boolean,
            "contains" => Function::Contains,
            "starts-with" => Function::StartsWith,
            "string" => Function::String,
            "string-length" => Function::StringLength,
            "normalize-space" => Function::NormalizeSpace,
            "concat" => Function::Concat,
            "substring" => Function::Substring,
            "translate" => Function::Translate,
            "number" => Function::Number,
            "name" => Function::Name,
            "local-name" => Function::LocalName,
            _ => return None,
        })
    }

    /// Accepted argument counts, inclusive; `None` means unbounded.
    pub(crate) fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::Position | Function::Last | Function::True | Function::False => (0, Some(0)),
            Function::Count | Function::Not | Function::Boolean => (1, Some(1)),
            Function::Contains | Function::StartsWith => (2, Some(2)),
            Function::String
            | Function::StringLength
            | Function::NormalizeSpace
            | Function::Number
            | Function::Name
            | Function::LocalName => (0, Some(1)),
            Function::Concat => (2, None),
            Function::Substring => (2, Some(3)),
            Function::Translate => (3, Some(3)),
        }
    }
}
