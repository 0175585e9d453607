//! The token definition for the method-name grammar.

/// A token is a single unit of a predicate expression, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// A reserved keyword, matched on whole camel-case words.
    Keyword(Keyword),
    /// A run of words that are not a keyword, e.g. `FirstName`.
    Fragment(&'a str),
    /// `_` between the segments of a nested attribute path.
    PathSeparator,
}

impl<'a> TokenKind<'a> {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, TokenKind::Keyword(k) if *k == keyword)
    }
}

/// Reserved words of the grammar.
///
/// Each keyword is a sequence of camel-case words. Matching compares whole
/// words, so `Orange` never matches `Or` and `Description` never matches `Desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Structure
    Or,
    And,
    OrderBy,
    Asc,
    Desc,

    // Modifiers
    Not,
    IgnoreCase,

    // Operators
    Equal,
    NotEqual,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
    Between,
    Like,
    NotLike,
    StartingWith,
    EndingWith,
    Containing,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Keyword {
    /// All keywords, longest word sequence first so a scan over this slice is
    /// a greedy-longest match.
    pub const ALL: &'static [Keyword] = &[
        Keyword::LessThanEquals,
        Keyword::GreaterThanEquals,
        Keyword::IsNotNull,
        Keyword::OrderBy,
        Keyword::IgnoreCase,
        Keyword::NotEqual,
        Keyword::LessThan,
        Keyword::GreaterThan,
        Keyword::NotLike,
        Keyword::StartingWith,
        Keyword::EndingWith,
        Keyword::NotIn,
        Keyword::IsNull,
        Keyword::Or,
        Keyword::And,
        Keyword::Asc,
        Keyword::Desc,
        Keyword::Not,
        Keyword::Equal,
        Keyword::Between,
        Keyword::Like,
        Keyword::Containing,
        Keyword::In,
    ];

    /// The camel-case words this keyword is spelled with.
    pub fn words(self) -> &'static [&'static str] {
        match self {
            Keyword::Or => &["Or"],
            Keyword::And => &["And"],
            Keyword::OrderBy => &["Order", "By"],
            Keyword::Asc => &["Asc"],
            Keyword::Desc => &["Desc"],
            Keyword::Not => &["Not"],
            Keyword::IgnoreCase => &["Ignore", "Case"],
            Keyword::Equal => &["Equal"],
            Keyword::NotEqual => &["Not", "Equal"],
            Keyword::LessThan => &["Less", "Than"],
            Keyword::LessThanEquals => &["Less", "Than", "Equals"],
            Keyword::GreaterThan => &["Greater", "Than"],
            Keyword::GreaterThanEquals => &["Greater", "Than", "Equals"],
            Keyword::Between => &["Between"],
            Keyword::Like => &["Like"],
            Keyword::NotLike => &["Not", "Like"],
            Keyword::StartingWith => &["Starting", "With"],
            Keyword::EndingWith => &["Ending", "With"],
            Keyword::Containing => &["Containing"],
            Keyword::In => &["In"],
            Keyword::NotIn => &["Not", "In"],
            Keyword::IsNull => &["Is", "Null"],
            Keyword::IsNotNull => &["Is", "Not", "Null"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Or => "Or",
            Keyword::And => "And",
            Keyword::OrderBy => "OrderBy",
            Keyword::Asc => "Asc",
            Keyword::Desc => "Desc",
            Keyword::Not => "Not",
            Keyword::IgnoreCase => "IgnoreCase",
            Keyword::Equal => "Equal",
            Keyword::NotEqual => "NotEqual",
            Keyword::LessThan => "LessThan",
            Keyword::LessThanEquals => "LessThanEquals",
            Keyword::GreaterThan => "GreaterThan",
            Keyword::GreaterThanEquals => "GreaterThanEquals",
            Keyword::Between => "Between",
            Keyword::Like => "Like",
            Keyword::NotLike => "NotLike",
            Keyword::StartingWith => "StartingWith",
            Keyword::EndingWith => "EndingWith",
            Keyword::Containing => "Containing",
            Keyword::In => "In",
            Keyword::NotIn => "NotIn",
            Keyword::IsNull => "IsNull",
            Keyword::IsNotNull => "IsNotNull",
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
