//! Operator table and leaf resolution.
//!
//! A leaf is one `And`-separated piece of a predicate expression, such as
//! `NotNameLikeIgnoreCase`. Resolution strips, in this order, a leading
//! `Not`, a trailing `IgnoreCase` and a trailing operator keyword; what is
//! left is the attribute path.

use serde::{Deserialize, Serialize};

use crate::ast::{AttributePath, Condition};
use crate::error::CompileError;
use crate::lexer::Lexer;
use crate::token::{Keyword, Token, TokenKind};

/// Canonical comparison kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
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

impl Operator {
    pub fn from_keyword(keyword: Keyword) -> Option<Self> {
        let operator = match keyword {
            Keyword::Equal => Operator::Equal,
            Keyword::NotEqual => Operator::NotEqual,
            Keyword::LessThan => Operator::LessThan,
            Keyword::LessThanEquals => Operator::LessThanEquals,
            Keyword::GreaterThan => Operator::GreaterThan,
            Keyword::GreaterThanEquals => Operator::GreaterThanEquals,
            Keyword::Between => Operator::Between,
            Keyword::Like => Operator::Like,
            Keyword::NotLike => Operator::NotLike,
            Keyword::StartingWith => Operator::StartingWith,
            Keyword::EndingWith => Operator::EndingWith,
            Keyword::Containing => Operator::Containing,
            Keyword::In => Operator::In,
            Keyword::NotIn => Operator::NotIn,
            Keyword::IsNull => Operator::IsNull,
            Keyword::IsNotNull => Operator::IsNotNull,
            Keyword::Or
            | Keyword::And
            | Keyword::OrderBy
            | Keyword::Asc
            | Keyword::Desc
            | Keyword::Not
            | Keyword::IgnoreCase => return None,
        };
        Some(operator)
    }

    /// Number of bound parameters the operator consumes.
    pub fn arity(self) -> usize {
        match self {
            Operator::IsNull | Operator::IsNotNull => 0,
            Operator::Between => 2,
            _ => 1,
        }
    }

    /// Whether the single parameter is collection-valued.
    pub fn is_collection(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// `IgnoreCase` only makes sense on operators comparing strings.
    pub fn supports_ignore_case(self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::Like
                | Operator::NotLike
                | Operator::StartingWith
                | Operator::EndingWith
                | Operator::Containing
        )
    }

    /// Query-language symbol the operator renders as.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::LessThan => "<",
            Operator::LessThanEquals => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanEquals => ">=",
            Operator::Between => "between",
            Operator::Like | Operator::StartingWith | Operator::EndingWith | Operator::Containing => {
                "like"
            }
            Operator::NotLike => "not like",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::IsNull => "is null",
            Operator::IsNotNull => "is not null",
        }
    }
}

/// Resolves one leaf of a predicate expression into a [`Condition`].
pub fn resolve(leaf: &str) -> Result<Condition, CompileError> {
    let mut tokens: Vec<Token<'_>> = Lexer::new(leaf).collect();

    let negated = matches!(tokens.first(), Some(t) if t.kind.is_keyword(Keyword::Not));
    if negated {
        tokens.remove(0);
    }

    let ignore_case = matches!(tokens.last(), Some(t) if t.kind.is_keyword(Keyword::IgnoreCase));
    if ignore_case {
        tokens.pop();
    }

    let operator = match tokens.last().map(|t| t.kind) {
        Some(TokenKind::Keyword(keyword)) => Operator::from_keyword(keyword),
        _ => None,
    };
    if operator.is_some() {
        tokens.pop();
    }
    let operator = operator.unwrap_or(Operator::Equal);

    if ignore_case && !operator.supports_ignore_case() {
        return Err(CompileError::malformed(
            leaf,
            format!("IgnoreCase cannot be combined with {:?}", operator),
        ));
    }

    let path = attribute_path(leaf, &tokens)?;
    Ok(Condition {
        path,
        operator,
        negated,
        ignore_case,
    })
}

/// Joins the remaining tokens back into path segments, cut at `_`.
fn attribute_path(leaf: &str, tokens: &[Token<'_>]) -> Result<AttributePath, CompileError> {
    if tokens.is_empty() {
        return Err(CompileError::unknown_attribute(
            leaf,
            "no attribute in front of the operator keyword",
        ));
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    for token in tokens {
        match token.kind {
            TokenKind::PathSeparator => segments.push(std::mem::take(&mut current)),
            _ => current.push_str(&leaf[token.span.start..token.span.end]),
        }
    }
    segments.push(current);

    if segments.iter().any(String::is_empty) {
        return Err(CompileError::unknown_attribute(leaf, "empty attribute path segment"));
    }

    Ok(AttributePath(
        segments.iter().map(|s| decapitalize(s)).collect(),
    ))
}

fn decapitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
