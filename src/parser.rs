//! Builds the predicate tree from a method name.
//!
//! ## Parsing flow
//!
//! ```text
//! parse("findByNameOrTitleAndAgeOrderByAgeDesc")
//!   ├─ strip prefix ("findBy" / "findAll")       → "NameOrTitleAndAgeOrderByAgeDesc"
//!   ├─ split on OrderBy                          → "NameOrTitleAndAge" | "AgeDesc"
//!   │
//!   ├─ build()                                   (predicate)
//!   │    ├─ split on Or                          → "Name" | "TitleAndAge"
//!   │    └─ split each part on And               → ["Name"] ["Title", "Age"]
//!   │         └─ operator::resolve() per leaf    → Condition
//!   │
//!   └─ parse_order()                             → [age desc]
//! ```
//!
//! ## Precedence
//!
//! `Or` binds looser than `And`; the tree is always an OR of ANDs and no
//! deeper nesting can be expressed.

use tracing::trace;

use crate::ast::{AndGroup, AttributePath, Direction, MethodQuery, OrGroup, OrderSpec};
use crate::error::CompileError;
use crate::lexer::{split_by_keyword, Lexer};
use crate::operator;
use crate::token::{Keyword, TokenKind};

pub const DEFAULT_PREFIX: &str = "findBy";
pub const DEFAULT_FIND_ALL: &str = "findAll";

/// Parser for method names of the form `<prefix><predicate>[OrderBy<order>]`.
#[derive(Debug, Clone)]
pub struct Parser {
    prefix: String,
    find_all: String,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, DEFAULT_FIND_ALL)
    }
}

impl Parser {
    pub fn new(prefix: impl Into<String>, find_all: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            find_all: find_all.into(),
        }
    }

    /// Parses a full method name.
    pub fn parse(&self, method: &str) -> Result<MethodQuery, CompileError> {
        trace!(method, "parsing method name");

        let (find_all, rest) = self.remove_prefix(method)?;
        let (predicate, order) = split_order_clause(method, rest)?;

        if find_all && !predicate.is_empty() {
            return Err(CompileError::malformed(
                method,
                format!("'{}' takes no predicate, found '{}'", self.find_all, predicate),
            ));
        }

        let predicate = build(predicate).map_err(|e| with_method_name(e, method))?;
        let order = match order {
            Some(order) => parse_order(order).map_err(|e| with_method_name(e, method))?,
            None => Vec::new(),
        };

        Ok(MethodQuery { predicate, order })
    }

    /// Returns whether the name is a find-all name, and the remainder.
    fn remove_prefix<'m>(&self, method: &'m str) -> Result<(bool, &'m str), CompileError> {
        if let Some(rest) = method.strip_prefix(self.find_all.as_str()) {
            return Ok((true, rest));
        }
        if let Some(rest) = method.strip_prefix(self.prefix.as_str()) {
            return Ok((false, rest));
        }
        Err(CompileError::malformed(
            method,
            format!("expected prefix '{}' or '{}'", self.prefix, self.find_all),
        ))
    }
}

/// Splits off the `OrderBy` clause, if any.
fn split_order_clause<'m>(
    method: &str,
    rest: &'m str,
) -> Result<(&'m str, Option<&'m str>), CompileError> {
    match split_by_keyword(rest, Keyword::OrderBy).as_slice() {
        [predicate] => Ok((*predicate, None)),
        [_, ""] => Err(CompileError::malformed(method, "OrderBy without attribute")),
        [predicate, order] => Ok((*predicate, Some(*order))),
        _ => Err(CompileError::malformed(method, "OrderBy used more than once")),
    }
}

/// Builds the predicate tree from the expression following the prefix.
///
/// An empty expression gives an empty [`OrGroup`].
pub fn build(expression: &str) -> Result<OrGroup, CompileError> {
    if expression.is_empty() {
        return Ok(OrGroup::default());
    }

    let mut groups = Vec::new();
    for (index, or_part) in split_by_keyword(expression, Keyword::Or).into_iter().enumerate() {
        if or_part.is_empty() {
            return Err(CompileError::malformed(expression, "Or without a condition on both sides"));
        }
        groups.push(build_and_group(expression, or_part, index == 0)?);
    }

    Ok(OrGroup { groups })
}

fn build_and_group(expression: &str, or_part: &str, first: bool) -> Result<AndGroup, CompileError> {
    let mut conditions = Vec::new();
    for leaf in split_by_keyword(or_part, Keyword::And) {
        if leaf.is_empty() {
            return Err(CompileError::malformed(expression, "And without a condition on both sides"));
        }
        conditions.push(operator::resolve(leaf)?);
    }
    Ok(AndGroup { conditions, first })
}

/// Parses `AgeDescName` into `[age desc, name asc]`.
pub fn parse_order(expression: &str) -> Result<Vec<OrderSpec>, CompileError> {
    let mut specs = Vec::new();
    let mut start = 0;

    for token in Lexer::new(expression) {
        let direction = match token.kind {
            TokenKind::Keyword(Keyword::Asc) => Direction::Asc,
            TokenKind::Keyword(Keyword::Desc) => Direction::Desc,
            _ => continue,
        };
        specs.push(order_spec(&expression[start..token.span.start], direction)?);
        start = token.span.end;
    }
    if start < expression.len() {
        specs.push(order_spec(&expression[start..], Direction::Asc)?);
    }

    if specs.is_empty() {
        return Err(CompileError::malformed(expression, "OrderBy without attribute"));
    }
    Ok(specs)
}

fn order_spec(fragment: &str, direction: Direction) -> Result<OrderSpec, CompileError> {
    if fragment.is_empty() {
        return Err(CompileError::unknown_attribute(
            fragment,
            format!("sort direction '{}' without attribute", direction.as_str()),
        ));
    }
    let separator = Lexer::new(fragment).find_map(|token| match token.kind {
        TokenKind::Keyword(keyword @ (Keyword::Or | Keyword::And | Keyword::Not)) => Some(keyword),
        _ => None,
    });
    if let Some(keyword) = separator {
        return Err(CompileError::malformed(
            fragment,
            format!("'{keyword}' inside an OrderBy attribute"),
        ));
    }

    let path: AttributePath = operator::resolve(fragment)
        .and_then(|condition| {
            if condition.negated || condition.ignore_case || fragment_has_operator(fragment) {
                Err(CompileError::unknown_attribute(fragment, "operator keyword in OrderBy clause"))
            } else {
                Ok(condition.path)
            }
        })?;
    Ok(OrderSpec::new(path, direction))
}

fn fragment_has_operator(fragment: &str) -> bool {
    matches!(
        Lexer::new(fragment).last().map(|t| t.kind),
        Some(TokenKind::Keyword(keyword)) if operator::Operator::from_keyword(keyword).is_some()
    )
}

/// Reports malformed-name errors against the whole method name.
fn with_method_name(error: CompileError, method: &str) -> CompileError {
    match error {
        CompileError::MalformedName { reason, .. } => CompileError::malformed(method, reason),
        other => other,
    }
}
