//! Lexer for the predicate part of a method name.
//!
//! The input is first cut into camel-case words: a word starts at every
//! uppercase letter and every `_` is a word of its own. Keywords are then
//! matched greedily (longest word sequence first) on whole words only.

use crate::token::{Keyword, Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    words: Vec<Span>,
    /// Index of the next unconsumed word
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            words: split_words(input),
            position: 0,
        }
    }

    /// Returns the text of the word at `index`, if any
    fn word(&self, index: usize) -> Option<&'a str> {
        self.words
            .get(index)
            .map(|span| &self.input[span.start..span.end])
    }

    fn is_separator(&self, index: usize) -> bool {
        self.word(index) == Some("_")
    }

    /// Longest keyword whose words start at `index`
    fn match_keyword(&self, index: usize) -> Option<Keyword> {
        Keyword::ALL.iter().copied().find(|keyword| {
            keyword
                .words()
                .iter()
                .enumerate()
                .all(|(offset, expected)| self.word(index + offset) == Some(*expected))
        })
    }
}

/// Cuts `input` into camel-case words.
fn split_words(input: &str) -> Vec<Span> {
    let mut words = Vec::new();
    let mut start = 0;
    let mut previous = None;

    for (index, c) in input.char_indices() {
        let boundary = c.is_uppercase() || c == '_' || previous == Some('_');
        if boundary && index > start {
            words.push(Span::new(start, index));
            start = index;
        }
        previous = Some(c);
    }
    if start < input.len() {
        words.push(Span::new(start, input.len()));
    }
    words
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let span = *self.words.get(self.position)?;

        if self.is_separator(self.position) {
            self.position += 1;
            return Some(Token { kind: TokenKind::PathSeparator, span });
        }

        if let Some(keyword) = self.match_keyword(self.position) {
            let last = self.words[self.position + keyword.words().len() - 1];
            self.position += keyword.words().len();
            return Some(Token {
                kind: TokenKind::Keyword(keyword),
                span: Span::new(span.start, last.end),
            });
        }

        // Merge plain words until the next keyword or path separator
        let mut end = span.end;
        self.position += 1;
        while let Some(&next) = self.words.get(self.position) {
            if self.is_separator(self.position) || self.match_keyword(self.position).is_some() {
                break;
            }
            end = next.end;
            self.position += 1;
        }

        Some(Token {
            kind: TokenKind::Fragment(&self.input[span.start..end]),
            span: Span::new(span.start, end),
        })
    }
}

/// Splits `expression` at every occurrence of `keyword` used as a separator.
///
/// An expression without such an occurrence comes back as a single element.
/// Parts on either side of a separator may be empty (`"NameOr"` gives
/// `["Name", ""]`); rejecting those is up to the caller.
pub fn split_by_keyword(expression: &str, keyword: Keyword) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;

    for token in Lexer::new(expression) {
        if token.kind.is_keyword(keyword) {
            parts.push(&expression[start..token.span.start]);
            start = token.span.end;
        }
    }
    parts.push(&expression[start..]);
    parts
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // Capitalised words that never collide with a keyword word
    fn plain_word() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,8}".prop_filter("not a keyword word", |w| {
            !Keyword::ALL
                .iter()
                .any(|k| k.words().iter().any(|kw| kw == w))
        })
    }

    proptest! {
        #[test]
        fn split_recovers_joined_parts(parts in prop::collection::vec(plain_word(), 1..6)) {
            let expression = parts.join("Or");
            let split = split_by_keyword(&expression, Keyword::Or);
            prop_assert_eq!(split, parts.iter().map(String::as_str).collect::<Vec<_>>());
        }

        #[test]
        fn plain_words_lex_to_one_fragment(words in prop::collection::vec(plain_word(), 1..4)) {
            let expression = words.concat();
            let kinds: Vec<_> = Lexer::new(&expression).map(|t| t.kind).collect();
            prop_assert_eq!(kinds, vec![TokenKind::Fragment(expression.as_str())]);
        }
    }
}
