//! Compile-time errors of the method-name compiler.

use thiserror::Error;

/// Failure to turn a method name into a query.
///
/// Both variants are a pure function of the input name: the same name always
/// fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The name cannot be cut into a non-empty predicate structure.
    #[error("malformed method name '{name}': {reason}")]
    MalformedName { name: String, reason: String },

    /// No attribute path is left once the recognised keywords are stripped.
    #[error("cannot derive an attribute from '{fragment}': {reason}")]
    UnknownAttributeSyntax { fragment: String, reason: String },
}

impl CompileError {
    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_attribute(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnknownAttributeSyntax {
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }
}
