//! Error types for eval URI parsing and object resolution.

use thiserror::Error;

use crate::grammar::Element;

/// Errors from the balanced-token scanner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The start and end markers are the same character.
    #[error("start delimiter must be different from end delimiter (both are '{0}')")]
    EqualDelimiters(char),
    /// The delimiter counts in the input do not match.
    #[error("non-matching delimiters ({starts} '{start}' vs {ends} '{end}')")]
    UnbalancedDelimiters {
        /// The start marker.
        start: char,
        /// Occurrences of the start marker.
        starts: usize,
        /// The end marker.
        end: char,
        /// Occurrences of the end marker.
        ends: usize,
    },
    /// A start marker has no closing partner after it, even though the
    /// overall counts match (e.g. `"}{"`).
    #[error("token opened at byte {position} is never closed")]
    UnterminatedToken {
        /// Byte offset of the unmatched start marker.
        position: usize,
    },
}

/// A name failed structural or semantic validation.
///
/// Carries the raw input so resolution failures always identify the
/// offending name string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {element} name '{input}': {kind}")]
pub struct InvalidNameError {
    /// The raw name that failed to parse.
    pub input: String,
    /// Which grammar rejected it.
    pub element: Element,
    /// The specific failure.
    pub kind: InvalidNameKind,
}

/// Specific reasons a name can be invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidNameKind {
    /// The name is empty.
    #[error("name is empty")]
    Empty,
    /// The scheme is not `eval` or `evaluation`.
    #[error("expected scheme 'eval' or 'evaluation'")]
    InvalidScheme {
        /// The scheme that was found, if any.
        found: Option<String>,
    },
    /// The name matches neither the strict nor the legacy grammar (or not
    /// the pinned one).
    #[error("name matches neither the strict nor the legacy grammar")]
    NoMatch,
    /// A `;` appears in the expression outside quoted spans and references.
    #[error("';' is not allowed in the expression outside quotes and references")]
    StraySeparator,
    /// The expression contains unbalanced reference braces.
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// A brace-delimited reference is not itself a valid attribute name.
    #[error("reference '{reference}' is not a valid attribute name")]
    InvalidReference {
        /// The offending reference body.
        reference: String,
    },
}

/// A dotted evaluator class named in a URI cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("evaluator class '{class}' is not registered")]
pub struct ClassLoadError {
    /// The dotted class name that was requested.
    pub class: String,
}

/// Errors surfaced by [`EvalFactory`](crate::EvalFactory) resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// The name failed grammar validation.
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),
    /// A dotted evaluator class could not be loaded.
    #[error(transparent)]
    ClassLoad(#[from] ClassLoadError),
    /// A second, distinct instance tried to register under a name already
    /// bound to a different live instance.
    #[error("{element} '{fullname}' is already registered to a different instance")]
    DoubleRegistration {
        /// Which cache detected the collision.
        element: Element,
        /// The canonical full name both instances claimed.
        fullname: String,
    },
}
