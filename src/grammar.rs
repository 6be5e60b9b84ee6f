//! Shared machinery for the three eval name grammars.
//!
//! Each grammar parses under two mutually exclusive modes: the strict,
//! RFC-conformant syntax and a legacy syntax kept for backward
//! compatibility. A name is always tried against the strict grammar first;
//! the legacy grammar is attempted only on strict failure, so strict-form
//! names are never misparsed as legacy.

use std::fmt;

use crate::constants::{SCHEME, SCHEME_LONG};
use crate::error::InvalidNameKind;

/// Which grammar matched a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GrammarMode {
    /// The modern, RFC-conformant syntax.
    Strict,
    /// The backward-compatible historical syntax.
    Legacy,
}

impl GrammarMode {
    /// Returns true for [`GrammarMode::Strict`].
    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// The three kinds of named elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    /// Top-level scope of a name.
    Authority,
    /// Named container grouping computed attributes.
    Device,
    /// Expression-valued computed data point.
    Attribute,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Authority => "authority",
            Self::Device => "device",
            Self::Attribute => "attribute",
        };
        write!(f, "{s}")
    }
}

/// The three canonical renderings of a parsed name.
///
/// `complete` always embeds scheme + authority + device (+ attribute);
/// `normal` omits defaulted segments; `short` is the barest spelling (for
/// attributes, the raw unexpanded expression).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanonicalName {
    /// Fully qualified form; re-parsing it is stable.
    pub complete: String,
    /// Form with defaulted segments omitted.
    pub normal: String,
    /// Shortest form.
    pub short: String,
}

/// Splits and checks the scheme, returning `(scheme, rest)`.
pub(crate) fn split_scheme(input: &str) -> Result<(&str, &str), InvalidNameKind> {
    if input.is_empty() {
        return Err(InvalidNameKind::Empty);
    }
    let Some(colon) = input.find(':') else {
        return Err(InvalidNameKind::InvalidScheme { found: None });
    };
    let scheme = &input[..colon];
    if scheme == SCHEME || scheme == SCHEME_LONG {
        Ok((scheme, &input[colon + 1..]))
    } else {
        Err(InvalidNameKind::InvalidScheme {
            found: Some(scheme.to_string()),
        })
    }
}

/// `[A-Za-z0-9_]`.
pub(crate) fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// An evaluator instance token: non-empty, free of `/ ? # : . =`.
pub(crate) fn is_instance_token(s: &str) -> bool {
    !s.is_empty() && !s.contains(['/', '?', '#', ':', '.', '='])
}

/// A dotted `module.Class` token: two or more word-character segments.
pub(crate) fn is_class_token(s: &str) -> bool {
    let mut segments = 0;
    for segment in s.split('.') {
        if segment.is_empty() || !segment.chars().all(is_word) {
            return false;
        }
        segments += 1;
    }
    segments >= 2
}

/// Splits the leading `key=value;` pairs off an attribute body, returning
/// the byte offset where the expression starts. Pairs must be contiguous
/// from the start; the first non-pair character ends the prefix.
pub(crate) fn subst_prefix_len(body: &str) -> usize {
    let chars: Vec<(usize, char)> = body.char_indices().collect();
    let mut p = 0; // index into chars
    let mut end = 0; // byte offset of the accepted prefix
    loop {
        let Some(&(_, c)) = chars.get(p) else { break };
        if !(c.is_ascii_alphabetic() || c == '_') {
            break;
        }
        let mut j = p + 1;
        while chars.get(j).is_some_and(|&(_, c)| is_word(c)) {
            j += 1;
        }
        if chars.get(j).map(|&(_, c)| c) != Some('=') {
            break;
        }
        let mut k = j + 1;
        while chars
            .get(k)
            .is_some_and(|&(_, c)| !matches!(c, '?' | '#' | '=' | ';'))
        {
            k += 1;
        }
        if k == j + 1 || chars.get(k).map(|&(_, c)| c) != Some(';') {
            break;
        }
        end = chars.get(k + 1).map_or(body.len(), |&(pos, _)| pos);
        p = k + 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_accepts_both_spellings() {
        assert_eq!(split_scheme("eval:x").unwrap(), ("eval", "x"));
        assert_eq!(split_scheme("evaluation:x").unwrap(), ("evaluation", "x"));
    }

    #[test]
    fn scheme_rejects_others() {
        assert!(matches!(
            split_scheme("tango:x"),
            Err(InvalidNameKind::InvalidScheme { found: Some(s) }) if s == "tango"
        ));
        assert!(matches!(
            split_scheme("no-colon"),
            Err(InvalidNameKind::InvalidScheme { found: None })
        ));
        assert!(matches!(split_scheme(""), Err(InvalidNameKind::Empty)));
    }

    #[test]
    fn instance_token_charset() {
        assert!(is_instance_token("myeval"));
        assert!(is_instance_token("my-eval 1"));
        assert!(!is_instance_token("my.eval"));
        assert!(!is_instance_token("my=eval"));
        assert!(!is_instance_token(""));
    }

    #[test]
    fn class_token_shape() {
        assert!(is_class_token("mymod.MyClass"));
        assert!(is_class_token("pkg.sub.Class"));
        assert!(!is_class_token("noclass"));
        assert!(!is_class_token(".leading"));
        assert!(!is_class_token("a..b"));
        assert!(!is_class_token("a.b-c"));
    }

    #[test]
    fn subst_prefix_stops_at_expression() {
        assert_eq!(subst_prefix_len("a=2;b=3;a+b"), 8);
        assert_eq!(subst_prefix_len("a+b"), 0);
        assert_eq!(subst_prefix_len("k=v"), 0); // no trailing ';' ends no pair
        assert_eq!(subst_prefix_len("a=2;"), 4);
    }

    #[test]
    fn element_display_is_lowercase() {
        assert_eq!(Element::Attribute.to_string(), "attribute");
    }
}
