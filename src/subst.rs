//! Variable substitution over eval expressions.
//!
//! An attribute URI may carry a `key=value;...` prefix whose pairs are
//! substituted into the expression when the canonical (complete) form is
//! built. Substitution is textual but context-aware: quoted literal spans
//! and brace-delimited attribute references pass through untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::error::ScanError;
use crate::grammar::is_word;
use crate::scanner::{quoted_spans, scan_balanced};

/// A substitution mapping parsed from a semicolon-joined `key=value` string.
///
/// Keys are identifier tokens (`[A-Za-z_][A-Za-z0-9_]*`); values run until
/// the next `?`, `#`, `=` or `;`. Text that matches neither contributes no
/// pair, and a later duplicate key overwrites an earlier one.
///
/// # Examples
///
/// ```
/// use eval_uri::Substitutions;
///
/// let subst = Substitutions::parse("a=2;b=3");
/// assert_eq!(subst.get("a"), Some("2"));
/// assert_eq!(subst.len(), 2);
/// assert_eq!(subst.apply("a+b"), "2+3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Substitutions {
    map: BTreeMap<String, String>,
}

impl Substitutions {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts `identifier=value` pairs from a semicolon-joined string.
    ///
    /// Parsing is lenient by design: fragments that do not form a pair are
    /// skipped, so any string is accepted.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut map = BTreeMap::new();
        let chars: Vec<(usize, char)> = input.char_indices().collect();
        let mut i = 0;
        while i < chars.len() {
            let (pos, c) = chars[i];
            let prev_blocks = i > 0 && {
                let p = chars[i - 1].1;
                is_word(p) || p == '.'
            };
            if !prev_blocks && (c.is_ascii_alphabetic() || c == '_') {
                let mut j = i + 1;
                while j < chars.len() && is_word(chars[j].1) {
                    j += 1;
                }
                if j < chars.len() && chars[j].1 == '=' {
                    let mut k = j + 1;
                    while k < chars.len() && !matches!(chars[k].1, '?' | '#' | '=' | ';') {
                        k += 1;
                    }
                    if k > j + 1 {
                        let key = input[pos..chars[j].0].to_string();
                        let value_start = chars[j + 1].0;
                        let value_end = chars.get(k).map_or(input.len(), |&(p, _)| p);
                        map.insert(key, input[value_start..value_end].to_string());
                        i = k;
                        continue;
                    }
                }
                i = j;
            } else {
                i += 1;
            }
        }
        Self { map }
    }

    /// Returns the replacement for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Returns true if no pairs were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns an iterator over the pairs, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expands `expr` by substituting every key by its value.
    ///
    /// Three passes: quoted literal spans are swapped for content-derived
    /// placeholders, whole-word key occurrences outside brace references are
    /// replaced, and the placeholders are restored. Keys are applied longest
    /// first (ties lexicographic), so output is deterministic even when a
    /// replacement value collides with another key's text.
    ///
    /// # Examples
    ///
    /// ```
    /// use eval_uri::Substitutions;
    ///
    /// let subst = Substitutions::parse("a=2");
    /// assert_eq!(subst.apply("\"a\"+a"), "\"a\"+2");
    /// assert_eq!(subst.apply("{a}+a"), "{a}+2");
    /// ```
    #[must_use]
    pub fn apply(&self, expr: &str) -> String {
        let mut ret = expr.to_string();

        let mut protected = Vec::new();
        for span in quoted_spans(expr) {
            let placeholder = placeholder_for(span);
            ret = ret.replace(span, &placeholder);
            protected.push((placeholder, span));
        }

        for (key, value) in self.application_order() {
            ret = substitute_word(&ret, key, value);
        }

        for (placeholder, span) in protected {
            ret = ret.replace(&placeholder, span);
        }
        ret
    }

    fn application_order(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self
            .map
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        pairs
    }
}

impl fmt::Display for Substitutions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .map
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}", pairs.join(";"))
    }
}

/// Expands `expr` by substituting all pairs parsed from `substitutions`.
///
/// Convenience for [`Substitutions::parse`] followed by
/// [`Substitutions::apply`].
///
/// # Examples
///
/// ```
/// use eval_uri::expand;
///
/// assert_eq!(expand("a+b", "a=2;b=3"), "2+3");
/// ```
#[must_use]
pub fn expand(expr: &str, substitutions: &str) -> String {
    Substitutions::parse(substitutions).apply(expr)
}

/// Finds the attribute references (outermost brace-delimited bodies) in an
/// eval expression, in left-to-right order.
///
/// # Errors
///
/// Returns [`ScanError`] if the braces in `expr` do not balance.
///
/// # Examples
///
/// ```
/// use eval_uri::references;
///
/// assert_eq!(references("{x}+{y}").unwrap(), vec!["x", "y"]);
/// ```
pub fn references(expr: &str) -> Result<Vec<String>, ScanError> {
    scan_balanced(expr, '{', '}', None)
}

/// Placeholder with a word-character alphabet, so no whole-word key match
/// can land inside it.
fn placeholder_for(span: &str) -> String {
    let mut hasher = DefaultHasher::new();
    span.hash(&mut hasher);
    format!("__q{:016x}__", hasher.finish())
}

/// Replaces whole-word occurrences of `key` that are not inside a brace
/// reference. Boundary and reference checks look at the source text, as a
/// regex lookaround would.
fn substitute_word(text: &str, key: &str, value: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        let matches_here = text[i..].starts_with(key)
            && text[..i].chars().next_back().is_none_or(|c| !is_word(c))
            && text[i + key.len()..]
                .chars()
                .next()
                .is_none_or(|c| !is_word(c))
            && !inside_reference(&text[i + key.len()..]);
        if matches_here {
            out.push_str(value);
            i += key.len();
        } else if let Some(c) = text[i..].chars().next() {
            out.push(c);
            i += c.len_utf8();
        } else {
            break;
        }
    }
    out
}

/// True if the text that follows a candidate match closes a reference
/// before opening one, i.e. the match sits inside `{...}`.
fn inside_reference(tail: &str) -> bool {
    for c in tail.chars() {
        match c {
            '}' => return true,
            '{' => return false,
            _ => {}
        }
    }
    false
}
