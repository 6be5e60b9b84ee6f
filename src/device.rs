//! Device name grammar.

use std::fmt;
use std::str::FromStr;

use crate::constants::{DEFAULT_AUTHORITY, SCHEME};
use crate::error::{InvalidNameError, InvalidNameKind};
use crate::grammar::{
    is_class_token, is_instance_token, split_scheme, CanonicalName, Element, GrammarMode,
};

/// The evaluator named by a device token, without its `@` prefix.
///
/// A bare name selects a named instance of the default implementation; a
/// dotted `module.Class` token requests that class to be loaded as the
/// device implementation. Exactly one of the two shapes applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvaluatorRef {
    /// A bare instance name, e.g. `@myeval`.
    Instance(String),
    /// A dotted class path to load, e.g. `@mymod.MyEvaluator`.
    Class(String),
}

impl EvaluatorRef {
    /// Parses a device token (without the `@`).
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        if is_instance_token(token) {
            Some(Self::Instance(token.to_string()))
        } else if is_class_token(token) {
            Some(Self::Class(token.to_string()))
        } else {
            None
        }
    }

    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Instance(s) | Self::Class(s) => s,
        }
    }

    /// Returns true for the dotted class shape.
    #[must_use]
    pub const fn is_class(&self) -> bool {
        matches!(self, Self::Class(_))
    }
}

impl fmt::Display for EvaluatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed eval device name.
///
/// ```
/// use eval_uri::{DeviceName, EvaluatorRef, GrammarMode};
///
/// let name = DeviceName::parse("eval://localhost/@myeval").unwrap();
/// assert_eq!(name.evaluator(), &EvaluatorRef::Instance("myeval".into()));
/// assert_eq!(name.canonical_forms().complete, "eval://localhost/@myeval");
///
/// // Legacy spelling, same identity.
/// let legacy = DeviceName::parse("eval://dev=myeval").unwrap();
/// assert_eq!(legacy.mode(), GrammarMode::Legacy);
/// assert_eq!(legacy.canonical_forms(), name.canonical_forms());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceName {
    scheme: String,
    authority: Option<String>,
    evaluator: EvaluatorRef,
    db_name: Option<String>,
    subst: Option<String>,
    mode: GrammarMode,
}

impl DeviceName {
    /// Parses a device name, trying the strict grammar first and the legacy
    /// grammar only on strict failure.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidNameError`] if the name matches neither grammar.
    pub fn parse(input: &str) -> Result<Self, InvalidNameError> {
        Self::parse_inner(input, None)
    }

    /// Parses against a single pinned grammar mode.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidNameError`] if the name does not match the pinned
    /// grammar.
    pub fn parse_pinned(input: &str, mode: GrammarMode) -> Result<Self, InvalidNameError> {
        Self::parse_inner(input, Some(mode))
    }

    /// Returns true if `input` parses under either grammar.
    #[must_use]
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Returns true if `input` parses under the pinned grammar mode.
    #[must_use]
    pub fn is_valid_pinned(input: &str, mode: GrammarMode) -> bool {
        Self::parse_pinned(input, mode).is_ok()
    }

    fn parse_inner(input: &str, pin: Option<GrammarMode>) -> Result<Self, InvalidNameError> {
        let (scheme, rest) = split_scheme(input).map_err(|kind| invalid(input, kind))?;

        if pin != Some(GrammarMode::Legacy) {
            if let Some(parsed) = Self::parse_strict(scheme, rest) {
                return Ok(parsed);
            }
        }
        if pin != Some(GrammarMode::Strict) {
            if let Some(parsed) = Self::parse_legacy(scheme, rest) {
                return Ok(parsed);
            }
        }
        Err(invalid(input, InvalidNameKind::NoMatch))
    }

    /// `eval:[//localhost][/]@<token>` with no query and no fragment.
    fn parse_strict(scheme: &str, rest: &str) -> Option<Self> {
        if rest.contains(['?', '#']) {
            return None;
        }
        let (authority, path) = match rest.strip_prefix(DEFAULT_AUTHORITY) {
            Some(path) => (Some(DEFAULT_AUTHORITY.to_string()), path),
            None => (None, rest),
        };
        if path.starts_with("//") {
            return None;
        }
        let path = path.strip_prefix('/').unwrap_or(path);
        let token = path.strip_prefix('@')?;
        let evaluator = EvaluatorRef::parse(token)?;
        Some(Self {
            scheme: scheme.to_string(),
            authority,
            evaluator,
            db_name: None,
            subst: None,
            mode: GrammarMode::Strict,
        })
    }

    /// `eval://[db=<name>;]dev=<token>[?<subst>]`, the `?<subst>` query not
    /// beginning with `configuration=`.
    fn parse_legacy(scheme: &str, rest: &str) -> Option<Self> {
        let body = rest.strip_prefix("//")?;

        let (db_name, body) = match body.strip_prefix("db=") {
            Some(after) => {
                let semi = after.find(';')?;
                let db = &after[..semi];
                if db.is_empty() || db.contains(['?', '#']) {
                    return None;
                }
                (Some(db.to_string()), &after[semi + 1..])
            }
            None => (None, body),
        };

        let body = body.strip_prefix("dev=")?;
        let (token, subst) = match body.find('?') {
            Some(q) => {
                let subst = &body[q + 1..];
                if subst.contains(['?', '#']) || subst.starts_with("configuration=") {
                    return None;
                }
                (&body[..q], Some(subst.to_string()))
            }
            None => (body, None),
        };
        let evaluator = EvaluatorRef::parse(token)?;
        Some(Self {
            scheme: scheme.to_string(),
            authority: None,
            evaluator,
            db_name,
            subst,
            mode: GrammarMode::Legacy,
        })
    }

    /// The scheme as written (`eval` or `evaluation`).
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The authority segment, if the URI carried one.
    #[must_use]
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// The parsed evaluator token.
    #[must_use]
    pub fn evaluator(&self) -> &EvaluatorRef {
        &self.evaluator
    }

    /// The legacy `db=` segment, if present.
    #[must_use]
    pub fn db_name(&self) -> Option<&str> {
        self.db_name.as_deref()
    }

    /// The legacy substitution query, retained for compatibility but
    /// otherwise ignored by this grammar.
    #[must_use]
    pub fn subst(&self) -> Option<&str> {
        self.subst.as_deref()
    }

    /// Which grammar matched.
    #[must_use]
    pub fn mode(&self) -> GrammarMode {
        self.mode
    }

    /// The `@`-prefixed device segment.
    #[must_use]
    pub fn devname(&self) -> String {
        format!("@{}", self.evaluator.as_str())
    }

    /// The canonical renderings, with the default authority substituted
    /// when the URI omitted it.
    #[must_use]
    pub fn canonical_forms(&self) -> CanonicalName {
        let authority = self.authority.as_deref().unwrap_or(DEFAULT_AUTHORITY);
        let devname = self.devname();
        CanonicalName {
            complete: format!("{SCHEME}:{authority}/{devname}"),
            short: self.evaluator.as_str().to_string(),
            normal: devname,
        }
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_forms().complete)
    }
}

impl FromStr for DeviceName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn invalid(input: &str, kind: InvalidNameKind) -> InvalidNameError {
    InvalidNameError {
        input: input.to_string(),
        element: Element::Device,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_bare_device() {
        let name = DeviceName::parse("eval:@foo").unwrap();
        assert_eq!(name.mode(), GrammarMode::Strict);
        assert_eq!(name.authority(), None);
        assert_eq!(name.evaluator(), &EvaluatorRef::Instance("foo".into()));
    }

    #[test]
    fn strict_with_authority_and_slash() {
        for input in ["eval://localhost/@foo", "eval:/@foo"] {
            let name = DeviceName::parse(input).unwrap();
            assert_eq!(name.devname(), "@foo");
            assert_eq!(name.canonical_forms().complete, "eval://localhost/@foo");
        }
    }

    #[test]
    fn strict_dotted_class() {
        let name = DeviceName::parse("eval:@mymod.MyEvaluator").unwrap();
        assert!(name.evaluator().is_class());
        assert_eq!(name.canonical_forms().short, "mymod.MyEvaluator");
    }

    #[test]
    fn legacy_dev_segment() {
        let name = DeviceName::parse("eval://dev=foo").unwrap();
        assert_eq!(name.mode(), GrammarMode::Legacy);
        assert_eq!(name.devname(), "@foo");
    }

    #[test]
    fn legacy_db_and_subst_are_retained() {
        let name = DeviceName::parse("eval://db=mydb;dev=foo?a=1;b=2").unwrap();
        assert_eq!(name.db_name(), Some("mydb"));
        assert_eq!(name.subst(), Some("a=1;b=2"));
        assert_eq!(name.canonical_forms().complete, "eval://localhost/@foo");
    }

    #[test]
    fn legacy_configuration_query_is_not_a_device() {
        assert!(!DeviceName::is_valid("eval://dev=foo?configuration=label"));
    }

    #[test]
    fn legacy_and_strict_agree_on_canonical_forms() {
        let strict = DeviceName::parse("eval://localhost/@mymod.MyClass").unwrap();
        let legacy = DeviceName::parse("eval://dev=mymod.MyClass").unwrap();
        assert_eq!(strict.canonical_forms(), legacy.canonical_forms());
    }

    #[test]
    fn complete_form_reparses_strict() {
        let legacy = DeviceName::parse("eval://db=x;dev=foo").unwrap();
        let complete = legacy.canonical_forms().complete;
        let again = DeviceName::parse(&complete).unwrap();
        assert_eq!(again.mode(), GrammarMode::Strict);
        assert_eq!(again.canonical_forms().complete, complete);
    }

    #[test]
    fn rejects_missing_at() {
        assert!(!DeviceName::is_valid("eval:foo"));
    }

    #[test]
    fn rejects_bad_tokens() {
        assert!(!DeviceName::is_valid("eval:@"));
        assert!(!DeviceName::is_valid("eval:@a=b"));
        assert!(!DeviceName::is_valid("eval:@a.b-c"));
        assert!(!DeviceName::is_valid("eval:@.leading"));
    }

    #[test]
    fn rejects_query_and_fragment_in_strict() {
        assert!(!DeviceName::is_valid("eval:@foo?x=1"));
        assert!(!DeviceName::is_valid("eval:@foo#frag"));
    }

    #[test]
    fn rejects_double_slash_path() {
        assert!(!DeviceName::is_valid("eval://localhost//@foo"));
    }

    #[test]
    fn pinned_mode_is_exclusive() {
        assert!(DeviceName::parse_pinned("eval://dev=foo", GrammarMode::Strict).is_err());
        assert!(DeviceName::parse_pinned("eval:@foo", GrammarMode::Legacy).is_err());
    }
}
