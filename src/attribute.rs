//! Attribute name grammar.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::constants::{DEFAULT_AUTHORITY, DEFAULT_DEVICE, SCHEME};
use crate::device::EvaluatorRef;
use crate::error::{InvalidNameError, InvalidNameKind};
use crate::grammar::{split_scheme, subst_prefix_len, CanonicalName, Element, GrammarMode};
use crate::scanner::{scan_balanced, strip_quoted};
use crate::subst::{expand, references};

/// A parsed eval attribute name.
///
/// The attribute segment is an expression, optionally preceded by a
/// `key=value;...` substitution prefix and a `@device/` segment, and
/// optionally followed by a `#cfgkey` configuration fragment. The
/// expression may embed `{...}` attribute references and quoted literal
/// spans.
///
/// ```
/// use eval_uri::AttributeName;
///
/// let name = AttributeName::parse("eval://localhost/@myeval/a=2;b=3;a+b").unwrap();
/// assert_eq!(name.expr(), "a+b");
/// assert_eq!(name.subst(), Some("a=2;b=3"));
/// assert_eq!(
///     name.canonical_forms().complete,
///     "eval://localhost/@myeval/2+3"
/// );
/// assert_eq!(name.canonical_forms().short, "a+b");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeName {
    scheme: String,
    authority: Option<String>,
    devname: Option<String>,
    db_name: Option<String>,
    subst: Option<String>,
    expr: String,
    cfg_key: Option<String>,
    mode: GrammarMode,
}

/// Structural fields shared by the two mode parsers.
struct Parts {
    authority: Option<String>,
    devname: Option<String>,
    db_name: Option<String>,
    subst: Option<String>,
    expr: String,
    cfg_key: Option<String>,
}

impl AttributeName {
    /// Parses an attribute name, trying the strict grammar first and the
    /// legacy grammar only on strict failure.
    ///
    /// Structural matching is followed by the separator check: once quoted
    /// spans and reference bodies are stripped, no `;` may remain in the
    /// expression.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidNameError`] if the name matches neither grammar
    /// ([`InvalidNameKind::NoMatch`]), if the expression braces do not
    /// balance ([`InvalidNameKind::Scan`]), or if a stray `;` survives
    /// sanitization ([`InvalidNameKind::StraySeparator`]).
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

    /// Returns true if `input` parses and every `{...}` reference in its
    /// expression and substitution segment is itself a valid attribute name
    /// (checked recursively).
    #[must_use]
    pub fn is_valid(input: &str) -> bool {
        Self::validity(input, None).is_ok()
    }

    /// [`AttributeName::is_valid`] against a single pinned grammar mode.
    #[must_use]
    pub fn is_valid_pinned(input: &str, mode: GrammarMode) -> bool {
        Self::validity(input, Some(mode)).is_ok()
    }

    fn parse_inner(input: &str, pin: Option<GrammarMode>) -> Result<Self, InvalidNameError> {
        let (scheme, rest) = split_scheme(input).map_err(|kind| invalid(input, kind))?;

        let (parts, mode) = if pin != Some(GrammarMode::Legacy)
            && let Some(parts) = Self::parse_strict(rest)
        {
            (parts, GrammarMode::Strict)
        } else if pin != Some(GrammarMode::Strict)
            && let Some(parts) = Self::parse_legacy(rest)
        {
            (parts, GrammarMode::Legacy)
        } else {
            return Err(invalid(input, InvalidNameKind::NoMatch));
        };

        let name = Self {
            scheme: scheme.to_string(),
            authority: parts.authority,
            devname: parts.devname,
            db_name: parts.db_name,
            subst: parts.subst,
            expr: parts.expr,
            cfg_key: parts.cfg_key,
            mode,
        };
        name.check_separators(input)?;
        Ok(name)
    }

    /// `eval:[//localhost][/][@<device>/][<key>=<val>;...]<expr>[#<cfgkey>]`.
    fn parse_strict(rest: &str) -> Option<Parts> {
        let (rest, cfg_key) = match rest.find('#') {
            Some(h) => {
                let frag = &rest[h + 1..];
                if frag.contains([' ', '#']) {
                    return None;
                }
                (&rest[..h], Some(frag.to_string()))
            }
            None => (rest, None),
        };
        if rest.contains('?') {
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

        // Optional device segment; a token the device grammar rejects, or
        // one that would leave no expression, is read as expression text.
        let (devname, body) = match path.strip_prefix('@').map(|a| (a, a.find('/'))) {
            Some((after_at, Some(slash)))
                if EvaluatorRef::parse(&after_at[..slash]).is_some()
                    && !after_at[slash + 1..].is_empty() =>
            {
                (
                    Some(format!("@{}", &after_at[..slash])),
                    &after_at[slash + 1..],
                )
            }
            _ => (None, path),
        };
        if body.is_empty() {
            return None;
        }

        let split = subst_prefix_len(body);
        let (subst, expr) = if body[split..].is_empty() {
            (None, body)
        } else {
            (normalize_subst(&body[..split]), &body[split..])
        };

        Some(Parts {
            authority,
            devname,
            db_name: None,
            subst,
            expr: expr.to_string(),
            cfg_key,
        })
    }

    /// `eval://[db=<name>;][dev=<name>;]<expr>[?<subst>][?configuration[=<cfgkey>]]`.
    fn parse_legacy(rest: &str) -> Option<Parts> {
        let body = rest.strip_prefix("//")?;
        if body.contains('#') {
            return None;
        }

        // `db=` and `dev=` prefixes need their closing ';' to count as
        // segments; otherwise the text reads as expression.
        let (db_name, body) = match body.strip_prefix("db=").map(|a| (a, a.find(';'))) {
            Some((after, Some(semi))) if semi > 0 && !after[..semi].contains('?') => {
                (Some(after[..semi].to_string()), &after[semi + 1..])
            }
            _ => (None, body),
        };
        let (devname, body) = match body.strip_prefix("dev=").map(|a| (a, a.find(';'))) {
            Some((after, Some(semi))) if semi > 0 && !after[..semi].contains('?') => {
                (Some(format!("@{}", &after[..semi])), &after[semi + 1..])
            }
            _ => (None, body),
        };

        let (expr, query) = match body.find('?') {
            Some(q) => (&body[..q], Some(&body[q + 1..])),
            None => (body, None),
        };
        if expr.is_empty() || expr.contains(';') {
            return None;
        }

        let (subst, cfg_key) = match query {
            None => (None, None),
            Some(q) => match q.find('?') {
                Some(i) => {
                    let subst = &q[..i];
                    let cfg = &q[i + 1..];
                    if subst.starts_with("configuration=") || cfg.contains('?') {
                        return None;
                    }
                    (normalize_subst(subst), Some(parse_configuration(cfg)?))
                }
                None => {
                    if q.starts_with("configuration=") {
                        (None, Some(parse_configuration(q)?))
                    } else {
                        (normalize_subst(q), None)
                    }
                }
            },
        };

        Some(Parts {
            authority: None,
            devname,
            db_name,
            subst,
            expr: expr.to_string(),
            cfg_key,
        })
    }

    /// Rejects a `;` that survives once quoted spans and reference bodies
    /// are stripped from the expression.
    fn check_separators(&self, input: &str) -> Result<(), InvalidNameError> {
        let mut sanitized = strip_quoted(&self.expr);
        let refs = scan_balanced(&sanitized, '{', '}', None)
            .map_err(|e| invalid(input, InvalidNameKind::Scan(e)))?;
        for r in &refs {
            sanitized = sanitized.replace(r.as_str(), "");
        }
        if sanitized.contains(';') {
            return Err(invalid(input, InvalidNameKind::StraySeparator));
        }
        Ok(())
    }

    /// Full validity: structural parse plus the recursive reference check
    /// over the expression and the substitution segment.
    fn validity(input: &str, pin: Option<GrammarMode>) -> Result<(), InvalidNameError> {
        let parsed = Self::parse_inner(input, pin)?;
        let segments = [Some(parsed.expr.as_str()), parsed.subst.as_deref()];
        for text in segments.into_iter().flatten() {
            let refs =
                references(text).map_err(|e| invalid(input, InvalidNameKind::Scan(e)))?;
            for reference in refs {
                if let Err(inner) = Self::validity(&reference, pin) {
                    debug!(
                        name = input,
                        reference = %reference,
                        error = %inner,
                        "name is invalid because the reference is not a valid attribute",
                    );
                    return Err(invalid(
                        input,
                        InvalidNameKind::InvalidReference { reference },
                    ));
                }
            }
        }
        Ok(())
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

    /// The `@`-prefixed device segment, if the URI carried one. Kept as raw
    /// text: legacy names admit device tokens the device grammar rejects,
    /// and resolution surfaces those later.
    #[must_use]
    pub fn devname(&self) -> Option<&str> {
        self.devname.as_deref()
    }

    /// The legacy `db=` segment, if present.
    #[must_use]
    pub fn db_name(&self) -> Option<&str> {
        self.db_name.as_deref()
    }

    /// The substitution segment, normalized without its trailing `;`.
    #[must_use]
    pub fn subst(&self) -> Option<&str> {
        self.subst.as_deref()
    }

    /// The raw, unexpanded expression.
    #[must_use]
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// The configuration key from the fragment, if present.
    #[must_use]
    pub fn cfg_key(&self) -> Option<&str> {
        self.cfg_key.as_deref()
    }

    /// Which grammar matched.
    #[must_use]
    pub fn mode(&self) -> GrammarMode {
        self.mode
    }

    /// The attribute segment as it would appear in a strict URI:
    /// `[subst;]expr`.
    #[must_use]
    pub fn attr_name(&self) -> String {
        match &self.subst {
            Some(s) => format!("{s};{}", self.expr),
            None => self.expr.clone(),
        }
    }

    /// The expression with the name's own substitutions applied.
    #[must_use]
    pub fn expanded_expr(&self) -> String {
        expand(&self.expr, self.subst.as_deref().unwrap_or(""))
    }

    /// The outermost `{...}` reference bodies in the expression.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`](crate::ScanError) if the braces do not balance.
    pub fn references(&self) -> Result<Vec<String>, crate::ScanError> {
        references(&self.expr)
    }

    /// The full name of the owning device, with defaults applied.
    #[must_use]
    pub fn device_name(&self) -> String {
        let authority = self.authority.as_deref().unwrap_or(DEFAULT_AUTHORITY);
        let devname = self.devname.as_deref().unwrap_or(DEFAULT_DEVICE);
        format!("{SCHEME}:{authority}/{devname}")
    }

    /// The canonical renderings. `complete` embeds the expanded expression;
    /// `normal` keeps the substitution prefix unexpanded and omits defaulted
    /// device and authority segments; `short` is the raw expression.
    #[must_use]
    pub fn canonical_forms(&self) -> CanonicalName {
        let authority = self.authority.as_deref().unwrap_or(DEFAULT_AUTHORITY);
        let devname = self.devname.as_deref().unwrap_or(DEFAULT_DEVICE);
        let complete = format!("{SCHEME}:{authority}/{devname}/{}", self.expanded_expr());
        let mut normal = self.attr_name();
        if devname != DEFAULT_DEVICE {
            normal = format!("{devname}/{normal}");
        }
        if authority != DEFAULT_AUTHORITY {
            normal = format!("{authority}/{normal}");
        }
        CanonicalName {
            complete,
            normal,
            short: self.expr.clone(),
        }
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_forms().complete)
    }
}

impl FromStr for AttributeName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `configuration[=]<cfgkey>`.
fn parse_configuration(s: &str) -> Option<String> {
    let rest = s.strip_prefix("configuration")?;
    let key = rest.strip_prefix('=').unwrap_or(rest);
    Some(key.to_string())
}

/// Trailing-`;`-free substitution text; empty collapses to `None`.
fn normalize_subst(raw: &str) -> Option<String> {
    let trimmed = raw.trim_end_matches(';');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn invalid(input: &str, kind: InvalidNameKind) -> InvalidNameError {
    InvalidNameError {
        input: input.to_string(),
        element: Element::Attribute,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_minimal() {
        let name = AttributeName::parse("eval:1+2").unwrap();
        assert_eq!(name.mode(), GrammarMode::Strict);
        assert_eq!(name.expr(), "1+2");
        assert_eq!(name.devname(), None);
        let forms = name.canonical_forms();
        assert_eq!(forms.complete, "eval://localhost/@DefaultEvaluator/1+2");
        assert_eq!(forms.normal, "1+2");
        assert_eq!(forms.short, "1+2");
    }

    #[test]
    fn strict_with_device_and_subst() {
        let name = AttributeName::parse("eval://localhost/@myeval/a=2;b=3;a+b").unwrap();
        assert_eq!(name.devname(), Some("@myeval"));
        assert_eq!(name.subst(), Some("a=2;b=3"));
        assert_eq!(name.expr(), "a+b");
        let forms = name.canonical_forms();
        assert_eq!(forms.complete, "eval://localhost/@myeval/2+3");
        assert_eq!(forms.normal, "@myeval/a=2;b=3;a+b");
        assert_eq!(forms.short, "a+b");
    }

    #[test]
    fn strict_fragment_is_the_cfg_key() {
        let name = AttributeName::parse("eval:x+y#label").unwrap();
        assert_eq!(name.cfg_key(), Some("label"));
        let name = AttributeName::parse("eval:x+y#").unwrap();
        assert_eq!(name.cfg_key(), Some(""));
        let name = AttributeName::parse("eval:x+y").unwrap();
        assert_eq!(name.cfg_key(), None);
    }

    #[test]
    fn strict_at_without_slash_is_expression_text() {
        let name = AttributeName::parse("eval:@foo").unwrap();
        assert_eq!(name.devname(), None);
        assert_eq!(name.expr(), "@foo");
    }

    #[test]
    fn strict_bad_device_token_is_expression_text() {
        let name = AttributeName::parse("eval:@f=o/x").unwrap();
        assert_eq!(name.devname(), None);
        assert_eq!(name.expr(), "@f=o/x");
    }

    #[test]
    fn legacy_subst_query() {
        let name = AttributeName::parse("eval://a+b?a=2;b=3").unwrap();
        assert_eq!(name.mode(), GrammarMode::Legacy);
        assert_eq!(name.subst(), Some("a=2;b=3"));
        assert_eq!(name.expr(), "a+b");
        let forms = name.canonical_forms();
        assert_eq!(forms.complete, "eval://localhost/@DefaultEvaluator/2+3");
        assert_eq!(forms.normal, "a=2;b=3;a+b");
        assert_eq!(forms.short, "a+b");
    }

    #[test]
    fn legacy_subst_and_configuration_queries() {
        let name = AttributeName::parse("eval://a+b?a=2;b=3?configuration=label").unwrap();
        assert_eq!(name.subst(), Some("a=2;b=3"));
        assert_eq!(name.cfg_key(), Some("label"));
    }

    #[test]
    fn legacy_configuration_only() {
        let name = AttributeName::parse("eval://x*2?configuration=unit").unwrap();
        assert_eq!(name.subst(), None);
        assert_eq!(name.cfg_key(), Some("unit"));
    }

    #[test]
    fn legacy_db_and_dev_segments() {
        let name = AttributeName::parse("eval://db=mydb;dev=foo;x*2").unwrap();
        assert_eq!(name.db_name(), Some("mydb"));
        assert_eq!(name.devname(), Some("@foo"));
        assert_eq!(name.expr(), "x*2");
        assert_eq!(name.canonical_forms().complete, "eval://localhost/@foo/x*2");
    }

    #[test]
    fn legacy_dev_without_semicolon_is_expression_text() {
        let name = AttributeName::parse("eval://dev=foo").unwrap();
        assert_eq!(name.devname(), None);
        assert_eq!(name.expr(), "dev=foo");
    }

    #[test]
    fn strict_and_legacy_agree_on_canonical_forms() {
        let strict = AttributeName::parse("eval://localhost/@foo/a=2;a*x").unwrap();
        let legacy = AttributeName::parse("eval://dev=foo;a*x?a=2").unwrap();
        assert_eq!(strict.canonical_forms(), legacy.canonical_forms());
        assert_eq!(strict.device_name(), legacy.device_name());
    }

    #[test]
    fn complete_form_is_a_fixpoint() {
        for input in [
            "eval:1+2",
            "eval://a+b?a=2;b=3",
            "eval://localhost/@myeval/k=10;k*{eval:x+1}",
        ] {
            let complete = AttributeName::parse(input).unwrap().canonical_forms().complete;
            let again = AttributeName::parse(&complete).unwrap();
            assert_eq!(again.mode(), GrammarMode::Strict);
            assert_eq!(again.canonical_forms().complete, complete);
        }
    }

    #[test]
    fn stray_separator_is_rejected() {
        let err = AttributeName::parse("eval:2;3").unwrap_err();
        assert!(matches!(err.kind, InvalidNameKind::StraySeparator));
    }

    #[test]
    fn quoted_and_referenced_separators_are_allowed() {
        assert!(AttributeName::parse("eval:\"a;b\"+x").is_ok());
        let name = AttributeName::parse("eval:{eval:\"x\"}+1");
        assert!(name.is_ok());
    }

    #[test]
    fn unbalanced_braces_fail_with_scan_kind() {
        let err = AttributeName::parse("eval:{foo").unwrap_err();
        assert!(matches!(err.kind, InvalidNameKind::Scan(_)));
    }

    #[test]
    fn device_name_applies_defaults() {
        let name = AttributeName::parse("eval:1+2").unwrap();
        assert_eq!(name.device_name(), "eval://localhost/@DefaultEvaluator");
        let name = AttributeName::parse("eval:@myeval/1+2").unwrap();
        assert_eq!(name.device_name(), "eval://localhost/@myeval");
    }

    #[test]
    fn validity_checks_references_recursively() {
        assert!(AttributeName::is_valid("eval:{eval:2+3}+1"));
        assert!(AttributeName::is_valid("eval:{eval:{eval:1}+2}*3"));
        assert!(!AttributeName::is_valid("eval:{x}+{y}"));
        assert!(!AttributeName::is_valid("eval:{eval:2;3}+1"));
    }

    #[test]
    fn validity_checks_references_in_subst() {
        assert!(AttributeName::is_valid("eval:k={eval:1+2};k*2"));
        assert!(!AttributeName::is_valid("eval:k={nope};k*2"));
    }

    #[test]
    fn empty_and_schemeless_names() {
        assert!(matches!(
            AttributeName::parse("").unwrap_err().kind,
            InvalidNameKind::Empty
        ));
        assert!(matches!(
            AttributeName::parse("1+2").unwrap_err().kind,
            InvalidNameKind::InvalidScheme { found: None }
        ));
    }

    #[test]
    fn long_scheme_normalizes_to_eval() {
        let name = AttributeName::parse("evaluation:1+2").unwrap();
        assert_eq!(name.scheme(), "evaluation");
        assert!(name.canonical_forms().complete.starts_with("eval:"));
    }
}
