//! Authority name grammar.

use std::fmt;
use std::str::FromStr;

use crate::constants::{DEFAULT_AUTHORITY, SCHEME};
use crate::error::{InvalidNameError, InvalidNameKind};
use crate::grammar::{split_scheme, CanonicalName, Element, GrammarMode};

/// A parsed eval authority name.
///
/// The only authority supported in strict mode is `//localhost`:
///
/// ```
/// use eval_uri::{AuthorityName, GrammarMode};
///
/// let name = AuthorityName::parse("eval://localhost").unwrap();
/// assert_eq!(name.mode(), GrammarMode::Strict);
///
/// // Legacy spelling with an embedded database name.
/// let name = AuthorityName::parse("eval://db=mydb").unwrap();
/// assert_eq!(name.mode(), GrammarMode::Legacy);
/// assert_eq!(name.db_name(), Some("mydb"));
/// assert_eq!(name.canonical_forms().complete, "eval://localhost");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityName {
    scheme: String,
    mode: GrammarMode,
    db_name: Option<String>,
}

impl AuthorityName {
    /// Parses an authority name, trying the strict grammar first and the
    /// legacy grammar only on strict failure.
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

        if pin != Some(GrammarMode::Legacy) && rest == DEFAULT_AUTHORITY {
            return Ok(Self {
                scheme: scheme.to_string(),
                mode: GrammarMode::Strict,
                db_name: None,
            });
        }

        if pin != Some(GrammarMode::Strict) {
            if let Some(db) = rest.strip_prefix("//db=") {
                if !db.is_empty() && !db.contains(['?', '#', ';']) {
                    return Ok(Self {
                        scheme: scheme.to_string(),
                        mode: GrammarMode::Legacy,
                        db_name: Some(db.to_string()),
                    });
                }
            }
        }

        Err(invalid(input, InvalidNameKind::NoMatch))
    }

    /// The scheme as written (`eval` or `evaluation`).
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Which grammar matched.
    #[must_use]
    pub fn mode(&self) -> GrammarMode {
        self.mode
    }

    /// The legacy `db=` segment, if present.
    #[must_use]
    pub fn db_name(&self) -> Option<&str> {
        self.db_name.as_deref()
    }

    /// The canonical renderings. Both grammar modes normalize to the single
    /// supported authority.
    #[must_use]
    pub fn canonical_forms(&self) -> CanonicalName {
        CanonicalName {
            complete: format!("{SCHEME}:{DEFAULT_AUTHORITY}"),
            normal: DEFAULT_AUTHORITY.to_string(),
            short: DEFAULT_AUTHORITY.trim_start_matches('/').to_string(),
        }
    }
}

impl fmt::Display for AuthorityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_forms().complete)
    }
}

impl FromStr for AuthorityName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn invalid(input: &str, kind: InvalidNameKind) -> InvalidNameError {
    InvalidNameError {
        input: input.to_string(),
        element: Element::Authority,
        kind,
    }
}
