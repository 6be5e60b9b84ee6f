//! Balanced-token scanning over expression text.
//!
//! The scanner is the one place that understands nesting: it extracts the
//! outermost bodies between a pair of delimiters and locates quoted literal
//! spans, leaving any recursion into the extracted tokens to its callers.

use crate::error::ScanError;

/// Finds the text between (possibly nested) delimiters in a string.
///
/// Only the outermost level is returned; a token containing further
/// `start`..`end` pairs counts as one token with the nested content included
/// verbatim. Tokens are produced in left-to-right order, without the
/// delimiters themselves. Passing `Some(n)` as `limit` stops the scan after
/// `n` tokens.
///
/// # Errors
///
/// Returns [`ScanError::EqualDelimiters`] if `start == end`,
/// [`ScanError::UnbalancedDelimiters`] if the delimiter counts in `text`
/// differ, and [`ScanError::UnterminatedToken`] if a start marker is never
/// closed even though the overall counts match (e.g. `"}{"`).
///
/// # Examples
///
/// ```
/// use eval_uri::scan_balanced;
///
/// let tokens = scan_balanced("{foo}bar{zig{zag}}boom", '{', '}', None).unwrap();
/// assert_eq!(tokens, vec!["foo", "zig{zag}"]);
/// ```
pub fn scan_balanced(
    text: &str,
    start: char,
    end: char,
    limit: Option<usize>,
) -> Result<Vec<String>, ScanError> {
    if start == end {
        return Err(ScanError::EqualDelimiters(start));
    }
    let starts = text.matches(start).count();
    let ends = text.matches(end).count();
    if starts != ends {
        return Err(ScanError::UnbalancedDelimiters {
            start,
            starts,
            end,
            ends,
        });
    }

    let mut tokens = Vec::new();
    let mut rest = text;
    let mut consumed = 0;
    while limit.is_none_or(|n| tokens.len() < n) {
        let Some(s) = rest.find(start) else {
            break;
        };
        let opened_at = consumed + s;
        let mut e = match rest[s..].find(end) {
            Some(i) => s + i + end.len_utf8(),
            None => return Err(ScanError::UnterminatedToken { position: opened_at }),
        };
        // Grow the candidate until the slice balances its own delimiters.
        while rest[s..e].matches(start).count() != rest[s..e].matches(end).count() {
            match rest[e..].find(end) {
                Some(i) => e += i + end.len_utf8(),
                None => return Err(ScanError::UnterminatedToken { position: opened_at }),
            }
        }
        tokens.push(rest[s + start.len_utf8()..e - end.len_utf8()].to_string());
        consumed += e;
        rest = &rest[e..];
    }
    Ok(tokens)
}

/// Locates single- and double-quoted literal spans, quotes included.
///
/// The scan is left-to-right and non-greedy: a span ends at the first
/// matching quote character, and a quote with no closing partner starts no
/// span.
///
/// # Examples
///
/// ```
/// use eval_uri::quoted_spans;
///
/// assert_eq!(quoted_spans(r#"x+"a;b"+'c'"#), vec![r#""a;b""#, "'c'"]);
/// assert_eq!(quoted_spans("no quotes"), Vec::<&str>::new());
/// ```
#[must_use]
pub fn quoted_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' || b == b'\'' {
            if let Some(j) = text[i + 1..].find(b as char) {
                let close = i + 1 + j + 1;
                spans.push(&text[i..close]);
                i = close;
                continue;
            }
        }
        i += 1;
    }
    spans
}

/// Returns `text` with every quoted span removed.
#[must_use]
pub fn strip_quoted(text: &str) -> String {
    let mut out = text.to_string();
    for span in quoted_spans(text) {
        out = out.replace(span, "");
    }
    out
}
