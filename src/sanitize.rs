//! Filesystem-safe name mapping for series and chapter titles.
//!
//! Titles scraped from remote sites routinely contain path separators,
//! reserved punctuation, and decorative whitespace. [`sanitize`] maps any
//! title to a single safe path segment. The mapping is pure and idempotent:
//! `sanitize(sanitize(s)) == sanitize(s)` for every input, so already-clean
//! names (for example chapter titles read back from the failure ledger) pass
//! through unchanged.

/// Fallback segment for titles that sanitize down to nothing usable.
const EMPTY_FALLBACK: &str = "untitled";

/// Maps arbitrary title text to a filesystem-safe single path segment.
///
/// Reserved characters (`/ \ : * ? " < > |`), whitespace, and control
/// characters are replaced with underscores; runs of replacements collapse
/// to one underscore and leading/trailing underscores are trimmed. Inputs
/// that reduce to an empty or dots-only segment (which would collide with
/// `.`/`..` path components) become `"untitled"`.
#[must_use]
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_sep = false;
    for ch in name.chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return EMPTY_FALLBACK.to_string();
    }
    trimmed.to_string()
}
