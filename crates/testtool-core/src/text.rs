//! Delimiter-based tokenizing of received text.
//!
//! [`split`] keeps every segment, including empty ones, so it is the exact
//! inverse of [`join`]:
//!
//! ```rust
//! use testtool_core::text::{join, split};
//!
//! let parts = split("123;456;", ";");
//! assert_eq!(parts, vec!["123", "456", ""]);
//! assert_eq!(join(&parts, ";"), "123;456;");
//! ```

/// Splits `text` on every non-overlapping occurrence of `delimiter`,
/// scanning left to right.
///
/// The result always has one more element than there are delimiter
/// occurrences: a string ending with the delimiter yields a trailing empty
/// segment, and a string without the delimiter yields itself.  An empty
/// delimiter never matches, so the whole input comes back as one segment.
pub fn split<'a>(text: &'a str, delimiter: &str) -> Vec<&'a str> {
    if delimiter.is_empty() {
        return vec![text];
    }
    text.split(delimiter).collect()
}

/// Concatenates `parts`, placing `delimiter` between neighbours.
pub fn join<S: AsRef<str>>(parts: &[S], delimiter: &str) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push_str(delimiter);
        }
        out.push_str(part.as_ref());
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
