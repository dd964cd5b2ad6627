//! Property name normalization
//!
//! Property names are normalized to valid identifiers before they are checked
//! against a content-type definition: lowercased, with any character outside
//! `[a-z0-9_]` stripped. A leading digit is prefixed with an underscore so the
//! result is always a usable identifier.

/// Normalize an arbitrary string into a valid property identifier.
///
/// # Example
/// ```
/// use strata_core::ident::normalize_identifier;
///
/// assert_eq!(normalize_identifier("Claim"), "claim");
/// assert_eq!(normalize_identifier("last-change date"), "lastchangedate");
/// assert_eq!(normalize_identifier("2nd_line"), "_2nd_line");
/// ```
pub fn normalize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                Some(c.to_ascii_lowercase())
            } else {
                None
            }
        })
        .collect();

    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases() {
        assert_eq!(normalize_identifier("Name"), "name");
        assert_eq!(normalize_identifier("STATUS"), "status");
    }

    #[test]
    fn test_strips_invalid_characters() {
        assert_eq!(normalize_identifier("first name"), "firstname");
        assert_eq!(normalize_identifier("e-mail"), "email");
        assert_eq!(normalize_identifier("a.b.c"), "abc");
    }

    #[test]
    fn test_keeps_underscores_and_digits() {
        assert_eq!(normalize_identifier("line_2"), "line_2");
    }

    #[test]
    fn test_leading_digit_gets_prefixed() {
        assert_eq!(normalize_identifier("1st"), "_1st");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_identifier(""), "");
        assert_eq!(normalize_identifier("!!!"), "");
    }
}
