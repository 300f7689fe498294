//! Display-name normalization.

use serde::{Deserialize, Serialize};

/// Canonical (first, last) pair derived from a free-text display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullName {
    pub first_name: String,
    pub last_name: String,
}

/// Parse a free-text display name into a canonical name pair.
///
/// Blank input yields `None`. A single token becomes the first name with an
/// empty last name; otherwise the first token is the first name and the
/// remaining tokens, space-joined, are the last name. Tokens are capitalized
/// per hyphen-delimited segment, so "howard-vickers" becomes
/// "Howard-Vickers". Deterministic and case-insensitive on input.
pub fn parse_display_name(raw: &str) -> Option<FullName> {
    let mut tokens = raw.split_whitespace();
    let first = tokens.next()?;

    let first_name = capitalize_token(first);
    let last_name = tokens
        .map(capitalize_token)
        .collect::<Vec<_>>()
        .join(" ");

    Some(FullName {
        first_name,
        last_name,
    })
}

fn capitalize_token(token: &str) -> String {
    token
        .split('-')
        .map(capitalize_segment)
        .collect::<Vec<_>>()
        .join("-")
}

fn capitalize_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_is_none() {
        assert_eq!(parse_display_name(""), None);
        assert_eq!(parse_display_name("   "), None);
    }

    #[test]
    fn test_single_token() {
        let name = parse_display_name("Izzy").unwrap();
        assert_eq!(name.first_name, "Izzy");
        assert_eq!(name.last_name, "");
    }

    #[test]
    fn test_two_tokens_case_insensitive() {
        let name = parse_display_name("izzy vIckerS").unwrap();
        assert_eq!(name.first_name, "Izzy");
        assert_eq!(name.last_name, "Vickers");
    }

    #[test]
    fn test_multi_token_last_name() {
        let name = parse_display_name("izzy robert gonzalez vickers").unwrap();
        assert_eq!(name.first_name, "Izzy");
        assert_eq!(name.last_name, "Robert Gonzalez Vickers");
    }

    #[test]
    fn test_hyphenated_segments_capitalized() {
        let name = parse_display_name("Jasmine howard-Vickers").unwrap();
        assert_eq!(name.first_name, "Jasmine");
        assert_eq!(name.last_name, "Howard-Vickers");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            parse_display_name("ana de armas"),
            parse_display_name("ana de armas")
        );
    }
}
