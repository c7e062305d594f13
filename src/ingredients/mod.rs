//! Shared ingredient catalog keyed by canonical name.

pub mod handlers;
pub mod repo;

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
}

/// Canonical form: trimmed, inner whitespace collapsed, lower-cased.
pub fn canonical_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `%needle%` for a `LIKE ... ESCAPE '\'` match, with the needle's own
/// wildcards escaped.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::{canonical_name, contains_pattern};

    #[test]
    fn folds_case_and_whitespace() {
        assert_eq!(canonical_name("  All-Purpose\tFLOUR "), "all-purpose flour");
    }

    #[test]
    fn blank_names_collapse_to_empty() {
        assert_eq!(canonical_name(" \n "), "");
    }

    #[test]
    fn unicode_names_are_lowercased() {
        assert_eq!(canonical_name("Crème Fraîche"), "crème fraîche");
    }

    #[test]
    fn search_wildcards_are_escaped() {
        assert_eq!(contains_pattern("oat"), "%oat%");
        assert_eq!(contains_pattern("_"), r"%\_%");
        assert_eq!(contains_pattern(r"50%\x"), r"%50\%\\x%");
    }
}
