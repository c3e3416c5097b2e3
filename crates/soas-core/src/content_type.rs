//! Content-type priority
//!
//! Declared content types are ranked in descending lexical order. For the
//! types with a built-in codec this gives:
//!
//! | rank | content type           |
//! |------|------------------------|
//! | 1    | `text/csv`             |
//! | 2    | `application/x-ndjson` |
//! | 3    | `application/json`     |
//!
//! The first entry of a ranked list is the one used on the wire.

pub const JSON: &str = "application/json";
pub const NDJSON: &str = "application/x-ndjson";
pub const CSV: &str = "text/csv";

/// Built-in codec types, highest priority first
pub const KNOWN_PRIORITY: [&str; 3] = [CSV, NDJSON, JSON];

/// Sort content types in descending lexical order and drop duplicates.
pub fn rank_content_types<I, S>(declared: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut ranked: Vec<String> = declared.into_iter().map(Into::into).collect();
    ranked.sort_unstable_by(|a, b| b.cmp(a));
    ranked.dedup();
    ranked
}

/// Media type without parameters, lowercased
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_json(content_type: &str) -> bool {
    essence(content_type) == JSON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types_rank() {
        let ranked = rank_content_types([JSON, NDJSON, CSV]);
        assert_eq!(ranked, KNOWN_PRIORITY);
    }

    #[test]
    fn test_rank_is_order_independent() {
        let a = rank_content_types(["text/csv", "application/json"]);
        let b = rank_content_types(["application/json", "text/csv"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rank_dedups() {
        let ranked = rank_content_types(["application/json", "application/json"]);
        assert_eq!(ranked, vec!["application/json"]);
    }

    #[test]
    fn test_essence() {
        assert_eq!(essence("Application/JSON; charset=utf-8"), JSON);
        assert!(is_json("application/json;charset=UTF-8"));
        assert!(!is_json("application/x-ndjson"));
    }
}
