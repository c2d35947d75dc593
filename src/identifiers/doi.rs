//! DOI recognition.

use regex::Regex;
use std::sync::LazyLock;

static DOI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("DOI regex is valid"));

const PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
    "DOI:",
];

/// Strip the usual `doi:` / resolver URL prefixes from a DOI.
pub fn strip_prefix(input: &str) -> &str {
    let input = input.trim();
    PREFIXES
        .iter()
        .find_map(|prefix| input.strip_prefix(prefix))
        .map(str::trim_start)
        .unwrap_or(input)
}

/// Whether `input` looks like a DOI, with or without a prefix.
pub fn is_doi(input: &str) -> bool {
    DOI_PATTERN.is_match(strip_prefix(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_doi() {
        assert!(is_doi("10.1000/xyz123"));
        assert_eq!(strip_prefix("10.1000/xyz123"), "10.1000/xyz123");
    }

    #[test]
    fn test_prefixed_doi() {
        assert_eq!(strip_prefix("doi: 10.1000/xyz123"), "10.1000/xyz123");
        assert_eq!(strip_prefix("https://doi.org/10.1000/xyz123"), "10.1000/xyz123");
        assert!(is_doi("https://dx.doi.org/10.1016/j.cell.2020.01.001"));
    }

    #[test]
    fn test_not_a_doi() {
        assert!(!is_doi("not-a-valid-identifier"));
        assert!(!is_doi("10.12/short-registrant"));
        assert!(!is_doi("10.1000/"));
        assert!(!is_doi("10.1000/has space"));
    }
}
