//! Decides whether a found record satisfies a wanted record.
//!
//! The checks run in a fixed order and stop at the first rejection:
//!
//! 1. the derived [`Kind`](crate::models::Kind) must agree;
//! 2. every exact field set on the wanted record must be set and equal on
//!    the candidate (the year is compared through its modifier);
//! 3. if the wanted record carries ISBNs, they must intersect the
//!    candidate's (skipped for papers);
//! 4. title, series and publisher must reach the threshold under
//!    [`fuzz::partial_ratio`];
//! 5. the best [`fuzz::token_set_ratio`] over all author pairs must reach
//!    the threshold.

pub mod fuzz;

use crate::models::{Exacts, Kind, Record};

/// Default fuzzy threshold, out of 100
pub const DEFAULT_ACCURACY: u32 = 75;

fn exact<T: PartialEq>(candidate: &Option<T>, wanted: &Option<T>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => candidate.as_ref() == Some(wanted),
    }
}

fn exacts_agree(candidate: &Exacts, wanted: &Exacts) -> bool {
    let year = match (candidate.year, wanted.year) {
        (_, None) => true,
        (Some(found), Some(wanted_year)) => wanted.year_mod.accepts(found, wanted_year),
        (None, Some(_)) => false,
    };

    year && exact(&candidate.language, &wanted.language)
        && exact(&candidate.edition, &wanted.edition)
        && exact(&candidate.extension, &wanted.extension)
        && exact(&candidate.volume, &wanted.volume)
        && exact(&candidate.number, &wanted.number)
        && exact(&candidate.pages, &wanted.pages)
        && exact(&candidate.size, &wanted.size)
}

fn approximate(candidate: &Option<String>, wanted: &Option<String>, threshold: u32) -> bool {
    let Some(wanted) = wanted else {
        return true;
    };
    let score = candidate
        .as_deref()
        .map(|found| fuzz::partial_ratio(&fuzz::full_process(found), &fuzz::full_process(wanted)))
        .unwrap_or(0);
    score >= threshold
}

fn authors_agree(candidate: &[String], wanted: &[String], threshold: u32) -> bool {
    if wanted.is_empty() {
        return true;
    }

    let mut best = 0;
    for found in candidate {
        for author in wanted {
            best = best.max(fuzz::token_set_ratio(found, author));
            if best >= threshold {
                return true;
            }
        }
    }
    false
}

/// Whether `candidate` satisfies `wanted` at the given fuzzy threshold.
pub fn matches(candidate: &Record, wanted: &Record, threshold: u32) -> bool {
    if candidate.kind() != wanted.kind() {
        return false;
    }

    if !exacts_agree(candidate.exacts(), wanted.exacts()) {
        return false;
    }

    if !wanted.isbns().is_empty()
        && candidate.kind() != Kind::Paper
        && candidate.isbns().is_disjoint(wanted.isbns())
    {
        return false;
    }

    let found = candidate.nonexacts();
    let want = wanted.nonexacts();
    if !approximate(&found.title, &want.title, threshold)
        || !approximate(&found.series, &want.series, threshold)
        || !approximate(&found.publisher, &want.publisher, threshold)
    {
        return false;
    }

    authors_agree(&found.authors, &want.authors, threshold)
}

/// A [`matches`] predicate bound to a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matcher {
    threshold: u32,
}

impl Matcher {
    /// Thresholds above 100 are clamped
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.min(100),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn matches(&self, candidate: &Record, wanted: &Record) -> bool {
        matches(candidate, wanted, self.threshold)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(DEFAULT_ACCURACY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, YearFilter};

    fn book(title: &str) -> Record {
        Record::builder().title(title).build()
    }

    #[test]
    fn test_kind_guard() {
        let wanted = Record::builder().title("On Growth and Form").build();
        let paper = Record::builder()
            .title("On Growth and Form")
            .journal("Nature")
            .build();

        assert!(matches(&book("On Growth and Form"), &wanted, DEFAULT_ACCURACY));
        assert!(!matches(&paper, &wanted, 0));
    }

    #[test]
    fn test_exact_fields_must_all_agree() {
        let wanted = Record::builder().title("Dune").edition(2).extension("pdf").build();

        let right = Record::builder().title("Dune").edition(2).extension("pdf").build();
        let wrong_extension = Record::builder().title("Dune").edition(2).extension("epub").build();
        let missing_edition = Record::builder().title("Dune").extension("pdf").build();

        assert!(matches(&right, &wanted, DEFAULT_ACCURACY));
        assert!(!matches(&wrong_extension, &wanted, DEFAULT_ACCURACY));
        assert!(!matches(&missing_edition, &wanted, DEFAULT_ACCURACY));
    }

    #[test]
    fn test_unset_wanted_fields_are_ignored() {
        let wanted = Record::builder().title("Dune").build();
        let candidate = Record::builder()
            .title("Dune")
            .year(1965)
            .language("english")
            .extension("epub")
            .build();
        assert!(matches(&candidate, &wanted, DEFAULT_ACCURACY));
    }

    #[test]
    fn test_year_modifier() {
        let at_least: YearFilter = ">=2000".parse().unwrap();
        let wanted = Record::builder().title("Dune").year_filter(at_least).build();

        assert!(matches(&Record::builder().title("Dune").year(2005).build(), &wanted, 75));
        assert!(matches(&Record::builder().title("Dune").year(2000).build(), &wanted, 75));
        assert!(!matches(&Record::builder().title("Dune").year(1965).build(), &wanted, 75));
        assert!(!matches(&book("Dune"), &wanted, 75));
    }

    #[test]
    fn test_isbn_intersection() {
        let wanted = Record::builder().isbns(["9780306406157", "9780345496874"]).build();
        let overlapping = Record::builder().isbns(["0345496876"]).build();
        let disjoint = Record::builder().isbns(["007462542X"]).build();
        let none = Record::builder().title("Whatever").build();

        assert!(matches(&overlapping, &wanted, DEFAULT_ACCURACY));
        assert!(!matches(&disjoint, &wanted, DEFAULT_ACCURACY));
        assert!(!matches(&none, &wanted, DEFAULT_ACCURACY));
    }

    #[test]
    fn test_isbns_are_skipped_for_papers() {
        let wanted = Record::builder()
            .journal("Nature")
            .isbn("9780306406157")
            .build();
        let candidate = Record::builder().journal("Nature").build();
        assert!(matches(&candidate, &wanted, DEFAULT_ACCURACY));
    }

    #[test]
    fn test_missing_candidate_text_scores_zero() {
        let wanted = Record::builder().title("Dune").series("Dune Chronicles").build();
        let candidate = book("Dune");
        assert!(!matches(&candidate, &wanted, 1));
        assert!(matches(&candidate, &wanted, 0));
    }

    #[test]
    fn test_partial_title() {
        let wanted = book("Victory of Eagles");
        let candidate = book("Temeraire: Victory of Eagles (Book 5)");
        assert!(matches(&candidate, &wanted, DEFAULT_ACCURACY));
        assert!(!matches(&book("Cooking for Engineers"), &wanted, DEFAULT_ACCURACY));
    }

    #[test]
    fn test_author_fuzziness() {
        let wanted = Record::builder().author("John Doe").build();
        let initial = Record::builder().author("J. Doe").build();
        let other = Record::builder().author("Jane Roe").build();
        let several = Record::builder().authors(["Jane Roe", "Doe, John"]).build();

        assert!(matches(&initial, &wanted, DEFAULT_ACCURACY));
        assert!(!matches(&other, &wanted, DEFAULT_ACCURACY));
        assert!(matches(&several, &wanted, DEFAULT_ACCURACY));
        assert!(!matches(&book("Anything"), &wanted, DEFAULT_ACCURACY));
    }

    #[test]
    fn test_threshold_is_monotonic() {
        let wanted = Record::builder().title("Victory of Eagles").author("Naomi Novik").build();
        let candidates = [
            Record::builder().title("Victory of Eagle").author("N. Novik").build(),
            Record::builder().title("Victor of Eagles").author("Naomi Novak").build(),
            Record::builder().title("Eagles").author("Novik").build(),
            book("Something else entirely"),
        ];

        for candidate in &candidates {
            for low in 0..=100 {
                for high in low..=100 {
                    if matches(candidate, &wanted, high) {
                        assert!(matches(candidate, &wanted, low), "{candidate:?} {low} {high}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_matcher_clamps() {
        assert_eq!(Matcher::new(250).threshold(), 100);
        assert_eq!(Matcher::default().threshold(), DEFAULT_ACCURACY);
    }
}
