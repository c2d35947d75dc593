//! Bibliographic record shared by sources, the matcher and the orchestrator.
//!
//! A record is split into three groups:
//!
//! - [`Nonexacts`]: free-text fields compared approximately,
//! - [`Exacts`]: fields that must be equal when the wanted record sets them,
//! - [`Auxiliary`]: ISBNs and mirror links, which are not plain field comparisons.
//!
//! Whether a record is a book or a paper is never stored; see [`Record::kind`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::identifiers::isbn;

/// Book or paper, derived from the populated fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Book,
    Paper,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Book => write!(f, "book"),
            Kind::Paper => write!(f, "paper"),
        }
    }
}

/// How a wanted year is compared with a candidate's year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearMod {
    #[default]
    Equal,
    AtLeast,
    AtMost,
    After,
    Before,
}

impl YearMod {
    /// Whether `found` satisfies `wanted` under this modifier.
    pub fn accepts(self, found: u32, wanted: u32) -> bool {
        match self {
            YearMod::Equal => found == wanted,
            YearMod::AtLeast => found >= wanted,
            YearMod::AtMost => found <= wanted,
            YearMod::After => found > wanted,
            YearMod::Before => found < wanted,
        }
    }
}

/// Error returned when a year criterion cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid year criterion: {0:?}")]
pub struct ParseYearError(pub String);

/// A year together with its comparison modifier.
///
/// Parsed from `2157`, `=>2157` / `>=2157`, `=<2157` / `<=2157`, `>2157` or `<2157`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearFilter {
    pub year: u32,
    pub modifier: YearMod,
}

impl FromStr for YearFilter {
    type Err = ParseYearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (modifier, digits) = if let Some(rest) = trimmed
            .strip_prefix("=>")
            .or_else(|| trimmed.strip_prefix(">="))
        {
            (YearMod::AtLeast, rest)
        } else if let Some(rest) = trimmed
            .strip_prefix("=<")
            .or_else(|| trimmed.strip_prefix("<="))
        {
            (YearMod::AtMost, rest)
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            (YearMod::After, rest)
        } else if let Some(rest) = trimmed.strip_prefix('<') {
            (YearMod::Before, rest)
        } else {
            (YearMod::Equal, trimmed)
        };

        let year = digits
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseYearError(s.to_string()))?;
        Ok(Self { year, modifier })
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.modifier {
            YearMod::Equal => "",
            YearMod::AtLeast => ">=",
            YearMod::AtMost => "<=",
            YearMod::After => ">",
            YearMod::Before => "<",
        };
        write!(f, "{}{}", prefix, self.year)
    }
}

/// Fields compared approximately
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonexacts {
    pub authors: Vec<String>,
    pub title: Option<String>,
    pub series: Option<String>,
    pub publisher: Option<String>,
    pub journal: Option<String>,
}

/// Fields that must match exactly when set on the wanted record
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exacts {
    pub year: Option<u32>,
    /// Only meaningful on a wanted record
    #[serde(default)]
    pub year_mod: YearMod,
    pub language: Option<String>,
    pub edition: Option<u32>,
    pub extension: Option<String>,
    pub volume: Option<u32>,
    pub number: Option<u32>,
    pub pages: Option<u32>,
    /// Size in bytes
    pub size: Option<u64>,
}

/// ISBNs and mirror links
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Auxiliary {
    /// Checksum-valid ISBNs in ISBN-13 form
    pub isbns: BTreeSet<String>,
    pub mirrors: Vec<Url>,
}

/// A bibliographic record, either wanted by the caller or found by a source.
///
/// Records are only constructed through [`RecordBuilder`], which trims text,
/// lower-cases `language`/`extension` and drops invalid ISBNs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    nonexacts: Nonexacts,
    exacts: Exacts,
    auxiliary: Auxiliary,
}

impl Record {
    /// Start building a record
    pub fn builder() -> RecordBuilder {
        RecordBuilder::new()
    }

    /// `Paper` when any of journal, volume or number is set, `Book` otherwise
    pub fn kind(&self) -> Kind {
        if self.nonexacts.journal.is_some()
            || self.exacts.volume.is_some()
            || self.exacts.number.is_some()
        {
            Kind::Paper
        } else {
            Kind::Book
        }
    }

    pub fn nonexacts(&self) -> &Nonexacts {
        &self.nonexacts
    }

    pub fn exacts(&self) -> &Exacts {
        &self.exacts
    }

    pub fn auxiliary(&self) -> &Auxiliary {
        &self.auxiliary
    }

    pub fn authors(&self) -> &[String] {
        &self.nonexacts.authors
    }

    pub fn title(&self) -> Option<&str> {
        self.nonexacts.title.as_deref()
    }

    pub fn isbns(&self) -> &BTreeSet<String> {
        &self.auxiliary.isbns
    }

    pub fn mirrors(&self) -> &[Url] {
        &self.auxiliary.mirrors
    }

    /// Whether no field at all is set
    pub fn is_empty(&self) -> bool {
        *self == Record::default()
    }
}

/// English ordinal for an edition number (`1st`, `2nd`, `11th`, ...)
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title().unwrap_or("(untitled)");
        let edition = self
            .exacts
            .edition
            .map(|e| format!("{} ed.", ordinal(e)))
            .unwrap_or_else(|| "n/a ed.".to_string());
        let extension = self.exacts.extension.as_deref().unwrap_or("n/a");

        write!(f, "{title}, {edition}, {extension}")?;
        if !self.nonexacts.authors.is_empty() {
            write!(f, " by {}", self.nonexacts.authors.join(", "))?;
        }
        if let Some(year) = self.exacts.year {
            write!(f, " ({year})")?;
        }
        Ok(())
    }
}

fn clean(value: &str) -> Option<String> {
    let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Builder for [`Record`]
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an author; blank names are ignored
    pub fn author(mut self, author: impl AsRef<str>) -> Self {
        if let Some(author) = clean(author.as_ref()) {
            self.record.nonexacts.authors.push(author);
        }
        self
    }

    pub fn authors<I, S>(self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        authors.into_iter().fold(self, |builder, a| builder.author(a))
    }

    pub fn title(mut self, title: impl AsRef<str>) -> Self {
        self.record.nonexacts.title = clean(title.as_ref());
        self
    }

    pub fn series(mut self, series: impl AsRef<str>) -> Self {
        self.record.nonexacts.series = clean(series.as_ref());
        self
    }

    pub fn publisher(mut self, publisher: impl AsRef<str>) -> Self {
        self.record.nonexacts.publisher = clean(publisher.as_ref());
        self
    }

    pub fn journal(mut self, journal: impl AsRef<str>) -> Self {
        self.record.nonexacts.journal = clean(journal.as_ref());
        self
    }

    pub fn year(mut self, year: u32) -> Self {
        self.record.exacts.year = Some(year);
        self
    }

    /// Set the year together with its comparison modifier
    pub fn year_filter(mut self, filter: YearFilter) -> Self {
        self.record.exacts.year = Some(filter.year);
        self.record.exacts.year_mod = filter.modifier;
        self
    }

    pub fn language(mut self, language: impl AsRef<str>) -> Self {
        self.record.exacts.language = clean(language.as_ref()).map(|l| l.to_lowercase());
        self
    }

    pub fn edition(mut self, edition: u32) -> Self {
        self.record.exacts.edition = Some(edition);
        self
    }

    /// File extension, without the leading dot
    pub fn extension(mut self, extension: impl AsRef<str>) -> Self {
        self.record.exacts.extension = clean(extension.as_ref().trim_start_matches('.'))
            .map(|e| e.to_lowercase());
        self
    }

    pub fn volume(mut self, volume: u32) -> Self {
        self.record.exacts.volume = Some(volume);
        self
    }

    pub fn number(mut self, number: u32) -> Self {
        self.record.exacts.number = Some(number);
        self
    }

    pub fn pages(mut self, pages: u32) -> Self {
        self.record.exacts.pages = Some(pages);
        self
    }

    /// Size in bytes
    pub fn size(mut self, size: u64) -> Self {
        self.record.exacts.size = Some(size);
        self
    }

    /// Add an ISBN; checksum failures are dropped
    pub fn isbn(mut self, candidate: impl AsRef<str>) -> Self {
        match isbn::normalize(candidate.as_ref()) {
            Some(valid) => {
                self.record.auxiliary.isbns.insert(valid);
            }
            None => tracing::trace!(isbn = candidate.as_ref(), "Dropping invalid ISBN"),
        }
        self
    }

    pub fn isbns<I, S>(self, isbns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        isbns.into_iter().fold(self, |builder, i| builder.isbn(i))
    }

    pub fn mirror(mut self, mirror: Url) -> Self {
        if !self.record.auxiliary.mirrors.contains(&mirror) {
            self.record.auxiliary.mirrors.push(mirror);
        }
        self
    }

    pub fn mirrors(self, mirrors: impl IntoIterator<Item = Url>) -> Self {
        mirrors.into_iter().fold(self, |builder, m| builder.mirror(m))
    }

    pub fn build(self) -> Record {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_derived() {
        let book = Record::builder().title("Victory of Eagles").build();
        assert_eq!(book.kind(), Kind::Book);

        let by_journal = Record::builder().title("On Things").journal("Nature").build();
        assert_eq!(by_journal.kind(), Kind::Paper);

        let by_volume = Record::builder().title("On Things").volume(3).build();
        assert_eq!(by_volume.kind(), Kind::Paper);

        let by_number = Record::builder().number(12).build();
        assert_eq!(by_number.kind(), Kind::Paper);
    }

    #[test]
    fn test_builder_normalizes_text() {
        let record = Record::builder()
            .author("  Naomi   Novik ")
            .author("   ")
            .title("")
            .series(" Temeraire ")
            .language("English")
            .extension(".EPUB")
            .build();

        assert_eq!(record.authors(), ["Naomi Novik".to_string()]);
        assert_eq!(record.title(), None);
        assert_eq!(record.nonexacts().series.as_deref(), Some("Temeraire"));
        assert_eq!(record.exacts().language.as_deref(), Some("english"));
        assert_eq!(record.exacts().extension.as_deref(), Some("epub"));
    }

    #[test]
    fn test_builder_drops_invalid_isbns() {
        let record = Record::builder()
            .isbns(["0306406152", "9780306406158", "978-0-345-49687-4", "nonsense"])
            .build();

        let isbns: Vec<_> = record.isbns().iter().cloned().collect();
        assert_eq!(isbns, vec!["9780306406157", "9780345496874"]);
    }

    #[test]
    fn test_duplicate_mirrors_collapse() {
        let url = Url::parse("https://example.org/get/1").unwrap();
        let record = Record::builder().mirror(url.clone()).mirror(url).build();
        assert_eq!(record.mirrors().len(), 1);
    }

    #[test]
    fn test_year_filter_parsing() {
        let cases = [
            ("2157", YearMod::Equal),
            ("=>2157", YearMod::AtLeast),
            (">=2157", YearMod::AtLeast),
            ("=<2157", YearMod::AtMost),
            ("<=2157", YearMod::AtMost),
            (">2157", YearMod::After),
            ("<2157", YearMod::Before),
        ];
        for (input, modifier) in cases {
            let filter: YearFilter = input.parse().unwrap();
            assert_eq!(filter, YearFilter { year: 2157, modifier }, "input {input}");
        }

        assert!("twenty".parse::<YearFilter>().is_err());
        assert!(">>2000".parse::<YearFilter>().is_err());
    }

    #[test]
    fn test_year_mod_accepts() {
        assert!(YearMod::Equal.accepts(2008, 2008));
        assert!(!YearMod::Equal.accepts(2009, 2008));
        assert!(YearMod::AtLeast.accepts(2008, 2008));
        assert!(YearMod::AtMost.accepts(2007, 2008));
        assert!(!YearMod::After.accepts(2008, 2008));
        assert!(YearMod::Before.accepts(2007, 2008));
    }

    #[test]
    fn test_ordinal() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(113), "113th");
    }

    #[test]
    fn test_display() {
        let record = Record::builder()
            .title("Victory of Eagles")
            .author("Naomi Novik")
            .edition(1)
            .extension("epub")
            .year(2008)
            .build();
        assert_eq!(
            record.to_string(),
            "Victory of Eagles, 1st ed., epub by Naomi Novik (2008)"
        );
    }
}
