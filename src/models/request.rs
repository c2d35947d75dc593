//! Turning caller criteria into either a search or a fetch.

use super::record::{Record, YearFilter};
use crate::identifiers::isbn;

/// Errors raised while validating caller criteria
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("an identifier cannot be combined with other search criteria")]
    IdentExclusive,

    #[error("no search criteria given")]
    Empty,

    #[error("at least one of author, title, series, publisher, journal or ISBN is required")]
    MissingInclusive,

    #[error("invalid ISBN: {0}")]
    InvalidIsbn(String),
}

/// Named, optional search criteria as supplied by a caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub authors: Vec<String>,
    pub title: Option<String>,
    pub series: Option<String>,
    pub publisher: Option<String>,
    pub journal: Option<String>,
    pub year: Option<YearFilter>,
    pub language: Option<String>,
    pub edition: Option<u32>,
    pub extension: Option<String>,
    pub volume: Option<u32>,
    pub number: Option<u32>,
    pub isbn: Option<String>,
    /// DOI or URL to resolve and fetch directly
    pub ident: Option<String>,
}

/// What the caller asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Search(Record),
    Fetch(String),
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl Criteria {
    fn has_inclusive(&self) -> bool {
        self.authors.iter().any(|a| !a.trim().is_empty())
            || is_set(&self.title)
            || is_set(&self.series)
            || is_set(&self.publisher)
            || is_set(&self.journal)
            || is_set(&self.isbn)
    }

    fn has_exact(&self) -> bool {
        self.year.is_some()
            || is_set(&self.language)
            || self.edition.is_some()
            || is_set(&self.extension)
            || self.volume.is_some()
            || self.number.is_some()
    }

    /// Validate the criteria and build the corresponding request.
    pub fn into_request(self) -> Result<Request, RequestError> {
        let searching = self.has_inclusive() || self.has_exact();

        if let Some(ident) = self.ident.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
            if searching {
                return Err(RequestError::IdentExclusive);
            }
            return Ok(Request::Fetch(ident.to_string()));
        }

        if !searching {
            return Err(RequestError::Empty);
        }
        if !self.has_inclusive() {
            return Err(RequestError::MissingInclusive);
        }

        let mut builder = Record::builder().authors(&self.authors);

        if let Some(candidate) = self.isbn.as_deref().filter(|i| !i.trim().is_empty()) {
            if !isbn::is_valid(candidate) {
                return Err(RequestError::InvalidIsbn(candidate.to_string()));
            }
            builder = builder.isbn(candidate);
        }
        if let Some(title) = &self.title {
            builder = builder.title(title);
        }
        if let Some(series) = &self.series {
            builder = builder.series(series);
        }
        if let Some(publisher) = &self.publisher {
            builder = builder.publisher(publisher);
        }
        if let Some(journal) = &self.journal {
            builder = builder.journal(journal);
        }
        if let Some(year) = self.year {
            builder = builder.year_filter(year);
        }
        if let Some(language) = &self.language {
            builder = builder.language(language);
        }
        if let Some(edition) = self.edition {
            builder = builder.edition(edition);
        }
        if let Some(extension) = &self.extension {
            builder = builder.extension(extension);
        }
        if let Some(volume) = self.volume {
            builder = builder.volume(volume);
        }
        if let Some(number) = self.number {
            builder = builder.number(number);
        }

        Ok(Request::Search(builder.build()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::YearMod;

    #[test]
    fn test_search_request() {
        let criteria = Criteria {
            authors: vec!["Naomi Novik".to_string()],
            title: Some("Victory of Eagles".to_string()),
            year: Some(">=2008".parse().unwrap()),
            extension: Some("EPUB".to_string()),
            ..Default::default()
        };

        let Request::Search(wanted) = criteria.into_request().unwrap() else {
            panic!("expected a search request");
        };
        assert_eq!(wanted.authors(), ["Naomi Novik".to_string()]);
        assert_eq!(wanted.title(), Some("Victory of Eagles"));
        assert_eq!(wanted.exacts().year, Some(2008));
        assert_eq!(wanted.exacts().year_mod, YearMod::AtLeast);
        assert_eq!(wanted.exacts().extension.as_deref(), Some("epub"));
    }

    #[test]
    fn test_fetch_request() {
        let criteria = Criteria {
            ident: Some(" 10.1000/xyz123 ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            criteria.into_request(),
            Ok(Request::Fetch("10.1000/xyz123".to_string()))
        );
    }

    #[test]
    fn test_ident_is_exclusive() {
        let criteria = Criteria {
            title: Some("Anything".to_string()),
            ident: Some("10.1000/xyz123".to_string()),
            ..Default::default()
        };
        assert_eq!(criteria.into_request(), Err(RequestError::IdentExclusive));

        let criteria = Criteria {
            edition: Some(2),
            ident: Some("10.1000/xyz123".to_string()),
            ..Default::default()
        };
        assert_eq!(criteria.into_request(), Err(RequestError::IdentExclusive));
    }

    #[test]
    fn test_empty_and_exact_only() {
        assert_eq!(Criteria::default().into_request(), Err(RequestError::Empty));

        let exact_only = Criteria {
            language: Some("english".to_string()),
            ..Default::default()
        };
        assert_eq!(exact_only.into_request(), Err(RequestError::MissingInclusive));
    }

    #[test]
    fn test_invalid_isbn_is_rejected() {
        let criteria = Criteria {
            isbn: Some("9780306406158".to_string()),
            ..Default::default()
        };
        assert_eq!(
            criteria.into_request(),
            Err(RequestError::InvalidIsbn("9780306406158".to_string()))
        );
    }
}
