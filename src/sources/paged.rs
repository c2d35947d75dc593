//! Generic pagination and mirror fallback for HTML catalogues.
//!
//! An adapter implements [`PagedSource`]: how to turn the wanted record into
//! queries, how to address a page on a mirror, when a category is exhausted
//! and how to read records out of a page. [`Paged`] drives it:
//!
//! - queries run one after the other, checking for cancellation between
//!   queries and between pages;
//! - page 1 of a query is tried on each mirror in turn, starting at the
//!   source's [`MirrorCursor`]; the first mirror that answers is used for the
//!   rest of that query and becomes the cursor;
//! - a failure after page 1 ends that query with what it already fed, and the
//!   next query starts on the following mirror;
//! - a captcha fails the query outright, without trying other mirrors, on
//!   any page.

use async_trait::async_trait;
use std::fmt;
use url::Url;

use super::{LogLevel, Source, SourceCapabilities, SourceError, SourceHandle};
use crate::models::Record;
use crate::utils::HttpClient;

/// Markup of common bot-check interstitials, matched case-insensitively.
///
/// Only widget and form markup is listed; result pages can mention the word
/// "captcha" in titles or in the echoed query.
const CAPTCHA_MARKERS: &[&str] = &[
    "g-recaptcha",
    "h-captcha",
    "cf-challenge",
    "cf_chl_",
    "id=\"captcha-form\"",
    "/recaptcha/api.js",
];

/// One fetched result page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: Url,
    /// 1-based page number
    pub number: u32,
    pub body: String,
}

/// Contract for a paginated, mirrored catalogue
pub trait PagedSource: Send + Sync + fmt::Debug {
    /// One search against one category with one set of parameters
    type Query: Send + Sync + fmt::Debug;

    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::BOOKS | SourceCapabilities::PAPERS
    }

    /// Mirror base URLs in preference order
    fn mirrors(&self) -> &[Url];

    /// Upper bound on pages fetched for a single query
    fn max_pages(&self) -> u32;

    /// Queries to run for `wanted`, typically one per populated field and category
    fn build_queries(&self, wanted: &Record) -> Vec<Self::Query>;

    /// Address of `page` (1-based) of `query` on `mirror`
    fn page_url(&self, mirror: &Url, query: &Self::Query, page: u32) -> Result<Url, SourceError>;

    /// Whether `page` holds nothing new, ending the query.
    ///
    /// `previous` is the page fetched just before, if any.
    fn is_exhausted(&self, query: &Self::Query, page: &Page, previous: Option<&Page>) -> bool;

    /// Records on `page`. Bad rows are logged through `handle` and skipped;
    /// `Err` means the page as a whole could not be read.
    fn extract_records(
        &self,
        query: &Self::Query,
        page: &Page,
        handle: &SourceHandle,
    ) -> Result<Vec<Record>, SourceError>;

    /// Whether `body` is a bot check instead of content.
    ///
    /// Adapters with a site-specific challenge page extend this.
    fn is_captcha(&self, body: &str) -> bool {
        has_captcha_markup(body)
    }
}

/// Whether `body` carries the markup of a common bot-check widget
pub fn has_captcha_markup(body: &str) -> bool {
    let lower = body.to_lowercase();
    CAPTCHA_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Which mirror a source tries first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorCursor {
    start: usize,
}

impl MirrorCursor {
    /// Mirror indices in probing order
    pub fn order(&self, len: usize) -> impl Iterator<Item = usize> {
        let start = if len == 0 { 0 } else { self.start % len };
        (0..len).map(move |i| (start + i) % len)
    }

    /// Prefer `index` from now on
    pub fn pin(&mut self, index: usize) {
        self.start = index;
    }

    /// Move past `index`, which just failed
    pub fn skip(&mut self, index: usize, len: usize) {
        if len > 0 {
            self.start = (index + 1) % len;
        }
    }

    pub fn current(&self) -> usize {
        self.start
    }
}

/// Runs a [`PagedSource`] as a [`Source`]
#[derive(Debug)]
pub struct Paged<A> {
    adapter: A,
    client: HttpClient,
}

impl<A: PagedSource> Paged<A> {
    pub fn new(adapter: A, client: HttpClient) -> Self {
        Self { adapter, client }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    async fn fetch_page(&self, url: Url, number: u32) -> Result<Page, SourceError> {
        tracing::debug!(source = self.adapter.id(), url = %url, page = number, "Fetching page");

        let response = self
            .client
            .client()
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("{}: {}", url, e)))?;

        if self.adapter.is_captcha(&body) {
            return Err(SourceError::Captcha(url.to_string()));
        }

        Ok(Page { url, number, body })
    }

    /// Find a mirror that serves page 1 of `query`.
    async fn first_page(
        &self,
        query: &A::Query,
        handle: &SourceHandle,
        cursor: &mut MirrorCursor,
    ) -> Result<Option<(usize, Page)>, SourceError> {
        let mirrors = self.adapter.mirrors();
        let mut last_error = None;

        for index in cursor.order(mirrors.len()) {
            if handle.terminating() {
                return Ok(None);
            }

            let mirror = &mirrors[index];
            let url = self.adapter.page_url(mirror, query, 1)?;
            match self.fetch_page(url, 1).await {
                Ok(page) => {
                    cursor.pin(index);
                    return Ok(Some((index, page)));
                }
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    handle.log(
                        LogLevel::Warn,
                        format!("Mirror {} failed: {}; trying the next one", mirror, err),
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SourceError::InvalidRequest("no mirrors configured".to_string())))
    }

    /// Run one query to exhaustion, returning the number of pages read.
    async fn run_query(
        &self,
        query: &A::Query,
        handle: &SourceHandle,
        cursor: &mut MirrorCursor,
    ) -> Result<u32, SourceError> {
        let Some((mirror_index, mut page)) = self.first_page(query, handle, cursor).await? else {
            return Ok(0);
        };
        let mirror = &self.adapter.mirrors()[mirror_index];
        let max_pages = self.adapter.max_pages().max(1);
        let mut previous: Option<Page> = None;
        let mut pages_read = 0;

        loop {
            if self.adapter.is_exhausted(query, &page, previous.as_ref()) {
                handle.log(LogLevel::Debug, format!("{:?} exhausted at page {}", query, page.number));
                break;
            }

            match self.adapter.extract_records(query, &page, handle) {
                Ok(records) => {
                    for record in records {
                        handle.feed(record).await;
                    }
                }
                Err(err) => handle.log(
                    LogLevel::Warn,
                    format!("Skipping page {} of {:?}: {}", page.number, query, err),
                ),
            }
            pages_read += 1;

            if handle.terminating() || page.number >= max_pages {
                break;
            }

            let next = page.number + 1;
            let url = self.adapter.page_url(mirror, query, next)?;
            match self.fetch_page(url, next).await {
                Ok(fetched) => previous = Some(std::mem::replace(&mut page, fetched)),
                Err(err @ SourceError::Captcha(_)) => return Err(err),
                Err(err) => {
                    handle.log(
                        LogLevel::Warn,
                        format!("Page {} of {:?} failed on {}: {}", next, query, mirror, err),
                    );
                    cursor.skip(mirror_index, self.adapter.mirrors().len());
                    break;
                }
            }
        }

        Ok(pages_read)
    }
}

#[async_trait]
impl<A> Source for Paged<A>
where
    A: PagedSource + 'static,
{
    fn id(&self) -> &str {
        self.adapter.id()
    }

    fn name(&self) -> &str {
        self.adapter.name()
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.adapter.capabilities()
    }

    async fn find(&self, wanted: &Record, handle: &SourceHandle) -> Result<(), SourceError> {
        let queries = self.adapter.build_queries(wanted);
        if queries.is_empty() {
            handle.log(LogLevel::Debug, "Nothing to query for this record");
            return Ok(());
        }

        let mut cursor = MirrorCursor::default();
        let mut failed = 0;
        let mut last_error = None;

        for query in &queries {
            if handle.terminating() {
                handle.log(LogLevel::Debug, "Terminating; skipping remaining queries");
                break;
            }

            match self.run_query(query, handle, &mut cursor).await {
                Ok(pages) => handle.log(LogLevel::Debug, format!("{:?} read {} page(s)", query, pages)),
                Err(err) => {
                    handle.log(LogLevel::Warn, format!("Skipping {:?}: {}", query, err));
                    failed += 1;
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(last) if failed == queries.len() => Err(SourceError::AllQueriesFailed {
                attempted: failed,
                last: Box::new(last),
            }),
            _ => Ok(()),
        }
    }
}
