//! Google Scholar adapter.
//!
//! Scholar pages hold ten results each and are addressed by a `start`
//! offset. Every result is a `div.gs_r` block: the title sits in
//! `h3.gs_rt`, the byline (authors, venue, year) in `div.gs_a`, and a direct
//! PDF link, when Scholar knows one, in `div.gs_ggs`. Only papers are
//! searched, by title or, failing that, by journal.

use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use url::Url;

use super::html::{absolute_link, clean, element_text, selector};
use super::paged::{has_captcha_markup, Page, Paged, PagedSource};
use super::{LogLevel, SourceCapabilities, SourceError, SourceHandle};
use crate::config::GscholarConfig;
use crate::models::Record;

const RESULTS_PER_PAGE: u32 = 10;

/// Markup of Scholar's "unusual traffic" page, matched case-insensitively
const CAPTCHA_MARKERS: &[&str] = &["gs_captcha_ccl", "gs_captcha_f", "action=\"/sorry/"];

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b").expect("year regex is valid"));

/// Google Scholar run through the generic pagination engine
pub type GscholarSource = Paged<Gscholar>;

/// Google Scholar page layout and query building
#[derive(Debug, Clone)]
pub struct Gscholar {
    mirrors: Vec<Url>,
    max_pages: u32,
}

impl Gscholar {
    /// Build from the `[gscholar]` configuration section
    pub fn from_config(config: &GscholarConfig) -> Result<Self, SourceError> {
        let mirrors = config
            .mirrors
            .iter()
            .map(|m| {
                Url::parse(m).map_err(|e| {
                    SourceError::InvalidRequest(format!("invalid scholar mirror {}: {}", m, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if mirrors.is_empty() {
            return Err(SourceError::InvalidRequest(
                "no scholar mirrors configured".to_string(),
            ));
        }

        Ok(Self {
            mirrors,
            max_pages: config.max_pages,
        })
    }
}

impl PagedSource for Gscholar {
    /// The search terms
    type Query = String;

    fn id(&self) -> &str {
        "gscholar"
    }

    fn name(&self) -> &str {
        "Google Scholar"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::PAPERS
    }

    fn mirrors(&self) -> &[Url] {
        &self.mirrors
    }

    fn max_pages(&self) -> u32 {
        self.max_pages
    }

    fn build_queries(&self, wanted: &Record) -> Vec<String> {
        wanted
            .title()
            .or(wanted.nonexacts().journal.as_deref())
            .map(|terms| vec![terms.to_string()])
            .unwrap_or_default()
    }

    fn page_url(&self, mirror: &Url, query: &String, page: u32) -> Result<Url, SourceError> {
        let mut url = mirror.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidRequest(format!("mirror {} cannot be a base", mirror)))?
            .pop_if_empty()
            .push("scholar");

        let start = page.saturating_sub(1) * RESULTS_PER_PAGE;
        url.query_pairs_mut()
            .clear()
            .append_pair("q", query)
            .append_pair("start", &start.to_string());

        Ok(url)
    }

    fn is_exhausted(&self, _query: &String, page: &Page, previous: Option<&Page>) -> bool {
        previous.is_some_and(|p| p.body == page.body)
            || results(&Html::parse_document(&page.body)).is_empty()
    }

    fn extract_records(
        &self,
        _query: &String,
        page: &Page,
        handle: &SourceHandle,
    ) -> Result<Vec<Record>, SourceError> {
        let document = Html::parse_document(&page.body);

        let mut records = Vec::new();
        for (index, block) in results(&document).into_iter().enumerate() {
            match paper_record(block, &page.url) {
                Ok(record) => records.push(record),
                Err(err) => handle.log(
                    LogLevel::Debug,
                    format!("Skipping result {} on page {}: {}", index, page.number, err),
                ),
            }
        }

        Ok(records)
    }

    fn is_captcha(&self, body: &str) -> bool {
        let lower = body.to_lowercase();
        has_captcha_markup(body) || CAPTCHA_MARKERS.iter().any(|marker| lower.contains(marker))
    }
}

fn results(document: &Html) -> Vec<ElementRef<'_>> {
    document.select(&selector("div.gs_r")).collect()
}

/// Drop leading `[PDF]`/`[CITATION]`-style type markers
fn strip_markers(title: &str) -> &str {
    let mut title = title.trim_start();
    while let Some(rest) = title.strip_prefix('[') {
        match rest.split_once(']') {
            Some((_, after)) => title = after.trim_start(),
            None => break,
        }
    }
    title
}

/// Authors, journal and year from a byline such as
/// `"J Doe, J Roe - Journal of Things, 2017 - things.org"`
fn parse_byline(byline: &str) -> (Vec<String>, Option<String>, Option<u32>) {
    let mut parts = byline.split(" - ");
    let authors = parts
        .next()
        .unwrap_or("")
        .split(',')
        .filter_map(|author| clean(author.trim_matches(|c: char| c == '…' || c.is_whitespace())))
        .collect();

    let venue = parts.next().unwrap_or("");
    let year = YEAR.find(venue).and_then(|m| m.as_str().parse().ok());
    let journal = match venue.rsplit_once(',') {
        Some((journal, _)) => journal,
        None if year.is_some() => "",
        None => venue,
    };
    let journal = clean(journal.trim_matches(|c: char| c == '…' || c.is_whitespace()));

    (authors, journal, year)
}

fn paper_record(block: ElementRef<'_>, base: &Url) -> Result<Record, SourceError> {
    let heading = block
        .select(&selector("h3.gs_rt"))
        .next()
        .ok_or_else(|| SourceError::Parse("result without a title".to_string()))?;
    let title_link = heading.select(&selector("a[href]")).next();
    let title = match title_link {
        Some(anchor) => element_text(anchor),
        None => strip_markers(&element_text(heading)).to_string(),
    };

    let link = block
        .select(&selector("div.gs_ggs a[href]"))
        .next()
        .or(title_link)
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| absolute_link(base, href))
        .ok_or_else(|| SourceError::Parse(format!("no link for {:?}", title)))?;

    let mut builder = Record::builder().title(&title).mirror(link);
    if let Some(byline) = block.select(&selector("div.gs_a")).next() {
        let (authors, journal, year) = parse_byline(&element_text(byline));
        builder = builder.authors(authors);
        if let Some(journal) = journal {
            builder = builder.journal(journal);
        }
        if let Some(year) = year {
            builder = builder.year(year);
        }
    }

    Ok(builder.build())
}
