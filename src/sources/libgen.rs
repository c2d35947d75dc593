//! Library Genesis adapter.
//!
//! Library Genesis splits its collection into categories with their own
//! search pages and result layouts, and only searches one field at a time:
//!
//! - Sci-Tech (`/search.php`): one query per title, author, series,
//!   publisher and ISBN. The site keeps serving the last page once the
//!   results run out, so a page identical to the previous one ends the query.
//! - Fiction (`/foreignfiction/index.php`): one query per title, author and
//!   series; an empty result table ends the query.
//! - Scientific articles (`/scimag/index.php`): one query by title and
//!   journal; a table without rows ends the query.
//!
//! Books are only searched in the first two, papers only in the last.

use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use url::Url;

use super::html::{absolute_link, clean, element_text, selector};
use super::paged::{Page, Paged, PagedSource};
use super::{LogLevel, SourceCapabilities, SourceError, SourceHandle};
use crate::config::LibgenConfig;
use crate::models::{Kind, Record, RecordBuilder};

static VOLUME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bvolume\s+(\d+)").expect("volume regex is valid"));
static ISSUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bissue\s+(\d+)").expect("issue regex is valid"));

/// Library Genesis run through the generic pagination engine
pub type LibgenSource = Paged<Libgen>;

/// A Library Genesis collection with its own search page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    SciTech,
    Fiction,
    Scimag,
}

impl Category {
    fn path_segments(self) -> &'static [&'static str] {
        match self {
            Category::SciTech => &["search.php"],
            Category::Fiction => &["foreignfiction", "index.php"],
            Category::Scimag => &["scimag", "index.php"],
        }
    }
}

/// One search against one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibgenQuery {
    pub category: Category,
    pub params: Vec<(&'static str, String)>,
}

impl LibgenQuery {
    fn new(category: Category, params: Vec<(&'static str, String)>) -> Self {
        Self { category, params }
    }

    /// Value of the parameter `key`, if present
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Library Genesis page layouts and query building
#[derive(Debug, Clone)]
pub struct Libgen {
    mirrors: Vec<Url>,
    results_per_page: u32,
    max_pages: u32,
}

impl Libgen {
    /// Build from the `[libgen]` configuration section
    pub fn from_config(config: &LibgenConfig) -> Result<Self, SourceError> {
        let mirrors = config
            .mirrors
            .iter()
            .map(|m| {
                Url::parse(m).map_err(|e| {
                    SourceError::InvalidRequest(format!("invalid libgen mirror {}: {}", m, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if mirrors.is_empty() {
            return Err(SourceError::InvalidRequest(
                "no libgen mirrors configured".to_string(),
            ));
        }

        Ok(Self {
            mirrors,
            results_per_page: config.results_per_page,
            max_pages: config.max_pages,
        })
    }

    fn scitech_queries(&self, wanted: &Record, queries: &mut Vec<LibgenQuery>) {
        let nonexacts = wanted.nonexacts();
        let mut push = |req: &str, column: &'static str| {
            queries.push(LibgenQuery::new(
                Category::SciTech,
                vec![
                    ("req", req.to_string()),
                    ("column", column.to_string()),
                    ("res", self.results_per_page.to_string()),
                    ("view", "simple".to_string()),
                ],
            ));
        };

        if let Some(title) = &nonexacts.title {
            push(title, "title");
        }
        for author in &nonexacts.authors {
            push(author, "author");
        }
        if let Some(series) = &nonexacts.series {
            push(series, "series");
        }
        if let Some(publisher) = &nonexacts.publisher {
            push(publisher, "publisher");
        }
        for isbn in wanted.isbns() {
            push(isbn, "identifier");
        }
    }

    fn fiction_queries(&self, wanted: &Record, queries: &mut Vec<LibgenQuery>) {
        let nonexacts = wanted.nonexacts();
        let extension = wanted
            .exacts()
            .extension
            .clone()
            .unwrap_or_else(|| "All".to_string());
        let mut push = |s: &str, column: u8| {
            queries.push(LibgenQuery::new(
                Category::Fiction,
                vec![
                    ("s", s.to_string()),
                    ("f_column", column.to_string()),
                    ("f_ext", extension.clone()),
                    ("f_group", "0".to_string()),
                    ("f_lang", "0".to_string()),
                ],
            ));
        };

        if let Some(title) = &nonexacts.title {
            push(title, 1);
        }
        for author in &nonexacts.authors {
            push(author, 2);
        }
        if let Some(series) = &nonexacts.series {
            push(series, 3);
        }
    }

    fn scimag_queries(&self, wanted: &Record, queries: &mut Vec<LibgenQuery>) {
        let nonexacts = wanted.nonexacts();
        let exacts = wanted.exacts();
        if nonexacts.title.is_none() && nonexacts.journal.is_none() {
            return;
        }

        let mut params = Vec::new();
        if let Some(title) = &nonexacts.title {
            params.push(("s", title.clone()));
        }
        if let Some(journal) = &nonexacts.journal {
            params.push(("journalid", journal.clone()));
        }
        if let Some(volume) = exacts.volume.or(exacts.year) {
            params.push(("v", volume.to_string()));
        }
        if let Some(pages) = exacts.pages {
            params.push(("p", pages.to_string()));
        }
        // Stay on Library Genesis when nothing is found
        params.push(("redirect", "0".to_string()));

        queries.push(LibgenQuery::new(Category::Scimag, params));
    }
}

impl PagedSource for Libgen {
    type Query = LibgenQuery;

    fn id(&self) -> &str {
        "libgen"
    }

    fn name(&self) -> &str {
        "Library Genesis"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::BOOKS | SourceCapabilities::PAPERS
    }

    fn mirrors(&self) -> &[Url] {
        &self.mirrors
    }

    fn max_pages(&self) -> u32 {
        self.max_pages
    }

    fn build_queries(&self, wanted: &Record) -> Vec<LibgenQuery> {
        let mut queries = Vec::new();
        match wanted.kind() {
            Kind::Book => {
                self.scitech_queries(wanted, &mut queries);
                self.fiction_queries(wanted, &mut queries);
            }
            Kind::Paper => self.scimag_queries(wanted, &mut queries),
        }
        queries
    }

    fn page_url(&self, mirror: &Url, query: &LibgenQuery, page: u32) -> Result<Url, SourceError> {
        let mut url = mirror.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidRequest(format!("mirror {} cannot be a base", mirror)))?
            .pop_if_empty()
            .extend(query.category.path_segments());

        url.query_pairs_mut()
            .clear()
            .extend_pairs(query.params.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("page", &page.to_string());

        Ok(url)
    }

    fn is_exhausted(&self, query: &LibgenQuery, page: &Page, previous: Option<&Page>) -> bool {
        let document = Html::parse_document(&page.body);
        match query.category {
            Category::SciTech => {
                previous.is_some_and(|p| p.body == page.body)
                    || scitech_table(&document)
                        .map(|table| scitech_rows(table).is_empty())
                        .unwrap_or(false)
            }
            Category::Fiction => fiction_rows(&document).map(|rows| rows.is_empty()).unwrap_or(true),
            Category::Scimag => scimag_rows(&document).map(|rows| rows.is_empty()).unwrap_or(true),
        }
    }

    fn extract_records(
        &self,
        query: &LibgenQuery,
        page: &Page,
        handle: &SourceHandle,
    ) -> Result<Vec<Record>, SourceError> {
        let document = Html::parse_document(&page.body);
        let rows: Vec<ElementRef<'_>> = match query.category {
            Category::SciTech => scitech_table(&document)
                .map(scitech_rows)
                .ok_or_else(|| no_table(page))?,
            Category::Fiction => fiction_rows(&document).ok_or_else(|| no_table(page))?,
            Category::Scimag => scimag_rows(&document).ok_or_else(|| no_table(page))?,
        };

        let mut records = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let parsed = match query.category {
                Category::SciTech => scitech_record(row, &page.url),
                Category::Fiction => fiction_record(row, &page.url),
                Category::Scimag => scimag_record(row, &page.url),
            };
            match parsed {
                Ok(record) => records.push(record),
                Err(err) => handle.log(
                    LogLevel::Warn,
                    format!("Skipping row {} on page {}: {}", index, page.number, err),
                ),
            }
        }

        Ok(records)
    }
}

fn no_table(page: &Page) -> SourceError {
    SourceError::Parse(format!("no result table at {}", page.url))
}

fn has_cells(row: &ElementRef<'_>) -> bool {
    row.select(&selector("td")).next().is_some()
}

fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.select(&selector("td")).collect()
}

/// Leading decimal digits of `text`, e.g. `2` for `"2nd"`
fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Convert a size such as `"1337 kb"` or `"2 Mb"` to bytes.
pub fn translate_size(text: &str) -> Option<u64> {
    let mut parts = text.split_whitespace();
    let count: f64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?.chars().next()?;

    let multiplier = match unit.to_ascii_lowercase() {
        'b' => 1.0,
        'k' => 1e3,
        'm' => 1e6,
        'g' => 1e9,
        _ => return None,
    };
    Some((count * multiplier).round() as u64)
}

fn split_authors(text: &str) -> Vec<String> {
    text.split([',', ';']).filter_map(clean).collect()
}

fn links(cells: &[ElementRef<'_>], base: &Url) -> Vec<Url> {
    let anchor = selector("a[href]");
    cells
        .iter()
        .flat_map(|cell| cell.select(&anchor).collect::<Vec<_>>())
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| absolute_link(base, href))
        .collect()
}

fn scitech_table<'a>(document: &'a Html) -> Option<ElementRef<'a>> {
    document.select(&selector("table.c")).next()
}

/// Result rows; the header and any layout rows lack a numeric id
fn scitech_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let td = selector("td");
    table
        .select(&selector("tr"))
        .filter(|row| {
            row.select(&td)
                .next()
                .map(element_text)
                .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        })
        .collect()
}

fn scitech_record(row: ElementRef<'_>, base: &Url) -> Result<Record, SourceError> {
    let cells = cells(row);
    if cells.len() < 10 {
        return Err(SourceError::Parse(format!(
            "expected at least 10 columns, found {}",
            cells.len()
        )));
    }

    let anchor = selector("a");
    let stei = cells[2];

    // The title link carries the numeric id; series, edition and ISBNs
    // live around or inside it.
    let title_link = stei
        .select(&anchor)
        .find(|a| {
            a.value()
                .id()
                .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        })
        .ok_or_else(|| SourceError::Parse("no title link".to_string()))?;

    let series = stei
        .select(&anchor)
        .next()
        .filter(|a| a.value().attr("title").is_none() && *a != title_link)
        .map(element_text);

    let title: String = title_link
        .children()
        .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
        .collect();

    let mut builder = Record::builder()
        .authors(split_authors(&element_text(cells[1])))
        .title(title)
        .series(series.unwrap_or_default())
        .publisher(element_text(cells[3]))
        .language(element_text(cells[6]))
        .extension(element_text(cells[8]))
        .mirrors(links(&cells[9..cells.len() - 1], base));

    for font in title_link.children().filter_map(ElementRef::wrap) {
        if font.value().name() != "font" {
            continue;
        }
        let text = element_text(font);
        match text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            Some(edition) => {
                if let Some(edition) = leading_number(edition) {
                    builder = builder.edition(edition);
                }
            }
            None => builder = builder.isbns(text.split(',')),
        }
    }

    builder = optional(builder, leading_number(&element_text(cells[4])), RecordBuilder::year);
    builder = optional(builder, leading_number(&element_text(cells[5])), RecordBuilder::pages);
    builder = optional(builder, translate_size(&element_text(cells[7])), RecordBuilder::size);

    Ok(builder.build())
}

fn optional<T>(
    builder: RecordBuilder,
    value: Option<T>,
    set: fn(RecordBuilder, T) -> RecordBuilder,
) -> RecordBuilder {
    match value {
        Some(value) => set(builder, value),
        None => builder,
    }
}

/// Data rows of the last `rules="rows"` table; header rows hold only `th`
fn fiction_rows(document: &Html) -> Option<Vec<ElementRef<'_>>> {
    let table = document.select(&selector(r#"table[rules="rows"]"#)).last()?;
    Some(table.select(&selector("tr")).filter(has_cells).collect())
}

fn fiction_record(row: ElementRef<'_>, base: &Url) -> Result<Record, SourceError> {
    let cells = cells(row);
    if cells.len() != 5 {
        return Err(SourceError::Parse(format!(
            "expected 5 columns, found {}",
            cells.len()
        )));
    }

    // "epub(1 Mb)"
    let files = element_text(cells[4]);
    let (extension, size) = match files.split_once('(') {
        Some((extension, rest)) => (extension, rest.split(')').next().and_then(translate_size)),
        None => (files.as_str(), None),
    };

    let builder = Record::builder()
        .authors(split_authors(&element_text(cells[0])))
        .series(element_text(cells[1]))
        .title(element_text(cells[2]))
        .language(element_text(cells[3]))
        .extension(extension)
        .mirrors(links(&cells[4..], base));

    Ok(optional(builder, size, RecordBuilder::size).build())
}

fn scimag_rows(document: &Html) -> Option<Vec<ElementRef<'_>>> {
    let table = document.select(&selector("table.catalog")).next()?;
    Some(table.select(&selector("tr")).filter(has_cells).collect())
}

fn first_link_text(cell: ElementRef<'_>) -> String {
    cell.select(&selector("a"))
        .next()
        .map(element_text)
        .unwrap_or_else(|| element_text(cell))
}

fn scimag_record(row: ElementRef<'_>, base: &Url) -> Result<Record, SourceError> {
    let cells = cells(row);
    if cells.len() < 5 {
        return Err(SourceError::Parse(format!(
            "expected at least 5 columns, found {}",
            cells.len()
        )));
    }

    let journal_text = element_text(cells[2]);
    let capture = |pattern: &Regex| {
        pattern
            .captures(&journal_text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
    };

    let builder = Record::builder()
        .authors(element_text(cells[0]).split(';'))
        .title(first_link_text(cells[1]))
        .journal(first_link_text(cells[2]))
        .mirrors(links(&cells[4..], base));
    let builder = optional(builder, capture(&VOLUME), RecordBuilder::volume);
    let builder = optional(builder, capture(&ISSUE), RecordBuilder::number);
    let builder = optional(builder, translate_size(&element_text(cells[3])), RecordBuilder::size);

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCITECH_PAGE: &str = r#"<html><body>
<table width=100% cellspacing=1 cellpadding=1 rules=rows class=c align=center>
<tr valign=top bgcolor=#C0C0C0><td><b>ID</b></td><td><b>Author(s)</b></td><td><b>Title</b></td><td><b>Publisher</b></td><td><b>Year</b></td><td><b>Pages</b></td><td><b>Language</b></td><td><b>Size</b></td><td><b>Extension</b></td><td colspan=3><b>Mirrors</b></td></tr>
<tr valign=top><td>1234</td>
<td><a href="search.php?req=Naomi+Novik&column=author">Naomi Novik</a></td>
<td width=500><a href="search.php?req=Temeraire&column=series"><font face=Times color=green><i>Temeraire</i></font></a><br><a href="book/index.php?md5=ABC" title="" id=1234>Victory of Eagles<br> <font face=Times color=green><i>[1st]</i></font> <font face=Times color=green><i>9780345496874, 0345496876</i></font></a></td>
<td>Del Rey</td><td nowrap>2008</td><td>350</td><td>English</td><td nowrap>1337 kb</td><td nowrap>epub</td>
<td><a href="http://library.lol/main/ABC" title="Gen.lib.rus.ec">[1]</a></td>
<td><a href="/ads.php?md5=ABC" title="Libgen.lc">[2]</a></td>
<td><a href="librarian/registration?md5=ABC" title="Libgen Librarian">[edit]</a></td>
</tr>
<tr valign=top><td>5678</td>
<td><a href="search.php?req=Jane+Roe">Jane Roe</a>, <a href="search.php?req=John+Doe">John Doe</a></td>
<td width=500><a href="book/index.php?md5=DEF" title="" id=5678>Cooking for Engineers <font face=Times color=green><i>[2nd ed.]</i></font> <font face=Times color=green><i>1234567890</i></font></a></td>
<td></td><td nowrap>n/a</td><td>xii+200</td><td>English</td><td nowrap>2 Mb</td><td nowrap>pdf</td>
<td><a href="http://library.lol/main/DEF">[1]</a></td>
<td><a href="librarian/registration?md5=DEF">[edit]</a></td>
</tr>
<tr valign=top><td>9999</td><td>Broken</td><td>row</td></tr>
</table></body></html>"#;

    const EMPTY_SCITECH_PAGE: &str = r#"<html><body>
<table rules=rows class=c><tr><td><b>ID</b></td><td><b>Author(s)</b></td></tr></table>
</body></html>"#;

    const FICTION_PAGE: &str = r#"<html><body>
<table rules="rows" class="menu"><tr><td>navigation</td></tr></table>
<table rules="rows" class="catalog">
<tr><th>Author(s)</th><th>Series</th><th>Title</th><th>Language</th><th>File</th></tr>
<tr><td>Naomi Novik</td><td>Temeraire</td><td>Victory of Eagles</td><td>English</td>
<td>EPUB(1 Mb)<div><a href="/foreignfiction/ads.php?md5=ABC">[1]</a><a href="http://fiction.example/get/ABC">[2]</a></div></td></tr>
</table></body></html>"#;

    const EMPTY_FICTION_PAGE: &str = r#"<html><body>
<table rules="rows" class="menu"><tr><td>navigation</td></tr></table>
<table rules="rows" class="catalog"></table>
</body></html>"#;

    const HEADER_ONLY_FICTION_PAGE: &str = r#"<html><body>
<table rules="rows" class="menu"><tr><td>navigation</td></tr></table>
<table rules="rows" class="catalog">
<tr><th>Author(s)</th><th>Series</th><th>Title</th><th>Language</th><th>File</th></tr>
</table></body></html>"#;

    const SCIMAG_PAGE: &str = r#"<html><body>
<table class="catalog"><thead><tr><th>Author(s)</th><th>Article</th><th>Journal</th><th>Size</th><th>Mirrors</th></tr></thead>
<tbody><tr>
<td>Doe, J.; Roe, J.</td>
<td><p><a href="/scimag/10.1000/xyz123">On the Growth of Things</a></p><p>DOI: 10.1000/xyz123</p></td>
<td><p><a href="/scimag/journals/1">Journal of Things</a></p><p>volume 12 (issue 3) : 45-67</p></td>
<td>512 kb</td>
<td><ul class="record_mirrors"><li><a href="http://mirror.example/10.1000/xyz123">[1]</a></li></ul></td>
</tr></tbody></table></body></html>"#;

    fn libgen() -> Libgen {
        Libgen::from_config(&LibgenConfig {
            mirrors: vec!["https://libgen.test".to_string()],
            results_per_page: 25,
            max_pages: 3,
        })
        .unwrap()
    }

    fn page(body: &str, number: u32) -> Page {
        Page {
            url: Url::parse("https://libgen.test/search.php?req=x").unwrap(),
            number,
            body: body.to_string(),
        }
    }

    fn query(category: Category) -> LibgenQuery {
        LibgenQuery::new(category, Vec::new())
    }

    fn handle() -> SourceHandle {
        SourceHandle::detached("libgen", 1).0
    }

    #[test]
    fn test_translate_size() {
        assert_eq!(translate_size("1337 kb"), Some(1_337_000));
        assert_eq!(translate_size("2 Mb"), Some(2_000_000));
        assert_eq!(translate_size("1 GB"), Some(1_000_000_000));
        assert_eq!(translate_size("1.5 Mb"), Some(1_500_000));
        assert_eq!(translate_size("512 bytes"), Some(512));
        assert_eq!(translate_size("huge"), None);
        assert_eq!(translate_size("12 parsecs"), None);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("1st"), Some(1));
        assert_eq!(leading_number(" 2nd ed."), Some(2));
        assert_eq!(leading_number("xii+200"), None);
    }

    #[test]
    fn test_book_queries() {
        let wanted = Record::builder()
            .title("Victory of Eagles")
            .author("Naomi Novik")
            .series("Temeraire")
            .extension("epub")
            .isbn("9780345496874")
            .build();

        let queries = libgen().build_queries(&wanted);
        let scitech: Vec<_> = queries
            .iter()
            .filter(|q| q.category == Category::SciTech)
            .collect();
        let fiction: Vec<_> = queries
            .iter()
            .filter(|q| q.category == Category::Fiction)
            .collect();

        assert_eq!(scitech.len(), 4);
        assert_eq!(fiction.len(), 3);
        assert!(queries.iter().all(|q| q.category != Category::Scimag));

        assert_eq!(scitech[0].param("req"), Some("Victory of Eagles"));
        assert_eq!(scitech[0].param("column"), Some("title"));
        assert_eq!(scitech[0].param("res"), Some("25"));
        assert_eq!(scitech[3].param("column"), Some("identifier"));
        assert_eq!(fiction[1].param("f_column"), Some("2"));
        assert_eq!(fiction[1].param("f_ext"), Some("epub"));
    }

    #[test]
    fn test_paper_queries() {
        let wanted = Record::builder()
            .title("On the Growth of Things")
            .journal("Journal of Things")
            .volume(12)
            .build();

        let queries = libgen().build_queries(&wanted);
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].category, Category::Scimag);
        assert_eq!(queries[0].param("s"), Some("On the Growth of Things"));
        assert_eq!(queries[0].param("journalid"), Some("Journal of Things"));
        assert_eq!(queries[0].param("v"), Some("12"));
        assert_eq!(queries[0].param("redirect"), Some("0"));
    }

    #[test]
    fn test_page_url_keeps_mirror_prefix() {
        let libgen = libgen();
        let mirror = Url::parse("http://127.0.0.1:1234/mirror-a/").unwrap();
        let query = LibgenQuery::new(
            Category::Fiction,
            vec![("s", "Victory of Eagles".to_string()), ("f_column", "1".to_string())],
        );

        let url = libgen.page_url(&mirror, &query, 2).unwrap();
        assert_eq!(url.path(), "/mirror-a/foreignfiction/index.php");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("s".to_string(), "Victory of Eagles".to_string()),
                ("f_column".to_string(), "1".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_scitech_extraction() {
        let records = libgen()
            .extract_records(&query(Category::SciTech), &page(SCITECH_PAGE, 1), &handle())
            .unwrap();
        assert_eq!(records.len(), 2);

        let eagles = &records[0];
        assert_eq!(eagles.title(), Some("Victory of Eagles"));
        assert_eq!(eagles.authors(), ["Naomi Novik".to_string()]);
        assert_eq!(eagles.nonexacts().series.as_deref(), Some("Temeraire"));
        assert_eq!(eagles.nonexacts().publisher.as_deref(), Some("Del Rey"));
        assert_eq!(eagles.exacts().edition, Some(1));
        assert_eq!(eagles.exacts().year, Some(2008));
        assert_eq!(eagles.exacts().pages, Some(350));
        assert_eq!(eagles.exacts().language.as_deref(), Some("english"));
        assert_eq!(eagles.exacts().size, Some(1_337_000));
        assert_eq!(eagles.exacts().extension.as_deref(), Some("epub"));
        assert_eq!(eagles.isbns().len(), 1);
        assert!(eagles.isbns().contains("9780345496874"));
        assert_eq!(
            eagles.mirrors().iter().map(Url::as_str).collect::<Vec<_>>(),
            vec!["http://library.lol/main/ABC", "https://libgen.test/ads.php?md5=ABC"]
        );

        let cooking = &records[1];
        assert_eq!(cooking.title(), Some("Cooking for Engineers"));
        assert_eq!(cooking.nonexacts().series, None);
        assert_eq!(cooking.nonexacts().publisher, None);
        assert_eq!(cooking.authors().len(), 2);
        assert_eq!(cooking.exacts().edition, Some(2));
        assert_eq!(cooking.exacts().year, None);
        assert_eq!(cooking.exacts().pages, None);
        assert!(cooking.isbns().is_empty());
        assert_eq!(cooking.mirrors().len(), 1);
    }

    #[test]
    fn test_scitech_exhaustion() {
        let libgen = libgen();
        let q = query(Category::SciTech);
        let first = page(SCITECH_PAGE, 1);
        let repeat = page(SCITECH_PAGE, 2);

        assert!(!libgen.is_exhausted(&q, &first, None));
        assert!(libgen.is_exhausted(&q, &repeat, Some(&first)));
        assert!(libgen.is_exhausted(&q, &page(EMPTY_SCITECH_PAGE, 1), None));
        assert!(!libgen.is_exhausted(&q, &page("<html>maintenance</html>", 1), None));
    }

    #[test]
    fn test_missing_table_fails_the_page() {
        let result = libgen().extract_records(
            &query(Category::SciTech),
            &page("<html>maintenance</html>", 1),
            &handle(),
        );
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_fiction_extraction() {
        let libgen = libgen();
        let q = query(Category::Fiction);
        let records = libgen
            .extract_records(&q, &page(FICTION_PAGE, 1), &handle())
            .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.title(), Some("Victory of Eagles"));
        assert_eq!(record.nonexacts().series.as_deref(), Some("Temeraire"));
        assert_eq!(record.exacts().extension.as_deref(), Some("epub"));
        assert_eq!(record.exacts().size, Some(1_000_000));
        assert_eq!(record.mirrors().len(), 2);

        assert!(!libgen.is_exhausted(&q, &page(FICTION_PAGE, 1), None));
        assert!(libgen.is_exhausted(&q, &page(EMPTY_FICTION_PAGE, 2), None));
        assert!(libgen.is_exhausted(&q, &page(HEADER_ONLY_FICTION_PAGE, 2), None));
        assert!(libgen.is_exhausted(&q, &page("<html>maintenance</html>", 2), None));
    }

    #[test]
    fn test_scimag_extraction() {
        let libgen = libgen();
        let q = query(Category::Scimag);
        let records = libgen
            .extract_records(&q, &page(SCIMAG_PAGE, 1), &handle())
            .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.kind(), Kind::Paper);
        assert_eq!(record.title(), Some("On the Growth of Things"));
        assert_eq!(record.nonexacts().journal.as_deref(), Some("Journal of Things"));
        assert_eq!(record.authors(), ["Doe, J.".to_string(), "Roe, J.".to_string()]);
        assert_eq!(record.exacts().volume, Some(12));
        assert_eq!(record.exacts().number, Some(3));
        assert_eq!(record.exacts().size, Some(512_000));
        assert_eq!(record.mirrors().len(), 1);

        assert!(!libgen.is_exhausted(&q, &page(SCIMAG_PAGE, 1), None));
        assert!(libgen.is_exhausted(&q, &page("<table class=catalog></table>", 1), None));
    }

    #[test]
    fn test_invalid_mirrors_are_rejected() {
        let config = LibgenConfig {
            mirrors: vec!["::not a url".to_string()],
            ..LibgenConfig::default()
        };
        assert!(Libgen::from_config(&config).is_err());

        let config = LibgenConfig {
            mirrors: Vec::new(),
            ..LibgenConfig::default()
        };
        assert!(Libgen::from_config(&config).is_err());
    }
}
