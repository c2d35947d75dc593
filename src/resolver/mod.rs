//! Identifier resolution and download.
//!
//! An identifier is either a direct link to a document, a link to a
//! paywalled landing page, or a DOI. Direct links are downloaded as they
//! are. Everything else goes through the resolver mirrors, which serve a
//! page embedding the document in an `iframe` (or `embed`). A mirror page
//! without one, usually a bot check, leaves the identifier unresolved.

use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

use crate::config::ResolverConfig;
use crate::identifiers::doi;
use crate::utils::HttpClient;

/// Extensions of links that are downloaded without resolution
const DIRECT_EXTENSIONS: &[&str] = &["pdf", "djvu"];

/// Characters of the URL's last path segment kept in a generated name
const NAME_SUFFIX_LEN: usize = 20;

/// What kind of identifier was supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    /// A link straight to the document
    Direct,
    /// A link to a landing page that needs resolving
    Paywalled,
    Doi,
}

/// Errors from classifying, resolving or fetching an identifier
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Not a URL or DOI: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid resolver mirror {mirror}: {reason}")]
    InvalidMirror { mirror: String, reason: String },

    #[error("All {attempted} resolver mirrors failed; last error: {last}")]
    MirrorsExhausted { attempted: usize, last: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of resolving an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Url),
    /// A mirror answered without a document link
    Unresolved,
}

/// A downloaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    /// Final URL after redirects
    pub url: Url,
    /// File name derived from the content and the URL
    pub name: String,
}

impl Fetched {
    /// Write the document into `dir` under its generated name.
    pub async fn save(&self, dir: &Path) -> Result<PathBuf, ResolveError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.name);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

/// Classify `ident` without touching the network.
pub fn classify(ident: &str) -> Result<IdentKind, ResolveError> {
    let ident = ident.trim();
    if doi::is_doi(ident) {
        return Ok(IdentKind::Doi);
    }

    match Url::parse(ident) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            if has_direct_extension(&url) {
                Ok(IdentKind::Direct)
            } else {
                Ok(IdentKind::Paywalled)
            }
        }
        _ => Err(ResolveError::InvalidIdentifier(ident.to_string())),
    }
}

fn has_direct_extension(url: &Url) -> bool {
    last_segment(url)
        .rsplit_once('.')
        .is_some_and(|(_, ext)| DIRECT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn last_segment(url: &Url) -> &str {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default()
}

/// `<sha256 of bytes>-<last 20 characters of the URL's last path segment>`
pub fn generate_name(bytes: &[u8], url: &Url) -> String {
    let segment: Vec<char> = last_segment(url).chars().collect();
    let suffix: String = segment[segment.len().saturating_sub(NAME_SUFFIX_LEN)..]
        .iter()
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}-{}", hasher.finalize(), suffix)
}

/// The document link embedded in a mirror page, if any
fn embedded_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    ["iframe[src]", "embed[src]"].iter().find_map(|css| {
        let selector = Selector::parse(css).expect("static selector is valid");
        document
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr("src"))
            .map(|src| src.trim().to_string())
            .filter(|src| !src.is_empty())
    })
}

/// Make a link found on `mirror` absolute
fn normalize_link(src: &str, mirror: &Url) -> Option<Url> {
    if let Some(rest) = src.strip_prefix("//") {
        return Url::parse(&format!("{}://{}", mirror.scheme(), rest)).ok();
    }
    mirror.join(src).ok()
}

/// Resolves identifiers through a list of mirrors
#[derive(Debug, Clone)]
pub struct Resolver {
    client: HttpClient,
    mirrors: Vec<Url>,
}

impl Resolver {
    pub fn new(mirrors: Vec<Url>, client: HttpClient) -> Self {
        Self { client, mirrors }
    }

    /// Build from the `[resolver]` configuration section
    pub fn from_config(config: &ResolverConfig, client: HttpClient) -> Result<Self, ResolveError> {
        let mirrors = config
            .mirrors
            .iter()
            .map(|m| {
                Url::parse(m).map_err(|e| ResolveError::InvalidMirror {
                    mirror: m.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(mirrors, client))
    }

    pub fn mirrors(&self) -> &[Url] {
        &self.mirrors
    }

    /// Find a downloadable URL for `ident`.
    ///
    /// Mirrors are tried in order until one answers; its answer is final.
    pub async fn resolve(&self, ident: &str) -> Result<Resolution, ResolveError> {
        let ident = ident.trim();
        let target = match classify(ident)? {
            IdentKind::Direct => {
                let url = Url::parse(ident)
                    .map_err(|_| ResolveError::InvalidIdentifier(ident.to_string()))?;
                return Ok(Resolution::Resolved(url));
            }
            IdentKind::Doi => doi::strip_prefix(ident),
            IdentKind::Paywalled => ident,
        };

        let mut last_error = None;
        for mirror in &self.mirrors {
            let url = match Url::parse(&format!("{}/{}", mirror.as_str().trim_end_matches('/'), target)) {
                Ok(url) => url,
                Err(e) => {
                    last_error = Some(format!("{}: {}", mirror, e));
                    continue;
                }
            };

            tracing::debug!(mirror = %mirror, url = %url, "Resolving identifier");
            match self.get_text(&url).await {
                Ok(body) => {
                    let resolution = embedded_link(&body)
                        .and_then(|src| normalize_link(&src, mirror))
                        .map(Resolution::Resolved)
                        .unwrap_or(Resolution::Unresolved);
                    if resolution == Resolution::Unresolved {
                        tracing::warn!(mirror = %mirror, ident, "No document link on the mirror page");
                    }
                    return Ok(resolution);
                }
                Err(err) => {
                    tracing::warn!(mirror = %mirror, error = %err, "Resolver mirror failed");
                    last_error = Some(err.to_string());
                }
            }
        }

        Err(ResolveError::MirrorsExhausted {
            attempted: self.mirrors.len(),
            last: last_error.unwrap_or_else(|| "no resolver mirrors configured".to_string()),
        })
    }

    /// Resolve `ident` and download it. `None` when it could not be resolved.
    pub async fn fetch(&self, ident: &str) -> Result<Option<Fetched>, ResolveError> {
        let url = match self.resolve(ident).await? {
            Resolution::Resolved(url) => url,
            Resolution::Unresolved => return Ok(None),
        };

        tracing::info!(url = %url, "Downloading");
        let response = self
            .client
            .client()
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ResolveError::Network(format!("{}: {}", url, e)))?;
        let response = check_status(response)?;

        let final_url = response.url().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ResolveError::Network(format!("{}: {}", final_url, e)))?
            .to_vec();
        let name = generate_name(&bytes, &final_url);

        Ok(Some(Fetched {
            bytes,
            url: final_url,
            name,
        }))
    }

    async fn get_text(&self, url: &Url) -> Result<String, ResolveError> {
        let response = self
            .client
            .client()
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ResolveError::Network(format!("{}: {}", url, e)))?;
        check_status(response)?
            .text()
            .await
            .map_err(|e| ResolveError::Network(format!("{}: {}", url, e)))
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ResolveError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ResolveError::Http {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}
