//! Source plugins with an extensible trait-based architecture.
//!
//! This module defines the [`Source`] trait that every catalogue adapter
//! implements. A source receives the wanted [`Record`] and a [`SourceHandle`],
//! and pushes every candidate it finds through [`SourceHandle::feed`]. It
//! does not decide what matches; the orchestrator does.
//!
//! Paginated, mirrored HTML catalogues implement the narrower
//! [`PagedSource`] contract instead and are wrapped in [`Paged`], which
//! supplies mirror fallback, pagination and cancellation checks.
//!
//! # Feature Flags
//!
//! Individual sources can be disabled at compile time using Cargo features:
//!
//! - `libgen` - Enable Library Genesis source (default: enabled)
//! - `gscholar` - Enable Google Scholar source (default: enabled)
//!
//! # Runtime Source Configuration
//!
//! Compiled-in sources can be filtered at runtime through the `[sources]`
//! configuration section or the environment:
//!
//! ```bash
//! # Only use these sources
//! export BOOKWYRM_SOURCES__ENABLED="libgen"
//!
//! # Never use these sources
//! export BOOKWYRM_SOURCES__DISABLED="gscholar"
//! ```

#[cfg(feature = "source-gscholar")]
pub mod gscholar;
mod handle;
#[cfg(any(feature = "source-libgen", feature = "source-gscholar"))]
mod html;
#[cfg(feature = "source-libgen")]
pub mod libgen;
pub mod mock;
pub mod paged;
mod registry;

pub use handle::{LogLevel, SourceHandle};
#[cfg(feature = "source-gscholar")]
pub use gscholar::{Gscholar, GscholarSource};
#[cfg(feature = "source-libgen")]
pub use libgen::{Libgen, LibgenSource};
pub use mock::MockSource;
pub use paged::{has_captcha_markup, MirrorCursor, Page, Paged, PagedSource};
pub use registry::{builtin_ids, SourceCapabilities, SourceRegistry};

use crate::models::Record;
use async_trait::async_trait;

/// The Source trait defines the interface for all catalogue plugins.
///
/// # Implementing a New Source
///
/// 1. Create a struct that implements `Source` (or [`PagedSource`] for a
///    paginated HTML catalogue, wrapped in [`Paged`])
/// 2. Feed every candidate through the handle; filtering happens later
/// 3. Check [`SourceHandle::terminating`] between units of work
/// 4. Register it with [`SourceRegistry::register`]
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "libgen")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// What kinds of records this source can find
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::BOOKS | SourceCapabilities::PAPERS
    }

    /// Search for candidates of `wanted` and feed them through `handle`.
    ///
    /// Returning `Err` marks this source as failed for the search; records
    /// already fed are kept.
    async fn find(&self, wanted: &Record, handle: &SourceHandle) -> Result<(), SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network error (connection, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Parsing error (HTML, URLs, numbers)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A bot check was served instead of content
    #[error("Captcha served by {0}")]
    Captcha(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every query this source issued failed
    #[error("All {attempted} queries failed; last error: {last}")]
    AllQueriesFailed {
        attempted: usize,
        last: Box<SourceError>,
    },

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    /// Whether trying another mirror could help
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Network(_) | SourceError::Http { .. })
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<url::ParseError> for SourceError {
    fn from(err: url::ParseError) -> Self {
        SourceError::Parse(format!("URL: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_capabilities() {
        let caps = SourceCapabilities::BOOKS | SourceCapabilities::PAPERS;

        assert!(caps.contains(SourceCapabilities::BOOKS));
        assert!(caps.contains(SourceCapabilities::PAPERS));
        assert!(!SourceCapabilities::BOOKS.contains(SourceCapabilities::PAPERS));
    }

    #[test]
    fn test_transient_errors() {
        assert!(SourceError::Network("timeout".into()).is_transient());
        assert!(SourceError::Http {
            status: 503,
            url: "http://mirror.test".into()
        }
        .is_transient());
        assert!(!SourceError::Captcha("http://mirror.test".into()).is_transient());
        assert!(!SourceError::Parse("bad table".into()).is_transient());
    }
}
