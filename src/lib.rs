//! # bookwyrm
//!
//! Find books and papers across several unreliable, paginated catalogues and
//! keep the ones that match what you asked for.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Records, year filters and caller criteria
//! - [`identifiers`]: ISBN and DOI recognition
//! - [`matcher`]: Exact and fuzzy record matching
//! - [`sources`]: Catalogue plugins, pagination and mirror fallback
//! - [`orchestrator`]: Concurrent searches over every registered source
//! - [`resolver`]: Resolving and downloading DOIs and links
//! - [`config`]: Configuration management
//! - [`utils`]: Shared HTTP client

pub mod config;
pub mod identifiers;
pub mod matcher;
pub mod models;
pub mod orchestrator;
pub mod resolver;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use matcher::Matcher;
pub use models::{Criteria, Record, Request};
pub use orchestrator::{Orchestrator, OrchestratorConfig, SearchReport, SearchStream};
pub use resolver::Resolver;
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
