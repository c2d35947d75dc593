//! Registry for managing source plugins.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Source, SourceError};
use crate::config::Config;
use crate::utils::HttpClient;

bitflags::bitflags! {
    /// What kinds of records a source can find
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const BOOKS = 1 << 0;
        const PAPERS = 1 << 1;
    }
}

/// Constructor for a built-in source
type Constructor = fn(&Config, &HttpClient) -> Result<Arc<dyn Source>, SourceError>;

#[cfg(feature = "source-libgen")]
fn libgen(config: &Config, client: &HttpClient) -> Result<Arc<dyn Source>, SourceError> {
    let adapter = super::libgen::Libgen::from_config(&config.libgen)?;
    Ok(Arc::new(super::LibgenSource::new(adapter, client.clone())))
}

#[cfg(feature = "source-gscholar")]
fn gscholar(config: &Config, client: &HttpClient) -> Result<Arc<dyn Source>, SourceError> {
    let adapter = super::gscholar::Gscholar::from_config(&config.gscholar)?;
    Ok(Arc::new(super::GscholarSource::new(adapter, client.clone())))
}

/// Built-in sources by id
#[allow(unused_mut)]
fn builtin() -> Vec<(&'static str, Constructor)> {
    let mut builtin: Vec<(&'static str, Constructor)> = Vec::new();
    #[cfg(feature = "source-libgen")]
    builtin.push(("libgen", libgen as Constructor));
    #[cfg(feature = "source-gscholar")]
    builtin.push(("gscholar", gscholar as Constructor));
    builtin
}

/// Ids of the sources compiled into this build
pub fn builtin_ids() -> Vec<&'static str> {
    builtin().into_iter().map(|(id, _)| id).collect()
}

/// Registry of the sources taking part in a search
///
/// The registry holds every enabled source; the orchestrator runs all of
/// them for each search.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in source the configuration enables
    pub fn from_config(config: &Config, client: &HttpClient) -> Result<Self, SourceError> {
        let mut registry = Self::new();

        for (id, construct) in builtin() {
            if !config.sources.is_enabled(id) {
                tracing::debug!(source = id, "Source disabled by configuration");
                continue;
            }
            registry.register(construct(config, client)?);
        }

        Ok(registry)
    }

    /// Register a new source, replacing any source with the same id
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.id().to_string(), source);
    }

    /// Get a source by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Source>> {
        self.sources.get(id)
    }

    /// Get all source IDs, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sources.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Get sources that support a specific capability, sorted by id
    pub fn with_capability(&self, capability: SourceCapabilities) -> Vec<&Arc<dyn Source>> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.sources.get(id))
            .filter(|s| s.capabilities().contains(capability))
            .collect()
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
