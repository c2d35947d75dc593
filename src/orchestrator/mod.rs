//! Runs every registered source concurrently against one wanted record.
//!
//! Each source runs in its own tokio task and feeds candidates into one
//! bounded channel shared by the whole search. The [`SearchStream`] applies
//! the matcher as candidates arrive. A failing or panicking source only
//! produces a [`SourceOutcome::Failed`]; its siblings keep running.

mod stream;

pub use stream::SearchStream;

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::matcher::{Matcher, DEFAULT_ACCURACY};
use crate::models::{Kind, Record};
use crate::sources::{SourceCapabilities, SourceHandle, SourceRegistry};
use stream::SourceTask;

/// Knobs for a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Fuzzy threshold out of 100
    pub accuracy: u32,
    /// Capacity of the shared feed
    pub feed_capacity: usize,
    /// Drop candidates without mirror links
    pub require_mirrors: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            accuracy: DEFAULT_ACCURACY,
            feed_capacity: 100,
            require_mirrors: false,
        }
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            accuracy: config.accuracy,
            feed_capacity: config.feed_capacity,
            require_mirrors: config.require_mirrors,
        }
    }
}

/// How one source's part of a search ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// `records` candidates were fed
    Succeeded { records: usize },
    Failed { reason: String },
}

impl SourceOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed { .. })
    }
}

/// Result of a completed search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    /// Matching records, duplicates removed, in arrival order
    pub matches: Vec<Record>,
    /// Outcome per source id
    pub outcomes: BTreeMap<String, SourceOutcome>,
    /// Candidates received, matching or not
    pub candidates: usize,
}

impl SearchReport {
    /// No record matched; says nothing about source failures
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// `(source id, reason)` for every failed source
    pub fn failed_sources(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| match outcome {
                SourceOutcome::Failed { reason } => Some((id.as_str(), reason.as_str())),
                SourceOutcome::Succeeded { .. } => None,
            })
            .collect()
    }
}

/// Dispatches searches over a [`SourceRegistry`]
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: SourceRegistry,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(registry: SourceRegistry, config: OrchestratorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Start a search and return its stream of matches.
    ///
    /// Every registered source able to find `wanted`'s kind is spawned on
    /// the current tokio runtime before this returns.
    pub fn search(&self, wanted: Record) -> SearchStream {
        let wanted = Arc::new(wanted);
        let capability = match wanted.kind() {
            Kind::Book => SourceCapabilities::BOOKS,
            Kind::Paper => SourceCapabilities::PAPERS,
        };

        let (sender, receiver) = mpsc::channel(self.config.feed_capacity.max(1));
        let terminating = Arc::new(AtomicBool::new(false));
        let mut tasks = Vec::new();

        let sources = self.registry.with_capability(capability);
        if sources.len() < self.registry.len() {
            tracing::debug!(
                skipped = self.registry.len() - sources.len(),
                kind = %wanted.kind(),
                "Skipping sources that cannot find this kind"
            );
        }

        for source in sources {
            let id = source.id().to_string();
            let fed = Arc::new(AtomicUsize::new(0));
            let handle = SourceHandle::new(&id, sender.clone(), Arc::clone(&terminating), Arc::clone(&fed));
            let source = Arc::clone(source);
            let record = Arc::clone(&wanted);

            let task = tokio::spawn(async move {
                tracing::debug!(source = source.id(), "Source started");
                source.find(&record, &handle).await
            });
            tasks.push(SourceTask { id, fed, task });
        }
        drop(sender);

        tracing::info!(sources = tasks.len(), wanted = %wanted, "Search started");
        SearchStream::new(
            wanted,
            Matcher::new(self.config.accuracy),
            self.config.require_mirrors,
            receiver,
            terminating,
            tasks,
        )
    }

    /// Run a search to completion.
    pub async fn search_all(&self, wanted: Record) -> SearchReport {
        self.search(wanted).collect().await
    }
}
