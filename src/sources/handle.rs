//! The handle a source uses to talk back to the search that runs it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::models::Record;

/// Severity of a message logged through [`SourceHandle::log`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Feed, log sink and cancellation flag handed to a running source.
///
/// Cloning is cheap; all clones feed the same channel.
#[derive(Debug, Clone)]
pub struct SourceHandle {
    source: Arc<str>,
    feed: mpsc::Sender<Record>,
    terminating: Arc<AtomicBool>,
    fed: Arc<AtomicUsize>,
}

impl SourceHandle {
    pub(crate) fn new(
        source: &str,
        feed: mpsc::Sender<Record>,
        terminating: Arc<AtomicBool>,
        fed: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            source: Arc::from(source),
            feed,
            terminating,
            fed,
        }
    }

    /// A handle with its own channel, for running one source outside an
    /// orchestrator.
    pub fn detached(source: &str, capacity: usize) -> (Self, mpsc::Receiver<Record>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = Self::new(
            source,
            sender,
            Arc::new(AtomicBool::new(false)),
            Arc::new(AtomicUsize::new(0)),
        );
        (handle, receiver)
    }

    /// Id of the source this handle belongs to
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Send a candidate downstream.
    ///
    /// Waits while the feed is full. Once the consumer has gone away the
    /// search is marked as terminating and the record is discarded.
    pub async fn feed(&self, record: Record) {
        if self.terminating() {
            return;
        }
        match self.feed.send(record).await {
            Ok(()) => {
                self.fed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                tracing::debug!(source = %self.source, "Feed closed; terminating");
                self.terminating.store(true, Ordering::Relaxed);
            }
        }
    }

    /// Emit a log event tagged with this source's id
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        let source = &*self.source;
        let message = message.as_ref();
        match level {
            LogLevel::Trace => tracing::trace!(source, "{}", message),
            LogLevel::Debug => tracing::debug!(source, "{}", message),
            LogLevel::Info => tracing::info!(source, "{}", message),
            LogLevel::Warn => tracing::warn!(source, "{}", message),
            LogLevel::Error => tracing::error!(source, "{}", message),
        }
    }

    /// Whether the search has been cancelled; sources should stop soon
    pub fn terminating(&self) -> bool {
        self.terminating.load(Ordering::Relaxed)
    }

    /// Records successfully fed so far
    pub fn fed(&self) -> usize {
        self.fed.load(Ordering::Relaxed)
    }
}
