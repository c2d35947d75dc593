//! Streaming side of a running search.

use futures_util::stream::{self, Stream};
use std::collections::{BTreeMap, HashSet};
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{SearchReport, SourceOutcome};
use crate::matcher::Matcher;
use crate::models::Record;
use crate::sources::SourceError;

/// A spawned source and what it has fed so far
#[derive(Debug)]
pub(super) struct SourceTask {
    pub(super) id: String,
    pub(super) fed: Arc<AtomicUsize>,
    pub(super) task: JoinHandle<Result<(), SourceError>>,
}

/// Matches of a running search, in arrival order.
///
/// Read matches one at a time with [`next`](Self::next), or all at once with
/// [`collect`](Self::collect). Dropping the stream cancels the search.
#[derive(Debug)]
pub struct SearchStream {
    wanted: Arc<Record>,
    matcher: Matcher,
    require_mirrors: bool,
    receiver: mpsc::Receiver<Record>,
    terminating: Arc<AtomicBool>,
    tasks: Vec<SourceTask>,
    seen: HashSet<Record>,
    matches: Vec<Record>,
    candidates: usize,
}

impl SearchStream {
    pub(super) fn new(
        wanted: Arc<Record>,
        matcher: Matcher,
        require_mirrors: bool,
        receiver: mpsc::Receiver<Record>,
        terminating: Arc<AtomicBool>,
        tasks: Vec<SourceTask>,
    ) -> Self {
        Self {
            wanted,
            matcher,
            require_mirrors,
            receiver,
            terminating,
            tasks,
            seen: HashSet::new(),
            matches: Vec::new(),
            candidates: 0,
        }
    }

    /// The record being searched for
    pub fn wanted(&self) -> &Record {
        &self.wanted
    }

    /// Next matching record, or `None` once every source is done or the
    /// search was cancelled.
    pub async fn next(&mut self) -> Option<Record> {
        loop {
            if self.is_cancelled() {
                self.receiver.close();
                return None;
            }

            let candidate = self.receiver.recv().await?;
            if self.is_cancelled() {
                continue;
            }
            self.candidates += 1;

            if self.require_mirrors && candidate.mirrors().is_empty() {
                tracing::trace!(record = %candidate, "Dropping candidate without mirrors");
                continue;
            }
            if !self.matcher.matches(&candidate, &self.wanted) {
                continue;
            }
            if !self.seen.insert(candidate.clone()) {
                tracing::trace!(record = %candidate, "Dropping duplicate match");
                continue;
            }

            self.matches.push(candidate.clone());
            return Some(candidate);
        }
    }

    /// Ask every source to stop. Records still in flight are discarded.
    pub fn cancel(&self) {
        if !self.terminating.swap(true, Ordering::Relaxed) {
            tracing::info!("Cancelling search");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.terminating.load(Ordering::Relaxed)
    }

    /// Candidates received so far, matching or not
    pub fn candidates(&self) -> usize {
        self.candidates
    }

    /// Drain the remaining matches, then wait for every source to end.
    pub async fn finish(mut self) -> SearchReport {
        while self.next().await.is_some() {}

        let mut outcomes = BTreeMap::new();
        for source in mem::take(&mut self.tasks) {
            let outcome = match source.task.await {
                Ok(Ok(())) => SourceOutcome::Succeeded {
                    records: source.fed.load(Ordering::Relaxed),
                },
                Ok(Err(err)) => SourceOutcome::Failed {
                    reason: err.to_string(),
                },
                Err(err) if err.is_panic() => SourceOutcome::Failed {
                    reason: "source panicked".to_string(),
                },
                Err(err) => SourceOutcome::Failed {
                    reason: err.to_string(),
                },
            };

            match &outcome {
                SourceOutcome::Succeeded { records } => {
                    tracing::debug!(source = %source.id, records, "Source finished")
                }
                SourceOutcome::Failed { reason } => {
                    tracing::warn!(source = %source.id, %reason, "Source failed")
                }
            }
            outcomes.insert(source.id, outcome);
        }

        SearchReport {
            matches: mem::take(&mut self.matches),
            outcomes,
            candidates: self.candidates,
        }
    }

    /// Batch mode: every match plus the per-source outcomes.
    pub async fn collect(self) -> SearchReport {
        self.finish().await
    }

    /// The matches as a [`Stream`], for callers that do not need the report.
    pub fn into_stream(self) -> impl Stream<Item = Record> + Send {
        stream::unfold(self, |mut search| async move {
            search.next().await.map(|record| (record, search))
        })
    }
}

impl Drop for SearchStream {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            self.cancel();
        }
        self.receiver.close();
    }
}
