//! Mock source for testing purposes.

use async_trait::async_trait;
use std::time::Duration;

use crate::models::Record;
use crate::sources::{LogLevel, Source, SourceCapabilities, SourceError, SourceHandle};

/// What a [`MockSource`] does once its records are fed
#[derive(Debug, Clone, PartialEq, Eq)]
enum Ending {
    Succeed,
    Fail(String),
    Panic,
    /// Keep feeding the records in a loop until the search terminates
    Repeat,
}

/// A mock source that feeds predefined records.
#[derive(Debug, Clone)]
pub struct MockSource {
    id: String,
    capabilities: SourceCapabilities,
    records: Vec<Record>,
    delay: Option<Duration>,
    ending: Ending,
}

impl MockSource {
    /// Create a mock source that feeds nothing and succeeds.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: SourceCapabilities::BOOKS | SourceCapabilities::PAPERS,
            records: Vec::new(),
            delay: None,
            ending: Ending::Succeed,
        }
    }

    /// Records to feed, in order.
    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    pub fn with_capabilities(mut self, capabilities: SourceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sleep before feeding each record.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail with `reason` after feeding the records.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.ending = Ending::Fail(reason.into());
        self
    }

    /// Panic after feeding the records.
    pub fn panicking(mut self) -> Self {
        self.ending = Ending::Panic;
        self
    }

    /// Feed the records over and over until the search terminates.
    pub fn repeating(mut self) -> Self {
        self.ending = Ending::Repeat;
        self
    }

    async fn feed_all(&self, handle: &SourceHandle) {
        for record in &self.records {
            if handle.terminating() {
                return;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            handle.feed(record.clone()).await;
        }
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.capabilities
    }

    async fn find(&self, _wanted: &Record, handle: &SourceHandle) -> Result<(), SourceError> {
        self.feed_all(handle).await;

        match &self.ending {
            Ending::Succeed => Ok(()),
            Ending::Fail(reason) => Err(SourceError::Other(reason.clone())),
            Ending::Panic => panic!("mock source {} panicked", self.id),
            Ending::Repeat => {
                while !handle.terminating() {
                    self.feed_all(handle).await;
                    tokio::task::yield_now().await;
                }
                handle.log(LogLevel::Debug, "Stopped repeating");
                Ok(())
            }
        }
    }
}

/// Helper function to create a book record for testing.
pub fn make_book(title: &str, author: &str) -> Record {
    Record::builder().title(title).author(author).build()
}
