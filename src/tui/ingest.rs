//! Drains one shard of a stream into the record list.
//!
//! The pipeline discovers the first shard, acquires an iterator at the
//! configured start position and walks the iterator chain for at most
//! `page_budget` fetches. Every page is handed to the UI loop as an
//! [`Event::PageFetched`]; the pipeline never touches view state itself.

use bytes::Bytes;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::client::{ClientError, FetchedRecord, SharedClient, StartPosition};

use super::app::MessageLevel;
use super::cache::Generation;
use super::event::Event;

/// Default number of pages fetched per browse.
pub const DEFAULT_PAGE_BUDGET: u32 = 5;

const ARRIVAL_FORMAT: &str = "%a, %d %b %Y %H:%M:%S UTC";

/// Which record field is shown in the record list and used as cache key.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ValueEnum,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RecordKey {
    /// Approximate arrival time, second granularity.
    #[default]
    ArrivalTimestamp,
    SequenceNumber,
}

impl RecordKey {
    pub fn display_key(self, record: &FetchedRecord) -> String {
        match (self, record.arrival) {
            (RecordKey::ArrivalTimestamp, Some(arrival)) => {
                arrival.format(ARRIVAL_FORMAT).to_string()
            }
            _ => record.sequence_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub page_budget: u32,
    pub start: StartPosition,
    pub record_key: RecordKey,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            page_budget: DEFAULT_PAGE_BUDGET,
            start: StartPosition::default(),
            record_key: RecordKey::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("No shard found for stream '{0}'")]
    NoShard(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub shard_id: String,
    pub pages: u32,
    pub records: usize,
    /// The shard reported no further iterator.
    pub reached_end: bool,
}

pub struct Ingestion {
    client: SharedClient,
    options: IngestOptions,
    generation: Generation,
    tx: mpsc::UnboundedSender<Event>,
}

impl Ingestion {
    pub fn new(
        client: SharedClient,
        options: IngestOptions,
        generation: Generation,
        tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            client,
            options,
            generation,
            tx,
        }
    }

    /// Runs the pipeline on its own task and reports the outcome as
    /// [`Event::IngestFinished`].
    pub fn spawn(self, stream: String) -> JoinHandle<()> {
        tokio::spawn(async move {
            let result = self.run(&stream).await;
            if let Err(e) = &result {
                tracing::warn!(stream = %stream, error = %e, "ingestion aborted");
            }
            let _ = self.tx.send(Event::IngestFinished {
                generation: self.generation,
                result,
            });
        })
    }

    pub async fn run(&self, stream: &str) -> Result<IngestSummary, IngestError> {
        self.log("getting shards...");
        let shards = self.client.list_shards(stream).await?;
        let Some(shard_id) = shards.into_iter().next() else {
            return Err(IngestError::NoShard(stream.to_owned()));
        };

        let mut summary = IngestSummary {
            shard_id,
            pages: 0,
            records: 0,
            reached_end: false,
        };
        if self.options.page_budget == 0 {
            return Ok(summary);
        }

        let mut iterator = self
            .client
            .get_iterator(&summary.shard_id, stream, self.options.start)
            .await?;

        self.log("getting records...");
        tracing::debug!(
            stream,
            shard = %summary.shard_id,
            budget = self.options.page_budget,
            "polling shard"
        );

        while summary.pages < self.options.page_budget {
            let page = self.client.get_records(&iterator).await?;
            summary.pages += 1;
            summary.records += page.records.len();

            if !page.records.is_empty() {
                let records = page
                    .records
                    .iter()
                    .map(|record| {
                        (
                            self.options.record_key.display_key(record),
                            Bytes::clone(&record.data),
                        )
                    })
                    .collect();
                let event = Event::PageFetched {
                    generation: self.generation,
                    records,
                };
                if self.tx.send(event).is_err() {
                    break;
                }
            }

            match page.next_iterator {
                Some(next) if !next.is_empty() => iterator = next,
                _ => {
                    summary.reached_end = true;
                    break;
                }
            }
        }

        tracing::debug!(
            stream,
            pages = summary.pages,
            records = summary.records,
            "polling finished"
        );
        Ok(summary)
    }

    fn log(&self, text: &str) {
        let _ = self.tx.send(Event::Log(MessageLevel::Info, text.to_owned()));
    }
}
