use bytes::Bytes;

use crate::client::ClientError;

use super::app::MessageLevel;
use super::cache::Generation;
use super::ingest::{IngestError, IngestSummary};

/// Mutations requested by background tasks, applied in order by the UI loop
#[derive(Debug)]
pub enum Event {
    /// Stream names have been enumerated
    StreamsLoaded(Result<Vec<String>, ClientError>),

    /// One page of records fetched by the ingestion task of `generation`
    PageFetched {
        generation: Generation,
        records: Vec<(String, Bytes)>,
    },

    /// Ingestion task of `generation` stopped
    IngestFinished {
        generation: Generation,
        result: Result<IngestSummary, IngestError>,
    },

    /// Result of publishing the text of insert overlay `overlay`
    RecordPublished {
        overlay: u64,
        stream: String,
        result: Result<String, ClientError>,
    },

    /// Line for the log panel
    Log(MessageLevel, String),
}
