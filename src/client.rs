//! Stream service access.
//!
//! The browsing engine only talks to the service through [`StreamClient`], so
//! the Kinesis-backed implementation can be swapped for an in-memory one.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kinesis::{
    config::Region, error::DisplayErrorContext, primitives::Blob, types::ShardIteratorType,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Where a fresh shard iterator is positioned.
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
pub enum StartPosition {
    /// Oldest record still retained by the shard.
    #[default]
    TrimHorizon,
    /// Only records written after the iterator is acquired.
    Latest,
}

impl From<StartPosition> for ShardIteratorType {
    fn from(position: StartPosition) -> Self {
        match position {
            StartPosition::TrimHorizon => ShardIteratorType::TrimHorizon,
            StartPosition::Latest => ShardIteratorType::Latest,
        }
    }
}

/// A record as returned by a page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRecord {
    pub sequence_number: String,
    pub arrival: Option<DateTime<Utc>>,
    pub data: Bytes,
}

/// One page of records plus the cursor for the next page.
///
/// `next_iterator` is `None` once the shard has been closed and fully read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
    pub records: Vec<FetchedRecord>,
    pub next_iterator: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ClientOp {
    #[strum(to_string = "connect")]
    Connect,
    #[strum(to_string = "list streams")]
    ListStreams,
    #[strum(to_string = "list shards")]
    ListShards,
    #[strum(to_string = "get shard iterator")]
    GetIterator,
    #[strum(to_string = "get records")]
    GetRecords,
    #[strum(to_string = "put record")]
    PutRecord,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Failed to {op}: {message}")]
pub struct ClientError {
    pub op: ClientOp,
    pub message: String,
}

impl ClientError {
    pub fn new(op: ClientOp, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }

    fn sdk<E>(op: ClientOp, err: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Self::new(op, DisplayErrorContext(&err).to_string())
    }
}

#[async_trait]
pub trait StreamClient: Send + Sync {
    async fn list_streams(&self) -> Result<Vec<String>, ClientError>;

    /// Shard ids of `stream` in the order the service returns them.
    async fn list_shards(&self, stream: &str) -> Result<Vec<String>, ClientError>;

    async fn get_iterator(
        &self,
        shard_id: &str,
        stream: &str,
        start: StartPosition,
    ) -> Result<String, ClientError>;

    async fn get_records(&self, iterator: &str) -> Result<RecordPage, ClientError>;

    /// Publishes `payload` and returns the assigned sequence number.
    async fn put_record(&self, stream: &str, payload: Bytes) -> Result<String, ClientError>;
}

pub type SharedClient = Arc<dyn StreamClient>;

/// Connection settings resolved from config file, environment and flags.
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub endpoint_url: Option<String>,
    pub partition_key: String,
}

pub struct KinesisClient {
    inner: aws_sdk_kinesis::Client,
    partition_key: String,
}

impl KinesisClient {
    pub async fn connect(settings: &ClientSettings) -> Result<Self, ClientError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint_url) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;

        if sdk_config.region().is_none() {
            return Err(ClientError::new(
                ClientOp::Connect,
                "no AWS region configured; set AWS_REGION or `ktui config set region <REGION>`",
            ));
        }

        tracing::debug!(region = ?sdk_config.region(), "kinesis client configured");

        Ok(Self {
            inner: aws_sdk_kinesis::Client::new(&sdk_config),
            partition_key: settings.partition_key.clone(),
        })
    }
}

#[async_trait]
impl StreamClient for KinesisClient {
    async fn list_streams(&self) -> Result<Vec<String>, ClientError> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .inner
                .list_streams()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| ClientError::sdk(ClientOp::ListStreams, e))?;

            names.extend(output.stream_names().iter().cloned());

            match output.next_token() {
                Some(token) if output.has_more_streams() => next_token = Some(token.to_owned()),
                _ => break,
            }
        }

        Ok(names)
    }

    async fn list_shards(&self, stream: &str) -> Result<Vec<String>, ClientError> {
        let output = self
            .inner
            .list_shards()
            .stream_name(stream)
            .send()
            .await
            .map_err(|e| ClientError::sdk(ClientOp::ListShards, e))?;

        Ok(output
            .shards()
            .iter()
            .map(|shard| shard.shard_id().to_owned())
            .collect())
    }

    async fn get_iterator(
        &self,
        shard_id: &str,
        stream: &str,
        start: StartPosition,
    ) -> Result<String, ClientError> {
        let output = self
            .inner
            .get_shard_iterator()
            .stream_name(stream)
            .shard_id(shard_id)
            .shard_iterator_type(start.into())
            .send()
            .await
            .map_err(|e| ClientError::sdk(ClientOp::GetIterator, e))?;

        output
            .shard_iterator()
            .map(str::to_owned)
            .ok_or_else(|| ClientError::new(ClientOp::GetIterator, "no iterator returned"))
    }

    async fn get_records(&self, iterator: &str) -> Result<RecordPage, ClientError> {
        let output = self
            .inner
            .get_records()
            .shard_iterator(iterator)
            .send()
            .await
            .map_err(|e| ClientError::sdk(ClientOp::GetRecords, e))?;

        let records = output
            .records()
            .iter()
            .map(|record| FetchedRecord {
                sequence_number: record.sequence_number().to_owned(),
                arrival: record
                    .approximate_arrival_timestamp()
                    .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())),
                data: Bytes::copy_from_slice(record.data().as_ref()),
            })
            .collect();

        Ok(RecordPage {
            records,
            next_iterator: output.next_shard_iterator().map(str::to_owned),
        })
    }

    async fn put_record(&self, stream: &str, payload: Bytes) -> Result<String, ClientError> {
        let output = self
            .inner
            .put_record()
            .stream_name(stream)
            .partition_key(&self.partition_key)
            .data(Blob::new(payload.to_vec()))
            .send()
            .await
            .map_err(|e| ClientError::sdk(ClientOp::PutRecord, e))?;

        Ok(output.sequence_number().to_owned())
    }
}
