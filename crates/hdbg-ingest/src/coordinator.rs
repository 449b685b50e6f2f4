//! Ingestion/retry coordinator
//!
//! One call per inbound chunk submission. A successful strict decode forwards
//! every record to the sink and acknowledges; a decode failure archives the
//! raw bytes, logs a best-effort diagnostic view, and runs the two-strike
//! handshake: ask the device to resend once, then accept the chunk as
//! permanently unrecoverable. Non-decode failures are never retried, so a
//! broken sink cannot put a device into a resend loop.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use hdbg_core::{decode_chunk, inspect_chunk, ChunkHeader, FileTable, MessageDictionary};

use crate::archive::FsArchive;
use crate::config::IngestConfig;
use crate::retry::{RetryDecision, RetryKey, RetryTable};
use crate::sink::{ChunkArchive, RecordSink, SinkRecord};

/// Identity placeholder when neither the header nor the request supplied one.
const UNKNOWN_IDENTITY: &str = "unknown";

// ----------------------------------------------------------------------------
// Submission and Response
// ----------------------------------------------------------------------------

/// One inbound chunk submission. Device and chunk identity may arrive
/// out-of-band (e.g. as transport headers) and act as fallbacks when the
/// decoded chunk header lacks them.
#[derive(Debug, Clone)]
pub struct Submission {
    pub device_id: Option<String>,
    pub chunk_id: Option<String>,
    pub body: Vec<u8>,
}

/// Top-level protocol verdict the device acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Do not resend this chunk, whatever happened to it.
    #[serde(rename = "ACK")]
    Ack,
    /// Resend this exact chunk once.
    #[serde(rename = "REPIT")]
    Repit,
}

/// Error code carried by some ACK responses. Devices ignore it; operators
/// and tests read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseError {
    #[serde(rename = "EMPTY_CHUNK")]
    EmptyChunk,
    #[serde(rename = "UNRECOVERABLE_CHUNK")]
    UnrecoverableChunk,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

/// Transport-agnostic response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResponse {
    pub result: SubmissionStatus,
    pub chunk_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl ChunkResponse {
    fn ack(chunk_id: String) -> Self {
        Self {
            result: SubmissionStatus::Ack,
            chunk_id,
            error: None,
        }
    }

    fn repit(chunk_id: String) -> Self {
        Self {
            result: SubmissionStatus::Repit,
            chunk_id,
            error: None,
        }
    }

    fn ack_error(chunk_id: String, error: ResponseError) -> Self {
        Self {
            result: SubmissionStatus::Ack,
            chunk_id,
            error: Some(error),
        }
    }
}

// ----------------------------------------------------------------------------
// Coordinator
// ----------------------------------------------------------------------------

/// Per-submission protocol logic over shared retry state.
pub struct Coordinator<S: RecordSink, A: ChunkArchive> {
    dictionary: MessageDictionary,
    files: FileTable,
    sink: Arc<S>,
    archive: Arc<A>,
    retries: RetryTable,
    config: IngestConfig,
}

impl<S: RecordSink, A: ChunkArchive> Coordinator<S, A> {
    pub fn new(
        dictionary: MessageDictionary,
        files: FileTable,
        sink: Arc<S>,
        archive: Arc<A>,
        config: IngestConfig,
    ) -> Self {
        Self {
            dictionary,
            files,
            sink,
            archive,
            retries: RetryTable::new(),
            config,
        }
    }

    /// Retries currently in flight, for operational introspection.
    pub fn pending_retries(&self) -> usize {
        self.retries.pending()
    }

    /// Process one chunk submission end to end and produce the response.
    ///
    /// Never fails: every internal failure is folded into the response so
    /// the device always gets a protocol verdict. The response is only built
    /// after the sink write is durable, since ACK tells the device to drop
    /// its copy.
    pub async fn handle(&self, submission: Submission) -> ChunkResponse {
        let request_chunk_id = submission
            .chunk_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_IDENTITY.to_owned());

        if submission.body.is_empty() {
            warn!(
                device = submission.device_id.as_deref().unwrap_or(UNKNOWN_IDENTITY),
                "received empty chunk body"
            );
            return ChunkResponse::ack_error(request_chunk_id, ResponseError::EmptyChunk);
        }

        match decode_chunk(&submission.body, &self.dictionary, &self.files) {
            Ok(chunk) => self.accept(&submission, chunk.header, chunk.records).await,
            Err(decode_error) => {
                self.reject(&submission, request_chunk_id, &decode_error)
                    .await
            }
        }
    }

    /// Successful decode: forward records, clear retry state, acknowledge.
    async fn accept(
        &self,
        submission: &Submission,
        header: ChunkHeader,
        records: Vec<hdbg_core::DecodedRecord>,
    ) -> ChunkResponse {
        let (device_id, chunk_id) = resolve_identity(Some(&header), submission);
        let record_count = records.len();

        let batch: Vec<SinkRecord> = records
            .into_iter()
            .map(|record| SinkRecord {
                timestamp: record.timestamp,
                level: record.level,
                text: record.text,
                chunk_id: chunk_id.clone(),
                device_id: device_id.clone(),
                dictionary_revision: header.dictionary_revision,
            })
            .collect();

        // The sink contract is all-or-nothing per chunk, so a failure here
        // leaves nothing behind to discard.
        if let Err(sink_error) = self.sink.append_chunk(batch).await {
            error!(
                device = %device_id,
                chunk = %chunk_id,
                error = %sink_error,
                "sink write failed; answering INTERNAL_ERROR"
            );
            self.archive_best_effort(&device_id, &chunk_id, &submission.body)
                .await;
            // Deliberately ACK, never REPIT: a resend would hit the same
            // sink and loop.
            return ChunkResponse::ack_error(chunk_id, ResponseError::InternalError);
        }

        self.retries
            .record_success(&RetryKey::new(device_id.clone(), chunk_id.clone()));

        info!(
            device = %device_id,
            chunk = %chunk_id,
            records = record_count,
            "chunk ingested"
        );
        ChunkResponse::ack(chunk_id)
    }

    /// Failed decode: archive, log a diagnostic view, run the two strikes.
    async fn reject(
        &self,
        submission: &Submission,
        request_chunk_id: String,
        decode_error: &hdbg_core::ChunkError,
    ) -> ChunkResponse {
        // Best-effort re-decode purely for the operator log; its output
        // never reaches the sink.
        let inspection = inspect_chunk(&submission.body, &self.dictionary, &self.files);
        let (device_id, chunk_id) = resolve_identity(inspection.header.as_ref(), submission);

        warn!(
            device = %device_id,
            chunk = %chunk_id,
            error = %decode_error,
            recovered_records = inspection.records.len(),
            diagnostic = inspection.error.as_deref().unwrap_or("none"),
            "chunk rejected by strict decode"
        );

        self.archive_best_effort(&device_id, &chunk_id, &submission.body)
            .await;

        // The response carries the request-supplied chunk id; the device
        // never sees the (possibly partially decoded) header identity.
        match self
            .retries
            .record_failure(&RetryKey::new(device_id, chunk_id))
        {
            RetryDecision::Repit => ChunkResponse::repit(request_chunk_id),
            RetryDecision::GiveUp => {
                ChunkResponse::ack_error(request_chunk_id, ResponseError::UnrecoverableChunk)
            }
        }
    }

    /// Archive raw bytes; failures are logged, never surfaced to the device.
    async fn archive_best_effort(&self, device_id: &str, chunk_id: &str, bytes: &[u8]) {
        match self
            .archive
            .store(device_id, chunk_id, Utc::now(), bytes)
            .await
        {
            Ok(stored) if stored >= self.config.archive_warn_threshold => {
                warn!(
                    stored,
                    threshold = self.config.archive_warn_threshold,
                    "archive is accumulating rejected chunks; manual review suggested"
                );
            }
            Ok(_) => {}
            Err(archive_error) => {
                warn!(
                    device = %device_id,
                    chunk = %chunk_id,
                    error = %archive_error,
                    "failed to archive rejected chunk"
                );
            }
        }
    }
}

impl<S: RecordSink> Coordinator<S, FsArchive> {
    /// Build a coordinator backed by the filesystem archive at the
    /// configured directory.
    pub fn with_fs_archive(
        dictionary: MessageDictionary,
        files: FileTable,
        sink: Arc<S>,
        config: IngestConfig,
    ) -> Self {
        let archive = Arc::new(FsArchive::new(config.archive_dir.clone()));
        Self::new(dictionary, files, sink, archive, config)
    }
}

// ----------------------------------------------------------------------------
// Identity Resolution
// ----------------------------------------------------------------------------

/// Prefer the decoded header's identity, fall back to the request-supplied
/// one, then to the literal "unknown".
fn resolve_identity(header: Option<&ChunkHeader>, submission: &Submission) -> (String, String) {
    let device_id = header
        .and_then(|h| h.device_id.clone())
        .or_else(|| submission.device_id.clone())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_owned());

    let chunk_id = header
        .and_then(|h| h.chunk_id.map(|id| id.to_string()))
        .or_else(|| submission.chunk_id.clone())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_owned());

    (device_id, chunk_id)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serialization() {
        let ack = ChunkResponse::ack("42".into());
        assert_eq!(
            serde_json::to_value(&ack).unwrap(),
            serde_json::json!({"result": "ACK", "chunk_id": "42"})
        );

        let repit = ChunkResponse::repit("42".into());
        assert_eq!(
            serde_json::to_value(&repit).unwrap(),
            serde_json::json!({"result": "REPIT", "chunk_id": "42"})
        );

        let given_up = ChunkResponse::ack_error("42".into(), ResponseError::UnrecoverableChunk);
        assert_eq!(
            serde_json::to_value(&given_up).unwrap(),
            serde_json::json!({
                "result": "ACK",
                "chunk_id": "42",
                "error": "UNRECOVERABLE_CHUNK"
            })
        );
    }

    #[test]
    fn test_identity_resolution_order() {
        let submission = Submission {
            device_id: Some("req-dev".into()),
            chunk_id: Some("req-chunk".into()),
            body: Vec::new(),
        };

        let (device, chunk) = resolve_identity(None, &submission);
        assert_eq!(device, "req-dev");
        assert_eq!(chunk, "req-chunk");

        let bare = Submission {
            device_id: None,
            chunk_id: None,
            body: Vec::new(),
        };
        let (device, chunk) = resolve_identity(None, &bare);
        assert_eq!(device, "unknown");
        assert_eq!(chunk, "unknown");
    }
}
