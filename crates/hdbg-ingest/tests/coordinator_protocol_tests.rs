//! Coordinator Protocol Tests
//!
//! Drives full submissions through the coordinator with in-memory
//! collaborators: the ACK/REPIT handshake, two-strike retry accounting,
//! identity resolution, sink forwarding, and the best-effort archival paths.

use std::sync::Arc;

use chrono::NaiveDate;
use hdbg_core::{ChunkWriter, FieldValue, FileTable, Level, MessageDictionary};
use hdbg_ingest::testing::{MemoryArchive, MemorySink};
use hdbg_ingest::{
    ChunkResponse, Coordinator, IngestConfig, ResponseError, Submission, SubmissionStatus,
};

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

struct Harness {
    coordinator: Coordinator<MemorySink, MemoryArchive>,
    sink: Arc<MemorySink>,
    archive: Arc<MemoryArchive>,
}

fn harness() -> Harness {
    let sink = Arc::new(MemorySink::new());
    let archive = Arc::new(MemoryArchive::new());
    let coordinator = Coordinator::new(
        MessageDictionary::builtin(),
        FileTable::builtin(),
        Arc::clone(&sink),
        Arc::clone(&archive),
        IngestConfig::default(),
    );
    Harness {
        coordinator,
        sink,
        archive,
    }
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

fn good_chunk() -> Vec<u8> {
    ChunkWriter::new(base_date())
        .dictionary_revision(1, 0)
        .device_id("d1")
        .chunk_id(42)
        .record(1, 360_000, &[FieldValue::I32(5)], 1, 12)
        .record(3, 360_100, &[FieldValue::Str("timeout".into())], 2, 30)
        .finish()
}

/// A chunk whose second record's context field is truncated: strict decode
/// aborts, which is the decode-classified failure the handshake is for.
fn corrupt_chunk() -> Vec<u8> {
    let mut bytes = good_chunk();
    bytes.truncate(bytes.len() - 6);
    bytes
}

fn submission(body: Vec<u8>) -> Submission {
    Submission {
        device_id: Some("d1".into()),
        chunk_id: Some("42".into()),
        body,
    }
}

// ----------------------------------------------------------------------------
// Success Path
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_successful_decode_forwards_records_and_acks() {
    let h = harness();
    let response = h.coordinator.handle(submission(good_chunk())).await;

    assert_eq!(
        response,
        ChunkResponse {
            result: SubmissionStatus::Ack,
            chunk_id: "42".into(),
            error: None,
        }
    );

    let records = h.sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].device_id, "d1");
    assert_eq!(records[0].chunk_id, "42");
    assert_eq!(records[0].dictionary_revision, (1, 0));
    assert_eq!(records[0].level, Level::Info);
    assert!(records[0].text.contains("размер кэша: 5"));
    assert_eq!(records[1].level, Level::Error);

    assert!(h.archive.chunks().is_empty());
    assert_eq!(h.coordinator.pending_retries(), 0);
}

#[tokio::test]
async fn test_header_identity_preferred_over_request() {
    let h = harness();
    let response = h
        .coordinator
        .handle(Submission {
            device_id: Some("other-device".into()),
            chunk_id: Some("999".into()),
            body: good_chunk(),
        })
        .await;

    // The decoded header says (d1, 42); the request-supplied values lose.
    assert_eq!(response.chunk_id, "42");
    assert_eq!(h.sink.records()[0].device_id, "d1");
}

#[tokio::test]
async fn test_empty_body_acks_without_state_change() {
    let h = harness();
    let response = h.coordinator.handle(submission(Vec::new())).await;

    assert_eq!(response.result, SubmissionStatus::Ack);
    assert_eq!(response.error, Some(ResponseError::EmptyChunk));
    assert!(h.sink.records().is_empty());
    assert!(h.archive.chunks().is_empty());
    assert_eq!(h.coordinator.pending_retries(), 0);
}

// ----------------------------------------------------------------------------
// Two-Strike Handshake
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_two_strikes_repit_then_give_up() {
    let h = harness();

    let first = h.coordinator.handle(submission(corrupt_chunk())).await;
    assert_eq!(first.result, SubmissionStatus::Repit);
    assert_eq!(first.chunk_id, "42");
    assert_eq!(first.error, None);
    assert_eq!(h.coordinator.pending_retries(), 1);

    let second = h.coordinator.handle(submission(corrupt_chunk())).await;
    assert_eq!(second.result, SubmissionStatus::Ack);
    assert_eq!(second.error, Some(ResponseError::UnrecoverableChunk));
    assert_eq!(h.coordinator.pending_retries(), 0);

    // The entry is gone, so a third submission starts over at REPIT.
    let third = h.coordinator.handle(submission(corrupt_chunk())).await;
    assert_eq!(third.result, SubmissionStatus::Repit);

    // Every failed submission archived its raw bytes.
    assert_eq!(h.archive.chunks().len(), 3);
    assert!(h.sink.records().is_empty());
}

#[tokio::test]
async fn test_success_resets_pending_retry() {
    let h = harness();

    let first = h.coordinator.handle(submission(corrupt_chunk())).await;
    assert_eq!(first.result, SubmissionStatus::Repit);

    let retry = h.coordinator.handle(submission(good_chunk())).await;
    assert_eq!(retry.result, SubmissionStatus::Ack);
    assert_eq!(h.coordinator.pending_retries(), 0);

    // A later failure for the same identity is a fresh first strike.
    let later = h.coordinator.handle(submission(corrupt_chunk())).await;
    assert_eq!(later.result, SubmissionStatus::Repit);
}

#[tokio::test]
async fn test_archive_failure_does_not_change_the_verdict() {
    let h = harness();
    h.archive.fail_next();

    let response = h.coordinator.handle(submission(corrupt_chunk())).await;
    assert_eq!(response.result, SubmissionStatus::Repit);
    assert!(h.archive.chunks().is_empty());
}

// ----------------------------------------------------------------------------
// Internal Failures
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_sink_failure_is_internal_error_never_repit() {
    let h = harness();
    h.sink.fail_next();

    let response = h.coordinator.handle(submission(good_chunk())).await;
    assert_eq!(response.result, SubmissionStatus::Ack);
    assert_eq!(response.error, Some(ResponseError::InternalError));

    // Nothing persisted, raw bytes archived for inspection, and no retry
    // entry: a sink outage must not trigger resend loops.
    assert!(h.sink.records().is_empty());
    assert_eq!(h.archive.chunks().len(), 1);
    assert_eq!(h.coordinator.pending_retries(), 0);

    // The same chunk resent after the outage ingests normally.
    let resent = h.coordinator.handle(submission(good_chunk())).await;
    assert_eq!(resent.result, SubmissionStatus::Ack);
    assert_eq!(resent.error, None);
    assert_eq!(h.sink.records().len(), 2);
}

// ----------------------------------------------------------------------------
// Concurrency
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_concurrent_submissions_for_different_devices() {
    let sink = Arc::new(MemorySink::new());
    let archive = Arc::new(MemoryArchive::new());
    let coordinator = Arc::new(Coordinator::new(
        MessageDictionary::builtin(),
        FileTable::builtin(),
        Arc::clone(&sink),
        Arc::clone(&archive),
        IngestConfig::default(),
    ));

    let mut handles = Vec::new();
    for device in 0..8u64 {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            let body = ChunkWriter::new(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())
                .device_id(format!("dev-{device}"))
                .chunk_id(device)
                .record(1, 0, &[FieldValue::I32(device as i32)], 1, 1)
                .finish();
            coordinator
                .handle(Submission {
                    device_id: None,
                    chunk_id: None,
                    body,
                })
                .await
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.result, SubmissionStatus::Ack);
        assert_eq!(response.error, None);
    }
    assert_eq!(sink.records().len(), 8);
    assert_eq!(coordinator.pending_retries(), 0);
}
