//! HDBG Ingestion Engine
//!
//! This crate contains the stateful side of chunk ingestion:
//! - `Coordinator`: per-submission protocol logic deciding ACK vs REPIT
//! - `RetryTable`: the process-wide two-strike retry state
//! - `RecordSink` / `ChunkArchive`: the external collaborators decoded
//!   records and unparsable chunk bytes are handed to
//! - `FsArchive`: filesystem implementation of the raw-bytes archive
//!
//! Decoding itself is pure and lives in `hdbg-core`; this is the "engine"
//! that drives it once per inbound submission.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod archive;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod retry;
pub mod sink;
pub mod testing;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use archive::FsArchive;
pub use config::IngestConfig;
pub use coordinator::{ChunkResponse, Coordinator, ResponseError, Submission, SubmissionStatus};
pub use errors::{IngestError, Result};
pub use retry::{RetryDecision, RetryKey, RetryTable};
pub use sink::{ChunkArchive, RecordSink, SinkRecord};
