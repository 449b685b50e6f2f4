//! Collaborator traits: record sink and raw-bytes archive
//!
//! The coordinator only ever talks to its two external collaborators through
//! these traits. Persisting decoded records and archiving unparsable bytes
//! are the only suspending operations on the ingestion path; decoding itself
//! never does I/O.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hdbg_core::Level;

use crate::errors::Result;

// ----------------------------------------------------------------------------
// Sink Record
// ----------------------------------------------------------------------------

/// One decoded record as handed to the sink, tagged with chunk identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub text: String,
    pub chunk_id: String,
    pub device_id: String,
    /// Dictionary revision the sending device encoded against.
    pub dictionary_revision: (u8, u8),
}

// ----------------------------------------------------------------------------
// Record Sink
// ----------------------------------------------------------------------------

/// Destination for the records of a successfully decoded chunk.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist every record of one chunk.
    ///
    /// All-or-nothing per submission: on error the sink must leave none of
    /// the batch behind, since the coordinator answers INTERNAL_ERROR and the
    /// device may legitimately resend the same chunk later.
    async fn append_chunk(&self, records: Vec<SinkRecord>) -> Result<()>;
}

// ----------------------------------------------------------------------------
// Chunk Archive
// ----------------------------------------------------------------------------

/// Storage for the raw bytes of chunks that failed strict decoding, kept for
/// offline inspection.
#[async_trait]
pub trait ChunkArchive: Send + Sync {
    /// Store one chunk's bytes under a stable, collision-resistant name.
    /// Returns how many chunks the archive holds afterwards, so the caller
    /// can decide whether to nag an operator.
    async fn store(
        &self,
        device_id: &str,
        chunk_id: &str,
        received_at: DateTime<Utc>,
        bytes: &[u8],
    ) -> Result<usize>;
}
