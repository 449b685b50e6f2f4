//! Error types for the ingestion engine
//!
//! The coordinator routes on one distinction: decode-classified failures go
//! through the two-strike REPIT handshake, everything else is an internal
//! failure the device must never retry against.

use thiserror::Error;

use hdbg_core::ChunkError;

// ----------------------------------------------------------------------------
// Ingest Errors
// ----------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum IngestError {
    /// Strict chunk decode failed. The only category that may earn a REPIT.
    #[error("chunk decode failed: {0}")]
    Decode(#[from] ChunkError),

    /// The record sink rejected or failed a batch.
    #[error("record sink failure: {reason}")]
    Sink { reason: String },

    /// The raw-bytes archive could not store a chunk.
    #[error("archive failure: {0}")]
    Archive(#[from] std::io::Error),
}

impl IngestError {
    /// Create a sink error with a reason.
    pub fn sink<T: Into<String>>(reason: T) -> Self {
        IngestError::Sink {
            reason: reason.into(),
        }
    }

    /// Whether this failure goes through the retry handshake.
    pub fn is_decode(&self) -> bool {
        matches!(self, IngestError::Decode(_))
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, IngestError>;
