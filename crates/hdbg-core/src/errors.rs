//! Error types for HDBG chunk decoding
//!
//! The decode error taxonomy mirrors how failures propagate: header-structural
//! errors are always fatal to the chunk, an unknown message code is the one
//! per-record condition a driver may skip, and every other record failure
//! means the stream itself is corrupt.

use thiserror::Error;

// ----------------------------------------------------------------------------
// Header Errors
// ----------------------------------------------------------------------------

/// Structural failures while decoding the chunk header. Always fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HeaderError {
    #[error("bad magic: expected {expected:?}, got {actual:?}")]
    BadMagic { expected: [u8; 4], actual: [u8; 4] },

    #[error("chunk too short for header: need {needed} bytes at offset {offset}, {got} remain")]
    Truncated {
        needed: usize,
        got: usize,
        offset: usize,
    },

    #[error("invalid calendar date {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: u16, month: u8, day: u8 },

    #[error("device id is not valid UTF-8")]
    InvalidDeviceId,
}

// ----------------------------------------------------------------------------
// Record Errors
// ----------------------------------------------------------------------------

/// Failures while decoding a single record.
///
/// Every variant carries the byte offset where the record started, for
/// diagnostics. Only [`RecordError::UnknownMessageCode`] is recoverable; the
/// other variants indicate the stream is corrupt past this point.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    /// The message code has no entry in the active dictionary. Raised before
    /// any context bytes are consumed.
    #[error("corrupted entry: unknown message code {code} (record at offset {offset})")]
    UnknownMessageCode { code: u16, offset: usize },

    /// A field with known width could not be read in full.
    #[error(
        "truncated record: field `{field}` needs {needed} bytes, {got} remain \
         (record at offset {offset})"
    )]
    Truncated {
        field: &'static str,
        needed: usize,
        got: usize,
        offset: usize,
    },

    /// The trailing file code has no entry in the file table.
    #[error("unknown file code {code} (record at offset {offset})")]
    UnknownFileCode { code: u8, offset: usize },

    /// A string field's bytes are not valid UTF-8.
    #[error("field `{field}` is not valid UTF-8 (record at offset {offset})")]
    InvalidUtf8 { field: &'static str, offset: usize },
}

impl RecordError {
    /// Whether a decode driver may skip this record and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecordError::UnknownMessageCode { .. })
    }

    /// Byte offset of the start of the record that failed.
    pub fn offset(&self) -> usize {
        match self {
            RecordError::UnknownMessageCode { offset, .. }
            | RecordError::Truncated { offset, .. }
            | RecordError::UnknownFileCode { offset, .. }
            | RecordError::InvalidUtf8 { offset, .. } => *offset,
        }
    }
}

// ----------------------------------------------------------------------------
// Chunk Errors
// ----------------------------------------------------------------------------

/// Chunk-level failures raised by the strict decode driver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChunkError {
    #[error("header: {0}")]
    Header(#[from] HeaderError),

    #[error("unsupported format version {major}.{minor} (supported major: {supported})")]
    UnsupportedVersion { major: u8, minor: u8, supported: u8 },

    #[error("chunk id required for format minor version {minor}")]
    MissingChunkId { minor: u8 },

    /// A record-structural failure aborted the chunk. Carries the offset of
    /// the failed record and how many records decoded cleanly before it.
    #[error("record at offset {offset} (after {records_decoded} decoded): {source}")]
    Record {
        offset: usize,
        records_decoded: usize,
        #[source]
        source: RecordError,
    },
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, ChunkError>;
