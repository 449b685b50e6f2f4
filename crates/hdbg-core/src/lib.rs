//! HDBG Chunk Decoding Core
//!
//! This crate implements the decoding side of the HDBG diagnostic-log wire
//! format: remote devices ship compact binary "chunks" (one header followed by
//! zero or more records), and this crate turns them into human-readable log
//! lines using a versioned numeric-code-to-template dictionary.
//!
//! Decoding is pure CPU-bound parsing over an in-memory buffer with no hidden
//! state, so the same functions can be used concurrently across chunks. The
//! stateful ingestion side (retry handshake, sinks, archiving) lives in the
//! `hdbg-ingest` crate.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod chunk;
pub mod cursor;
pub mod dictionary;
pub mod errors;
pub mod header;
pub mod record;
pub mod writer;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use chunk::{decode_chunk, inspect_chunk, ChunkInspection, DecodedChunk};
pub use dictionary::{FieldKind, FieldSpec, FileTable, Level, MessageDictionary, MessageSpec};
pub use errors::{ChunkError, HeaderError, RecordError, Result};
pub use header::{ChunkHeader, CHUNK_MAGIC, FORMAT_VERSION_MAJOR};
pub use record::{DecodedRecord, FieldValue};
pub use writer::ChunkWriter;
