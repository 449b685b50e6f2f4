//! In-memory collaborator implementations for tests and demos

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::{IngestError, Result};
use crate::sink::{ChunkArchive, RecordSink, SinkRecord};

// ----------------------------------------------------------------------------
// Memory Sink
// ----------------------------------------------------------------------------

/// Record sink that keeps everything in memory. Can be told to fail the next
/// batch, to exercise the INTERNAL_ERROR path.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<SinkRecord>>,
    fail_next: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `append_chunk` call fail without storing anything.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Snapshot of everything appended so far.
    pub fn records(&self) -> Vec<SinkRecord> {
        self.records.lock().expect("sink poisoned").clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn append_chunk(&self, records: Vec<SinkRecord>) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(IngestError::sink("injected sink failure"));
        }
        self.records.lock().expect("sink poisoned").extend(records);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Memory Archive
// ----------------------------------------------------------------------------

/// One archived chunk as captured by [`MemoryArchive`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedChunk {
    pub device_id: String,
    pub chunk_id: String,
    pub bytes: Vec<u8>,
}

/// Raw-bytes archive that keeps chunks in memory. Can be told to fail, to
/// exercise the best-effort archival path.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    chunks: Mutex<Vec<ArchivedChunk>>,
    fail_next: AtomicBool,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn chunks(&self) -> Vec<ArchivedChunk> {
        self.chunks.lock().expect("archive poisoned").clone()
    }
}

#[async_trait]
impl ChunkArchive for MemoryArchive {
    async fn store(
        &self,
        device_id: &str,
        chunk_id: &str,
        _received_at: DateTime<Utc>,
        bytes: &[u8],
    ) -> Result<usize> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(IngestError::Archive(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected archive failure",
            )));
        }
        let mut chunks = self.chunks.lock().expect("archive poisoned");
        chunks.push(ArchivedChunk {
            device_id: device_id.to_owned(),
            chunk_id: chunk_id.to_owned(),
            bytes: bytes.to_vec(),
        });
        Ok(chunks.len())
    }
}
