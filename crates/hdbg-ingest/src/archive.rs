//! Filesystem implementation of the raw-bytes archive

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::errors::Result;
use crate::sink::ChunkArchive;

/// File extension for archived chunks.
const CHUNK_EXTENSION: &str = "chunk";

// ----------------------------------------------------------------------------
// Filesystem Archive
// ----------------------------------------------------------------------------

/// Stores rejected chunks as files under one directory, one file per
/// submission, named `{device}_{chunk}_{unix_millis}.chunk`. The receipt
/// timestamp keeps resubmissions of the same identity from colliding.
#[derive(Debug, Clone)]
pub struct FsArchive {
    dir: PathBuf,
}

impl FsArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Count archived chunks currently on disk.
    pub async fn stored_count(&self) -> Result<usize> {
        let mut count = 0;
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) == Some(CHUNK_EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl ChunkArchive for FsArchive {
    async fn store(
        &self,
        device_id: &str,
        chunk_id: &str,
        received_at: DateTime<Utc>,
        bytes: &[u8],
    ) -> Result<usize> {
        fs::create_dir_all(&self.dir).await?;

        let name = format!(
            "{}_{}_{}.{CHUNK_EXTENSION}",
            sanitize(device_id),
            sanitize(chunk_id),
            received_at.timestamp_millis()
        );
        fs::write(self.dir.join(name), bytes).await?;

        self.stored_count().await
    }
}

/// Identifiers come off the wire; keep file names to a portable charset.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
