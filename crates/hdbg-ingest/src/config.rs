//! Ingestion configuration

use std::path::PathBuf;

// ----------------------------------------------------------------------------
// Ingest Configuration
// ----------------------------------------------------------------------------

/// Tunables for the ingestion coordinator.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Directory the filesystem archive stores rejected chunks under.
    pub archive_dir: PathBuf,
    /// Archived-chunk count at which an operational review warning is logged.
    /// A threshold check on every archival, not a hard limit.
    pub archive_warn_threshold: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            archive_dir: PathBuf::from("hdbg-archive"),
            archive_warn_threshold: 5,
        }
    }
}
