//! Chunk encoding
//!
//! Builder producing wire-format chunk bytes from a header description and a
//! sequence of records. The ingest path never encodes; the writer exists for
//! tests, simulated devices, and tooling that needs valid chunks.

use chrono::{Datelike, NaiveDate};

use crate::header::{CHUNK_MAGIC, FORMAT_VERSION_MAJOR, MINOR_VERSION_WITH_CHUNK_ID};
use crate::record::FieldValue;

// ----------------------------------------------------------------------------
// Chunk Writer
// ----------------------------------------------------------------------------

/// Builder for one binary chunk.
#[derive(Debug, Clone)]
pub struct ChunkWriter {
    version_major: u8,
    version_minor: u8,
    date: NaiveDate,
    dictionary_revision: (u8, u8),
    device_id: Option<String>,
    chunk_id: Option<u64>,
    records: Vec<u8>,
}

impl ChunkWriter {
    /// Start a chunk for the given base date at the current format version.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            version_major: FORMAT_VERSION_MAJOR,
            version_minor: MINOR_VERSION_WITH_CHUNK_ID,
            date,
            dictionary_revision: (1, 0),
            device_id: None,
            chunk_id: None,
            records: Vec::new(),
        }
    }

    /// Override the format version, e.g. to produce legacy 1.0 chunks.
    pub fn version(mut self, major: u8, minor: u8) -> Self {
        self.version_major = major;
        self.version_minor = minor;
        self
    }

    pub fn dictionary_revision(mut self, major: u8, minor: u8) -> Self {
        self.dictionary_revision = (major, minor);
        self
    }

    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn chunk_id(mut self, chunk_id: u64) -> Self {
        self.chunk_id = Some(chunk_id);
        self
    }

    /// Append one record. The field values must match the dictionary schema
    /// for `code` if the chunk is meant to decode cleanly; the writer does
    /// not consult the dictionary, which is exactly what makes it useful for
    /// producing corrupt chunks in tests.
    pub fn record(
        mut self,
        code: u16,
        ticks: u32,
        fields: &[FieldValue],
        file_code: u8,
        line: u16,
    ) -> Self {
        self.records.extend_from_slice(&code.to_le_bytes());
        self.records.extend_from_slice(&ticks.to_le_bytes()[..3]);
        for value in fields {
            push_field(&mut self.records, value);
        }
        self.records.push(file_code);
        self.records.extend_from_slice(&line.to_le_bytes());
        self
    }

    /// Produce the final chunk bytes: header followed by all records.
    pub fn finish(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(24 + self.records.len());

        bytes.extend_from_slice(&CHUNK_MAGIC);
        bytes.push(self.version_major);
        bytes.push(self.version_minor);

        bytes.extend_from_slice(&(Datelike::year(&self.date) as u16).to_le_bytes());
        bytes.push(Datelike::month(&self.date) as u8);
        bytes.push(Datelike::day(&self.date) as u8);

        bytes.push(self.dictionary_revision.0);
        bytes.push(self.dictionary_revision.1);

        match &self.device_id {
            Some(id) => {
                let id_bytes = id.as_bytes();
                bytes.push(id_bytes.len() as u8);
                bytes.extend_from_slice(id_bytes);
            }
            None => bytes.push(0),
        }

        if self.version_minor >= MINOR_VERSION_WITH_CHUNK_ID {
            if let Some(chunk_id) = self.chunk_id {
                bytes.extend_from_slice(&chunk_id.to_le_bytes());
            }
        }

        bytes.extend_from_slice(&self.records);
        bytes
    }
}

fn push_field(out: &mut Vec<u8>, value: &FieldValue) {
    match value {
        FieldValue::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
        FieldValue::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
        FieldValue::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
        FieldValue::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
        FieldValue::Bool(v) => out.push(u8::from(*v)),
        FieldValue::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
        FieldValue::Str(v) => {
            let bytes = v.as_bytes();
            out.push(bytes.len() as u8);
            out.extend_from_slice(bytes);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let bytes = ChunkWriter::new(date)
            .device_id("d1")
            .chunk_id(42)
            .finish();

        assert_eq!(&bytes[0..4], b"HDBG");
        assert_eq!(bytes[4], 1); // major
        assert_eq!(bytes[5], 1); // minor
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 2025);
        assert_eq!(bytes[8], 1); // month
        assert_eq!(bytes[9], 15); // day
        assert_eq!(bytes[12], 2); // device id length
        assert_eq!(&bytes[13..15], b"d1");
        assert_eq!(
            u64::from_le_bytes(bytes[15..23].try_into().unwrap()),
            42
        );
    }

    #[test]
    fn test_legacy_minor_zero_has_no_chunk_id() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let bytes = ChunkWriter::new(date)
            .version(1, 0)
            .chunk_id(42)
            .finish();

        // Header is exactly the 13 fixed bytes: no device id, no chunk id.
        assert_eq!(bytes.len(), 13);
    }

    #[test]
    fn test_record_field_widths() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let header_only = ChunkWriter::new(date).chunk_id(1).finish();
        let with_record = ChunkWriter::new(date)
            .chunk_id(1)
            .record(
                6,
                0,
                &[FieldValue::Str("cpu".into()), FieldValue::F32(36.6)],
                3,
                10,
            )
            .finish();

        // code(2) + ticks(3) + str(1+3) + f32(4) + file(1) + line(2)
        assert_eq!(with_record.len() - header_only.len(), 16);
    }
}
