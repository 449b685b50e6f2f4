//! Single-record decoding and text rendering
//!
//! A record on the wire is: message code (u16) · relative timestamp (3 bytes,
//! accumulated 10 ms ticks since the header date) · the context fields the
//! dictionary schema declares for that code · a trailing file code (u8) and
//! line number (u16). Decoding one record yields the final rendered log line.

use core::fmt;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::dictionary::{FieldKind, FileTable, Level, MessageDictionary, MessageSpec};
use crate::errors::RecordError;
use crate::header::ChunkHeader;

// ----------------------------------------------------------------------------
// Timestamp Ticks
// ----------------------------------------------------------------------------

/// Milliseconds per relative-timestamp tick.
pub const MS_PER_TICK: i64 = 10;

/// Nominal maximum ticks in one calendar day. The encoding assumes ticks
/// never exceed a day; the decoder does not enforce the bound.
pub const MAX_TICKS_PER_DAY: u32 = 8_640_000;

// ----------------------------------------------------------------------------
// Field Values
// ----------------------------------------------------------------------------

/// One decoded context-field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Str(String),
    U16(u16),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::I32(v) => write!(f, "{v}"),
            FieldValue::I64(v) => write!(f, "{v}"),
            FieldValue::F32(v) => write!(f, "{v}"),
            FieldValue::F64(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Str(v) => write!(f, "{v}"),
            FieldValue::U16(v) => write!(f, "{v}"),
        }
    }
}

// ----------------------------------------------------------------------------
// Decoded Record
// ----------------------------------------------------------------------------

/// One fully decoded log line. Immutable value consumed by the record sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedRecord {
    /// Absolute timestamp: header date at midnight UTC plus the tick offset.
    pub timestamp: DateTime<Utc>,
    /// Severity from the dictionary entry.
    pub level: Level,
    /// Rendered text, placeholders substituted.
    pub text: String,
}

// ----------------------------------------------------------------------------
// Record Decoding
// ----------------------------------------------------------------------------

/// Decode one record starting at the cursor's current position.
///
/// The chunk driver only calls this with at least a full message code left in
/// the buffer, so a missing code is never seen there; a short read of the
/// code is still fatal here for direct callers. Every other short read surfaces
/// as [`RecordError::Truncated`]. On failure the cursor is left wherever the
/// failing read stopped, which for an unknown message code is exactly past
/// the code and timestamp bytes.
pub fn decode_record(
    cur: &mut Cursor<'_>,
    header: &ChunkHeader,
    dictionary: &MessageDictionary,
    files: &FileTable,
) -> Result<DecodedRecord, RecordError> {
    let start = cur.position();

    let code = cur.read_u16_le().map_err(|s| RecordError::Truncated {
        field: "message_code",
        needed: s.needed,
        got: s.got,
        offset: start,
    })?;

    // A timestamp cut short by the buffer end zero-pads rather than
    // failing; the last record of a chunk may arrive truncated.
    let ticks = cur.read_u24_le_padded();

    // Unknown code is checked before any context bytes are consumed, so a
    // skipping driver resumes right here.
    let spec = dictionary
        .get(code)
        .ok_or(RecordError::UnknownMessageCode {
            code,
            offset: start,
        })?;

    let mut values: Vec<(&'static str, FieldValue)> = Vec::with_capacity(spec.fields.len());
    for field in spec.fields {
        let value = read_field(cur, field.name, field.kind, start)?;
        values.push((field.name, value));
    }

    let file_code = cur.read_u8().map_err(|s| RecordError::Truncated {
        field: "file_code",
        needed: s.needed,
        got: s.got,
        offset: start,
    })?;
    let line = cur.read_u16_le().map_err(|s| RecordError::Truncated {
        field: "line_number",
        needed: s.needed,
        got: s.got,
        offset: start,
    })?;

    let file_name = files.get(file_code).ok_or(RecordError::UnknownFileCode {
        code: file_code,
        offset: start,
    })?;

    let midnight = header.date.and_time(NaiveTime::MIN).and_utc();
    let timestamp = midnight + Duration::milliseconds(i64::from(ticks) * MS_PER_TICK);

    Ok(DecodedRecord {
        timestamp,
        level: spec.level,
        text: render_text(spec, &values, file_name, line),
    })
}

fn read_field(
    cur: &mut Cursor<'_>,
    name: &'static str,
    kind: FieldKind,
    record_offset: usize,
) -> Result<FieldValue, RecordError> {
    let truncated = |s: crate::cursor::ShortRead| RecordError::Truncated {
        field: name,
        needed: s.needed,
        got: s.got,
        offset: record_offset,
    };

    Ok(match kind {
        FieldKind::I32 => FieldValue::I32(cur.read_i32_le().map_err(truncated)?),
        FieldKind::I64 => FieldValue::I64(cur.read_i64_le().map_err(truncated)?),
        FieldKind::F32 => FieldValue::F32(cur.read_f32_le().map_err(truncated)?),
        FieldKind::F64 => FieldValue::F64(cur.read_f64_le().map_err(truncated)?),
        FieldKind::Bool => FieldValue::Bool(cur.read_u8().map_err(truncated)? != 0),
        FieldKind::U16 => FieldValue::U16(cur.read_u16_le().map_err(truncated)?),
        FieldKind::Str => {
            let len = cur.read_u8().map_err(truncated)? as usize;
            let bytes = cur.read_bytes(len).map_err(truncated)?;
            let text = core::str::from_utf8(bytes)
                .map_err(|_| RecordError::InvalidUtf8 {
                    field: name,
                    offset: record_offset,
                })?
                .to_owned();
            FieldValue::Str(text)
        }
    })
}

// ----------------------------------------------------------------------------
// Text Rendering
// ----------------------------------------------------------------------------

/// Location suffix some legacy firmware templates still carry; the renderer
/// strips it since the location is now prefixed instead.
const LEGACY_LOCATION_SUFFIX: &str = "(file %file%, line %line%)";

fn render_text(
    spec: &MessageSpec,
    values: &[(&'static str, FieldValue)],
    file_name: &str,
    line: u16,
) -> String {
    let template = spec
        .template
        .trim_end()
        .strip_suffix(LEGACY_LOCATION_SUFFIX)
        .map(str::trim_end)
        .unwrap_or(spec.template);

    // File and line always resolve by this point (an unmapped file code has
    // already failed the record), so the location prefix is unconditional.
    let mut text = format!("{file_name},{line} {template}");

    for (name, value) in values {
        text = text.replace(&format!("%{name}%"), &value.to_string());
    }
    text = text.replace("%file%", file_name);
    text.replace("%line%", &line.to_string())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ChunkWriter;
    use chrono::NaiveDate;

    fn decode_one(bytes: &[u8]) -> Result<DecodedRecord, RecordError> {
        let mut cur = Cursor::new(bytes);
        let header = crate::header::decode_header(&mut cur).unwrap();
        decode_record(
            &mut cur,
            &header,
            &MessageDictionary::builtin(),
            &FileTable::builtin(),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_decode_with_context_field() {
        let bytes = ChunkWriter::new(date())
            .chunk_id(42)
            .record(1, 360_000, &[FieldValue::I32(5)], 1, 120)
            .finish();

        let record = decode_one(&bytes).unwrap();
        assert_eq!(record.level, Level::Info);
        assert!(record.text.contains("размер кэша: 5"));
        assert!(record.text.starts_with("sync.c,120 "));
        // 360_000 ticks * 10 ms = 1 hour past midnight.
        assert_eq!(
            record.timestamp,
            date().and_hms_opt(1, 0, 0).unwrap().and_utc()
        );
    }

    #[test]
    fn test_unknown_code_consumes_only_code_and_timestamp() {
        let bytes = ChunkWriter::new(date())
            .chunk_id(1)
            .record(999, 0, &[], 1, 1)
            .finish();

        let mut cur = Cursor::new(&bytes);
        let header = crate::header::decode_header(&mut cur).unwrap();
        let record_start = cur.position();

        let err = decode_record(
            &mut cur,
            &header,
            &MessageDictionary::builtin(),
            &FileTable::builtin(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            RecordError::UnknownMessageCode { code: 999, .. }
        ));
        assert!(err.is_recoverable());
        assert_eq!(err.offset(), record_start);
        // Exactly the 2-byte code and 3-byte timestamp are gone.
        assert_eq!(cur.position(), record_start + 5);
    }

    #[test]
    fn test_truncated_schema_field() {
        let bytes = ChunkWriter::new(date())
            .chunk_id(1)
            .record(1, 0, &[FieldValue::I32(5)], 1, 1)
            .finish();

        // Cut two bytes into the i32 context field.
        let mut cur = Cursor::new(&bytes[..bytes.len() - 5]);
        let header = crate::header::decode_header(&mut cur).unwrap();
        let err = decode_record(
            &mut cur,
            &header,
            &MessageDictionary::builtin(),
            &FileTable::builtin(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            RecordError::Truncated {
                field: "cache_size",
                ..
            }
        ));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_unknown_file_code() {
        let bytes = ChunkWriter::new(date())
            .chunk_id(1)
            .record(1, 0, &[FieldValue::I32(5)], 0xEE, 1)
            .finish();

        let err = decode_one(&bytes).unwrap_err();
        assert!(matches!(err, RecordError::UnknownFileCode { code: 0xEE, .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_legacy_location_suffix_stripped() {
        // Code 10's template ends in "(file %file%, line %line%)"; the
        // renderer drops it and keeps only the location prefix.
        let bytes = ChunkWriter::new(date())
            .chunk_id(1)
            .record(10, 0, &[], 5, 77)
            .finish();

        let record = decode_one(&bytes).unwrap();
        assert_eq!(record.text, "main.c,77 Отказ записи в журнал");
    }

    #[test]
    fn test_multiple_placeholders() {
        let bytes = ChunkWriter::new(date())
            .chunk_id(1)
            .record(
                4,
                0,
                &[
                    FieldValue::Str("srv.local".into()),
                    FieldValue::U16(3),
                ],
                2,
                8,
            )
            .finish();

        let record = decode_one(&bytes).unwrap();
        assert_eq!(
            record.text,
            "net.c,8 Повторное подключение к srv.local (попытка 3)"
        );
        assert_eq!(record.level, Level::Warn);
    }
}
