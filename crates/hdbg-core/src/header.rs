//! Chunk header decoding
//!
//! Every chunk starts with a semi-fixed-length header: magic, format version,
//! the calendar date all record timestamps are relative to, the dictionary
//! revision the sender encoded against, an optional device id and, from
//! format minor version 1 on, a 64-bit chunk id.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cursor::{Cursor, ShortRead};
use crate::errors::HeaderError;

// ----------------------------------------------------------------------------
// Format Constants
// ----------------------------------------------------------------------------

/// Magic tag every chunk starts with.
pub const CHUNK_MAGIC: [u8; 4] = *b"HDBG";

/// The one format major version this decoder supports.
pub const FORMAT_VERSION_MAJOR: u8 = 1;

/// First minor version that carries a chunk id.
pub const MINOR_VERSION_WITH_CHUNK_ID: u8 = 1;

// ----------------------------------------------------------------------------
// Chunk Header
// ----------------------------------------------------------------------------

/// Decoded chunk header. Constructed once per chunk, immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHeader {
    /// Format major version.
    pub version_major: u8,
    /// Format minor version.
    pub version_minor: u8,
    /// Calendar date all record timestamps are offsets from.
    pub date: NaiveDate,
    /// Dictionary revision (major, minor) the sender encoded against.
    pub dictionary_revision: (u8, u8),
    /// Sending device, when the sender included one.
    pub device_id: Option<String>,
    /// Chunk identity. Required by the strict driver when minor version >= 1,
    /// but its absence is not an error at header-decode time.
    pub chunk_id: Option<u64>,
}

impl ChunkHeader {
    /// Whether this header's format version obliges it to carry a chunk id.
    pub fn requires_chunk_id(&self) -> bool {
        self.version_minor >= MINOR_VERSION_WITH_CHUNK_ID
    }
}

// ----------------------------------------------------------------------------
// Decoding
// ----------------------------------------------------------------------------

impl From<ShortRead> for HeaderError {
    fn from(short: ShortRead) -> Self {
        HeaderError::Truncated {
            needed: short.needed,
            got: short.got,
            offset: short.offset,
        }
    }
}

/// Decode a chunk header starting at the cursor's current position.
///
/// On success the cursor is left at the first record boundary. A missing
/// chunk id (fewer than 8 bytes left after the device id) is not an error
/// here; the strict driver validates it against the format version.
pub fn decode_header(cur: &mut Cursor<'_>) -> Result<ChunkHeader, HeaderError> {
    let magic: [u8; 4] = cur.read_array()?;
    if magic != CHUNK_MAGIC {
        return Err(HeaderError::BadMagic {
            expected: CHUNK_MAGIC,
            actual: magic,
        });
    }

    let version_major = cur.read_u8()?;
    let version_minor = cur.read_u8()?;

    let year = cur.read_u16_le()?;
    let month = cur.read_u8()?;
    let day = cur.read_u8()?;
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or(HeaderError::InvalidDate { year, month, day })?;

    let dictionary_revision = (cur.read_u8()?, cur.read_u8()?);

    let device_len = cur.read_u8()? as usize;
    let device_id = if device_len == 0 {
        None
    } else {
        let bytes = cur.read_bytes(device_len)?;
        Some(
            core::str::from_utf8(bytes)
                .map_err(|_| HeaderError::InvalidDeviceId)?
                .to_owned(),
        )
    };

    let chunk_id = if version_minor >= MINOR_VERSION_WITH_CHUNK_ID && cur.remaining() >= 8 {
        Some(cur.read_u64_le()?)
    } else {
        None
    };

    Ok(ChunkHeader {
        version_major,
        version_minor,
        date,
        dictionary_revision,
        device_id,
        chunk_id,
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
