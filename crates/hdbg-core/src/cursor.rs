//! Byte cursor over a chunk buffer
//!
//! All multi-byte integers in the HDBG wire format are little-endian. The
//! cursor tracks its absolute offset so decode errors can report where in the
//! buffer a record started.

use core::convert::TryInto;

// ----------------------------------------------------------------------------
// Short Reads
// ----------------------------------------------------------------------------

/// A read requested more bytes than the buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortRead {
    /// Bytes the read needed.
    pub needed: usize,
    /// Bytes that actually remained.
    pub got: usize,
    /// Cursor position when the read was attempted.
    pub offset: usize,
}

// ----------------------------------------------------------------------------
// Cursor
// ----------------------------------------------------------------------------

/// Read-only cursor over an in-memory chunk buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned at offset 0.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current absolute offset into the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether the buffer is exhausted.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ShortRead> {
        if self.remaining() < n {
            return Err(ShortRead {
                needed: n,
                got: self.remaining(),
                offset: self.pos,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ShortRead> {
        let bytes = self.read_bytes(N)?;
        // read_bytes already guaranteed the length
        Ok(bytes.try_into().unwrap_or([0u8; N]))
    }

    pub fn read_u8(&mut self) -> Result<u8, ShortRead> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, ShortRead> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, ShortRead> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, ShortRead> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, ShortRead> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64_le(&mut self) -> Result<i64, ShortRead> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32_le(&mut self) -> Result<f32, ShortRead> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64_le(&mut self) -> Result<f64, ShortRead> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Read a 3-byte little-endian unsigned integer, zero-padding on the low
    /// side when fewer than 3 bytes remain. Never fails: the final record of a
    /// chunk may be truncated mid-timestamp and is decoded lossily rather than
    /// rejected, so the bytes that did arrive land in the high-order positions.
    pub fn read_u24_le_padded(&mut self) -> u32 {
        let n = self.remaining().min(3);
        let mut bytes = [0u8; 4];
        bytes[3 - n..3].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        u32::from_le_bytes(bytes)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_advance_position() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05];
        let mut cur = Cursor::new(&buf);

        assert_eq!(cur.read_u8().unwrap(), 0x01);
        assert_eq!(cur.read_u16_le().unwrap(), 0x0302);
        assert_eq!(cur.position(), 3);
        assert_eq!(cur.remaining(), 2);
    }

    #[test]
    fn test_short_read_reports_offset() {
        let buf = [0xAA, 0xBB];
        let mut cur = Cursor::new(&buf);
        cur.read_u8().unwrap();

        let err = cur.read_u32_le().unwrap_err();
        assert_eq!(
            err,
            ShortRead {
                needed: 4,
                got: 1,
                offset: 1
            }
        );
        // A failed read consumes nothing.
        assert_eq!(cur.position(), 1);
    }

    #[test]
    fn test_u24_padded_full_width() {
        let buf = [0x01, 0x02, 0x03];
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_u24_le_padded(), 0x030201);
        assert!(cur.is_empty());
    }

    #[test]
    fn test_u24_padded_truncated() {
        // Two bytes left: they shift into the high-order positions and the
        // missing low byte reads as zero.
        let buf = [0x01, 0x02];
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_u24_le_padded(), 0x020100);
        assert!(cur.is_empty());

        let mut empty = Cursor::new(&[]);
        assert_eq!(empty.read_u24_le_padded(), 0);
    }
}
