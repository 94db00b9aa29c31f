//! Component G: the raw byte cursor.
//!
//! A thin typed decoder over a mapped slice. Mutating reads advance the
//! cursor; peeks do not (except where noted). All multi-byte reads are
//! little-endian, matching the format's byte order (spec §6).

use crate::error::WireError;

/// A cursor over a borrowed byte slice — typically a view into a mapped data
/// file produced by `chronicle-storage`'s data-file cache.
#[derive(Debug)]
pub struct RawCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> RawCursor<'a> {
    pub fn new(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, offset }
    }

    pub fn get_offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Moves the cursor forward by `n` bytes without reading them.
    pub fn advance(&mut self, n: usize) {
        self.offset += n;
    }

    fn require(&self, len: usize) -> Result<(), WireError> {
        if self.offset + len > self.bytes.len() {
            return Err(WireError::Truncated {
                offset: self.offset,
                needed: len,
                available: self.bytes.len().saturating_sub(self.offset),
            });
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        self.require(len)?;
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        let slice = self.take(1)?;
        Ok(slice[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, WireError> {
        let slice = self.take(2)?;
        Ok(i16::from_le_bytes(slice.try_into().expect("2 bytes")))
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        let slice = self.take(4)?;
        Ok(i32::from_le_bytes(slice.try_into().expect("4 bytes")))
    }

    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        let slice = self.take(8)?;
        Ok(i64::from_le_bytes(slice.try_into().expect("8 bytes")))
    }

    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        let slice = self.take(8)?;
        Ok(f64::from_le_bytes(slice.try_into().expect("8 bytes")))
    }

    /// Reads 2 bytes as a single UTF-16 code unit. Surrogate pairs are not
    /// reassembled — this intentionally mirrors the format's known-lossy
    /// original behavior (spec §9); callers needing full UTF-16 decoding must
    /// pair surrogate code units themselves.
    pub fn read_u16_codeunit(&mut self) -> Result<u16, WireError> {
        let slice = self.take(2)?;
        Ok(u16::from_le_bytes(slice.try_into().expect("2 bytes")))
    }

    /// Reads a stop-bit varint: 7 data bits per byte, little-endian, high bit
    /// marks continuation. Unsigned only.
    pub fn read_stop_bit_varint(&mut self) -> Result<u64, WireError> {
        let start = self.offset;
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8().map_err(|_| WireError::UnterminatedVarint { offset: start })?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift >= 64 {
                return Err(WireError::UnterminatedVarint { offset: start });
            }
        }
    }

    /// Reads a stop-bit length prefix followed by that many UTF-8 bytes.
    ///
    /// Advances past exactly the `L` payload bytes — any trailing padding the
    /// writer reserved beyond the string is *not* consumed. Callers who know
    /// about a fixed-size string reservation must manage the cursor
    /// explicitly with [`Self::get_offset`]/[`Self::set_offset`]/[`Self::advance`].
    pub fn read_string(&mut self) -> Result<String, WireError> {
        let len_start = self.offset;
        let len = self.read_stop_bit_varint()?;
        let slice = self.take(len as usize).map_err(|_| WireError::StringLengthOverflow {
            offset: len_start,
            len,
            available: self.bytes.len().saturating_sub(self.offset),
        })?;
        std::str::from_utf8(slice)
            .map(str::to_owned)
            .map_err(|source| WireError::InvalidUtf8 {
                offset: len_start,
                source,
            })
    }

    /// Non-destructive variant of [`Self::read_string`]: restores the cursor
    /// position after decoding.
    pub fn peek_string(&mut self) -> Result<String, WireError> {
        let saved = self.offset;
        let result = self.read_string();
        self.offset = saved;
        result
    }

    /// Fast-path peek: decodes a length-prefixed string but leaves the cursor
    /// in an unspecified position afterward. Faster than [`Self::peek_string`]
    /// when the caller is about to reposition the cursor anyway (e.g. before
    /// a `set_offset` back to a known record boundary).
    pub fn peek_string_undef_offset(&mut self) -> Result<String, WireError> {
        self.read_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop_bit_encode(mut value: u64, out: &mut Vec<u8>) {
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if value == 0 {
                break;
            }
        }
    }

    #[test]
    fn typed_reads_round_trip_little_endian() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&42i16.to_le_bytes());
        bytes.extend_from_slice(&(-7i32).to_le_bytes());
        bytes.extend_from_slice(&9_000_000_000i64.to_le_bytes());
        bytes.extend_from_slice(&1.2345f64.to_le_bytes());
        bytes.push(1);
        bytes.push(0);

        let mut cursor = RawCursor::new(&bytes, 0);
        assert_eq!(cursor.read_i16().unwrap(), 42);
        assert_eq!(cursor.read_i32().unwrap(), -7);
        assert_eq!(cursor.read_i64().unwrap(), 9_000_000_000);
        assert_eq!(cursor.read_f64().unwrap(), 1.2345);
        assert!(cursor.read_bool().unwrap());
        assert!(!cursor.read_bool().unwrap());
    }

    #[test]
    fn stop_bit_varint_round_trips_across_byte_boundaries() {
        for value in [0u64, 1, 127, 128, 300, 16384, u32::MAX as u64, u64::MAX] {
            let mut bytes = Vec::new();
            stop_bit_encode(value, &mut bytes);
            let mut cursor = RawCursor::new(&bytes, 0);
            assert_eq!(cursor.read_stop_bit_varint().unwrap(), value);
            assert_eq!(cursor.get_offset(), bytes.len());
        }
    }

    #[test]
    fn read_string_stops_before_padding() {
        let mut bytes = Vec::new();
        stop_bit_encode(5, &mut bytes);
        bytes.extend_from_slice(b"hello");
        bytes.extend_from_slice(&[0u8; 10]); // writer-reserved padding

        let mut cursor = RawCursor::new(&bytes, 0);
        let s = cursor.read_string().unwrap();
        assert_eq!(s, "hello");
        assert_eq!(cursor.get_offset(), 1 + 5);
        assert!(cursor.get_offset() < bytes.len());
    }

    #[test]
    fn peek_string_restores_offset() {
        let mut bytes = Vec::new();
        stop_bit_encode(3, &mut bytes);
        bytes.extend_from_slice(b"abc");

        let mut cursor = RawCursor::new(&bytes, 0);
        assert_eq!(cursor.peek_string().unwrap(), "abc");
        assert_eq!(cursor.get_offset(), 0);
        assert_eq!(cursor.read_string().unwrap(), "abc");
    }

    #[test]
    fn truncated_read_reports_needed_and_available() {
        let bytes = [1u8, 2];
        let mut cursor = RawCursor::new(&bytes, 0);
        let err = cursor.read_i64().unwrap_err();
        match err {
            WireError::Truncated { needed, available, .. } => {
                assert_eq!(needed, 8);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn string_length_overflow_is_distinguished_from_truncation() {
        let mut bytes = Vec::new();
        stop_bit_encode(100, &mut bytes);
        bytes.extend_from_slice(b"short");
        let mut cursor = RawCursor::new(&bytes, 0);
        let err = cursor.read_string().unwrap_err();
        assert!(matches!(err, WireError::StringLengthOverflow { .. }));
    }
}
