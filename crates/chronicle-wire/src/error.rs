//! Errors raised while encoding or decoding wire-format bytes.

/// Errors from the index codec and raw byte cursor.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A cursor read ran past the end of the mapped slice.
    #[error("truncated read: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A stop-bit varint did not terminate within the bytes available.
    #[error("unterminated stop-bit varint starting at offset {offset}")]
    UnterminatedVarint { offset: usize },

    /// A length-prefixed string's declared length exceeds the remaining bytes.
    #[error("string length {len} at offset {offset} exceeds remaining {available} bytes")]
    StringLengthOverflow {
        offset: usize,
        len: u64,
        available: usize,
    },

    /// A length-prefixed string's bytes were not valid UTF-8.
    #[error("invalid UTF-8 in length-prefixed string at offset {offset}: {source}")]
    InvalidUtf8 {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    /// `split_slot`/`split_position` called with a thread-id width outside `[1, 63]`.
    #[error("thread id width {bits} out of range [1, 63]")]
    InvalidThreadWidth { bits: u8 },
}
