//! I/O error types.

use std::path::PathBuf;

/// Errors from opening or mapping a chronicle file region.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Underlying OS I/O error.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The region was asked to pre-extend to a size that isn't a multiple of
    /// the word width, or a word read/write address wasn't 8-byte aligned.
    #[error("byte offset {offset} is not 8-byte aligned within a {region_size}-byte region")]
    Misaligned { offset: u64, region_size: u64 },

    /// A word read or CAS addressed a byte offset outside the region.
    #[error("byte offset {offset} out of bounds for a {region_size}-byte region")]
    OutOfBounds { offset: u64, region_size: u64 },
}
