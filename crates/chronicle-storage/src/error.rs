//! Error kinds for the reader and writer (spec §7 — kept distinct, never
//! conflated into one generic "storage error").

use std::path::PathBuf;

use chronicle_types::{CycleDate, FileNum, ThreadId};

/// Errors raised by [`crate::reader::Reader`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// End of the currently published stream. In non-blocking polling mode
    /// this means "try again later"; it is the only retriable kind.
    #[error("no data available past the current tail")]
    NoData,

    /// The requested cycle's index chain is unavailable — a file is missing
    /// when the chain needs to grow into it.
    #[error("no chronicle index file available for cycle {date} (index-{filenum})")]
    NoChronicleForDate { date: CycleDate, filenum: u32 },

    /// An index slot references a data file that cannot be opened.
    #[error("slot references missing data file data-{thread}-{filenum} in cycle {date}")]
    CorruptData {
        date: CycleDate,
        thread: ThreadId,
        filenum: FileNum,
    },

    /// Mutually exclusive constructor options were combined, or a value was
    /// out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `max_mapped_memory` was configured below one data file.
    #[error("max_mapped_memory must be at least {min_bytes} bytes (one data file)")]
    ConfigError { min_bytes: u64 },

    /// Underlying mapped-region I/O failure.
    #[error(transparent)]
    Io(#[from] chronicle_io::IoError),

    /// Wire decoding failure on an otherwise well-formed slot.
    #[error(transparent)]
    Wire(#[from] chronicle_wire::WireError),

    /// Filesystem error enumerating or opening cycle directories.
    #[error("filesystem error at {path}: {source}")]
    Fs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the symmetric writer/appender.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("max_mapped_memory must be at least {min_bytes} bytes (one data file)")]
    ConfigError { min_bytes: u64 },

    /// The appender reserved a span, began writing the payload, and the wall
    /// clock crossed midnight before the record could be published. The
    /// reservation is abandoned; the reader will never see a slot for it.
    #[error(
        "partial write lost on rollover: reserved {reserved_bytes} bytes in cycle {cycle} for thread {thread}"
    )]
    PartialWriteLostOnRollover {
        cycle: CycleDate,
        thread: ThreadId,
        reserved_bytes: u64,
    },

    #[error(transparent)]
    Io(#[from] chronicle_io::IoError),

    #[error("filesystem error at {path}: {source}")]
    Fs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
