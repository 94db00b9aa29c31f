//! # chronicle
//!
//! Reader and writer for the **Vanilla Chronicle** on-disk log format: a
//! daily-rolled, append-only, multi-writer, memory-mapped sequence of binary
//! records. Writers on any number of threads or processes atomically
//! reserve space in per-thread data files and publish fixed-width index
//! entries linking a global sequence number to `(thread, data-file,
//! offset)`. Readers tail the log, decoding the index to jump to raw
//! payload bytes in the mapped data files.
//!
//! ```no_run
//! use chronicle::{Reader, ReaderOptions, SystemClock};
//!
//! let options = ReaderOptions::new("/var/log/chronicle");
//! let mut reader = Reader::new(options, Box::new(SystemClock))?;
//! let mut record = reader.next_raw_bytes()?;
//! let value = record.read_f64()?;
//! # Ok::<(), chronicle_storage::ReaderError>(())
//! ```
//!
//! # Modules
//!
//! - [`chronicle_types`] — shared newtypes and the injected [`Clock`] trait.
//! - [`chronicle_io`] — the mapped-region primitive (component A).
//! - [`chronicle_wire`] — the index codec and raw byte cursor (B, G).
//! - [`chronicle_storage`] — cycle rollover, mapped-file cache, reader and
//!   writer state machines (C, D, E, F, and the writer).
//! - [`chronicle_config`] — config-file loading and thread-id-bit
//!   autodetection.

pub use chronicle_config::{ConfigError, ReaderFileConfig, WriterFileConfig};
pub use chronicle_io::{IoError, MappedRegion};
pub use chronicle_storage::{Reader, ReaderError, Writer, WriterError};
pub use chronicle_types::{
    ByteOffset, Clock, CycleDate, FileNum, FullIndex, IntraIndex, PollingInterval, ReaderOptions,
    StartPosition, SystemClock, ThreadId, ThreadIdBits, WriterOptions,
};
pub use chronicle_wire::{from_full, pack_position, pack_slot, split_position, split_slot, to_full, RawCursor, WireError};

/// Static counterparts of the reader's index arithmetic: `to_full_index`/`from_full_index`.
pub mod index {
    pub use chronicle_wire::{from_full as from_full_index, to_full as to_full_index};
}
