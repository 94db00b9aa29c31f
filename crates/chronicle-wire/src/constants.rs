//! Fixed wire constants for the Vanilla Chronicle format.
//!
//! These are **not** tunable: they are part of the on-disk contract and must
//! match the writer exactly. Changing any of them breaks compatibility with
//! every chronicle already on disk.

/// Number of low bits of a full index that hold the intra-day sequence
/// number; the bits above hold days-since-epoch. Derived from the format's
/// reference fixture (`2015-04-16`, intra `10` -> `18_187_021_835_042_826`).
pub const CYCLE_INDEX_POS: u32 = 40;

/// Masks the intra-day index out of a full index (component B).
pub const INTRA_INDEX_MASK: u64 = (1u64 << CYCLE_INDEX_POS) - 1;

/// Size in bytes of one `index-N` file.
pub const INDEX_FILE_SIZE: u64 = 1024 * 1024;

/// `log2(INDEX_FILE_SIZE)`: shift used to recover an index file number from a
/// slot's byte offset.
pub const FILENUM_FROM_INDEX_SHIFT: u32 = 20;

/// Masks a byte offset within a single index file (component E). Distinct
/// from [`INTRA_INDEX_MASK`] — see DESIGN.md for why a single
/// `INDEX_OFFSET_MASK` name is split into these two constants here.
pub const INDEX_FILE_BYTE_MASK: u64 = INDEX_FILE_SIZE - 1;

/// Size in bytes of one `data-<thread>-<N>` file.
pub const DATA_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// `log2(DATA_FILE_SIZE)`: shift used to split a position field into a data
/// file number (high bits) and a byte offset within that file (low bits).
pub const FILENUM_FROM_POS_SHIFT: u32 = 26;

/// Masks the byte-offset-within-data-file part of a position field.
pub const POS_MASK: u64 = (1u64 << FILENUM_FROM_POS_SHIFT) - 1;

/// Width in bytes of one index slot.
pub const SLOT_SIZE: u64 = 8;

/// Number of slots held in one index file.
pub const SLOTS_PER_INDEX_FILE: u64 = INDEX_FILE_SIZE / SLOT_SIZE;
