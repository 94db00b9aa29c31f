//! Component B: the index codec.
//!
//! Pure functions translating between a `(date, intra-day index)` pair and a
//! 64-bit full index, and between a raw slot word and its `(thread,
//! position)` / `(filenum, byte_offset)` parts. No I/O; see `chronicle-io`
//! for the mapped-region word reads that feed these functions.

use chronicle_types::{ByteOffset, CycleDate, FileNum, FullIndex, IntraIndex, Position, ThreadId};

use crate::constants::{
    CYCLE_INDEX_POS, FILENUM_FROM_POS_SHIFT, INTRA_INDEX_MASK, POS_MASK,
};
use crate::error::WireError;

/// `intra + (days_since_epoch(date) << CYCLE_INDEX_POS)`.
pub fn to_full(date: CycleDate, intra: IntraIndex) -> FullIndex {
    debug_assert!(
        intra.as_u64() <= INTRA_INDEX_MASK,
        "intra-day index {} exceeds the {CYCLE_INDEX_POS}-bit budget",
        intra.as_u64()
    );
    let days = date.days_since_epoch();
    debug_assert!(days >= 0, "full-index encoding requires dates on or after the epoch");
    let packed = ((days as u64) << CYCLE_INDEX_POS) | (intra.as_u64() & INTRA_INDEX_MASK);
    FullIndex::new(packed)
}

/// Inverse of [`to_full`]: `intra = v & INTRA_INDEX_MASK`, `date = epoch + (v >> CYCLE_INDEX_POS)`.
pub fn from_full(full: FullIndex) -> (CycleDate, IntraIndex) {
    let v = full.as_u64();
    let intra = IntraIndex::new(v & INTRA_INDEX_MASK);
    let days = (v >> CYCLE_INDEX_POS) as i64;
    (CycleDate::from_days_since_epoch(days), intra)
}

/// Splits a raw slot word into its thread identifier and position, given the
/// runtime thread-id bit width `T`.
///
/// `thread = v >> (64 - T)`, `position = v & mask_low(64 - T)`.
pub fn split_slot(word: u64, thread_bits: u8) -> Result<(ThreadId, Position), WireError> {
    if !(1..=63).contains(&thread_bits) {
        return Err(WireError::InvalidThreadWidth { bits: thread_bits });
    }
    let position_bits = 64 - u32::from(thread_bits);
    let thread = word >> position_bits;
    let position_mask = if position_bits == 64 {
        u64::MAX
    } else {
        (1u64 << position_bits) - 1
    };
    let position = word & position_mask;
    Ok((ThreadId::new(thread as u32), Position::new(position)))
}

/// Packs a `(thread, position)` pair into a slot word. The symmetric inverse
/// of [`split_slot`], used by the writer side.
pub fn pack_slot(thread: ThreadId, position: Position, thread_bits: u8) -> Result<u64, WireError> {
    if !(1..=63).contains(&thread_bits) {
        return Err(WireError::InvalidThreadWidth { bits: thread_bits });
    }
    let position_bits = 64 - u32::from(thread_bits);
    let position_mask = if position_bits == 64 {
        u64::MAX
    } else {
        (1u64 << position_bits) - 1
    };
    debug_assert!(
        position.as_u64() & !position_mask == 0,
        "position {} does not fit in {position_bits} bits",
        position.as_u64()
    );
    Ok((u64::from(thread.as_u32()) << position_bits) | (position.as_u64() & position_mask))
}

/// Splits a position field into a data-file number and a byte offset within
/// that file: `filenum = position >> FILENUM_FROM_POS_SHIFT`, `byte_offset =
/// position & POS_MASK`.
pub fn split_position(position: Position) -> (FileNum, ByteOffset) {
    let raw = position.as_u64();
    let filenum = (raw >> FILENUM_FROM_POS_SHIFT) as u32;
    let byte_offset = raw & POS_MASK;
    (FileNum::new(filenum), ByteOffset::new(byte_offset))
}

/// Packs a `(filenum, byte_offset)` pair back into a position field. The
/// symmetric inverse of [`split_position`].
pub fn pack_position(filenum: FileNum, byte_offset: ByteOffset) -> Position {
    debug_assert!(
        byte_offset.as_u64() & !POS_MASK == 0,
        "byte offset {} exceeds POS_MASK",
        byte_offset.as_u64()
    );
    let raw = (u64::from(filenum.as_u32()) << FILENUM_FROM_POS_SHIFT) | (byte_offset.as_u64() & POS_MASK);
    Position::new(raw)
}
