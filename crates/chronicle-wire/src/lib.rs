//! # chronicle-wire: index codec and raw byte cursor
//!
//! The two leaf components of the Vanilla Chronicle format that have no
//! dependency on the filesystem or memory mapping:
//!
//! - [`index_codec`] (component B) — translates between full indices,
//!   `(date, intra-day index)` pairs, slot words, and `(thread, position)` /
//!   `(filenum, byte_offset)` parts. These are the fixed wire constants and
//!   pure functions the writer and reader must agree on bit-for-bit.
//! - [`cursor`] (component G) — a typed decoder over a borrowed byte slice,
//!   used by callers to pull structured values out of a payload once the
//!   reader has located it.

pub mod constants;
pub mod cursor;
pub mod error;
pub mod index_codec;

pub use cursor::RawCursor;
pub use error::WireError;
pub use index_codec::{from_full, pack_position, pack_slot, split_position, split_slot, to_full};
