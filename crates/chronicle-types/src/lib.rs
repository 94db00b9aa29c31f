//! # chronicle-types: Core types for the Vanilla Chronicle format
//!
//! Shared newtypes used across the reader and writer crates:
//! - Entity identifiers ([`ThreadId`], [`FileNum`])
//! - Byte-level quantities ([`ByteOffset`], [`Position`])
//! - Sequence identifiers ([`IntraIndex`], [`FullIndex`])
//! - Temporal types ([`CycleDate`])
//! - Reader configuration primitives ([`PollingInterval`], [`ThreadIdBits`])

use std::fmt::{self, Display};

use chrono::{Datelike, NaiveDate};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies the writer thread that published a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThreadId(u32);

impl ThreadId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ThreadId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<ThreadId> for u32 {
    fn from(id: ThreadId) -> Self {
        id.0
    }
}

/// Numbers a writer thread's sequence of `data-<thread>-<N>` files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileNum(u32);

impl FileNum {
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for FileNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FileNum {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Byte offset within a single data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ByteOffset(u64);

impl ByteOffset {
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for ByteOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ByteOffset {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The low `64 - T` bits of a slot word: a file number and a byte offset
/// packed together. See `chronicle-wire::index_codec` for the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u64);

impl Position {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn is_unpublished(self) -> bool {
        self.0 == 0
    }
}

/// The 0-based sequence number of a record within its cycle (day).
///
/// Bounded to `[0, 2^CYCLE_INDEX_POS)` by the full-index packing in
/// `chronicle-wire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntraIndex(u64);

impl IntraIndex {
    pub const ZERO: IntraIndex = IntraIndex(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for IntraIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for IntraIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A 64-bit identifier combining the UTC day count and an [`IntraIndex`].
///
/// See `chronicle-wire::index_codec::{to_full, from_full}` for the packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FullIndex(u64);

impl FullIndex {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for FullIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FullIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<FullIndex> for u64 {
    fn from(value: FullIndex) -> Self {
        value.0
    }
}

/// A UTC calendar day, formatted on disk as a cycle directory name (`YYYYMMDD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CycleDate(NaiveDate);

impl CycleDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub const fn naive(self) -> NaiveDate {
        self.0
    }

    /// Days since the UNIX epoch (UTC), matching the format's full-index encoding.
    pub fn days_since_epoch(self) -> i64 {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date");
        (self.0 - epoch).num_days()
    }

    pub fn from_days_since_epoch(days: i64) -> Self {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date");
        Self(epoch + chrono::Duration::days(days))
    }

    /// Directory name for this cycle: `YYYYMMDD`.
    pub fn directory_name(self) -> String {
        format!("{:04}{:02}{:02}", self.0.year(), self.0.month(), self.0.day())
    }

    /// Parses a directory name of the form `YYYYMMDD`.
    ///
    /// Returns `None` if the string isn't exactly 8 ASCII digits or doesn't
    /// name a valid calendar date.
    pub fn parse_directory_name(name: &str) -> Option<Self> {
        if name.len() != 8 || !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year: i32 = name[0..4].parse().ok()?;
        let month: u32 = name[4..6].parse().ok()?;
        let day: u32 = name[6..8].parse().ok()?;
        Self::from_ymd(year, month, day)
    }
}

impl Display for CycleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.directory_name())
    }
}

/// How `Reader::next_position` behaves when the tail slot is unpublished.
///
/// Mirrors the source's `polling_interval` parameter: `None` raises
/// `NoData` immediately, `Spin` busy-polls, `Sleep` sleeps between polls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollingInterval {
    /// Non-blocking: raise `NoData` as soon as the tail is unpublished.
    NonBlocking,
    /// Busy-spin: re-check immediately, no sleep.
    Spin,
    /// Sleep for the given duration between polls.
    Sleep(std::time::Duration),
}

/// Width, in bits, of the thread-id field at the top of a slot word.
///
/// Default is 16 on Windows; elsewhere it is derived from the bit width of
/// `/proc/sys/kernel/pid_max` (see `chronicle-config::thread_bits`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadIdBits(u8);

impl ThreadIdBits {
    /// Valid range for the thread-id field width.
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 63;

    pub fn new(bits: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&bits).then_some(Self(bits))
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for ThreadIdBits {
    fn default() -> Self {
        Self(16)
    }
}

/// Injected wall-clock source, so rollover logic can be driven by a fake
/// clock in tests instead of monkey-patching global time (spec §9).
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now_utc(&self) -> CycleDate;
}

/// The system wall clock, via `chrono::Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> CycleDate {
        CycleDate::new(chrono::Utc::now().date_naive())
    }
}

/// Either a `date` anchor or an exact `full_index` resume point. The two are
/// mutually exclusive at the reader's construction boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    FirstCycle,
    Date(CycleDate),
    FullIndex(FullIndex),
}

/// Constructor options for [`crate::Clock`]-driven reader and writer setup.
/// Shared between `chronicle-storage` (which consumes it) and
/// `chronicle-config` (which builds it from a config file or autodetection).
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub base_dir: std::path::PathBuf,
    pub polling_interval: PollingInterval,
    pub start: StartPosition,
    pub max_mapped_memory: Option<u64>,
    pub thread_id_bits: ThreadIdBits,
}

impl ReaderOptions {
    pub fn new(base_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            polling_interval: PollingInterval::NonBlocking,
            start: StartPosition::FirstCycle,
            max_mapped_memory: None,
            thread_id_bits: ThreadIdBits::default(),
        }
    }
}

/// Constructor options for the symmetric writer/appender.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub base_dir: std::path::PathBuf,
    pub max_mapped_memory: Option<u64>,
    pub thread_id_bits: ThreadIdBits,
}

impl WriterOptions {
    pub fn new(base_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_mapped_memory: None,
            thread_id_bits: ThreadIdBits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn cycle_date_round_trips_through_directory_name() {
        let date = CycleDate::from_ymd(2015, 4, 16).unwrap();
        assert_eq!(date.directory_name(), "20150416");
        assert_eq!(CycleDate::parse_directory_name("20150416"), Some(date));
    }

    #[test_case("2015413" ; "too short")]
    #[test_case("2015April" ; "non numeric")]
    #[test_case("20159916" ; "invalid month")]
    fn cycle_date_rejects_malformed_names(name: &str) {
        assert_eq!(CycleDate::parse_directory_name(name), None);
    }

    #[test]
    fn thread_id_bits_rejects_zero_and_full_width() {
        assert!(ThreadIdBits::new(0).is_none());
        assert!(ThreadIdBits::new(64).is_none());
        assert!(ThreadIdBits::new(16).is_some());
    }

    #[test]
    fn days_since_epoch_round_trips() {
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let days = date.days_since_epoch();
        assert_eq!(CycleDate::from_days_since_epoch(days), date);
    }
}
