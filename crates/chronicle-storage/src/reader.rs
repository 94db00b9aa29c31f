//! Component F: the reader state machine.
//!
//! Tails the index-file chain, handles empty-slot polling, day rollover,
//! and corrupt-data detection, producing `(filenum, offset, thread)`
//! triples for [`crate::data_cache::DataFileCache`] to resolve into mapped
//! payload bytes.

use std::path::PathBuf;

use chronicle_types::{
    ByteOffset, Clock, CycleDate, FileNum, FullIndex, IntraIndex, PollingInterval, ReaderOptions,
    StartPosition, ThreadId,
};
use chronicle_wire::constants::DATA_FILE_SIZE;
use chronicle_wire::RawCursor;
use tracing::{debug, info};

use crate::cycles;
use crate::data_cache::DataFileCache;
use crate::error::ReaderError;
use crate::index_chain::IndexFileChain;

/// Mutable state scoped to the reader's current cycle. Recreated in full on
/// every rollover — the chain and cache both hold mappings into files that
/// only exist for the life of one cycle directory (spec §3 invariant).
struct CycleState {
    date: CycleDate,
    intra_index: IntraIndex,
    max_index: Option<IntraIndex>,
    chain: IndexFileChain,
    data_cache: DataFileCache,
}

/// Tails a chronicle rooted at `base_dir`, producing `(filenum, offset,
/// thread)` triples in strict intra-day sequence order.
///
/// Single-threaded per instance — the data-file cache is not safe to share
/// across readers (spec §5).
pub struct Reader {
    base_dir: PathBuf,
    clock: Box<dyn Clock>,
    polling_interval: PollingInterval,
    thread_id_bits: u8,
    max_mapped_memory: Option<u64>,
    cycle: Option<CycleState>,
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cycle {
            Some(cycle) => write!(
                f,
                "Reader(base={}, cycle={}, intra={})",
                self.base_dir.display(),
                cycle.date,
                cycle.intra_index
            ),
            None => write!(f, "Reader(base={}, no cycle)", self.base_dir.display()),
        }
    }
}

impl Reader {
    /// `date` and `full_index` in `options.start` are mutually exclusive by
    /// construction ([`StartPosition`] is an enum, not two optional fields) —
    /// a typed sibling of the source's runtime `InvalidArgument` check.
    pub fn new(options: ReaderOptions, clock: Box<dyn Clock>) -> Result<Self, ReaderError> {
        if let Some(bytes) = options.max_mapped_memory {
            if bytes < DATA_FILE_SIZE {
                return Err(ReaderError::ConfigError {
                    min_bytes: DATA_FILE_SIZE,
                });
            }
        }

        let mut reader = Reader {
            base_dir: options.base_dir,
            clock,
            polling_interval: options.polling_interval,
            thread_id_bits: options.thread_id_bits.get(),
            max_mapped_memory: options.max_mapped_memory,
            cycle: None,
        };

        match options.start {
            StartPosition::FullIndex(full) => {
                let (date, intra) = chronicle_wire::from_full(full);
                reader.enter_cycle(date, intra)?;
            }
            StartPosition::Date(date) => {
                let resolved = cycles::cycle_for_date(&reader.base_dir, date)?;
                reader.enter_cycle(resolved, IntraIndex::ZERO)?;
            }
            StartPosition::FirstCycle => match cycles::first_cycle(&reader.base_dir) {
                Ok(date) => reader.enter_cycle(date, IntraIndex::ZERO)?,
                Err(ReaderError::NoData) => {}
                Err(other) => return Err(other),
            },
        }
        Ok(reader)
    }

    fn enter_cycle(&mut self, date: CycleDate, intra: IntraIndex) -> Result<(), ReaderError> {
        let cycle_dir = cycles::cycle_directory(&self.base_dir, date);
        let data_cache = DataFileCache::new(self.max_mapped_memory)?;
        info!(cycle = %date, intra = %intra, "reader entering cycle");
        self.cycle = Some(CycleState {
            date,
            intra_index: intra,
            max_index: None,
            chain: IndexFileChain::new(&cycle_dir, date),
            data_cache,
        });
        Ok(())
    }

    /// Reads the next published slot, advancing the cursor. Loops internally
    /// across rollover and polling; the slot is re-read on every iteration
    /// since the writer may publish between reads.
    pub fn next_position(&mut self) -> Result<(FileNum, ByteOffset, ThreadId), ReaderError> {
        loop {
            if self.cycle.is_none() {
                match cycles::first_cycle(&self.base_dir) {
                    Ok(date) => {
                        self.enter_cycle(date, IntraIndex::ZERO)?;
                        continue;
                    }
                    Err(ReaderError::NoData) => return Err(ReaderError::NoData),
                    Err(other) => return Err(other),
                }
            }

            let thread_id_bits = self.thread_id_bits;
            let cycle = self.cycle.as_mut().expect("checked above");
            let word = cycle.chain.slot_word(cycle.intra_index.as_u64())?;
            let (thread, position) = chronicle_wire::split_slot(word, thread_id_bits)?;

            if position.is_unpublished() {
                let today = self.clock.now_utc();
                let current_date = cycle.date;
                if current_date != today {
                    if let Some(next_date) = cycles::next_cycle(&self.base_dir, current_date)? {
                        debug!(from = %current_date, to = %next_date, "rolling over to next cycle");
                        self.enter_cycle(next_date, IntraIndex::ZERO)?;
                        continue;
                    }
                }
                match self.polling_interval {
                    PollingInterval::NonBlocking => return Err(ReaderError::NoData),
                    PollingInterval::Spin => continue,
                    PollingInterval::Sleep(duration) => {
                        std::thread::sleep(duration);
                        continue;
                    }
                }
            }

            let (filenum, offset) = chronicle_wire::split_position(position);
            cycle.intra_index = cycle.intra_index.next();
            return Ok((filenum, offset, thread));
        }
    }

    /// [`Self::next_position`] followed by resolving the payload mapping, so
    /// the caller gets a ready-to-decode [`RawCursor`].
    pub fn next_raw_bytes(&mut self) -> Result<RawCursor<'_>, ReaderError> {
        let (filenum, offset, thread) = self.next_position()?;
        let cycle = self.cycle.as_mut().expect("next_position sets a cycle on success");
        let cycle_dir = cycles::cycle_directory(&self.base_dir, cycle.date);
        let region = cycle
            .data_cache
            .get_or_open(&cycle_dir, cycle.date, thread, filenum)?;
        Ok(RawCursor::new(region.as_slice(), offset.as_u64() as usize))
    }

    /// [`Self::next_raw_bytes`] by another name, kept for public-API parity
    /// with `next_index` — `RawCursor` already plays the role a dedicated
    /// reader object would.
    pub fn next_reader(&mut self) -> Result<RawCursor<'_>, ReaderError> {
        self.next_raw_bytes()
    }

    /// Advances past one record without returning its bytes, then returns
    /// the full index of the *following* record — i.e. [`Self::get_index`]
    /// immediately after the advance. Typically used to skip records the
    /// caller isn't interested in decoding.
    pub fn next_index(&mut self) -> Result<FullIndex, ReaderError> {
        self.next_position()?;
        self.get_index()
    }

    /// Replays a previously observed `(thread, filenum, offset)` triple
    /// without moving the tail cursor — useful for re-decoding a record
    /// whose position was recorded earlier (e.g. by `get_index`/`set_index`
    /// round trips in tests).
    pub fn raw_bytes_at(
        &mut self,
        thread: ThreadId,
        filenum: FileNum,
        offset: ByteOffset,
    ) -> Result<RawCursor<'_>, ReaderError> {
        let cycle = self.cycle.as_mut().ok_or(ReaderError::NoData)?;
        let cycle_dir = cycles::cycle_directory(&self.base_dir, cycle.date);
        let region = cycle
            .data_cache
            .get_or_open(&cycle_dir, cycle.date, thread, filenum)?;
        Ok(RawCursor::new(region.as_slice(), offset.as_u64() as usize))
    }

    /// Scans forward from `max(max_index, intra_index)` until an unpublished
    /// slot is found, without advancing the reader's cursor. The result is
    /// memoized as `max_index`, cycle-scoped — it is discarded whenever the
    /// cycle changes (spec §9 makes this reset explicit; the source only
    /// implies it).
    pub fn get_end_index_today(&mut self) -> Result<FullIndex, ReaderError> {
        let thread_id_bits = self.thread_id_bits;
        let cycle = self.cycle.as_mut().ok_or(ReaderError::NoData)?;
        let mut probe = cycle
            .max_index
            .map(IntraIndex::as_u64)
            .unwrap_or(0)
            .max(cycle.intra_index.as_u64());
        loop {
            let word = cycle.chain.slot_word(probe)?;
            let (_, position) = chronicle_wire::split_slot(word, thread_id_bits)?;
            if position.is_unpublished() {
                cycle.max_index = Some(IntraIndex::new(probe));
                return Ok(chronicle_wire::to_full(cycle.date, IntraIndex::new(probe)));
            }
            probe += 1;
        }
    }

    pub fn set_index(&mut self, full_index: FullIndex) -> Result<(), ReaderError> {
        let (date, intra) = chronicle_wire::from_full(full_index);
        let differs = match &self.cycle {
            Some(cycle) => cycle.date != date,
            None => true,
        };
        if differs {
            let resolved = cycles::cycle_for_date(&self.base_dir, date)?;
            self.enter_cycle(resolved, intra)?;
        } else if let Some(cycle) = self.cycle.as_mut() {
            cycle.intra_index = intra;
        }
        Ok(())
    }

    pub fn set_date(&mut self, date: CycleDate) -> Result<(), ReaderError> {
        let resolved = cycles::cycle_for_date(&self.base_dir, date)?;
        self.enter_cycle(resolved, IntraIndex::ZERO)
    }

    pub fn set_start_index_today(&mut self) -> Result<(), ReaderError> {
        let cycle = self.cycle.as_mut().ok_or(ReaderError::NoData)?;
        cycle.intra_index = IntraIndex::ZERO;
        Ok(())
    }

    pub fn set_end_index_today(&mut self) -> Result<(), ReaderError> {
        let full = self.get_end_index_today()?;
        let (_, intra) = chronicle_wire::from_full(full);
        let cycle = self.cycle.as_mut().expect("get_end_index_today requires a cycle");
        cycle.intra_index = intra;
        Ok(())
    }

    /// Advances through every remaining cycle directory, then positions at
    /// the end of the last one.
    pub fn set_end(&mut self) -> Result<(), ReaderError> {
        loop {
            let current_date = match &self.cycle {
                Some(cycle) => cycle.date,
                None => {
                    let date = cycles::first_cycle(&self.base_dir)?;
                    self.enter_cycle(date, IntraIndex::ZERO)?;
                    continue;
                }
            };
            match cycles::next_cycle(&self.base_dir, current_date)? {
                Some(next_date) => self.enter_cycle(next_date, IntraIndex::ZERO)?,
                None => break,
            }
        }
        self.set_end_index_today()
    }

    pub fn get_index(&self) -> Result<FullIndex, ReaderError> {
        let cycle = self.cycle.as_ref().ok_or(ReaderError::NoData)?;
        Ok(chronicle_wire::to_full(cycle.date, cycle.intra_index))
    }

    pub fn get_date(&self) -> Result<CycleDate, ReaderError> {
        self.cycle.as_ref().map(|c| c.date).ok_or(ReaderError::NoData)
    }

    /// Drops every mapping and file handle (data mappings, then data file
    /// handles, then index mappings, then index file handles, by virtue of
    /// `CycleState`'s field-drop order) and resets the cursor to
    /// start-of-stream, so the same instance can be reused after a
    /// configuration change.
    pub fn close(&mut self) {
        self.cycle = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_types::ThreadIdBits;
    use chronicle_wire::constants::{INDEX_FILE_SIZE, SLOT_SIZE};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct FixedClock(Mutex<CycleDate>);

    impl Clock for FixedClock {
        fn now_utc(&self) -> CycleDate {
            *self.0.lock().unwrap()
        }
    }

    fn fixed_clock(date: CycleDate) -> Box<dyn Clock> {
        Box::new(FixedClock(Mutex::new(date)))
    }

    fn make_cycle_with_records(base: &std::path::Path, date: CycleDate, words: &[u64]) {
        let cycle_dir = base.join(date.directory_name());
        std::fs::create_dir_all(&cycle_dir).unwrap();
        let index_path = cycle_dir.join("index-0");
        chronicle_io::MappedRegion::create_and_extend(&index_path, INDEX_FILE_SIZE).unwrap();
        let region = chronicle_io::MappedRegion::open_write(&index_path, INDEX_FILE_SIZE).unwrap();
        for (i, word) in words.iter().enumerate() {
            unsafe {
                region.unsafe_write_word(i as u64 * SLOT_SIZE, *word).unwrap();
            }
        }
    }

    fn options(base: &std::path::Path) -> chronicle_types::ReaderOptions {
        let mut opts = chronicle_types::ReaderOptions::new(base);
        opts.thread_id_bits = ThreadIdBits::new(16).unwrap();
        opts
    }

    #[test]
    fn empty_base_directory_raises_no_data_on_first_read() {
        let dir = tempdir().unwrap();
        let today = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let mut reader = Reader::new(options(dir.path()), fixed_clock(today)).unwrap();
        let err = reader.next_position().unwrap_err();
        assert!(matches!(err, ReaderError::NoData));
    }

    #[test]
    fn next_position_reads_published_slots_in_order() {
        let dir = tempdir().unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        // thread=1, filenum=0, offset=100 packed at T=16
        let word = chronicle_wire::pack_slot(
            ThreadId::new(1),
            chronicle_wire::pack_position(FileNum::new(0), ByteOffset::new(100)),
            16,
        )
        .unwrap();
        make_cycle_with_records(dir.path(), date, &[word]);

        let mut reader = Reader::new(options(dir.path()), fixed_clock(date)).unwrap();
        let (filenum, offset, thread) = reader.next_position().unwrap();
        assert_eq!(filenum, FileNum::new(0));
        assert_eq!(offset, ByteOffset::new(100));
        assert_eq!(thread, ThreadId::new(1));

        let err = reader.next_position().unwrap_err();
        assert!(matches!(err, ReaderError::NoData));
    }

    #[test]
    fn rollover_advances_past_exhausted_cycle_when_clock_has_moved() {
        let dir = tempdir().unwrap();
        let day1 = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let day2 = CycleDate::from_ymd(2015, 1, 2).unwrap();
        make_cycle_with_records(dir.path(), day1, &[]);
        let word = chronicle_wire::pack_slot(
            ThreadId::new(2),
            chronicle_wire::pack_position(FileNum::new(0), ByteOffset::new(50)),
            16,
        )
        .unwrap();
        make_cycle_with_records(dir.path(), day2, &[word]);

        let mut reader = Reader::new(options(dir.path()), fixed_clock(day2)).unwrap();
        let (_, _, thread) = reader.next_position().unwrap();
        assert_eq!(reader.get_date().unwrap(), day2);
        assert_eq!(thread, ThreadId::new(2));
    }

    #[test]
    fn get_end_index_today_does_not_advance_cursor() {
        let dir = tempdir().unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let word = chronicle_wire::pack_slot(
            ThreadId::new(1),
            chronicle_wire::pack_position(FileNum::new(0), ByteOffset::new(8)),
            16,
        )
        .unwrap();
        make_cycle_with_records(dir.path(), date, &[word, word]);

        let mut reader = Reader::new(options(dir.path()), fixed_clock(date)).unwrap();
        let end = reader.get_end_index_today().unwrap();
        let (_, intra) = chronicle_wire::from_full(end);
        assert_eq!(intra.as_u64(), 2);
        // cursor untouched
        assert_eq!(reader.get_index().unwrap(), chronicle_wire::to_full(date, IntraIndex::ZERO));
    }

    #[test]
    fn close_resets_to_start_of_stream() {
        let dir = tempdir().unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let word = chronicle_wire::pack_slot(
            ThreadId::new(1),
            chronicle_wire::pack_position(FileNum::new(0), ByteOffset::new(8)),
            16,
        )
        .unwrap();
        make_cycle_with_records(dir.path(), date, &[word]);

        let mut reader = Reader::new(options(dir.path()), fixed_clock(date)).unwrap();
        reader.next_position().unwrap();
        reader.close();
        let (_, offset, _) = reader.next_position().unwrap();
        assert_eq!(offset, ByteOffset::new(8));
    }
}
