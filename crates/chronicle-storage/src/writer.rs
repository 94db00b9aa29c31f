//! The symmetric writer/appender. Its on-disk output is exactly what
//! [`crate::reader::Reader`] consumes, so the reader's test suite needs a
//! writer that produces bit-exact fixtures.
//!
//! Per record, the contract is:
//! 1. Reserve a byte span in `data-<thread>-<N>` via CAS on a shared
//!    allocator word at the start of that file.
//! 2. Write the payload bytes into the reserved span.
//! 3. Claim the next index slot by CAS on the first zero slot in the index
//!    chain, encoding `(thread, position)`.
//!
//! The payload store happens-before the index CAS (release-ordered), so a
//! reader observing a non-zero slot may safely read the referenced payload.

use std::path::PathBuf;

use chronicle_types::{ByteOffset, CycleDate, FileNum, FullIndex, IntraIndex, ThreadId, WriterOptions};
use chronicle_wire::constants::{DATA_FILE_SIZE, INDEX_FILE_SIZE, SLOT_SIZE};
use tracing::{debug, info, warn};

use crate::cycles;
use crate::error::WriterError;

use chronicle_io::MappedRegion;

/// First 8 bytes of every data file are reserved for the allocator cursor —
/// the next free byte offset, CAS'd forward by every reserving appender.
const ALLOCATOR_WORD_OFFSET: u64 = 0;

/// Payload bytes start immediately after the allocator word.
const DATA_FILE_HEADER_SIZE: u64 = SLOT_SIZE;

struct DataFile {
    filenum: FileNum,
    region: MappedRegion,
}

/// One writer thread's append cursor: its own `data-<thread>-<N>` sequence
/// and a position inside the current cycle's index chain.
///
/// Each `Writer` is scoped to a single logical thread identity — matching
/// the format's per-thread data file naming. A process with multiple
/// appender threads constructs one `Writer` per thread.
pub struct Writer {
    base_dir: PathBuf,
    thread: ThreadId,
    thread_id_bits: u8,
    clock: Box<dyn chronicle_types::Clock>,
    cycle_date: CycleDate,
    cycle_dir: PathBuf,
    index_mappings: Vec<MappedRegion>,
    index_slot: u64,
    data_file: Option<DataFile>,
}

impl Writer {
    pub fn new(options: WriterOptions, thread: ThreadId, clock: Box<dyn chronicle_types::Clock>) -> Result<Self, WriterError> {
        if let Some(bytes) = options.max_mapped_memory {
            if bytes < DATA_FILE_SIZE {
                return Err(WriterError::ConfigError {
                    min_bytes: DATA_FILE_SIZE,
                });
            }
        }
        let date = clock.now_utc();
        let cycle_dir = cycles::cycle_directory(&options.base_dir, date);
        std::fs::create_dir_all(&cycle_dir).map_err(|source| WriterError::Fs {
            path: cycle_dir.clone(),
            source,
        })?;
        Ok(Writer {
            base_dir: options.base_dir,
            thread,
            thread_id_bits: options.thread_id_bits.get(),
            clock,
            cycle_date: date,
            cycle_dir,
            index_mappings: Vec::new(),
            index_slot: 0,
            data_file: None,
        })
    }

    fn ensure_index_file(&mut self, file: usize) -> Result<(), WriterError> {
        while self.index_mappings.len() <= file {
            let idx = self.index_mappings.len();
            let path = self.cycle_dir.join(format!("index-{idx}"));
            if !path.exists() {
                MappedRegion::create_and_extend(&path, INDEX_FILE_SIZE)?;
            }
            let region = MappedRegion::open_write(&path, INDEX_FILE_SIZE)?;
            self.index_mappings.push(region);
        }
        Ok(())
    }

    fn ensure_data_file(&mut self) -> Result<&DataFile, WriterError> {
        if self.data_file.is_none() {
            let filenum = self.next_data_filenum();
            let path = self
                .cycle_dir
                .join(format!("data-{}-{}", self.thread, filenum));
            if !path.exists() {
                MappedRegion::create_and_extend(&path, DATA_FILE_SIZE)?;
                let region = MappedRegion::open_write(&path, DATA_FILE_SIZE)?;
                // SAFETY: the file was just created, so no other writer can
                // be observing the allocator word yet.
                unsafe {
                    region.unsafe_write_word(ALLOCATOR_WORD_OFFSET, DATA_FILE_HEADER_SIZE)?;
                }
                self.data_file = Some(DataFile { filenum, region });
            } else {
                let region = MappedRegion::open_write(&path, DATA_FILE_SIZE)?;
                self.data_file = Some(DataFile { filenum, region });
            }
        }
        Ok(self.data_file.as_ref().expect("just ensured"))
    }

    fn next_data_filenum(&self) -> FileNum {
        match &self.data_file {
            Some(df) => df.filenum,
            None => FileNum::new(0),
        }
    }

    /// Reserves `len` bytes in the current data file by CAS-advancing the
    /// allocator word, rolling to the next file number when the reservation
    /// would overflow `DATA_FILE_SIZE`.
    fn reserve_span(&mut self, len: u64) -> Result<(FileNum, ByteOffset), WriterError> {
        loop {
            let data_file = self.ensure_data_file()?;
            let current = data_file.region.read_word(ALLOCATOR_WORD_OFFSET)?;
            if current + len > DATA_FILE_SIZE {
                let next_filenum = data_file.filenum.next();
                self.data_file = None;
                let path = self
                    .cycle_dir
                    .join(format!("data-{}-{}", self.thread, next_filenum));
                MappedRegion::create_and_extend(&path, DATA_FILE_SIZE)?;
                let region = MappedRegion::open_write(&path, DATA_FILE_SIZE)?;
                unsafe {
                    region.unsafe_write_word(ALLOCATOR_WORD_OFFSET, DATA_FILE_HEADER_SIZE)?;
                }
                self.data_file = Some(DataFile {
                    filenum: next_filenum,
                    region,
                });
                continue;
            }
            let prev = data_file.region.cas_word(ALLOCATOR_WORD_OFFSET, current, current + len)?;
            if prev != current {
                continue;
            }
            return Ok((data_file.filenum, ByteOffset::new(current)));
        }
    }

    /// Appends `payload` as one record: reserves a span, writes the bytes,
    /// then publishes the index slot. Returns the full index assigned to
    /// the record.
    ///
    /// If the wall clock has crossed midnight since the span was reserved,
    /// the reservation is abandoned and [`WriterError::PartialWriteLostOnRollover`]
    /// is raised — the format has no way to migrate an in-flight reservation
    /// to a new cycle directory.
    pub fn append(&mut self, payload: &[u8]) -> Result<FullIndex, WriterError> {
        let today_at_reserve = self.clock.now_utc();
        if today_at_reserve != self.cycle_date {
            self.roll_cycle(today_at_reserve)?;
        }

        let (filenum, offset) = self.reserve_span(payload.len() as u64)?;

        if self.clock.now_utc() != self.cycle_date {
            warn!(
                cycle = %self.cycle_date,
                thread = %self.thread,
                reserved_bytes = payload.len(),
                "wall clock crossed midnight mid-record; abandoning reservation"
            );
            return Err(WriterError::PartialWriteLostOnRollover {
                cycle: self.cycle_date,
                thread: self.thread,
                reserved_bytes: payload.len() as u64,
            });
        }

        let data_file = self.data_file.as_ref().expect("reserve_span ensures a data file");
        for (i, chunk) in payload.chunks(8).enumerate() {
            let mut word_bytes = [0u8; 8];
            word_bytes[..chunk.len()].copy_from_slice(chunk);
            let word = u64::from_le_bytes(word_bytes);
            // SAFETY: this span was exclusively reserved by the CAS above;
            // no other writer can address these bytes until we publish the
            // index slot below.
            unsafe {
                data_file
                    .region
                    .unsafe_write_word(offset.as_u64() + i as u64 * 8, word)?;
            }
        }

        let position = chronicle_wire::pack_position(filenum, offset);
        let slot_value = chronicle_wire::pack_slot(self.thread, position, self.thread_id_bits)
            .map_err(|source| WriterError::InvalidArgument(source.to_string()))?;

        let full_index = self.publish_slot(slot_value)?;
        debug!(
            cycle = %self.cycle_date, thread = %self.thread, filenum = %filenum,
            offset = %offset, "published record"
        );
        Ok(full_index)
    }

    fn publish_slot(&mut self, slot_value: u64) -> Result<FullIndex, WriterError> {
        loop {
            let byte_offset = self.index_slot * SLOT_SIZE;
            let file = (byte_offset / INDEX_FILE_SIZE) as usize;
            let byte_in_file = byte_offset % INDEX_FILE_SIZE;
            self.ensure_index_file(file)?;
            let prev = self.index_mappings[file].cas_word(byte_in_file, 0, slot_value)?;
            if prev != 0 {
                // Another thread in this process claimed this slot first;
                // try the next one. Cross-process contention on the exact
                // same slot cannot happen because each thread's position
                // counter only ever advances, but within one process two
                // `Writer`s must not share a slot counter — callers are
                // expected to give each thread its own `Writer`.
                self.index_slot += 1;
                continue;
            }
            let full_index = chronicle_wire::to_full(self.cycle_date, IntraIndex::new(self.index_slot));
            self.index_slot += 1;
            return Ok(full_index);
        }
    }

    fn roll_cycle(&mut self, new_date: CycleDate) -> Result<(), WriterError> {
        info!(from = %self.cycle_date, to = %new_date, thread = %self.thread, "writer rolling to new cycle");
        self.cycle_dir = cycles::cycle_directory(&self.base_dir, new_date);
        std::fs::create_dir_all(&self.cycle_dir).map_err(|source| WriterError::Fs {
            path: self.cycle_dir.clone(),
            source,
        })?;
        self.cycle_date = new_date;
        self.index_mappings.clear();
        self.index_slot = 0;
        self.data_file = None;
        Ok(())
    }

    pub fn cycle_date(&self) -> CycleDate {
        self.cycle_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_types::{Clock, ThreadIdBits};
    use proptest::prelude::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct FixedClock(Mutex<CycleDate>);

    impl Clock for FixedClock {
        fn now_utc(&self) -> CycleDate {
            *self.0.lock().unwrap()
        }
    }

    fn options(base: &std::path::Path) -> WriterOptions {
        let mut opts = WriterOptions::new(base);
        opts.thread_id_bits = ThreadIdBits::new(16).unwrap();
        opts
    }

    #[test]
    fn append_then_read_round_trips_a_payload() {
        let dir = tempdir().unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let clock: Box<dyn Clock> = Box::new(FixedClock(Mutex::new(date)));
        let mut writer = Writer::new(options(dir.path()), ThreadId::new(1), clock).unwrap();

        let full = writer.append(&1.2345f64.to_le_bytes()).unwrap();
        let (written_date, intra) = chronicle_wire::from_full(full);
        assert_eq!(written_date, date);
        assert_eq!(intra.as_u64(), 0);

        let mut reader_opts = chronicle_types::ReaderOptions::new(dir.path());
        reader_opts.thread_id_bits = ThreadIdBits::new(16).unwrap();
        let reader_clock: Box<dyn Clock> = Box::new(FixedClock(Mutex::new(date)));
        let mut reader = crate::reader::Reader::new(reader_opts, reader_clock).unwrap();
        let mut cursor = reader.next_raw_bytes().unwrap();
        assert_eq!(cursor.read_f64().unwrap(), 1.2345);
    }

    #[test]
    fn sequential_appends_get_increasing_slots() {
        let dir = tempdir().unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let clock: Box<dyn Clock> = Box::new(FixedClock(Mutex::new(date)));
        let mut writer = Writer::new(options(dir.path()), ThreadId::new(3), clock).unwrap();

        let first = writer.append(&1i32.to_le_bytes()).unwrap();
        let second = writer.append(&2i32.to_le_bytes()).unwrap();
        let (_, i1) = chronicle_wire::from_full(first);
        let (_, i2) = chronicle_wire::from_full(second);
        assert_eq!(i1.as_u64(), 0);
        assert_eq!(i2.as_u64(), 1);
    }

    #[test]
    fn partial_write_lost_on_rollover_when_clock_advances_mid_record() {
        let dir = tempdir().unwrap();
        let day1 = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let day2 = CycleDate::from_ymd(2015, 1, 2).unwrap();

        #[derive(Debug)]
        struct AdvancingClock(std::sync::atomic::AtomicUsize, CycleDate, CycleDate);
        impl Clock for AdvancingClock {
            fn now_utc(&self) -> CycleDate {
                // Construction and the append's pre-reservation check both see
                // `day1`; only the post-reservation check sees `day2`, so the
                // reservation itself succeeds before the rollover is noticed.
                let call = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if call < 2 { self.1 } else { self.2 }
            }
        }
        let clock: Box<dyn Clock> = Box::new(AdvancingClock(std::sync::atomic::AtomicUsize::new(0), day1, day2));
        let mut writer = Writer::new(options(dir.path()), ThreadId::new(1), clock).unwrap();
        let err = writer.append(b"x").unwrap_err();
        assert!(matches!(err, WriterError::PartialWriteLostOnRollover { .. }));
    }

    #[test]
    fn config_error_when_bound_below_one_data_file() {
        let dir = tempdir().unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let clock: Box<dyn Clock> = Box::new(FixedClock(Mutex::new(date)));
        let mut opts = options(dir.path());
        opts.max_mapped_memory = Some(DATA_FILE_SIZE - 1);
        let err = Writer::new(opts, ThreadId::new(1), clock).unwrap_err();
        assert!(matches!(err, WriterError::ConfigError { .. }));
    }

    proptest! {
        #[test]
        fn sequential_appends_round_trip_through_a_reader(payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..16)) {
            let dir = tempdir().unwrap();
            let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
            let clock: Box<dyn Clock> = Box::new(FixedClock(Mutex::new(date)));
            let mut writer = Writer::new(options(dir.path()), ThreadId::new(7), clock).unwrap();
            for payload in &payloads {
                writer.append(payload).unwrap();
            }

            let mut reader_opts = chronicle_types::ReaderOptions::new(dir.path());
            reader_opts.thread_id_bits = ThreadIdBits::new(16).unwrap();
            let reader_clock: Box<dyn Clock> = Box::new(FixedClock(Mutex::new(date)));
            let mut reader = crate::reader::Reader::new(reader_opts, reader_clock).unwrap();
            for payload in &payloads {
                let mut cursor = reader.next_raw_bytes().unwrap();
                let mut observed = vec![0u8; payload.len()];
                for byte in &mut observed {
                    *byte = cursor.read_u8().unwrap();
                }
                prop_assert_eq!(&observed, payload);
            }
        }
    }
}
