//! Component D: the bounded data-file map cache.
//!
//! An insertion-ordered cache from `(thread, filenum)` to a mapped data
//! file. Capacity, if bounded, evicts the oldest-inserted entry — never an
//! LRU reorder on hit, matching the source's simple "oldest wins" discipline
//! (see `RollingStore` in the pack's `forest_db::rolling` module, which
//! evicts by a similar oldest-first rule keyed on numeric ordering rather
//! than insertion order).
//!
//! `get_or_open` takes `&mut self` and returns a reference borrowed from
//! `self`. That borrow must be dropped before the next call — which the
//! borrow checker enforces for free, turning the source's implicit "finish
//! decoding before calling back into the reader" contract (spec §9) into a
//! compile-time guarantee instead of a documented caller obligation.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use chronicle_io::{IoError, MappedRegion};
use chronicle_types::{CycleDate, FileNum, ThreadId};
use chronicle_wire::constants::DATA_FILE_SIZE;
use tracing::debug;

use crate::error::ReaderError;

type CacheKey = (ThreadId, FileNum);

#[derive(Debug)]
pub struct DataFileCache {
    capacity: Option<usize>,
    entries: HashMap<CacheKey, MappedRegion>,
    insertion_order: VecDeque<CacheKey>,
}

impl DataFileCache {
    /// `max_mapped_memory` bounds total resident mappings to
    /// `max_mapped_memory / DATA_FILE_SIZE`. `None` means unbounded — fine on
    /// platforms with abundant address space. `Some(bytes)` below one data
    /// file is a configuration error.
    pub fn new(max_mapped_memory: Option<u64>) -> Result<Self, ReaderError> {
        let capacity = match max_mapped_memory {
            None => None,
            Some(bytes) => {
                let cap = bytes / DATA_FILE_SIZE;
                if cap < 1 {
                    return Err(ReaderError::ConfigError {
                        min_bytes: DATA_FILE_SIZE,
                    });
                }
                Some(cap as usize)
            }
        };
        Ok(Self {
            capacity,
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
        })
    }

    /// Returns the mapping for `(thread, filenum)`, opening and inserting it
    /// if absent. Fails with [`ReaderError::CorruptData`] if the referenced
    /// data file doesn't exist — an index slot must never name a file the
    /// writer didn't create.
    pub fn get_or_open(
        &mut self,
        cycle_dir: &Path,
        date: CycleDate,
        thread: ThreadId,
        filenum: FileNum,
    ) -> Result<&MappedRegion, ReaderError> {
        let key = (thread, filenum);
        if !self.entries.contains_key(&key) {
            let path = cycle_dir.join(format!("data-{}-{}", thread, filenum));
            let region = MappedRegion::open_read(&path, DATA_FILE_SIZE).map_err(|err| {
                if is_not_found(&err) {
                    ReaderError::CorruptData {
                        date,
                        thread,
                        filenum,
                    }
                } else {
                    ReaderError::Io(err)
                }
            })?;
            self.entries.insert(key, region);
            self.insertion_order.push_back(key);
            self.evict_to_capacity();
        }
        Ok(self
            .entries
            .get(&key)
            .expect("just inserted or already present"))
    }

    fn evict_to_capacity(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.entries.len() > capacity {
            let Some(oldest) = self.insertion_order.pop_front() else {
                break;
            };
            if let Some(region) = self.entries.remove(&oldest) {
                debug!(
                    thread = %oldest.0,
                    filenum = %oldest.1,
                    path = %region.path().display(),
                    "evicted data-file mapping"
                );
            }
        }
    }

    /// Drops every mapping and its insertion record — called on cycle change
    /// and on reader close.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_not_found(err: &IoError) -> bool {
    matches!(err, IoError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_data_file(cycle_dir: &Path, thread: u32, filenum: u32) {
        let path = cycle_dir.join(format!("data-{thread}-{filenum}"));
        MappedRegion::create_and_extend(&path, DATA_FILE_SIZE).unwrap();
    }

    #[test]
    fn config_error_when_bound_below_one_data_file() {
        let err = DataFileCache::new(Some(DATA_FILE_SIZE - 1)).unwrap_err();
        assert!(matches!(err, ReaderError::ConfigError { .. }));
    }

    #[test]
    fn missing_data_file_is_corrupt_data() {
        let dir = tempdir().unwrap();
        let mut cache = DataFileCache::new(None).unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let err = cache
            .get_or_open(dir.path(), date, ThreadId::new(1), FileNum::new(0))
            .unwrap_err();
        assert!(matches!(err, ReaderError::CorruptData { .. }));
    }

    #[test]
    fn eviction_removes_oldest_inserted_entry_first() {
        let dir = tempdir().unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        make_data_file(dir.path(), 1, 0);
        make_data_file(dir.path(), 1, 1);
        make_data_file(dir.path(), 1, 2);

        let mut cache = DataFileCache::new(Some(2 * DATA_FILE_SIZE)).unwrap();
        cache
            .get_or_open(dir.path(), date, ThreadId::new(1), FileNum::new(0))
            .unwrap();
        cache
            .get_or_open(dir.path(), date, ThreadId::new(1), FileNum::new(1))
            .unwrap();
        assert_eq!(cache.len(), 2);

        cache
            .get_or_open(dir.path(), date, ThreadId::new(1), FileNum::new(2))
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert!(!cache.entries.contains_key(&(ThreadId::new(1), FileNum::new(0))));
        assert!(cache.entries.contains_key(&(ThreadId::new(1), FileNum::new(1))));
        assert!(cache.entries.contains_key(&(ThreadId::new(1), FileNum::new(2))));
    }
}
