//! Component E: the index-file chain.
//!
//! An ordered, growable list of mapped `index-N` files within one cycle.
//! Translates a logical slot number to `(file, byte)` and reads the 64-bit
//! word there. The chain never shrinks during a cycle; on cycle change it is
//! closed and rebuilt from scratch by the reader.

use std::path::{Path, PathBuf};

use chronicle_io::{IoError, MappedRegion};
use chronicle_types::CycleDate;
use chronicle_wire::constants::{FILENUM_FROM_INDEX_SHIFT, INDEX_FILE_BYTE_MASK, INDEX_FILE_SIZE, SLOT_SIZE};
use tracing::trace;

use crate::error::ReaderError;

#[derive(Debug)]
pub struct IndexFileChain {
    cycle_dir: PathBuf,
    date: CycleDate,
    mappings: Vec<MappedRegion>,
}

impl IndexFileChain {
    pub fn new(cycle_dir: &Path, date: CycleDate) -> Self {
        Self {
            cycle_dir: cycle_dir.to_path_buf(),
            date,
            mappings: Vec::new(),
        }
    }

    pub fn date(&self) -> CycleDate {
        self.date
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn ensure_file(&mut self, file: usize) -> Result<(), ReaderError> {
        while self.mappings.len() <= file {
            let idx = self.mappings.len();
            let path = self.cycle_dir.join(format!("index-{idx}"));
            let region = MappedRegion::open_read(&path, INDEX_FILE_SIZE).map_err(|err| {
                if is_not_found(&err) {
                    ReaderError::NoChronicleForDate {
                        date: self.date,
                        filenum: idx as u32,
                    }
                } else {
                    ReaderError::Io(err)
                }
            })?;
            trace!(cycle = %self.date, file = idx, "opened index file into chain");
            self.mappings.push(region);
        }
        Ok(())
    }

    /// Reads the slot word at logical slot `s`, opening the next index file
    /// transparently when `s` crosses into it.
    pub fn slot_word(&mut self, slot: u64) -> Result<u64, ReaderError> {
        let byte_offset = slot * SLOT_SIZE;
        let file = (byte_offset >> FILENUM_FROM_INDEX_SHIFT) as usize;
        let byte_in_file = byte_offset & INDEX_FILE_BYTE_MASK;
        self.ensure_file(file)?;
        Ok(self.mappings[file].read_word(byte_in_file)?)
    }
}

fn is_not_found(err: &IoError) -> bool {
    matches!(err, IoError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn slot_word_reads_zero_for_unpublished_slot() {
        let dir = tempdir().unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        MappedRegion::create_and_extend(&dir.path().join("index-0"), INDEX_FILE_SIZE).unwrap();

        let mut chain = IndexFileChain::new(dir.path(), date);
        assert_eq!(chain.slot_word(0).unwrap(), 0);
    }

    #[test]
    fn slot_word_fails_with_no_chronicle_for_date_when_file_missing() {
        let dir = tempdir().unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        let mut chain = IndexFileChain::new(dir.path(), date);
        let err = chain.slot_word(0).unwrap_err();
        assert!(matches!(err, ReaderError::NoChronicleForDate { .. }));
    }

    #[test]
    fn slot_word_crosses_index_file_boundary() {
        let dir = tempdir().unwrap();
        let date = CycleDate::from_ymd(2015, 1, 1).unwrap();
        MappedRegion::create_and_extend(&dir.path().join("index-0"), INDEX_FILE_SIZE).unwrap();
        MappedRegion::create_and_extend(&dir.path().join("index-1"), INDEX_FILE_SIZE).unwrap();

        let slots_per_file = INDEX_FILE_SIZE / SLOT_SIZE;
        let mut chain = IndexFileChain::new(dir.path(), date);
        assert_eq!(chain.slot_word(slots_per_file).unwrap(), 0);
        assert_eq!(chain.len(), 2);
    }
}
