//! Component A: the mapped region handle.
//!
//! Owns a read-only or read-write memory mapping of a fixed-size file
//! region. Word reads and compare-and-set writes operate on 8-byte aligned
//! offsets using a single hardware atomic — this is what lets writers and
//! readers on different threads or processes coordinate through nothing but
//! the mapped bytes.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use memmap2::{Mmap, MmapMut};
use tracing::debug;

use crate::error::IoError;

/// A fixed-size mapped file region, either read-only (the reader's view) or
/// read-write (the writer's view).
#[derive(Debug)]
pub enum MappedRegion {
    ReadOnly {
        mmap: Mmap,
        len: u64,
        path: PathBuf,
    },
    ReadWrite {
        mmap: MmapMut,
        len: u64,
        path: PathBuf,
    },
}

impl MappedRegion {
    /// Creates `path` if absent and extends it to exactly `size` bytes,
    /// zero-filled. Writers call this before mapping a fresh index or data
    /// file; the format requires files be pre-extended, never grown under an
    /// active mapping.
    pub fn create_and_extend(path: &Path, size: u64) -> Result<(), IoError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|source| IoError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        file.set_len(size).map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), size, "pre-extended chronicle file");
        Ok(())
    }

    /// Opens `path` read-only and maps exactly `size` bytes. The file must
    /// already be at least `size` bytes (the writer pre-extends it).
    pub fn open_read(path: &Path, size: u64) -> Result<Self, IoError> {
        let file = File::open(path).map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::check_file_len(path, &file, size)?;
        // SAFETY: the mapped file is owned by the chronicle and is never
        // truncated while mapped; concurrent writers only append via CAS on
        // already-reserved bytes, never shrink the file.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(MappedRegion::ReadOnly {
            mmap,
            len: size,
            path: path.to_path_buf(),
        })
    }

    /// Opens `path` read-write and maps exactly `size` bytes. The caller must
    /// have already pre-extended the file via [`Self::create_and_extend`].
    pub fn open_write(path: &Path, size: u64) -> Result<Self, IoError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| IoError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::check_file_len(path, &file, size)?;
        // SAFETY: same invariant as open_read — the file is never truncated
        // while mapped.
        let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(MappedRegion::ReadWrite {
            mmap,
            len: size,
            path: path.to_path_buf(),
        })
    }

    fn check_file_len(path: &Path, file: &File, size: u64) -> Result<(), IoError> {
        let actual = file
            .metadata()
            .map_err(|source| IoError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if actual < size {
            return Err(IoError::OutOfBounds {
                offset: size,
                region_size: actual,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> u64 {
        match self {
            MappedRegion::ReadOnly { len, .. } | MappedRegion::ReadWrite { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        match self {
            MappedRegion::ReadOnly { path, .. } | MappedRegion::ReadWrite { path, .. } => path,
        }
    }

    /// Unmaps the region. Equivalent to dropping it; provided so callers can
    /// make the close point explicit, matching the reader's hierarchical
    /// shutdown order (mappings before file handles).
    pub fn close(self) {
        drop(self);
    }

    fn base_ptr(&self) -> *const u8 {
        match self {
            MappedRegion::ReadOnly { mmap, .. } => mmap.as_ptr(),
            MappedRegion::ReadWrite { mmap, .. } => mmap.as_ptr(),
        }
    }

    fn check_word_offset(&self, byte_offset: u64) -> Result<(), IoError> {
        if byte_offset % 8 != 0 {
            return Err(IoError::Misaligned {
                offset: byte_offset,
                region_size: self.len(),
            });
        }
        if byte_offset + 8 > self.len() {
            return Err(IoError::OutOfBounds {
                offset: byte_offset,
                region_size: self.len(),
            });
        }
        Ok(())
    }

    /// # Safety
    /// The caller must have validated `byte_offset` via [`Self::check_word_offset`].
    unsafe fn atomic_word_at(&self, byte_offset: u64) -> &AtomicU64 {
        let ptr = self.base_ptr().add(byte_offset as usize) as *const AtomicU64;
        // SAFETY: offset is 8-byte aligned and in-bounds (checked by the
        // caller); the region outlives this reference for the lifetime of
        // `&self`, and AtomicU64 has the same layout and validity as a
        // little-endian u64 word on every supported platform.
        unsafe { &*ptr }
    }

    /// Reads an 8-byte little-endian word at `byte_offset` with at least
    /// acquire ordering, so a reader observing a writer-published value also
    /// observes everything the writer stored before its release CAS.
    pub fn read_word(&self, byte_offset: u64) -> Result<u64, IoError> {
        self.check_word_offset(byte_offset)?;
        // SAFETY: offset validated above.
        let word = unsafe { self.atomic_word_at(byte_offset) };
        Ok(word.load(Ordering::Acquire))
    }

    /// Atomically compares the word at `byte_offset` to `expected` and, if
    /// equal, stores `new` with release ordering. Returns the previous value
    /// either way (the caller checks it against `expected` to know whether
    /// the CAS succeeded), matching a single hardware CAS instruction.
    ///
    /// Only meaningful on a [`MappedRegion::ReadWrite`] mapping; readers
    /// never call this.
    pub fn cas_word(&self, byte_offset: u64, expected: u64, new: u64) -> Result<u64, IoError> {
        self.check_word_offset(byte_offset)?;
        // SAFETY: offset validated above.
        let word = unsafe { self.atomic_word_at(byte_offset) };
        match word.compare_exchange(expected, new, Ordering::Release, Ordering::Acquire) {
            Ok(prev) | Err(prev) => Ok(prev),
        }
    }

    /// Writes an 8-byte little-endian word at `byte_offset` without any
    /// atomicity or ordering guarantee.
    ///
    /// # Safety
    /// The caller must guarantee no other reader or writer can observe this
    /// region at `byte_offset` concurrently — e.g. the payload bytes of a
    /// span the current writer thread has exclusively reserved, before the
    /// span is published via [`Self::cas_word`] on the index slot.
    pub unsafe fn unsafe_write_word(&self, byte_offset: u64, value: u64) -> Result<(), IoError> {
        self.check_word_offset(byte_offset)?;
        let ptr = self.base_ptr().add(byte_offset as usize) as *mut u64;
        // SAFETY: forwarded to the caller's contract above.
        unsafe { ptr.write_unaligned(value.to_le()) };
        Ok(())
    }

    /// Borrows the full mapped region as a byte slice, for use by
    /// `chronicle-wire::RawCursor`.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            MappedRegion::ReadOnly { mmap, .. } => &mmap[..],
            MappedRegion::ReadWrite { mmap, .. } => &mmap[..],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_word_sees_unsafe_write_word() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index-0");
        MappedRegion::create_and_extend(&path, 64).unwrap();

        let writer = MappedRegion::open_write(&path, 64).unwrap();
        unsafe { writer.unsafe_write_word(8, 0xdead_beef).unwrap() };
        assert_eq!(writer.read_word(8).unwrap(), 0xdead_beef);

        let reader = MappedRegion::open_read(&path, 64).unwrap();
        assert_eq!(reader.read_word(8).unwrap(), 0xdead_beef);
    }

    #[test]
    fn cas_word_only_succeeds_when_expected_matches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index-0");
        MappedRegion::create_and_extend(&path, 64).unwrap();
        let region = MappedRegion::open_write(&path, 64).unwrap();

        let prev = region.cas_word(0, 0, 42).unwrap();
        assert_eq!(prev, 0);
        assert_eq!(region.read_word(0).unwrap(), 42);

        // stale expectation: CAS fails, reports the current value, doesn't write.
        let prev = region.cas_word(0, 0, 99).unwrap();
        assert_eq!(prev, 42);
        assert_eq!(region.read_word(0).unwrap(), 42);
    }

    #[test]
    fn misaligned_offset_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index-0");
        MappedRegion::create_and_extend(&path, 64).unwrap();
        let region = MappedRegion::open_write(&path, 64).unwrap();
        assert!(matches!(
            region.read_word(3),
            Err(IoError::Misaligned { .. })
        ));
    }

    #[test]
    fn out_of_bounds_offset_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index-0");
        MappedRegion::create_and_extend(&path, 64).unwrap();
        let region = MappedRegion::open_write(&path, 64).unwrap();
        assert!(matches!(
            region.read_word(64),
            Err(IoError::OutOfBounds { .. })
        ));
    }
}
