//! Component C: the cycle directory set.
//!
//! Enumerates `YYYYMMDD` day-directories immediately under the base
//! directory. Every operation is a fresh directory listing — the set may
//! grow while a reader or writer runs, and there is no cached view to go
//! stale.

use std::path::{Path, PathBuf};

use chronicle_types::CycleDate;
use tracing::trace;

use crate::error::ReaderError;

/// Lists every cycle directory name directly under `base_dir`, sorted
/// lexicographically (which, for fixed-width `YYYYMMDD` names, is also
/// chronological order).
fn list_cycles(base_dir: &Path) -> Result<Vec<CycleDate>, ReaderError> {
    let entries = std::fs::read_dir(base_dir).map_err(|source| ReaderError::Fs {
        path: base_dir.to_path_buf(),
        source,
    })?;

    let mut cycles = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReaderError::Fs {
            path: base_dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(date) = CycleDate::parse_directory_name(name) {
            cycles.push(date);
        }
    }
    cycles.sort_by_key(CycleDate::directory_name);
    Ok(cycles)
}

/// The lexicographically smallest cycle directory under `base_dir`.
///
/// Fails with [`ReaderError::NoData`] if the base directory holds no cycle
/// directories (an empty chronicle is a legitimate initial state — the
/// caller should usually treat this as "not yet written to", not an error).
pub fn first_cycle(base_dir: &Path) -> Result<CycleDate, ReaderError> {
    let cycles = list_cycles(base_dir)?;
    cycles.into_iter().next().ok_or(ReaderError::NoData)
}

/// The next cycle directory strictly greater than `current`, if any.
pub fn next_cycle(base_dir: &Path, current: CycleDate) -> Result<Option<CycleDate>, ReaderError> {
    let cycles = list_cycles(base_dir)?;
    let next = cycles.into_iter().find(|c| *c > current);
    trace!(?current, ?next, "next_cycle lookup");
    Ok(next)
}

/// The smallest cycle directory whose name is `>=` the requested date's
/// directory name.
///
/// This returns the first cycle **on or after** the requested date, not an
/// exact match — preserved intentionally from the source format (see
/// DESIGN.md's open-question notes).
pub fn cycle_for_date(base_dir: &Path, date: CycleDate) -> Result<CycleDate, ReaderError> {
    let cycles = list_cycles(base_dir)?;
    cycles
        .into_iter()
        .find(|c| *c >= date)
        .ok_or(ReaderError::NoData)
}

pub fn cycle_directory(base_dir: &Path, date: CycleDate) -> PathBuf {
    base_dir.join(date.directory_name())
}
