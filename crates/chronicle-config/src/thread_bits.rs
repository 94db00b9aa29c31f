//! Thread-id bit width autodetection.
//!
//! Reads `/proc/sys/kernel/pid_max` on POSIX and uses the bit width of that
//! integer as `T` — the width of the thread-id field at the top of every
//! slot word. On Windows, and anywhere the procfs entry can't be read, it
//! falls back to a fixed default of 16. `T` must agree between every writer
//! and reader touching a chronicle; getting this wrong silently corrupts
//! decoding, so callers who know their deployment's real `pid_max` should
//! prefer an explicit override over autodetection.

use std::path::Path;

use chronicle_types::ThreadIdBits;

use crate::error::ConfigError;

/// Default thread-id bit width used on Windows, or wherever autodetection
/// isn't possible.
pub const DEFAULT_THREAD_ID_BITS: u8 = 16;

const PID_MAX_PATH: &str = "/proc/sys/kernel/pid_max";

/// Autodetects `T` by reading `/proc/sys/kernel/pid_max` and returning its
/// bit width. Returns the Windows/fallback default if the platform isn't
/// Linux or the file can't be read.
pub fn detect_thread_id_bits() -> ThreadIdBits {
    if cfg!(target_os = "windows") {
        return ThreadIdBits::new(DEFAULT_THREAD_ID_BITS).expect("16 is always in range");
    }
    match read_pid_max_bits(Path::new(PID_MAX_PATH)) {
        Ok(bits) => bits,
        Err(err) => {
            tracing::warn!(
                error = %err,
                "falling back to default thread_id_bits={DEFAULT_THREAD_ID_BITS}"
            );
            ThreadIdBits::new(DEFAULT_THREAD_ID_BITS).expect("16 is always in range")
        }
    }
}

fn read_pid_max_bits(path: &Path) -> Result<ThreadIdBits, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ThreadBitsDetection {
        path: path.to_path_buf(),
        source,
    })?;
    let pid_max: u64 = contents.trim().parse().map_err(|_| ConfigError::Validation(format!(
        "{path} did not contain an integer: {contents:?}",
        path = path.display()
    )))?;
    let bits = bit_width(pid_max);
    ThreadIdBits::new(bits).ok_or_else(|| {
        ConfigError::Validation(format!("pid_max {pid_max} produced out-of-range thread_id_bits {bits}"))
    })
}

/// Zero-based position of the highest set bit, i.e. `floor(log2(x))` — not
/// `x`'s bit length.
fn bit_width(value: u64) -> u8 {
    debug_assert!(value > 0, "pid_max must be positive");
    (u64::BITS - 1 - value.leading_zeros()) as u8
}
