//! # chronicle-config: configuration loading for the Vanilla Chronicle reader/writer
//!
//! The core reader/writer crates (`chronicle-storage`) take their options as
//! plain structs (`ReaderOptions`/`WriterOptions` in `chronicle-types`) with
//! no CLI or env-var surface of their own. This crate builds those options
//! from two higher-level sources a demo binary or operator tool actually
//! wants:
//!
//! - [`ReaderFileConfig`]/[`WriterFileConfig`]: serde structs loadable from a
//!   single TOML file, plain-struct-with-`Default`, no layered merging.
//! - [`thread_bits::detect_thread_id_bits`]: `/proc/sys/kernel/pid_max`
//!   autodetection with an explicit override path.

mod error;
mod thread_bits;

use std::path::{Path, PathBuf};

use chronicle_types::{PollingInterval, ReaderOptions, StartPosition, ThreadIdBits, WriterOptions};
use serde::{Deserialize, Serialize};

pub use error::ConfigError;
pub use thread_bits::{detect_thread_id_bits, DEFAULT_THREAD_ID_BITS};

/// Polling mode as it appears in a config file: `"non-blocking"`, `"spin"`,
/// or a positive number of seconds to sleep between polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PollingConfig {
    Named(PollingMode),
    SleepSeconds(f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollingMode {
    NonBlocking,
    Spin,
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig::Named(PollingMode::NonBlocking)
    }
}

impl From<PollingConfig> for PollingInterval {
    fn from(config: PollingConfig) -> Self {
        match config {
            PollingConfig::Named(PollingMode::NonBlocking) => PollingInterval::NonBlocking,
            PollingConfig::Named(PollingMode::Spin) => PollingInterval::Spin,
            PollingConfig::SleepSeconds(secs) => {
                PollingInterval::Sleep(std::time::Duration::from_secs_f64(secs.max(0.0)))
            }
        }
    }
}

/// TOML-loadable mirror of [`ReaderOptions`] for the demo binary and any
/// operator tooling that wants a config file instead of constructing
/// options in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderFileConfig {
    pub base_dir: PathBuf,
    pub polling: PollingConfig,
    /// `YYYYMMDD`, mutually exclusive with `full_index` — validated on
    /// conversion to [`ReaderOptions`], not at parse time.
    pub date: Option<String>,
    pub full_index: Option<u64>,
    pub max_mapped_memory: Option<u64>,
    /// `None` means autodetect via [`detect_thread_id_bits`].
    pub thread_id_bits: Option<u8>,
}

impl Default for ReaderFileConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            polling: PollingConfig::default(),
            date: None,
            full_index: None,
            max_mapped_memory: None,
            thread_id_bits: None,
        }
    }
}

impl ReaderFileConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Builds [`ReaderOptions`], resolving thread-id-bit autodetection and
    /// validating that `date` and `full_index` weren't both set.
    pub fn into_options(self) -> Result<ReaderOptions, ConfigError> {
        let start = match (self.date, self.full_index) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "date and full_index are mutually exclusive".to_string(),
                ));
            }
            (Some(date_str), None) => {
                let date = chronicle_types::CycleDate::parse_directory_name(&date_str)
                    .or_else(|| parse_dashed_date(&date_str))
                    .ok_or_else(|| ConfigError::Validation(format!("invalid date {date_str:?}, expected YYYYMMDD or YYYY-MM-DD")))?;
                StartPosition::Date(date)
            }
            (None, Some(full)) => StartPosition::FullIndex(chronicle_types::FullIndex::new(full)),
            (None, None) => StartPosition::FirstCycle,
        };

        let thread_id_bits = match self.thread_id_bits {
            Some(bits) => ThreadIdBits::new(bits)
                .ok_or_else(|| ConfigError::Validation(format!("thread_id_bits {bits} out of range")))?,
            None => detect_thread_id_bits(),
        };

        Ok(ReaderOptions {
            base_dir: self.base_dir,
            polling_interval: self.polling.into(),
            start,
            max_mapped_memory: self.max_mapped_memory,
            thread_id_bits,
        })
    }
}

fn parse_dashed_date(s: &str) -> Option<chronicle_types::CycleDate> {
    let mut parts = s.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    chronicle_types::CycleDate::from_ymd(year, month, day)
}

/// TOML-loadable mirror of [`WriterOptions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterFileConfig {
    pub base_dir: PathBuf,
    pub max_mapped_memory: Option<u64>,
    pub thread_id_bits: Option<u8>,
}

impl Default for WriterFileConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            max_mapped_memory: None,
            thread_id_bits: None,
        }
    }
}

impl WriterFileConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    pub fn into_options(self) -> Result<WriterOptions, ConfigError> {
        let thread_id_bits = match self.thread_id_bits {
            Some(bits) => ThreadIdBits::new(bits)
                .ok_or_else(|| ConfigError::Validation(format!("thread_id_bits {bits} out of range")))?,
            None => detect_thread_id_bits(),
        };
        Ok(WriterOptions {
            base_dir: self.base_dir,
            max_mapped_memory: self.max_mapped_memory,
            thread_id_bits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reader_config_round_trips_through_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            base_dir = "/var/log/chronicle"
            polling = "spin"
            thread_id_bits = 16
            "#
        )
        .unwrap();

        let config = ReaderFileConfig::from_toml_file(file.path()).unwrap();
        let options = config.into_options().unwrap();
        assert_eq!(options.base_dir, PathBuf::from("/var/log/chronicle"));
        assert!(matches!(options.polling_interval, PollingInterval::Spin));
        assert_eq!(options.thread_id_bits.get(), 16);
        assert!(matches!(options.start, StartPosition::FirstCycle));
    }

    #[test]
    fn date_and_full_index_are_mutually_exclusive() {
        let config = ReaderFileConfig {
            date: Some("20150101".to_string()),
            full_index: Some(1),
            ..ReaderFileConfig::default()
        };
        assert!(matches!(config.into_options(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn dashed_date_is_accepted() {
        let config = ReaderFileConfig {
            date: Some("2015-04-16".to_string()),
            ..ReaderFileConfig::default()
        };
        let options = config.into_options().unwrap();
        match options.start {
            StartPosition::Date(date) => assert_eq!(date.directory_name(), "20150416"),
            other => panic!("unexpected start position: {other:?}"),
        }
    }
}
