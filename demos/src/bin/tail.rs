//! Tails a chronicle directory, printing each record's raw length and
//! position as it's published. Stops when the tail is caught up and the
//! reader is non-blocking; otherwise sleeps between polls.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use chronicle::{PollingInterval, Reader, ReaderOptions, SystemClock};

#[derive(Parser)]
struct Args {
    /// Base directory holding the chronicle's `YYYYMMDD` cycle directories.
    base_dir: PathBuf,

    /// Sleep this many seconds between polls once caught up, instead of
    /// exiting on `NoData`.
    #[arg(long)]
    follow_interval: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut options = ReaderOptions::new(&args.base_dir);
    options.polling_interval = match args.follow_interval {
        Some(secs) => PollingInterval::Sleep(Duration::from_secs_f64(secs)),
        None => PollingInterval::NonBlocking,
    };

    let mut reader = Reader::new(options, Box::new(SystemClock))?;
    loop {
        match reader.next_raw_bytes() {
            Ok(mut cursor) => {
                tracing::info!(offset = cursor.get_offset(), "record published");
                let _ = cursor.read_u8();
            }
            Err(chronicle::ReaderError::NoData) => {
                tracing::info!("caught up to tail");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
