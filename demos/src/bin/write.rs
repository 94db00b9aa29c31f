//! Appends a handful of stop-bit-varint-length-prefixed strings to a
//! chronicle directory, one per invocation's thread identity. Useful for
//! generating a fixture directory `chronicle-tail` can watch.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use chronicle::{SystemClock, ThreadId, Writer, WriterOptions};

#[derive(Parser)]
struct Args {
    /// Base directory to create/append to.
    base_dir: PathBuf,

    /// Writer-thread identity (distinct `data-<thread>-N` files per value).
    #[arg(long, default_value_t = 0)]
    thread: u32,

    /// Number of records to append.
    #[arg(long, default_value_t = 10)]
    count: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let options = WriterOptions::new(&args.base_dir);
    let mut writer = Writer::new(options, ThreadId::new(args.thread), Box::new(SystemClock))?;

    for i in 0..args.count {
        let payload = format!("{}={}", args.thread, i);
        let full_index = writer.append(payload.as_bytes())?;
        tracing::info!(%full_index, %payload, "appended record");
    }
    Ok(())
}
