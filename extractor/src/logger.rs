//! Structured, leveled, file-backed logging, configured from `Config`.

use flexi_logger::{DeferredNow, FileSpec, Logger, LoggerHandle, WriteMode};
use log::Record;
use std::io::Write;
use std::thread;

use crate::config::Config;

/// Initializes the logger against the level and sink directory in `cfg`.
///
/// Per-byte/per-push traces belong at `trace`/`debug` level rather than behind
/// a separate Cargo feature: this crate has no kernel-mode logging budget to
/// protect, unlike the driver-side collaborator this pattern was modeled on.
pub fn init_logger(cfg: &Config) -> Result<LoggerHandle, Box<dyn std::error::Error>> {
    let spec = format!("extractor={}", cfg.log_level);
    let handle = Logger::try_with_str(spec)?
        .log_to_file(FileSpec::default().directory(&cfg.log_sink).suppress_timestamp())
        .append()
        .write_mode(WriteMode::BufferAndFlush)
        .format(log_format)
        .start()?;
    Ok(handle)
}

fn log_format(w: &mut dyn Write, now: &mut DeferredNow, record: &Record) -> std::io::Result<()> {
    write!(
        w,
        "{} [{:<5}] [{}:{}] [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        record.level(),
        record.file().unwrap_or("<unknown>"),
        record.line().unwrap_or(0),
        thread::current().name().unwrap_or("<unnamed>"),
        &record.args()
    )
}
