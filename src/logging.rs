//! Logging infrastructure for orgphoto.
//!
//! Two channels exist side by side:
//!
//! * diagnostics through the `log` facade with an `env_logger` backend,
//!   set up by [`init_logging`]
//! * the per-run event log, `events.log` inside the destination directory,
//!   fed through an [`EventSink`]
//!
//! Diagnostic log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. Default: info level
//!
//! # Build-specific Formatting
//!
//! - **Debug builds**: Include timestamp, level, and module path for detailed debugging
//! - **Release builds**: Compact format with level and message only for cleaner output
//!
//! # Example
//!
//! ```rust,no_run
//! use orgphoto::logging::{init_logging, EventLog, EventSink};
//! use std::path::Path;
//!
//! init_logging(0, false);
//!
//! let mut events = EventLog::create(Path::new("/photos"), false).unwrap();
//! events.info("Processing started");
//! events.finish();
//! ```

use env_logger::Builder;
use log::{Level, LevelFilter};
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the event log inside the destination directory.
pub const EVENT_LOG_NAME: &str = "events.log";

const RULE: &str = "================================================================================";

/// Initialize the logging subsystem based on CLI verbosity flags.
///
/// Calling it again is harmless; later calls are ignored.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=normal, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by RUST_LOG)
pub fn init_logging(verbose: u8, quiet: bool) {
    let use_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();

    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        return;
    }

    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG environment variable: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!(
            "Logging initialized at level: {:?}",
            determine_level(verbose, quiet)
        );
    }
}

/// Determine the log level from CLI flags.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Configure the log format based on build type and verbosity.
fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}

/// Get the current log level as a string.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}

/// Destination for per-file event lines.
pub trait EventSink {
    /// Record one line at `level`.
    fn record(&mut self, level: Level, message: &str);

    /// Record at info level.
    fn info(&mut self, message: &str) {
        self.record(Level::Info, message);
    }

    /// Record at warn level.
    fn warn(&mut self, message: &str) {
        self.record(Level::Warn, message);
    }

    /// Record at error level.
    fn error(&mut self, message: &str) {
        self.record(Level::Error, message);
    }

    /// Record at debug level.
    fn debug(&mut self, message: &str) {
        self.record(Level::Debug, message);
    }
}

/// Append-only `events.log` in the destination directory.
///
/// Lines are plain messages without timestamps, except for the session
/// header and footer. Debug lines are written only in verbose mode. Every
/// line is also forwarded to the `log` facade.
pub struct EventLog {
    path: PathBuf,
    writer: Option<LineWriter<File>>,
    verbose: bool,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("path", &self.path)
            .field("open", &self.writer.is_some())
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl EventLog {
    /// Open (or create) `events.log` under `dest_root` and write the session
    /// header.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the file cannot be created.
    pub fn create(dest_root: &Path, verbose: bool) -> io::Result<Self> {
        std::fs::create_dir_all(dest_root)?;
        let path = dest_root.join(EVENT_LOG_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut log = Self {
            path,
            writer: Some(LineWriter::new(file)),
            verbose,
        };
        let started = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        log.write_line(RULE);
        log.write_line("orgphoto - Photo Organization Tool");
        log.write_line(&format!("Version: {}", env!("CARGO_PKG_VERSION")));
        log.write_line(&format!("Session Started: {}", started));
        log.write_line(RULE);
        Ok(log)
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the session footer and close the file.
    pub fn finish(mut self) {
        self.write_footer();
    }

    fn write_footer(&mut self) {
        if self.writer.is_none() {
            return;
        }
        let ended = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        self.write_line(RULE);
        self.write_line(&format!("Session Ended: {}", ended));
        self.write_line(RULE);
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }

    fn write_line(&mut self, line: &str) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{}", line) {
            log::error!("Cannot write to {}: {}; event log disabled", self.path.display(), e);
            self.writer = None;
        }
    }
}

impl EventSink for EventLog {
    fn record(&mut self, level: Level, message: &str) {
        log::log!(target: "orgphoto::events", level, "{}", message);
        if level <= Level::Info || self.verbose {
            self.write_line(message);
        }
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        self.write_footer();
    }
}

/// In-memory sink, mostly for tests and for callers without a log file.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Vec<(Level, String)>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded line.
    #[must_use]
    pub fn lines(&self) -> &[(Level, String)] {
        &self.lines
    }

    /// Whether any line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, l)| l.contains(needle))
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, level: Level, message: &str) {
        self.lines.push((level, message.to_string()));
    }
}
