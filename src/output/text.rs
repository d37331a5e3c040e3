//! Human-readable summaries.
//!
//! Colors come from yansi and are dropped globally by `--no-color`.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::cache::{BuildStats, IndexStats, StoreLocation};
use crate::organizer::RunSummary;

/// Print the end-of-run summary.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_run_summary<W: Write>(writer: &mut W, summary: &RunSummary) -> io::Result<()> {
    let title = if summary.dry_run {
        "Dry run complete"
    } else {
        "Organize complete"
    };
    writeln!(writer, "{}", title.bold())?;
    writeln!(
        writer,
        "  {} -> {} ({}, duplicates: {})",
        summary.source.display(),
        summary.destination.display(),
        summary.mode,
        summary.duplicate_handling
    )?;
    writeln!(writer, "  Matched:   {}", summary.seen)?;
    writeln!(writer, "  Processed: {}", summary.processed.green())?;
    writeln!(writer, "  Skipped:   {}", summary.skipped.yellow())?;
    if summary.demoted > 0 || summary.demotion_failures > 0 {
        writeln!(
            writer,
            "  Demoted:   {} ({} failed)",
            summary.demoted, summary.demotion_failures
        )?;
    }
    if summary.failed > 0 {
        writeln!(writer, "  Failed:    {}", summary.failed.red().bold())?;
    }
    if let Some(store) = &summary.store {
        writeln!(writer, "  Hash cache: {}", store)?;
    }
    writeln!(writer, "  Elapsed:   {:.2?}", summary.elapsed)?;
    Ok(())
}

/// Print index build statistics, as shown by `organize --benchmark`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_benchmark<W: Write>(
    writer: &mut W,
    build: &BuildStats,
    index: Option<&IndexStats>,
) -> io::Result<()> {
    writeln!(writer, "{}", "Hash Cache Benchmark".bold())?;
    writeln!(writer, "  Build time:     {:.2?}", build.elapsed)?;
    writeln!(writer, "  Files hashed:   {}", build.hashed)?;
    writeln!(writer, "  Files reused:   {}", build.reused)?;
    writeln!(writer, "  Stale removed:  {}", build.stale_removed)?;
    writeln!(writer, "  Hash failures:  {}", build.failed)?;
    writeln!(
        writer,
        "  Bytes hashed:   {}",
        ByteSize::b(build.bytes_hashed)
    )?;
    let secs = build.elapsed.as_secs_f64();
    if secs > 0.0 && build.bytes_hashed > 0 {
        // f64 precision is plenty for a throughput figure.
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let per_sec = (build.bytes_hashed as f64 / secs) as u64;
        writeln!(writer, "  Throughput:     {}/s", ByteSize::b(per_sec))?;
    }
    if let Some(index) = index {
        writeln!(writer, "  Indexed files:  {}", index.total_files)?;
    }
    Ok(())
}

/// Print the report of the `index` subcommand.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_index_report<W: Write>(
    writer: &mut W,
    target: &std::path::Path,
    store: &StoreLocation,
    build: &BuildStats,
    index: &IndexStats,
) -> io::Result<()> {
    writeln!(writer, "{} {}", "Index of".bold(), target.display())?;
    writeln!(writer, "  Store:            {}", store)?;
    writeln!(
        writer,
        "  Files:            {} ({} hashed, {} reused, {} stale removed)",
        index.total_files, build.hashed, build.reused, build.stale_removed
    )?;
    writeln!(writer, "  Unique contents:  {}", index.unique_hashes)?;
    if index.duplicate_groups > 0 {
        writeln!(
            writer,
            "  Duplicate groups: {}",
            index.duplicate_groups.yellow()
        )?;
    } else {
        writeln!(writer, "  Duplicate groups: 0")?;
    }
    if build.failed > 0 {
        writeln!(writer, "  Unreadable files: {}", build.failed.red())?;
    }
    writeln!(writer, "  Build time:       {:.2?}", build.elapsed)?;
    Ok(())
}
