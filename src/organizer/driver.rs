//! The placement driver.
//!
//! [`Organizer::run`] walks the source tree in sorted order and, for every
//! matching file, resolves its date, applies the date policy, computes
//! `<dest>/<YYYY_MM_DD>/<name>` and hands the file to the duplicate
//! resolver and the executor. Per-file failures are logged and counted;
//! only invalid input paths abort a run.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use super::date::{folder_name, resolve_with_mtime, DatePolicy, DateResolver};
use crate::actions::executor::{file_name, FileLine};
use crate::actions::{ensure_dir, Executor, Outcome, TransferMode};
use crate::cache::{BuildStats, ContentIndex, IndexStats, StoreLocation, CACHE_FILE_NAME};
use crate::duplicates::{
    DecisionContext, DuplicateModes, DuplicateResolver, Prompter, ResolverConfig,
};
use crate::error::ExitCode;
use crate::logging::{EventSink, EVENT_LOG_NAME};
use crate::progress::{ProgressCallback, PHASE_ORGANIZE};
use crate::scanner::{normalize_extensions, Walker, WalkerConfig};

/// Errors that stop a run before any file is touched.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The source directory does not exist.
    #[error("source directory does not exist: {0}")]
    SourceMissing(PathBuf),

    /// The source path is not a directory.
    #[error("source is not a directory: {0}")]
    SourceNotDirectory(PathBuf),

    /// Source and destination are the same directory.
    #[error("source and destination are the same directory: {0}")]
    SameDirectory(PathBuf),

    /// The destination directory could not be created.
    #[error("cannot create destination directory {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OrganizeError {
    /// Whether the error is about the paths the user supplied.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::CreateDestination { .. })
    }
}

/// Everything a run needs to know.
#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    /// Tree to scan.
    pub source: PathBuf,
    /// Root of the date folders.
    pub destination: PathBuf,
    /// Copy or move.
    pub mode: TransferMode,
    /// Decide and log, but change nothing.
    pub dry_run: bool,
    /// Comma-separated extension allow-list.
    pub extensions: Option<String>,
    /// Files with or without embedded dates.
    pub date_policy: DatePolicy,
    /// Duplicate handling modes.
    pub duplicate_modes: DuplicateModes,
    /// Redirect directory, absolute or relative to the destination.
    pub redirect_dir: PathBuf,
    /// Keyword for renamed duplicates.
    pub duplicate_keyword: String,
    /// Build and consult the content index.
    pub comprehensive_check: bool,
    /// Alternative location of the index store.
    pub cache_dir: Option<PathBuf>,
    /// Log a progress line every N placed files (0 disables it).
    pub progress_interval: usize,
    /// Follow symlinks in the source.
    pub follow_symlinks: bool,
    /// Skip hidden entries in the source.
    pub skip_hidden: bool,
}

impl OrganizeOptions {
    /// Options with the usual defaults: copy, fallback dates, skip mode.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            mode: TransferMode::Copy,
            dry_run: false,
            extensions: None,
            date_policy: DatePolicy::default(),
            duplicate_modes: DuplicateModes::default(),
            redirect_dir: PathBuf::from("Duplicates"),
            duplicate_keyword: "duplicate".to_string(),
            comprehensive_check: true,
            cache_dir: None,
            progress_interval: 100,
            follow_symlinks: false,
            skip_hidden: false,
        }
    }

    /// Check the source and destination paths.
    ///
    /// # Errors
    ///
    /// [`OrganizeError::SourceMissing`], [`OrganizeError::SourceNotDirectory`]
    /// or [`OrganizeError::SameDirectory`].
    pub fn validate(&self) -> Result<(), OrganizeError> {
        let meta = fs::metadata(&self.source)
            .map_err(|_| OrganizeError::SourceMissing(self.source.clone()))?;
        if !meta.is_dir() {
            return Err(OrganizeError::SourceNotDirectory(self.source.clone()));
        }
        let source = absolute(&self.source);
        if source == absolute(&self.destination) {
            return Err(OrganizeError::SameDirectory(source));
        }
        Ok(())
    }

    /// Absolute redirect directory for a destination root.
    #[must_use]
    pub fn redirect_path(&self, dest_root: &Path) -> PathBuf {
        if self.redirect_dir.is_absolute() {
            self.redirect_dir.clone()
        } else {
            dest_root.join(&self.redirect_dir)
        }
    }
}

/// Canonical path when it exists, else an absolute lexical one.
fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Counters and context of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Scanned tree.
    pub source: PathBuf,
    /// Destination root.
    pub destination: PathBuf,
    /// Copy or move.
    pub mode: TransferMode,
    /// Whether mutations were suppressed.
    pub dry_run: bool,
    /// Enabled duplicate modes.
    pub duplicate_handling: String,
    /// Files matching the extension filter.
    pub seen: usize,
    /// Files placed (or that would have been).
    pub processed: usize,
    /// Files left out by the date policy or a duplicate decision.
    pub skipped: usize,
    /// Files that could not be handled.
    pub failed: usize,
    /// Existing files moved out of a canonical slot.
    pub demoted: usize,
    /// Demotions that failed.
    pub demotion_failures: usize,
    /// Index build counters, when the index was used.
    pub build: Option<BuildStats>,
    /// Index contents at the end of the run.
    pub index: Option<IndexStats>,
    /// Where the index persisted its records.
    pub store: Option<StoreLocation>,
    /// Wall-clock duration.
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl RunSummary {
    /// Exit code for this run.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.failed > 0 || self.demotion_failures > 0 {
            ExitCode::PartialSuccess
        } else {
            ExitCode::Success
        }
    }
}

/// One organize run.
pub struct Organizer<'a> {
    options: OrganizeOptions,
    dates: &'a dyn DateResolver,
    prompter: &'a mut dyn Prompter,
    sink: &'a mut dyn EventSink,
    progress: Option<&'a dyn ProgressCallback>,
}

impl<'a> Organizer<'a> {
    /// Prepare a run.
    pub fn new(
        options: OrganizeOptions,
        dates: &'a dyn DateResolver,
        prompter: &'a mut dyn Prompter,
        sink: &'a mut dyn EventSink,
    ) -> Self {
        Self {
            options,
            dates,
            prompter,
            sink,
            progress: None,
        }
    }

    /// Report progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run options.
    #[must_use]
    pub fn options(&self) -> &OrganizeOptions {
        &self.options
    }

    /// Process the whole source tree.
    ///
    /// # Errors
    ///
    /// Only for invalid paths or an uncreatable destination; per-file
    /// problems are counted in the summary.
    pub fn run(self) -> Result<RunSummary, OrganizeError> {
        let Organizer {
            options,
            dates,
            prompter,
            sink,
            progress,
        } = self;
        let start = Instant::now();

        options.validate()?;
        // The destination root hosts the event log and the index, so it is
        // created even in a dry run.
        fs::create_dir_all(&options.destination).map_err(|source| {
            OrganizeError::CreateDestination {
                path: options.destination.clone(),
                source,
            }
        })?;
        let source_root = absolute(&options.source);
        let dest_root = absolute(&options.destination);
        let redirect_dir = options.redirect_path(&dest_root);
        let event_log = dest_root.join(EVENT_LOG_NAME);

        sink.info(&format!(
            "Source: {}  Destination: {}  Action: {}{}",
            source_root.display(),
            dest_root.display(),
            options.mode.verb(),
            if options.dry_run { " [DRY RUN]" } else { "" }
        ));
        sink.info(&format!(
            "Duplicate handling: {}  Keyword: {}  Date policy: {}",
            options.duplicate_modes, options.duplicate_keyword, options.date_policy
        ));
        if options.duplicate_modes.redirects_demotions() {
            sink.info(&format!("Redirect directory: {}", redirect_dir.display()));
        }

        let mut summary = RunSummary {
            source: source_root.clone(),
            destination: dest_root.clone(),
            mode: options.mode,
            dry_run: options.dry_run,
            duplicate_handling: options.duplicate_modes.to_string(),
            seen: 0,
            processed: 0,
            skipped: 0,
            failed: 0,
            demoted: 0,
            demotion_failures: 0,
            build: None,
            index: None,
            store: None,
            elapsed: Duration::ZERO,
        };

        let mut index = if options.comprehensive_check {
            let store = ContentIndex::store_path(&dest_root, options.cache_dir.as_deref());
            let mut index = if options.dry_run && !store.exists() {
                log::debug!("Dry run without a hash cache; indexing in memory");
                ContentIndex::open_in_memory(&dest_root)
            } else {
                ContentIndex::open(&dest_root, options.cache_dir.as_deref())
            };
            index.exclude_file(event_log.clone());
            if source_root.starts_with(&dest_root) {
                // unplaced source files are not part of the library yet
                index.exclude_dir(source_root.clone());
            }
            let stats = index.build_with_progress(progress);
            sink.info(&format!(
                "Hash cache: {} files indexed ({} hashed, {} reused, {} stale removed) in {:.2?}",
                stats.total_indexed(),
                stats.hashed,
                stats.reused,
                stats.stale_removed,
                stats.elapsed
            ));
            summary.build = Some(stats);
            Some(index)
        } else {
            sink.info("Comprehensive duplicate check disabled; matching file names only");
            None
        };

        let resolver = DuplicateResolver::new(ResolverConfig {
            modes: options.duplicate_modes.clone(),
            keyword: options.duplicate_keyword.clone(),
            redirect_dir,
        });
        let executor = Executor::new(options.mode, options.dry_run);

        let mut walker_config = WalkerConfig {
            follow_symlinks: options.follow_symlinks,
            skip_hidden: options.skip_hidden,
            ..WalkerConfig::default()
        }
        .with_extensions(options.extensions.as_deref().map(normalize_extensions))
        .exclude_name_prefix(CACHE_FILE_NAME)
        .exclude_file(event_log);
        if dest_root.starts_with(&source_root) {
            log::debug!("Destination lies inside the source; not walking it");
            walker_config = walker_config.exclude_dir(dest_root.clone());
        }
        let walker = Walker::new(&source_root, walker_config);

        if let Some(p) = progress {
            p.on_phase_start(PHASE_ORGANIZE, 0);
        }

        let mut announced: HashSet<PathBuf> = HashSet::new();
        let mut current_folder: Option<PathBuf> = None;

        for entry in walker.walk() {
            let file = match entry {
                Ok(file) => file,
                Err(e) => {
                    sink.error(&format!("Cannot read source entry: {}", e));
                    summary.failed += 1;
                    continue;
                }
            };
            summary.seen += 1;
            if let Some(p) = progress {
                p.on_progress(summary.seen, &file.path.to_string_lossy());
            }

            let folder = file.path.parent().map(Path::to_path_buf);
            if folder != current_folder {
                if let Some(dir) = &folder {
                    sink.info(&format!("Source Folder: {}", dir.display()));
                }
                current_folder = folder;
            }

            let name = file_name(&file.path);
            let resolved = resolve_with_mtime(&file.path, file.modified, dates);
            if !options.date_policy.admits(resolved.source) {
                sink.info(&format!(
                    "{}    skipped",
                    FileLine::new(&name, &resolved).prefix()
                ));
                summary.skipped += 1;
                continue;
            }

            let date_dir = dest_root.join(folder_name(resolved.date));
            if !date_dir.is_dir() && announced.insert(date_dir.clone()) {
                if !options.dry_run {
                    if let Err(e) = ensure_dir(&date_dir) {
                        sink.error(&format!(
                            "Failed to create destination subdir {}: {}",
                            date_dir.display(),
                            e
                        ));
                        announced.remove(&date_dir);
                        summary.failed += 1;
                        continue;
                    }
                }
                sink.info(&format!("created new destination subdir: {}", date_dir.display()));
            }

            let Some(file_os_name) = file.path.file_name() else {
                summary.failed += 1;
                continue;
            };
            let canonical = date_dir.join(file_os_name);

            let decision = {
                let mut ctx = DecisionContext {
                    index: index.as_ref(),
                    dates,
                    prompter: &mut *prompter,
                };
                resolver.decide(&file.path, resolved.date, &canonical, &mut ctx)
            };
            let decision = match decision {
                Ok(decision) => decision,
                Err(e) => {
                    sink.error(&format!("Cannot place {}: {}", file.path.display(), e));
                    summary.failed += 1;
                    continue;
                }
            };

            match executor.apply(&decision, &resolved, index.as_mut(), &mut *sink) {
                Ok(Outcome::Placed {
                    demoted,
                    demotion_failures,
                    ..
                }) => {
                    summary.processed += 1;
                    summary.demoted += demoted;
                    summary.demotion_failures += demotion_failures;
                    if options.progress_interval > 0
                        && summary.processed % options.progress_interval == 0
                    {
                        sink.info(&format!(
                            "Processed {} files so far...",
                            summary.processed
                        ));
                    }
                }
                Ok(Outcome::Skipped(_)) => summary.skipped += 1,
                Err(_) => summary.failed += 1,
            }
        }

        if let Some(p) = progress {
            p.on_phase_end(PHASE_ORGANIZE);
        }

        sink.info(&format!(
            "Total files matched: {}, processed: {}",
            summary.seen, summary.processed
        ));
        if summary.skipped + summary.failed > 0 {
            sink.info(&format!(
                "Skipped: {}, failed: {}, demoted: {}",
                summary.skipped, summary.failed, summary.demoted
            ));
        }

        if let Some(index) = index.take() {
            summary.index = Some(index.stats());
            summary.store = Some(index.location().clone());
            if let Err(e) = index.close() {
                log::warn!("Failed to close hash cache: {}", e);
            }
        }
        summary.elapsed = start.elapsed();
        Ok(summary)
    }
}
