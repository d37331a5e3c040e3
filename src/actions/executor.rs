//! Applying duplicate decisions to the filesystem.
//!
//! The [`Executor`] is the only place where placement side effects happen:
//! demotions, directory creation, the copy or move itself, and the matching
//! content index updates. In dry-run mode the same code path runs with every
//! mutation suppressed and the event log says what would have happened.

use std::path::Path;

use crate::cache::ContentIndex;
use crate::duplicates::{Decision, Demotion, DuplicateAction, SkipReason};
use crate::logging::EventSink;
use crate::organizer::date::ResolvedDate;

use super::transfer::{ensure_dir, move_file, transfer, TransferError, TransferMode};

/// What happened to one incoming file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The file was placed (or would have been, in a dry run).
    Placed {
        /// Final location.
        destination: std::path::PathBuf,
        /// Existing files moved out of the way.
        demoted: usize,
        /// Demotions that failed.
        demotion_failures: usize,
    },
    /// The file was left out.
    Skipped(SkipReason),
}

/// Applies [`Decision`]s.
#[derive(Debug, Clone, Copy)]
pub struct Executor {
    mode: TransferMode,
    dry_run: bool,
}

impl Executor {
    /// Create an executor.
    #[must_use]
    pub fn new(mode: TransferMode, dry_run: bool) -> Self {
        Self { mode, dry_run }
    }

    /// Transfer mode.
    #[must_use]
    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    /// Whether mutations are suppressed.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Carry out `decision`, logging every step to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] when the incoming file itself cannot be
    /// placed. Failed demotions are logged and counted, not returned.
    pub fn apply(
        &self,
        decision: &Decision,
        date: &ResolvedDate,
        mut index: Option<&mut ContentIndex>,
        sink: &mut dyn EventSink,
    ) -> Result<Outcome, TransferError> {
        let name = file_name(&decision.source);
        let line = FileLine::new(&name, date);

        self.log_conflict(decision, &name, sink);

        let mut demoted = 0;
        let mut demotion_failures = 0;
        let annotation = match &decision.action {
            DuplicateAction::Skip(reason) => {
                sink.info(&format!("{}    skipped - {}", line.prefix(), reason));
                return Ok(Outcome::Skipped(*reason));
            }
            DuplicateAction::Place => String::new(),
            DuplicateAction::Promote { demotions } => {
                for demotion in demotions {
                    if self.demote(demotion, index.as_deref_mut(), sink) {
                        demoted += 1;
                    } else {
                        demotion_failures += 1;
                    }
                }
                String::new()
            }
            DuplicateAction::Overwrite { protected_to } => {
                sink.info("    Overwrite blocked - master file protected");
                format!(" [RENAMED - master protected -> {}]", file_name(protected_to))
            }
            DuplicateAction::Rename(to) => {
                format!(" [RENAMED - not master -> {}]", file_name(to))
            }
            DuplicateAction::Redirect(to) => {
                format!(" [REDIRECTED - not master -> {}]", to.display())
            }
        };

        // Skip returned above, every other action has a destination
        let Some(destination) = decision.final_destination() else {
            return Ok(Outcome::Skipped(SkipReason::NotMaster));
        };

        if !self.dry_run {
            if let Err(e) = self.place(&decision.source, destination) {
                sink.error(&format!(
                    "Failed to {} {} to {}: {}",
                    self.mode.verb(),
                    decision.source.display(),
                    destination.display(),
                    e
                ));
                return Err(e);
            }
            if let Some(index) = index {
                if self.mode == TransferMode::Move {
                    index.invalidate_file(&decision.source);
                }
                if let Err(e) = index.add_file(destination, decision.content_hash) {
                    log::warn!("Could not index {}: {}", destination.display(), e);
                }
            }
        }

        let parent = destination.parent().unwrap_or_else(|| Path::new(""));
        sink.info(&format!(
            "{}  {} {:>3} {}{}{}",
            line.prefix(),
            date.date.format("%Y-%m-%d %H:%M:%S"),
            self.mode.past(),
            parent.display(),
            annotation,
            self.dry_run_marker()
        ));

        Ok(Outcome::Placed {
            destination: destination.to_path_buf(),
            demoted,
            demotion_failures,
        })
    }

    fn log_conflict(&self, decision: &Decision, name: &str, sink: &mut dyn EventSink) {
        let Some(conflict) = &decision.conflict else {
            return;
        };
        if conflict.filename_match {
            sink.info(&format!(
                "  DUPLICATE CONFLICT: {} -> {} (reason: {})",
                name,
                decision.canonical.display(),
                conflict.reason()
            ));
        } else {
            for path in &conflict.content_matches {
                sink.info(&format!(
                    "  DUPLICATE CONFLICT: {} matches existing file {} (reason: {})",
                    name,
                    path.display(),
                    conflict.reason()
                ));
            }
        }

        match &decision.action {
            DuplicateAction::Promote { demotions } => {
                sink.info(&format!(
                    "  MASTER PROMOTION: Incoming file {} is the better master",
                    name
                ));
                for demotion in demotions {
                    sink.info(&format!(
                        "    DEMOTION: {} will be moved to duplicate location",
                        file_name(&demotion.from)
                    ));
                }
            }
            _ => sink.info(&format!(
                "  MASTER RETAINED: Existing file {} remains as master",
                file_name(&conflict.master)
            )),
        }
    }

    /// Move one existing file out of the canonical slot. Returns success.
    fn demote(
        &self,
        demotion: &Demotion,
        index: Option<&mut ContentIndex>,
        sink: &mut dyn EventSink,
    ) -> bool {
        let from_name = file_name(&demotion.from);
        if self.dry_run {
            sink.info(&format!(
                "    WOULD DEMOTE: {} -> {} [DRY RUN]",
                from_name,
                demotion.to.display()
            ));
            return true;
        }

        let moved = demotion
            .to
            .parent()
            .map_or(Ok(false), ensure_dir)
            .and_then(|_| move_file(&demotion.from, &demotion.to));
        if let Err(e) = moved {
            sink.error(&format!(
                "Failed to demote {} to {}: {}",
                demotion.from.display(),
                demotion.to.display(),
                e
            ));
            return false;
        }
        sink.info(&format!(
            "    DEMOTED: {} -> {}",
            from_name,
            demotion.to.display()
        ));

        if let Some(index) = index {
            let known = index.hash_of(&demotion.from);
            index.invalidate_file(&demotion.from);
            if let Err(e) = index.add_file(&demotion.to, known) {
                log::warn!("Could not index {}: {}", demotion.to.display(), e);
            }
        }
        true
    }

    fn place(&self, source: &Path, destination: &Path) -> Result<(), TransferError> {
        if let Some(parent) = destination.parent() {
            ensure_dir(parent)?;
        }
        transfer(self.mode, source, destination)
    }

    fn dry_run_marker(&self) -> &'static str {
        if self.dry_run {
            " [DRY RUN]"
        } else {
            ""
        }
    }
}

/// Left part of a per-file event line: the name, padded, and the
/// no-native-timestamp tag.
pub(crate) struct FileLine<'a> {
    name: &'a str,
    tag: &'static str,
    width: usize,
}

impl<'a> FileLine<'a> {
    pub(crate) fn new(name: &'a str, date: &ResolvedDate) -> Self {
        let width = 40usize.saturating_sub(name.chars().count()).max(4);
        let tag = if date.is_fallback() {
            " no date "
        } else {
            "         "
        };
        Self { name, tag, width }
    }

    pub(crate) fn prefix(&self) -> String {
        format!("  {}  {:>width$}", self.name, self.tag, width = self.width)
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
