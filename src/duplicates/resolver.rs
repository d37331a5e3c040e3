//! Per-file duplicate decisions.
//!
//! [`DuplicateResolver::decide`] looks at one incoming file and its
//! canonical destination and returns a [`Decision`] that fully determines
//! the file's fate. It does not touch the filesystem apart from existence
//! checks (and the interactive prompt); the executor applies the decision.
//!
//! A conflict exists when a file is already at the canonical path, or when
//! the content index knows a file with identical bytes anywhere under the
//! target. The conflicting files and the incoming one go through master
//! selection:
//!
//! * incoming wins: every existing conflict is demoted and the incoming
//!   file takes the canonical slot ([`DuplicateAction::Promote`])
//! * an existing file wins: the mode policy decides between skip, a
//!   protected rename, a rename and a redirect

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use super::master::select_master;
use super::naming::{
    duplicate_filename, unique_duplicate_filename_with, unique_filename_with, NamingError,
};
use super::prompt::{PromptChoice, PromptRequest, Prompter};
use super::{DuplicateMode, DuplicateModes};
use crate::cache::ContentIndex;
use crate::organizer::date::DateResolver;
use crate::scanner::Hash;

/// Settings for the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Enabled handling modes.
    pub modes: DuplicateModes,
    /// Keyword inserted into renamed files (`photo_<keyword>.jpg`).
    pub keyword: String,
    /// Absolute redirect directory.
    pub redirect_dir: PathBuf,
}

/// Why an incoming file was not placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// An existing file is the better master and the mode says skip.
    NotMaster,
    /// Identical content already exists under the target.
    IdenticalContent,
    /// The user chose to skip.
    UserChoice,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotMaster => "existing file is better master",
            Self::IdenticalContent => "identical content to master",
            Self::UserChoice => "user choice",
        })
    }
}

/// An existing file leaving the canonical slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demotion {
    /// Current location.
    pub from: PathBuf,
    /// Planned new location.
    pub to: PathBuf,
}

/// The fate of one incoming file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateAction {
    /// No conflict; place at the canonical path.
    Place,
    /// Do not place.
    Skip(SkipReason),
    /// Overwrite was requested but the master is protected; place here.
    Overwrite {
        /// Keyword-suffixed path next to the master.
        protected_to: PathBuf,
    },
    /// Place under a keyword-suffixed name.
    Rename(PathBuf),
    /// Place in the redirect directory.
    Redirect(PathBuf),
    /// The incoming file is master: demote the others, then place at the
    /// canonical path.
    Promote {
        /// Planned demotions, in master-selection order.
        demotions: Vec<Demotion>,
    },
}

impl DuplicateAction {
    /// Short label for logs and summaries.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::Skip(_) => "skip",
            Self::Overwrite { .. } => "overwrite-protected",
            Self::Rename(_) => "rename",
            Self::Redirect(_) => "redirect",
            Self::Promote { .. } => "promote",
        }
    }
}

/// What the incoming file collides with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// A file exists at the canonical path.
    pub filename_match: bool,
    /// Indexed files with identical content (sorted).
    pub content_matches: Vec<PathBuf>,
    /// Union of both, filename match first, without repeats.
    pub conflicting: Vec<PathBuf>,
    /// The file chosen as master.
    pub master: PathBuf,
}

impl Conflict {
    /// Human-readable conflict reason.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match (self.filename_match, self.content_matches.is_empty()) {
            (true, false) => "filename AND content match",
            (true, true) => "filename exists",
            (false, _) => "identical content",
        }
    }
}

/// Result of deciding one incoming file.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Incoming file.
    pub source: PathBuf,
    /// `<dest>/<YYYY_MM_DD>/<name>`.
    pub canonical: PathBuf,
    /// What to do.
    pub action: DuplicateAction,
    /// Conflict details, `None` when there was none.
    pub conflict: Option<Conflict>,
    /// Hash of the incoming file, when the index is enabled and hashing worked.
    pub content_hash: Option<Hash>,
}

impl Decision {
    /// Where the incoming file ends up, `None` when it is skipped.
    #[must_use]
    pub fn final_destination(&self) -> Option<&Path> {
        match &self.action {
            DuplicateAction::Place | DuplicateAction::Promote { .. } => Some(&self.canonical),
            DuplicateAction::Skip(_) => None,
            DuplicateAction::Overwrite { protected_to } => Some(protected_to),
            DuplicateAction::Rename(path) | DuplicateAction::Redirect(path) => Some(path),
        }
    }
}

/// Collaborators consulted while deciding.
pub struct DecisionContext<'a> {
    /// Content index, `None` when content checking is disabled.
    pub index: Option<&'a ContentIndex>,
    /// Embedded-date source for existing files.
    pub dates: &'a dyn DateResolver,
    /// Asked in interactive mode.
    pub prompter: &'a mut dyn Prompter,
}

/// Decision function for incoming files.
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    config: ResolverConfig,
}

impl DuplicateResolver {
    /// Create a resolver.
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolver settings.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Decide the fate of `source` heading for `canonical`.
    ///
    /// # Errors
    ///
    /// [`NamingError`] when no free name can be generated.
    pub fn decide(
        &self,
        source: &Path,
        source_date: NaiveDateTime,
        canonical: &Path,
        ctx: &mut DecisionContext<'_>,
    ) -> Result<Decision, NamingError> {
        let filename_match = canonical.exists();

        let (content_hash, content_matches) = match ctx.index {
            Some(index) => match index.hash_file(source) {
                Ok(hash) => {
                    let mut matches = index.paths_with_hash(&hash);
                    matches.retain(|p| p != source);
                    (Some(hash), matches)
                }
                Err(e) => {
                    log::warn!("Cannot hash {}: {}; checking names only", source.display(), e);
                    (None, Vec::new())
                }
            },
            None => (None, Vec::new()),
        };

        let mut conflicting = Vec::new();
        if filename_match {
            conflicting.push(canonical.to_path_buf());
        }
        for path in &content_matches {
            if !conflicting.contains(path) {
                conflicting.push(path.clone());
            }
        }

        if conflicting.is_empty() {
            return Ok(Decision {
                source: source.to_path_buf(),
                canonical: canonical.to_path_buf(),
                action: DuplicateAction::Place,
                conflict: None,
                content_hash,
            });
        }

        let selection = select_master(source, source_date, &conflicting, ctx.dates);
        let name = canonical.file_name().unwrap_or_else(|| OsStr::new(""));

        let action = if selection.incoming_is_master() {
            let from: Vec<PathBuf> = selection
                .non_masters
                .iter()
                .filter(|c| c.path.exists())
                .map(|c| c.path.clone())
                .collect();
            DuplicateAction::Promote {
                demotions: self.plan_demotions(canonical, &from)?,
            }
        } else {
            self.existing_wins(
                source,
                canonical,
                name,
                filename_match,
                &content_matches,
                ctx.prompter,
            )?
        };

        Ok(Decision {
            source: source.to_path_buf(),
            canonical: canonical.to_path_buf(),
            action,
            conflict: Some(Conflict {
                filename_match,
                content_matches,
                conflicting,
                master: selection.master.path,
            }),
            content_hash,
        })
    }

    fn existing_wins(
        &self,
        source: &Path,
        canonical: &Path,
        name: &OsStr,
        filename_match: bool,
        content_matches: &[PathBuf],
        prompter: &mut dyn Prompter,
    ) -> Result<DuplicateAction, NamingError> {
        let modes = &self.config.modes;
        let dir = canonical.parent().unwrap_or_else(|| Path::new(""));
        let renamed = || unique_duplicate_filename_with(dir, name, &self.config.keyword, |p| p.exists());

        if modes.contains(DuplicateMode::Interactive) {
            let choice = prompter.choose(&PromptRequest {
                source,
                destination: canonical,
                filename_conflict: filename_match,
                content_matches,
            });
            return Ok(match choice {
                PromptChoice::Skip => DuplicateAction::Skip(SkipReason::UserChoice),
                PromptChoice::Overwrite => DuplicateAction::Overwrite {
                    protected_to: renamed()?,
                },
                PromptChoice::Rename => DuplicateAction::Rename(renamed()?),
                PromptChoice::Redirect => {
                    DuplicateAction::Redirect(self.redirect_target(name, &HashSet::new())?)
                }
            });
        }

        if modes.contains(DuplicateMode::Content) && !content_matches.is_empty() {
            return Ok(DuplicateAction::Skip(SkipReason::IdenticalContent));
        }
        if modes.contains(DuplicateMode::Skip) {
            return Ok(DuplicateAction::Skip(SkipReason::NotMaster));
        }
        if modes.contains(DuplicateMode::Redirect) {
            return Ok(DuplicateAction::Redirect(
                self.redirect_target(name, &HashSet::new())?,
            ));
        }
        if modes.contains(DuplicateMode::Rename) || modes.contains(DuplicateMode::Content) {
            return Ok(DuplicateAction::Rename(renamed()?));
        }
        if modes.contains(DuplicateMode::Overwrite) {
            return Ok(DuplicateAction::Overwrite {
                protected_to: renamed()?,
            });
        }
        Ok(DuplicateAction::Skip(SkipReason::NotMaster))
    }

    /// Plan where every demoted file goes. Targets planned earlier in the
    /// same decision count as taken.
    fn plan_demotions(
        &self,
        canonical: &Path,
        from: &[PathBuf],
    ) -> Result<Vec<Demotion>, NamingError> {
        let mut reserved: HashSet<PathBuf> = HashSet::from([canonical.to_path_buf()]);
        let mut demotions = Vec::with_capacity(from.len());

        for path in from {
            let to = if self.config.modes.redirects_demotions() {
                let name = path.file_name().unwrap_or_else(|| OsStr::new(""));
                self.redirect_target(name, &reserved)?
            } else {
                let renamed = duplicate_filename(path, &self.config.keyword);
                unique_filename_with(&renamed, |p| p.exists() || reserved.contains(p))?
            };
            reserved.insert(to.clone());
            demotions.push(Demotion {
                from: path.clone(),
                to,
            });
        }
        Ok(demotions)
    }

    /// Bare name inside the redirect directory, else a keyword-suffixed one.
    fn redirect_target(
        &self,
        name: &OsStr,
        reserved: &HashSet<PathBuf>,
    ) -> Result<PathBuf, NamingError> {
        let dir = &self.config.redirect_dir;
        let is_taken = |p: &Path| p.exists() || reserved.contains(p);
        let bare = dir.join(name);
        if !is_taken(&bare) {
            return Ok(bare);
        }
        unique_duplicate_filename_with(dir, name, &self.config.keyword, is_taken)
    }
}
