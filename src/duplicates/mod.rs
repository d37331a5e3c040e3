//! Duplicate resolution.
//!
//! This module provides functionality for:
//! - Duplicate-keyword heuristics on file names ([`keywords`])
//! - Master selection among conflicting files ([`master`])
//! - Collision-free name generation ([`naming`])
//! - Interactive prompting ([`prompt`])
//! - The per-file decision function ([`resolver`])
//!
//! # Modes
//!
//! The handling mode is a comma-separated list of [`DuplicateMode`] values.
//! Some combinations contradict each other and are rejected:
//!
//! | mode        | conflicts with              |
//! |-------------|-----------------------------|
//! | `skip`      | overwrite, redirect, rename |
//! | `overwrite` | redirect, rename            |

pub mod keywords;
pub mod master;
pub mod naming;
pub mod prompt;
pub mod resolver;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use keywords::{has_duplicate_keyword, DUPLICATE_KEYWORDS};
pub use master::{select_master, Candidate, CandidateOrigin, MasterScore, MasterSelection};
pub use naming::{
    duplicate_filename, unique_duplicate_filename, unique_filename, NamingError, MAX_ATTEMPTS,
};
pub use prompt::{
    confirm_default_yes, ConsolePrompter, PromptChoice, PromptRequest, Prompter, ScriptedPrompter,
};
pub use resolver::{
    Conflict, Decision, DecisionContext, Demotion, DuplicateAction, DuplicateResolver,
    ResolverConfig, SkipReason,
};

/// One duplicate handling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateMode {
    /// Leave the incoming file out.
    Skip,
    /// Overwrite intent, downgraded to a protected rename.
    Overwrite,
    /// Place under a keyword-suffixed name.
    Rename,
    /// Skip identical content, rename on a name-only clash.
    Content,
    /// Ask for each duplicate.
    Interactive,
    /// Place in the redirect directory.
    Redirect,
}

impl DuplicateMode {
    /// Every mode, in display order.
    pub const ALL: [Self; 6] = [
        Self::Skip,
        Self::Overwrite,
        Self::Rename,
        Self::Content,
        Self::Interactive,
        Self::Redirect,
    ];

    /// Lowercase name as accepted on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::Rename => "rename",
            Self::Content => "content",
            Self::Interactive => "interactive",
            Self::Redirect => "redirect",
        }
    }
}

impl fmt::Display for DuplicateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pairs of modes that cannot be combined.
pub const CONFLICTING_MODES: &[(DuplicateMode, DuplicateMode)] = &[
    (DuplicateMode::Skip, DuplicateMode::Overwrite),
    (DuplicateMode::Skip, DuplicateMode::Redirect),
    (DuplicateMode::Skip, DuplicateMode::Rename),
    (DuplicateMode::Overwrite, DuplicateMode::Redirect),
    (DuplicateMode::Overwrite, DuplicateMode::Rename),
];

/// Errors from parsing a mode list.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    /// A name that is not a mode.
    #[error("Invalid duplicate handling mode '{mode}'{hint}. Valid modes: skip, overwrite, rename, content, interactive, redirect")]
    Unknown {
        /// The rejected name.
        mode: String,
        /// Rendered suggestion, empty when there is none.
        hint: String,
    },

    /// Two modes that contradict each other.
    #[error("Conflicting duplicate handling modes: '{0}' and '{1}' cannot be used together")]
    Conflict(DuplicateMode, DuplicateMode),

    /// No mode at all.
    #[error("No duplicate handling mode given")]
    Empty,
}

/// A validated, non-empty set of duplicate modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateModes(BTreeSet<DuplicateMode>);

impl Default for DuplicateModes {
    fn default() -> Self {
        Self(BTreeSet::from([DuplicateMode::Skip]))
    }
}

impl DuplicateModes {
    /// Build from individual modes, checking the conflict table.
    ///
    /// # Errors
    ///
    /// [`ModeError::Conflict`] for contradictory pairs, [`ModeError::Empty`]
    /// when no mode is given.
    pub fn new(modes: impl IntoIterator<Item = DuplicateMode>) -> Result<Self, ModeError> {
        let set: BTreeSet<_> = modes.into_iter().collect();
        if set.is_empty() {
            return Err(ModeError::Empty);
        }
        for (a, b) in CONFLICTING_MODES {
            if set.contains(a) && set.contains(b) {
                return Err(ModeError::Conflict(*a, *b));
            }
        }
        Ok(Self(set))
    }

    /// Whether `mode` is enabled.
    #[must_use]
    pub fn contains(&self, mode: DuplicateMode) -> bool {
        self.0.contains(&mode)
    }

    /// Whether demoted files go to the redirect directory instead of being
    /// renamed in place.
    #[must_use]
    pub fn redirects_demotions(&self) -> bool {
        self.contains(DuplicateMode::Redirect) || self.contains(DuplicateMode::Interactive)
    }

    /// Iterate the enabled modes.
    pub fn iter(&self) -> impl Iterator<Item = DuplicateMode> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for DuplicateModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(DuplicateMode::as_str).collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for DuplicateModes {
    type Err = ModeError;

    /// Parse a comma-separated list such as `"redirect,content"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modes = Vec::new();
        for raw in s.split(',').map(str::trim).filter(|m| !m.is_empty()) {
            let lower = raw.to_lowercase();
            match DuplicateMode::ALL.iter().find(|m| m.as_str() == lower) {
                Some(mode) => modes.push(*mode),
                None => {
                    let hint = suggest_mode(&lower)
                        .map(|m| format!(" (did you mean '{}'?)", m))
                        .unwrap_or_default();
                    return Err(ModeError::Unknown {
                        mode: raw.to_string(),
                        hint,
                    });
                }
            }
        }
        Self::new(modes)
    }
}

/// Closest mode name to a misspelling, if any is close enough.
#[must_use]
pub fn suggest_mode(input: &str) -> Option<DuplicateMode> {
    DuplicateMode::ALL
        .iter()
        .map(|m| (*m, strsim::jaro_winkler(input, m.as_str())))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(m, _)| m)
}
