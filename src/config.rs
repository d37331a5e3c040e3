//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. the TOML config file (`--config FILE`, else `config.toml` in the
//!    platform config directory)
//! 3. an optional `[profile.NAME]` table from that file
//! 4. `ORGPHOTO_*` environment variables (`__` separates nested keys)
//! 5. command-line flags ([`Config::merge_organize_args`])
//!
//! ```toml
//! duplicate_handling = "redirect,content"
//! redirect_dir = "Duplicates"
//! date_policy = "fallback"
//!
//! [profile.phone]
//! extensions = "jpg,heic,mov"
//! duplicate_handling = "skip"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::{IndexArgs, OrganizeArgs, OutputFormat};
use crate::duplicates::{DuplicateModes, ModeError};
use crate::organizer::date::DatePolicy;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "ORGPHOTO_";

/// Errors from loading, validating or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The layered sources could not be combined into a [`Config`].
    #[error("invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// `duplicate_handling` does not parse.
    #[error(transparent)]
    Modes(#[from] ModeError),

    /// `duplicate_keyword` is empty or contains a path separator.
    #[error("invalid duplicate keyword '{0}': must be non-empty and contain no path separators")]
    Keyword(String),

    /// No platform configuration directory.
    #[error("cannot determine the configuration directory")]
    NoConfigDir,

    /// Writing the config file failed.
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing to TOML failed.
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Comma-separated extension allow-list; `None` processes every file.
    pub extensions: Option<String>,
    /// What to do with files lacking an embedded date.
    pub date_policy: DatePolicy,
    /// Comma-separated duplicate handling modes.
    pub duplicate_handling: String,
    /// Redirect directory, absolute or relative to the destination.
    pub redirect_dir: PathBuf,
    /// Keyword inserted into renamed duplicates.
    pub duplicate_keyword: String,
    /// Detect identical content anywhere under the destination.
    pub comprehensive_check: bool,
    /// Where the index store lives; `None` keeps it inside the destination.
    pub cache_dir: Option<PathBuf>,
    /// Emit a progress line every N processed files.
    pub progress_interval: usize,
    /// Follow symbolic links while walking the source.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories in the source.
    pub skip_hidden: bool,
    /// Summary format.
    pub output: OutputFormat,
    /// Named overrides, selected with `--profile`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profile: BTreeMap<String, ProfileConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extensions: None,
            date_policy: DatePolicy::default(),
            duplicate_handling: "skip".to_string(),
            redirect_dir: PathBuf::from("Duplicates"),
            duplicate_keyword: "duplicate".to_string(),
            comprehensive_check: true,
            cache_dir: None,
            progress_interval: 100,
            follow_symlinks: false,
            skip_hidden: false,
            output: OutputFormat::Text,
            profile: BTreeMap::new(),
        }
    }
}

/// Per-profile overrides. Unset fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub extensions: Option<String>,
    pub date_policy: Option<DatePolicy>,
    pub duplicate_handling: Option<String>,
    pub redirect_dir: Option<PathBuf>,
    pub duplicate_keyword: Option<String>,
    pub comprehensive_check: Option<bool>,
    pub cache_dir: Option<PathBuf>,
    pub progress_interval: Option<usize>,
    pub follow_symlinks: Option<bool>,
    pub skip_hidden: Option<bool>,
    pub output: Option<OutputFormat>,
}

/// Top-level keys accepted in the config file.
const KNOWN_KEYS: &[&str] = &[
    "extensions",
    "date_policy",
    "duplicate_handling",
    "redirect_dir",
    "duplicate_keyword",
    "comprehensive_check",
    "cache_dir",
    "progress_interval",
    "follow_symlinks",
    "skip_hidden",
    "output",
    "profile",
];

impl Config {
    /// Default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoConfigDir`] when the platform has no home directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs =
            ProjectDirs::from("com", "orgphoto", "orgphoto").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// with a warning when the sources are invalid.
    #[must_use]
    pub fn load(path: Option<&Path>, profile: Option<&str>) -> Self {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().ok(),
        };
        match path {
            Some(path) => Self::load_from_path(path, profile),
            None => Self::try_load_layers(None, profile).unwrap_or_default(),
        }
    }

    /// Load from a specific file, falling back to defaults on error.
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>, profile: Option<&str>) -> Self {
        match Self::try_load_layers(Some(path.as_ref()), profile) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Ignoring configuration from {}: {}",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Load every layer, failing on the first invalid source.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Extract`] when a source has the wrong shape.
    pub fn try_load_layers(path: Option<&Path>, profile: Option<&str>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            if path.exists() {
                warn_unknown_keys(path);
                figment = figment.merge(Toml::file(path));
            } else {
                log::debug!("No config file at {}", path.display());
            }
        }
        let mut config: Config = figment.extract().map_err(Box::new)?;

        if let Some(name) = profile {
            match config.profile.get(name).cloned() {
                Some(overrides) => config.apply_profile(&overrides),
                None => log::warn!(
                    "Profile '{}' not found; available: {}",
                    name,
                    config.profile.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            }
        }

        // Environment last so it beats the profile too.
        let config: Config = Figment::from(Serialized::defaults(config))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;
        Ok(config)
    }

    fn apply_profile(&mut self, p: &ProfileConfig) {
        if let Some(v) = &p.extensions {
            self.extensions = Some(v.clone());
        }
        if let Some(v) = p.date_policy {
            self.date_policy = v;
        }
        if let Some(v) = &p.duplicate_handling {
            self.duplicate_handling = v.clone();
        }
        if let Some(v) = &p.redirect_dir {
            self.redirect_dir = v.clone();
        }
        if let Some(v) = &p.duplicate_keyword {
            self.duplicate_keyword = v.clone();
        }
        if let Some(v) = p.comprehensive_check {
            self.comprehensive_check = v;
        }
        if let Some(v) = &p.cache_dir {
            self.cache_dir = Some(v.clone());
        }
        if let Some(v) = p.progress_interval {
            self.progress_interval = v;
        }
        if let Some(v) = p.follow_symlinks {
            self.follow_symlinks = v;
        }
        if let Some(v) = p.skip_hidden {
            self.skip_hidden = v;
        }
        if let Some(v) = p.output {
            self.output = v;
        }
    }

    /// Apply `organize` flags on top of the loaded layers.
    pub fn merge_organize_args(&mut self, args: &OrganizeArgs) {
        if let Some(v) = &args.extensions {
            self.extensions = Some(v.clone());
        }
        if let Some(v) = args.date_policy {
            self.date_policy = v;
        }
        if let Some(v) = &args.duplicate_handling {
            self.duplicate_handling = v.clone();
        }
        if let Some(v) = &args.redirect_dir {
            self.redirect_dir = v.clone();
        }
        if let Some(v) = &args.duplicate_keyword {
            self.duplicate_keyword = v.clone();
        }
        if args.no_comprehensive_check {
            self.comprehensive_check = false;
        }
        if let Some(v) = &args.cache_dir {
            self.cache_dir = Some(v.clone());
        }
        if args.follow_symlinks {
            self.follow_symlinks = true;
        }
        if args.skip_hidden {
            self.skip_hidden = true;
        }
        if let Some(v) = args.output {
            self.output = v;
        }
    }

    /// Apply `index` flags on top of the loaded layers.
    pub fn merge_index_args(&mut self, args: &IndexArgs) {
        if let Some(v) = &args.cache_dir {
            self.cache_dir = Some(v.clone());
        }
        if let Some(v) = args.output {
            self.output = v;
        }
    }

    /// Parse and validate the duplicate handling modes.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Modes`] for unknown or conflicting modes.
    pub fn duplicate_modes(&self) -> Result<DuplicateModes, ConfigError> {
        Ok(self.duplicate_handling.parse()?)
    }

    /// Validated duplicate keyword.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Keyword`] when empty or containing a separator.
    pub fn keyword(&self) -> Result<&str, ConfigError> {
        let kw = self.duplicate_keyword.as_str();
        if kw.is_empty() || kw.contains(['/', '\\']) {
            return Err(ConfigError::Keyword(kw.to_string()));
        }
        Ok(kw)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write to `path` (creating parent directories).
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] or [`ConfigError::Serialize`].
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Warn about top-level keys nobody reads, suggesting the closest known one.
fn warn_unknown_keys(path: &Path) {
    let Ok(text) = fs::read_to_string(path) else {
        return;
    };
    let Ok(table) = toml::from_str::<toml::Table>(&text) else {
        return;
    };
    for key in table.keys() {
        if KNOWN_KEYS.contains(&key.as_str()) {
            continue;
        }
        match suggest_key(key) {
            Some(known) => log::warn!(
                "Unknown config key '{}' in {} (did you mean '{}'?)",
                key,
                path.display(),
                known
            ),
            None => log::warn!("Unknown config key '{}' in {}", key, path.display()),
        }
    }
}

fn suggest_key(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .map(|k| (*k, strsim::jaro_winkler(key, k)))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(k, _)| k)
}
