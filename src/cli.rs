//! Command-line interface definitions for orgphoto.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, error format, config file) come first, then a
//! subcommand.
//!
//! # Example
//!
//! ```bash
//! # Copy every file from a camera card into dated folders
//! orgphoto organize -c /media/card ~/Pictures
//!
//! # Preview a move of JPEG/PNG files, redirecting losers to a review folder
//! orgphoto organize -m -d -j jpg,png -D redirect ~/Downloads ~/Pictures
//!
//! # Refresh the duplicate index of an archive and print its report
//! orgphoto index ~/Pictures
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::organizer::date::DatePolicy;

const ORGANIZE_EXAMPLES: &str = "\
Examples:
  Copy all files, keeping the better of two same-named files in place:
    orgphoto organize -c /media/card ~/Pictures

  Move only JPEG and PNG files, simulating first:
    orgphoto organize -m -d -j jpg,png ~/Downloads ~/Pictures

  Only organize files that have no embedded date:
    orgphoto organize -c -x only-missing ~/Scans ~/Pictures

  Send duplicates to a review folder and drop identical content:
    orgphoto organize -c -D redirect,content -R Review ~/Phone ~/Pictures

  Filename-only duplicate detection with an external cache:
    orgphoto organize -c -N ~/Phone ~/Pictures
    orgphoto organize -c -C ~/.cache/orgphoto ~/Phone ~/Pictures

Notes:
  Without -m or -c you are asked whether to run a simulated move.
  Every run appends to events.log in the destination directory.";

/// Organize files into date folders with content-aware duplicate handling.
///
/// Files are placed under DEST/YYYY_MM_DD/ by creation date. When a file
/// with the same name or identical content already exists, the better
/// "master" keeps the canonical name and the other copy is skipped,
/// renamed or redirected.
#[derive(Debug, Parser)]
#[command(name = "orgphoto")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: config.toml in the platform config directory)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Named profile from the configuration file
    #[arg(long, value_name = "NAME", global = true)]
    pub profile: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for orgphoto.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Organize SOURCE into date folders under DEST
    #[command(after_long_help = ORGANIZE_EXAMPLES)]
    Organize(OrganizeArgs),
    /// Build or refresh the duplicate index of a directory
    Index(IndexArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

/// Arguments for the organize subcommand.
#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Directory to scan recursively
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Directory receiving the YYYY_MM_DD folders (created if missing)
    #[arg(value_name = "DEST")]
    pub destination: PathBuf,

    /// Move files (removes the originals)
    #[arg(short = 'm', long = "move", conflicts_with = "copy")]
    pub move_files: bool,

    /// Copy files (keeps the originals)
    #[arg(short = 'c', long)]
    pub copy: bool,

    /// Simulate: decide and log everything, change nothing
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Comma-separated extensions to process, e.g. "jpg,png" (default: all files)
    #[arg(short = 'j', long, value_name = "LIST")]
    pub extensions: Option<String>,

    /// Files without an embedded date: skip-missing, fallback or only-missing
    #[arg(short = 'x', long, value_enum, value_name = "POLICY")]
    pub date_policy: Option<DatePolicy>,

    /// Duplicate handling: comma-separated skip, overwrite, rename, content, interactive, redirect
    #[arg(short = 'D', long, value_name = "MODES")]
    pub duplicate_handling: Option<String>,

    /// Redirect directory, absolute or relative to DEST (default: Duplicates)
    #[arg(short = 'R', long, value_name = "DIR")]
    pub redirect_dir: Option<PathBuf>,

    /// Keyword inserted into renamed duplicates (default: duplicate)
    #[arg(short = 'K', long, value_name = "KEYWORD")]
    pub duplicate_keyword: Option<String>,

    /// Detect duplicates by file name only; no index is built or stored
    #[arg(short = 'N', long)]
    pub no_comprehensive_check: bool,

    /// Keep the index store in this directory instead of DEST
    #[arg(short = 'C', long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Print index build statistics
    #[arg(short = 'B', long)]
    pub benchmark: bool,

    /// Follow symbolic links in SOURCE
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories in SOURCE
    #[arg(long)]
    pub skip_hidden: bool,

    /// Summary format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

/// Arguments for the index subcommand.
#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Directory to index
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Keep the index store in this directory instead of TARGET
    #[arg(short = 'C', long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Drop every record before building
    #[arg(long)]
    pub clear: bool,

    /// Report format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

/// Arguments for the config subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config file
    #[arg(long)]
    pub save: bool,

    /// Only print the config file location
    #[arg(long, conflicts_with = "save")]
    pub path: bool,
}

/// Output format for summaries and reports.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
