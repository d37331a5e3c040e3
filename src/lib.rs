//! orgphoto - Date-folder photo organizer
//!
//! Copies or moves files from a source tree into `DEST/YYYY_MM_DD/` folders,
//! detecting duplicates by name and by BLAKE3 content hash, keeping the best
//! "master" copy under the canonical name and skipping, renaming or
//! redirecting the rest.

pub mod actions;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod organizer;
pub mod output;
pub mod progress;
pub mod scanner;

use std::io::{self, Write};

use anyhow::Context;

use crate::actions::TransferMode;
use crate::cache::ContentIndex;
use crate::cli::{Cli, Commands, ConfigArgs, IndexArgs, OrganizeArgs, OutputFormat};
use crate::config::Config;
use crate::duplicates::{confirm_default_yes, ConsolePrompter};
use crate::error::ExitCode;
use crate::logging::{init_logging, EventLog, EVENT_LOG_NAME};
use crate::organizer::{NoEmbeddedDates, OrganizeOptions, Organizer};
use crate::output::{JsonIndexReport, JsonRunOutput};
use crate::progress::Progress;

const DRY_RUN_QUESTION: &str = "Would you like to run in dryrun mode simulating moving files?";

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for invalid input or when the run cannot start.
/// Per-file failures are reported through [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let mut config = Config::load(cli.config_file.as_deref(), cli.profile.as_deref());

    match cli.command {
        Commands::Organize(ref args) => {
            config.merge_organize_args(args);
            run_organize(&cli, args, &config)
        }
        Commands::Index(ref args) => {
            config.merge_index_args(args);
            run_index(&cli, args, &config)
        }
        Commands::Config(ref args) => run_config(&cli, args, &config),
    }
}

/// Pick copy or move, asking for a simulated move when neither was given.
fn select_mode(args: &OrganizeArgs) -> anyhow::Result<Option<(TransferMode, bool)>> {
    if args.move_files {
        return Ok(Some((TransferMode::Move, args.dry_run)));
    }
    if args.copy {
        return Ok(Some((TransferMode::Copy, args.dry_run)));
    }
    let confirmed = {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stderr();
        confirm_default_yes(&mut input, &mut output, DRY_RUN_QUESTION)
            .context("Failed to read answer")?
    };
    Ok(confirmed.then_some((TransferMode::Move, true)))
}

fn run_organize(cli: &Cli, args: &OrganizeArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let modes = config.duplicate_modes()?;
    let keyword = config.keyword()?.to_string();

    let Some((mode, dry_run)) = select_mode(args)? else {
        eprintln!("No action selected. Exiting.");
        return Ok(ExitCode::GeneralError);
    };

    let options = OrganizeOptions {
        source: args.source.clone(),
        destination: args.destination.clone(),
        mode,
        dry_run,
        extensions: config.extensions.clone(),
        date_policy: config.date_policy,
        duplicate_modes: modes,
        redirect_dir: config.redirect_dir.clone(),
        duplicate_keyword: keyword,
        comprehensive_check: config.comprehensive_check,
        cache_dir: config.cache_dir.clone(),
        progress_interval: config.progress_interval,
        follow_symlinks: config.follow_symlinks,
        skip_hidden: config.skip_hidden,
    };
    options.validate()?;

    let mut event_log = EventLog::create(&options.destination, cli.verbose > 0).with_context(|| {
        format!(
            "Failed to open {} in {}",
            EVENT_LOG_NAME,
            options.destination.display()
        )
    })?;
    let progress = Progress::new(cli.quiet || config.output == OutputFormat::Json);
    let mut prompter = ConsolePrompter::stdio();

    let summary = Organizer::new(options, &NoEmbeddedDates, &mut prompter, &mut event_log)
        .with_progress(&progress)
        .run()?;
    event_log.finish();

    let mut stdout = io::stdout().lock();
    match config.output {
        OutputFormat::Json => JsonRunOutput::new(&summary).write_to(&mut stdout)?,
        OutputFormat::Text => {
            if !cli.quiet {
                output::write_run_summary(&mut stdout, &summary)?;
            }
            if args.benchmark {
                match &summary.build {
                    Some(build) => {
                        output::write_benchmark(&mut stdout, build, summary.index.as_ref())?;
                    }
                    None => writeln!(
                        stdout,
                        "Hash Cache Benchmark: comprehensive check disabled, nothing to report"
                    )?,
                }
            }
        }
    }
    Ok(summary.exit_code())
}

fn run_index(cli: &Cli, args: &IndexArgs, config: &Config) -> anyhow::Result<ExitCode> {
    if !args.target.is_dir() {
        return Err(organizer::OrganizeError::SourceNotDirectory(args.target.clone()).into());
    }
    let mut index = ContentIndex::open(&args.target, config.cache_dir.as_deref());
    index.exclude_file(args.target.join(EVENT_LOG_NAME));
    if args.clear {
        log::info!("Clearing hash cache for {}", args.target.display());
        index.clear();
    }
    let progress = Progress::new(cli.quiet || config.output == OutputFormat::Json);
    let build = index.build_with_progress(Some(&progress));
    let stats = index.stats();
    let store = index.location().clone();
    if let Err(e) = index.close() {
        log::warn!("Failed to close hash cache: {}", e);
    }

    let mut stdout = io::stdout().lock();
    match config.output {
        OutputFormat::Json => {
            JsonIndexReport::new(&args.target, store, build, stats).write_to(&mut stdout)?;
        }
        OutputFormat::Text => {
            output::write_index_report(&mut stdout, &args.target, &store, &build, &stats)?;
        }
    }
    Ok(ExitCode::Success)
}

fn run_config(cli: &Cli, args: &ConfigArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let path = match &cli.config_file {
        Some(p) => p.clone(),
        None => Config::default_path()?,
    };
    if args.path {
        println!("{}", path.display());
    } else if args.save {
        config.save_to(&path)?;
        println!("Configuration written to {}", path.display());
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(ExitCode::Success)
}
