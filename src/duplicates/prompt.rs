//! Interactive duplicate prompts.
//!
//! The resolver asks a [`Prompter`] when the interactive mode is active and
//! an existing file keeps the master slot. [`ConsolePrompter`] talks to a
//! terminal (or any reader/writer pair); [`ScriptedPrompter`] replays a fixed
//! list of answers.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// What the user chose for one duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    /// Leave the file out.
    Skip,
    /// Overwrite intent; the master is still protected, so this renames.
    Overwrite,
    /// Place under a keyword-suffixed name next to the master.
    Rename,
    /// Place in the redirect directory.
    Redirect,
}

impl PromptChoice {
    /// Parse one answer line.
    ///
    /// `R` (uppercase) means redirect; `r` means rename.
    #[must_use]
    pub fn parse(answer: &str) -> Option<Self> {
        let answer = answer.trim();
        if answer == "R" {
            return Some(Self::Redirect);
        }
        match answer.to_lowercase().as_str() {
            "s" | "skip" => Some(Self::Skip),
            "o" | "overwrite" => Some(Self::Overwrite),
            "r" | "rename" => Some(Self::Rename),
            "redirect" => Some(Self::Redirect),
            _ => None,
        }
    }
}

/// Context shown to the user.
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    /// Incoming file.
    pub source: &'a Path,
    /// Where it would go.
    pub destination: &'a Path,
    /// A file already exists at `destination`.
    pub filename_conflict: bool,
    /// Files under the target with identical content.
    pub content_matches: &'a [PathBuf],
}

/// Synchronous source of duplicate decisions.
pub trait Prompter {
    /// Block until a choice is made for this duplicate.
    fn choose(&mut self, request: &PromptRequest<'_>) -> PromptChoice;
}

/// Prompter reading answers line by line.
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompter<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on the process's stdin/stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    /// Prompt using the given reader and writer.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn describe(&mut self, request: &PromptRequest<'_>) -> io::Result<()> {
        let name = request
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writeln!(self.output, "\nDuplicate detected for: {}", name)?;
        writeln!(self.output, "Target location: {}", request.destination.display())?;
        if !request.content_matches.is_empty() {
            writeln!(self.output, "Content duplicates found at:")?;
            for path in request.content_matches {
                writeln!(self.output, "  - {}", path.display())?;
            }
        }
        if request.filename_conflict {
            writeln!(
                self.output,
                "Filename conflict at: {}",
                request.destination.display()
            )?;
        }
        Ok(())
    }

    fn menu(&mut self) -> io::Result<()> {
        writeln!(self.output, "\nChoose action:")?;
        writeln!(self.output, "  s) Skip this file")?;
        writeln!(self.output, "  o) Overwrite existing file(s)")?;
        writeln!(self.output, "  r) Rename with suffix")?;
        writeln!(self.output, "  R) Redirect to duplicates directory")?;
        write!(self.output, "Your choice [s/o/r/R]: ")?;
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn choose(&mut self, request: &PromptRequest<'_>) -> PromptChoice {
        if let Err(e) = self.describe(request) {
            log::debug!("Prompt output failed: {}", e);
        }
        loop {
            if let Err(e) = self.menu() {
                log::debug!("Prompt output failed: {}", e);
            }
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) => {
                    log::warn!("No answer on input; skipping {}", request.source.display());
                    return PromptChoice::Skip;
                }
                Ok(_) => {
                    if let Some(choice) = PromptChoice::parse(&line) {
                        return choice;
                    }
                    let _ = writeln!(self.output, "Invalid choice. Please enter s, o, r, or R.");
                }
                Err(e) => {
                    log::warn!("Failed to read answer ({}); skipping", e);
                    return PromptChoice::Skip;
                }
            }
        }
    }
}

/// Prompter replaying queued answers; answers [`PromptChoice::Skip`] once empty.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<PromptChoice>,
    asked: usize,
}

impl ScriptedPrompter {
    /// Queue the given answers.
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = PromptChoice>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: 0,
        }
    }

    /// How many times a choice was requested.
    #[must_use]
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn choose(&mut self, _request: &PromptRequest<'_>) -> PromptChoice {
        self.asked += 1;
        self.answers.pop_front().unwrap_or(PromptChoice::Skip)
    }
}

/// Ask a yes/no question where an empty answer or end of input means yes.
///
/// # Errors
///
/// Returns an error if writing the question or reading the answer fails.
pub fn confirm_default_yes<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<bool> {
    write!(output, "{} [Y/n]: ", question)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(true);
    }
    Ok(matches!(
        line.trim().to_lowercase().as_str(),
        "" | "y" | "yes"
    ))
}
