//! Fixtures shared by the integration tests.

use filetime::{set_file_mtime, FileTime};
use orgphoto::duplicates::{Prompter, ScriptedPrompter};
use orgphoto::logging::MemorySink;
use orgphoto::organizer::date::{folder_name, local_naive};
use orgphoto::organizer::{NoEmbeddedDates, OrganizeOptions, Organizer, RunSummary};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::{tempdir, TempDir};

pub const JAN_2021: i64 = 1_610_000_000;
pub const JUN_2022: i64 = 1_655_000_000;

/// Write `content` to `path` (creating parents) with the given mtime.
pub fn write_dated(path: &Path, content: &[u8], secs: i64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

/// Date folder name for a file modified at `secs`.
pub fn folder_for(secs: i64) -> String {
    let time = SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64);
    folder_name(local_naive(time))
}

pub struct Setup {
    pub tmp: TempDir,
    pub src: PathBuf,
    pub dst: PathBuf,
}

impl Setup {
    /// Date folder for `secs` under the destination.
    pub fn day(&self, secs: i64) -> PathBuf {
        self.dst.join(folder_for(secs))
    }
}

pub fn setup() -> Setup {
    let tmp = tempdir().unwrap();
    let src = tmp.path().join("camera");
    let dst = tmp.path().join("library");
    fs::create_dir_all(&src).unwrap();
    Setup { tmp, src, dst }
}

pub fn run(options: OrganizeOptions) -> (RunSummary, MemorySink) {
    run_with(options, &mut ScriptedPrompter::default())
}

pub fn run_with(options: OrganizeOptions, prompter: &mut dyn Prompter) -> (RunSummary, MemorySink) {
    let mut sink = MemorySink::new();
    let summary = Organizer::new(options, &NoEmbeddedDates, prompter, &mut sink)
        .run()
        .unwrap();
    (summary, sink)
}
