//! Master selection among files competing for one destination name.
//!
//! Every candidate gets a [`MasterScore`]; lower is better. The score orders
//! by, in turn:
//!
//! 1. no duplicate keyword in the name
//! 2. shorter file name (in characters, extension included)
//! 3. older creation date
//!
//! Ties keep insertion order, and the incoming file is always inserted
//! first, so an exact tie goes to the incoming file.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use super::keywords::has_duplicate_keyword;
use crate::organizer::date::{mtime_date, timestamp, DateResolver};

/// Sort key for master selection. Lower is better.
#[derive(Debug, Clone, Copy)]
pub struct MasterScore {
    /// Name carries a duplicate marker.
    pub has_duplicate_keyword: bool,
    /// Characters in the full file name.
    pub name_length: usize,
    /// Creation date as seconds since the epoch.
    pub timestamp: f64,
}

impl MasterScore {
    /// Score the file at `path` created at `date`.
    #[must_use]
    pub fn new(path: &Path, date: NaiveDateTime) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            has_duplicate_keyword: has_duplicate_keyword(&name),
            name_length: name.chars().count(),
            timestamp: timestamp(date),
        }
    }
}

impl PartialEq for MasterScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MasterScore {}

impl PartialOrd for MasterScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MasterScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.has_duplicate_keyword
            .cmp(&other.has_duplicate_keyword)
            .then(self.name_length.cmp(&other.name_length))
            .then(self.timestamp.total_cmp(&other.timestamp))
    }
}

/// Whether a candidate is the file being placed or one already in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    /// The source file being placed.
    Incoming,
    /// A file already under the target tree.
    Existing,
}

/// One file taking part in master selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// File path.
    pub path: PathBuf,
    /// Date used for scoring.
    pub date: NaiveDateTime,
    /// Computed score.
    pub score: MasterScore,
    /// Incoming or existing.
    pub origin: CandidateOrigin,
}

impl Candidate {
    /// Build a scored candidate.
    #[must_use]
    pub fn new(path: PathBuf, date: NaiveDateTime, origin: CandidateOrigin) -> Self {
        let score = MasterScore::new(&path, date);
        Self {
            path,
            date,
            score,
            origin,
        }
    }
}

/// Result of [`select_master`].
#[derive(Debug, Clone)]
pub struct MasterSelection {
    /// The best candidate.
    pub master: Candidate,
    /// Every other candidate, best first.
    pub non_masters: Vec<Candidate>,
}

impl MasterSelection {
    /// Whether the incoming file won.
    #[must_use]
    pub fn incoming_is_master(&self) -> bool {
        self.master.origin == CandidateOrigin::Incoming
    }
}

/// Choose the master among the incoming file and the existing conflicts.
///
/// Dates of existing files come from `dates`, then their modification time,
/// then the current time.
#[must_use]
pub fn select_master(
    incoming: &Path,
    incoming_date: NaiveDateTime,
    existing: &[PathBuf],
    dates: &dyn DateResolver,
) -> MasterSelection {
    let mut candidates = Vec::with_capacity(existing.len() + 1);
    candidates.push(Candidate::new(
        incoming.to_path_buf(),
        incoming_date,
        CandidateOrigin::Incoming,
    ));
    for path in existing {
        let date = existing_date(path, dates);
        candidates.push(Candidate::new(path.clone(), date, CandidateOrigin::Existing));
    }

    // stable: ties keep insertion order
    candidates.sort_by(|a, b| a.score.cmp(&b.score));

    let master = candidates.remove(0);
    log::debug!(
        "Master selection: {} ({:?}) keyword={} length={} date={}",
        master.path.display(),
        master.origin,
        master.score.has_duplicate_keyword,
        master.score.name_length,
        master.date.format("%Y-%m-%d %H:%M:%S")
    );
    MasterSelection {
        master,
        non_masters: candidates,
    }
}

fn existing_date(path: &Path, dates: &dyn DateResolver) -> NaiveDateTime {
    if let Some(date) = dates.embedded_date(path) {
        return date;
    }
    match mtime_date(path) {
        Ok(date) => date,
        Err(e) => {
            log::warn!("Failed to get date for existing file {}: {}", path.display(), e);
            Local::now().naive_local()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizer::date::NoEmbeddedDates;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn date(y: i32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn fixed_dates(map: HashMap<PathBuf, NaiveDateTime>) -> impl Fn(&Path) -> Option<NaiveDateTime> {
        move |p: &Path| map.get(p).copied()
    }

    #[test]
    fn test_score_ordering() {
        let plain = MasterScore::new(Path::new("photo.jpg"), date(2020));
        let keyword = MasterScore::new(Path::new("p (1).jpg"), date(2000));
        let longer = MasterScore::new(Path::new("photo_x.jpg"), date(2000));
        let newer = MasterScore::new(Path::new("image.jpg"), date(2021));

        assert!(plain < keyword);
        assert!(plain < longer);
        assert!(plain < newer);
    }

    #[test]
    fn test_incoming_wins_ties() {
        let dates = fixed_dates(HashMap::from([(PathBuf::from("/t/a.jpg"), date(2020))]));
        let sel = select_master(
            Path::new("/s/a.jpg"),
            date(2020),
            &[PathBuf::from("/t/a.jpg")],
            &dates,
        );
        assert!(sel.incoming_is_master());
        assert_eq!(sel.non_masters.len(), 1);
    }

    #[test]
    fn test_older_existing_wins() {
        let dates = fixed_dates(HashMap::from([(PathBuf::from("/t/a.jpg"), date(2010))]));
        let sel = select_master(
            Path::new("/s/a.jpg"),
            date(2020),
            &[PathBuf::from("/t/a.jpg")],
            &dates,
        );
        assert!(!sel.incoming_is_master());
        assert_eq!(sel.master.path, PathBuf::from("/t/a.jpg"));
        assert_eq!(sel.non_masters[0].origin, CandidateOrigin::Incoming);
    }

    #[test]
    fn test_keyword_existing_loses() {
        let dates = fixed_dates(HashMap::from([(
            PathBuf::from("/t/photo (1).jpg"),
            date(1990),
        )]));
        let sel = select_master(
            Path::new("/s/photo.jpg"),
            date(2020),
            &[PathBuf::from("/t/photo (1).jpg")],
            &dates,
        );
        assert!(sel.incoming_is_master());
    }

    #[test]
    fn test_missing_existing_file_uses_now() {
        let sel = select_master(
            Path::new("/s/a.jpg"),
            date(2020),
            &[PathBuf::from("/definitely/missing/a.jpg")],
            &NoEmbeddedDates,
        );
        // "now" is newer than 2020, so the incoming file wins.
        assert!(sel.incoming_is_master());
    }
}
