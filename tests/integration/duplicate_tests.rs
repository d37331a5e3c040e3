//! Organize runs where incoming files collide with existing ones.

use super::common::{run, run_with, setup, write_dated, JAN_2021, JUN_2022};
use orgphoto::actions::TransferMode;
use orgphoto::cache::{ContentIndex, StoreLocation, CACHE_FILE_NAME};
use orgphoto::duplicates::{DuplicateModes, PromptChoice, ScriptedPrompter};
use orgphoto::organizer::OrganizeOptions;
use std::fs;

const OLDER: i64 = JAN_2021 - 3600;

fn with_modes(s: &super::common::Setup, modes: &str) -> OrganizeOptions {
    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.duplicate_modes = modes.parse::<DuplicateModes>().unwrap();
    options
}

#[test]
fn test_keyword_copy_is_demoted_by_clean_name() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("photo (1).jpg"), b"content A", OLDER);
    write_dated(&s.src.join("photo.jpg"), b"content A", JAN_2021);

    let (summary, sink) = run(OrganizeOptions::new(&s.src, &s.dst));

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.demoted, 1);
    assert_eq!(fs::read(day.join("photo.jpg")).unwrap(), b"content A");
    assert!(!day.join("photo (1).jpg").exists());
    assert!(day.join("photo (1)_duplicate.jpg").exists());
    assert!(sink.contains("MASTER PROMOTION"));
    assert!(sink.contains("DEMOTED: photo (1).jpg"));
}

#[test]
fn test_older_existing_wins_and_incoming_is_skipped() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("a.jpg"), b"existing", OLDER);
    write_dated(&s.src.join("a.jpg"), b"incoming", JAN_2021);

    let (summary, sink) = run(OrganizeOptions::new(&s.src, &s.dst));

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(fs::read(day.join("a.jpg")).unwrap(), b"existing");
    assert!(sink.contains("DUPLICATE CONFLICT: a.jpg"));
    assert!(sink.contains("MASTER RETAINED"));
    assert!(sink.contains("skipped - existing file is better master"));
}

#[test]
fn test_rename_mode_keeps_both() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("a.jpg"), b"existing", OLDER);
    write_dated(&day.join("a_duplicate.jpg"), b"older copy", OLDER);
    write_dated(&s.src.join("a.jpg"), b"incoming", JAN_2021);

    let (summary, sink) = run(with_modes(&s, "rename"));

    assert_eq!(summary.processed, 1);
    assert_eq!(fs::read(day.join("a.jpg")).unwrap(), b"existing");
    assert_eq!(
        fs::read(day.join("a_duplicate_001.jpg")).unwrap(),
        b"incoming"
    );
    assert!(sink.contains("[RENAMED - not master -> a_duplicate_001.jpg]"));
}

#[test]
fn test_older_incoming_promoted_in_place() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("a.jpg"), b"newer existing", JUN_2022);
    write_dated(&s.src.join("a.jpg"), b"incoming", JAN_2021);

    let (summary, _) = run(OrganizeOptions::new(&s.src, &s.dst));

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.demoted, 1);
    assert_eq!(fs::read(day.join("a.jpg")).unwrap(), b"incoming");
    assert_eq!(
        fs::read(day.join("a_duplicate.jpg")).unwrap(),
        b"newer existing"
    );
}

#[test]
fn test_promotion_redirects_every_loser() {
    let s = setup();
    let day = s.day(JAN_2021);
    let other = s.day(JUN_2022);
    write_dated(&day.join("a.jpg"), b"different bytes", JUN_2022);
    write_dated(&other.join("a copy.jpg"), b"incoming", JUN_2022);
    write_dated(&s.src.join("a.jpg"), b"incoming", JAN_2021);

    let (summary, sink) = run(with_modes(&s, "redirect"));

    assert_eq!(summary.demoted, 2);
    let redirect = s.dst.join("Duplicates");
    assert_eq!(fs::read(day.join("a.jpg")).unwrap(), b"incoming");
    assert_eq!(fs::read(redirect.join("a.jpg")).unwrap(), b"different bytes");
    assert_eq!(fs::read(redirect.join("a copy.jpg")).unwrap(), b"incoming");
    assert!(!other.join("a copy.jpg").exists());
    assert!(sink.contains("reason: filename AND content match"));
}

#[test]
fn test_dry_run_redirect_touches_nothing() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("a.jpg"), b"existing", OLDER);
    write_dated(&s.src.join("a.jpg"), b"incoming", JAN_2021);

    let mut options = with_modes(&s, "redirect");
    options.mode = TransferMode::Move;
    options.dry_run = true;
    let (summary, sink) = run(options);

    assert_eq!(summary.processed, 1);
    assert!(s.src.join("a.jpg").exists());
    assert!(!s.dst.join("Duplicates").exists());
    assert_eq!(fs::read(day.join("a.jpg")).unwrap(), b"existing");
    assert!(sink.contains("[REDIRECTED - not master ->"));
    assert!(sink.contains("[DRY RUN]"));
    // no store existed before, so the dry run indexes in memory only
    assert!(!s.dst.join(CACHE_FILE_NAME).exists());
    assert_eq!(summary.store, Some(StoreLocation::InMemory));
}

#[test]
fn test_dry_run_reuses_existing_store() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("a.jpg"), b"existing", OLDER);
    write_dated(&s.src.join("b.jpg"), b"incoming", JAN_2021);
    let mut index = ContentIndex::open(&s.dst, None);
    index.build();
    index.close().unwrap();

    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.dry_run = true;
    let (summary, _) = run(options);

    assert!(matches!(summary.store, Some(StoreLocation::Persistent(_))));
    assert_eq!(summary.build.map(|b| b.reused), Some(1));
    assert!(!day.join("b.jpg").exists());
}

#[test]
fn test_source_inside_library_is_not_treated_as_existing() {
    let s = setup();
    let inbox = s.dst.join("inbox");
    write_dated(&inbox.join("a.jpg"), b"same bytes", JAN_2021);
    write_dated(&inbox.join("b.jpg"), b"same bytes", JAN_2021 + 5);

    let mut options = with_modes(&s, "rename");
    options.source = inbox.clone();
    options.mode = TransferMode::Move;
    let (summary, sink) = run(options);

    let day = s.day(JAN_2021);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.demoted, 0);
    assert!(!sink.contains("DEMOTED"));
    assert_eq!(fs::read(day.join("a.jpg")).unwrap(), b"same bytes");
    assert_eq!(fs::read(day.join("b_duplicate.jpg")).unwrap(), b"same bytes");
    assert_eq!(fs::read_dir(&inbox).unwrap().count(), 0);

    // one record per file that is really there
    let index = ContentIndex::open(&s.dst.canonicalize().unwrap(), None);
    assert_eq!(index.len(), 2);
    assert!(index.record(&inbox.canonicalize().unwrap().join("b.jpg")).is_none());
}

#[test]
fn test_redirect_into_custom_absolute_dir() {
    let s = setup();
    let day = s.day(JAN_2021);
    let review = s.tmp.path().join("review");
    write_dated(&day.join("a.jpg"), b"existing", OLDER);
    write_dated(&review.join("a.jpg"), b"already redirected", OLDER);
    write_dated(&s.src.join("a.jpg"), b"incoming", JAN_2021);

    let mut options = with_modes(&s, "redirect");
    options.redirect_dir = review.clone();
    let (summary, _) = run(options);

    assert_eq!(summary.processed, 1);
    assert_eq!(fs::read(review.join("a.jpg")).unwrap(), b"already redirected");
    assert_eq!(fs::read(review.join("a_duplicate.jpg")).unwrap(), b"incoming");
}

#[test]
fn test_content_mode_skips_identical_bytes_anywhere() {
    let s = setup();
    let elsewhere = s.day(JUN_2022);
    write_dated(&elsewhere.join("b.jpg"), b"same bytes", OLDER);
    write_dated(&s.src.join("a.jpg"), b"same bytes", JAN_2021);

    let (summary, sink) = run(with_modes(&s, "content"));

    assert_eq!(summary.skipped, 1);
    assert!(!s.day(JAN_2021).join("a.jpg").exists());
    assert!(sink.contains("reason: identical content"));
    assert!(sink.contains("skipped - identical content to master"));
}

#[test]
fn test_content_mode_renames_name_only_conflicts() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("a.jpg"), b"existing", OLDER);
    write_dated(&s.src.join("a.jpg"), b"incoming", JAN_2021);

    let (summary, _) = run(with_modes(&s, "content"));

    assert_eq!(summary.processed, 1);
    assert_eq!(fs::read(day.join("a_duplicate.jpg")).unwrap(), b"incoming");
}

#[test]
fn test_combined_redirect_and_content() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("same.jpg"), b"same", OLDER);
    write_dated(&day.join("diff.jpg"), b"old", OLDER);
    write_dated(&s.src.join("same.jpg"), b"same", JAN_2021);
    write_dated(&s.src.join("diff.jpg"), b"new", JAN_2021);

    let (summary, _) = run(with_modes(&s, "redirect,content"));

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(
        fs::read(s.dst.join("Duplicates").join("diff.jpg")).unwrap(),
        b"new"
    );
    assert!(!s.dst.join("Duplicates").join("same.jpg").exists());
}

#[test]
fn test_overwrite_never_replaces_the_master() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("a.jpg"), b"existing", OLDER);
    write_dated(&s.src.join("a.jpg"), b"incoming", JAN_2021);

    let (summary, sink) = run(with_modes(&s, "overwrite"));

    assert_eq!(summary.processed, 1);
    assert_eq!(fs::read(day.join("a.jpg")).unwrap(), b"existing");
    assert_eq!(fs::read(day.join("a_duplicate.jpg")).unwrap(), b"incoming");
    assert!(sink.contains("Overwrite blocked - master file protected"));
}

#[test]
fn test_interactive_uses_prompter_answers() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("a.jpg"), b"existing a", OLDER);
    write_dated(&day.join("b.jpg"), b"existing b", OLDER);
    write_dated(&s.src.join("a.jpg"), b"incoming a", JAN_2021);
    write_dated(&s.src.join("b.jpg"), b"incoming b", JAN_2021);

    let mut prompter = ScriptedPrompter::new([PromptChoice::Rename, PromptChoice::Skip]);
    let (summary, sink) = run_with(with_modes(&s, "interactive"), &mut prompter);

    assert_eq!(prompter.asked(), 2);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(fs::read(day.join("a_duplicate.jpg")).unwrap(), b"incoming a");
    assert!(!day.join("b_duplicate.jpg").exists());
    assert!(sink.contains("skipped - user choice"));
}

#[test]
fn test_without_comprehensive_check_only_names_conflict() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("b.jpg"), b"same bytes", OLDER);
    write_dated(&s.src.join("a.jpg"), b"same bytes", JAN_2021);

    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.comprehensive_check = false;
    let (summary, _) = run(options);

    assert_eq!(summary.processed, 1);
    assert!(day.join("a.jpg").exists());
    assert!(summary.index.is_none());
    assert!(!s.dst.join(CACHE_FILE_NAME).exists());
}

#[test]
fn test_same_name_twice_in_one_run() {
    let s = setup();
    write_dated(&s.src.join("x/a.jpg"), b"first", JAN_2021);
    write_dated(&s.src.join("y/a.jpg"), b"second", JAN_2021 + 5);

    let (summary, _) = run(with_modes(&s, "rename"));

    let day = s.day(JAN_2021);
    assert_eq!(summary.processed, 2);
    assert_eq!(fs::read(day.join("a.jpg")).unwrap(), b"first");
    assert_eq!(fs::read(day.join("a_duplicate.jpg")).unwrap(), b"second");
}

#[test]
fn test_index_tracks_placements_and_demotions() {
    let s = setup();
    let day = s.day(JAN_2021);
    write_dated(&day.join("a.jpg"), b"newer existing", JUN_2022);
    write_dated(&s.src.join("a.jpg"), b"incoming", JAN_2021);

    run(OrganizeOptions::new(&s.src, &s.dst));

    let index = ContentIndex::open(&s.dst.canonicalize().unwrap(), None);
    let canonical_day = day.canonicalize().unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.record(&canonical_day.join("a.jpg")).is_some());
    assert!(index.record(&canonical_day.join("a_duplicate.jpg")).is_some());
}
