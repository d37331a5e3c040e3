//! End-to-end organize runs without duplicates in play.

use super::common::{folder_for, run, setup, write_dated, JAN_2021, JUN_2022};
use filetime::FileTime;
use orgphoto::actions::TransferMode;
use orgphoto::cache::CACHE_FILE_NAME;
use orgphoto::duplicates::ScriptedPrompter;
use orgphoto::error::ExitCode;
use orgphoto::logging::MemorySink;
use orgphoto::organizer::{DatePolicy, OrganizeOptions, Organizer};
use std::fs;
use std::path::Path;

#[test]
fn test_copy_into_date_folders() {
    let s = setup();
    write_dated(&s.src.join("a.jpg"), b"alpha", JAN_2021);
    write_dated(&s.src.join("nested/deeper/b.png"), b"beta", JUN_2022);

    let (summary, _) = run(OrganizeOptions::new(&s.src, &s.dst));

    assert_eq!(summary.seen, 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.exit_code(), ExitCode::Success);

    let a = s.dst.join(folder_for(JAN_2021)).join("a.jpg");
    let b = s.dst.join(folder_for(JUN_2022)).join("b.png");
    assert_eq!(fs::read(&a).unwrap(), b"alpha");
    assert_eq!(fs::read(&b).unwrap(), b"beta");
    // copies keep the source and its timestamps
    assert!(s.src.join("a.jpg").exists());
    let meta = fs::metadata(&a).unwrap();
    assert_eq!(
        FileTime::from_last_modification_time(&meta).unix_seconds(),
        JAN_2021
    );
}

#[test]
fn test_move_removes_sources() {
    let s = setup();
    write_dated(&s.src.join("a.jpg"), b"alpha", JAN_2021);

    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.mode = TransferMode::Move;
    let (summary, sink) = run(options);

    assert_eq!(summary.processed, 1);
    assert!(!s.src.join("a.jpg").exists());
    assert!(s.dst.join(folder_for(JAN_2021)).join("a.jpg").exists());
    assert!(sink.contains("moved"));
}

#[test]
fn test_dry_run_changes_nothing() {
    let s = setup();
    write_dated(&s.src.join("a.jpg"), b"alpha", JAN_2021);

    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.mode = TransferMode::Move;
    options.dry_run = true;
    let (summary, sink) = run(options);

    assert_eq!(summary.processed, 1);
    assert!(summary.dry_run);
    assert!(s.src.join("a.jpg").exists());
    // the root exists for the log, the date folder and the store do not
    assert!(s.dst.is_dir());
    assert!(!s.dst.join(CACHE_FILE_NAME).exists());
    assert!(!s.dst.join(folder_for(JAN_2021)).exists());
    assert!(sink.contains("[DRY RUN]"));
    assert!(sink.contains("created new destination subdir"));
}

#[test]
fn test_extension_filter_is_case_insensitive() {
    let s = setup();
    write_dated(&s.src.join("a.JPG"), b"a", JAN_2021);
    write_dated(&s.src.join("b.jpeg"), b"b", JAN_2021);
    write_dated(&s.src.join("c.txt"), b"c", JAN_2021);

    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.extensions = Some("jpg, .TXT".to_string());
    let (summary, _) = run(options);

    assert_eq!(summary.seen, 2);
    let day = s.dst.join(folder_for(JAN_2021));
    assert!(day.join("a.JPG").exists());
    assert!(day.join("c.txt").exists());
    assert!(!day.join("b.jpeg").exists());
}

#[test]
fn test_date_policies_without_embedded_dates() {
    let s = setup();
    write_dated(&s.src.join("a.jpg"), b"a", JAN_2021);

    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.date_policy = DatePolicy::OnlyMissing;
    let (summary, sink) = run(options.clone());
    assert_eq!(summary.processed, 1);
    assert!(sink.contains(" no date "));

    let s = setup();
    write_dated(&s.src.join("a.jpg"), b"a", JAN_2021);
    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.date_policy = DatePolicy::SkipMissing;
    let (summary, sink) = run(options);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped, 1);
    assert!(sink.contains("skipped"));
}

#[test]
fn test_embedded_dates_take_precedence() {
    let s = setup();
    write_dated(&s.src.join("a.jpg"), b"a", JAN_2021);
    write_dated(&s.src.join("b.jpg"), b"b", JAN_2021);

    let embedded = chrono::NaiveDate::from_ymd_opt(2019, 7, 4)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let dates = move |p: &Path| {
        (p.file_name().and_then(|n| n.to_str()) == Some("a.jpg")).then_some(embedded)
    };

    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.date_policy = DatePolicy::SkipMissing;
    let mut prompter = ScriptedPrompter::default();
    let mut sink = MemorySink::new();
    let summary = Organizer::new(options, &dates, &mut prompter, &mut sink)
        .run()
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert!(s.dst.join("2019_07_04").join("a.jpg").exists());
    assert!(sink.contains("2019-07-04 12:00:00"));
}

#[test]
fn test_index_persisted_and_reused() {
    let s = setup();
    write_dated(&s.src.join("a.jpg"), b"alpha", JAN_2021);

    let (first, _) = run(OrganizeOptions::new(&s.src, &s.dst));
    assert!(s.dst.join(CACHE_FILE_NAME).exists());
    assert_eq!(first.index.unwrap().total_files, 1);

    let more = s.src.parent().unwrap().join("phone");
    write_dated(&more.join("b.jpg"), b"beta", JAN_2021);
    let (second, _) = run(OrganizeOptions::new(&more, &s.dst));
    let build = second.build.unwrap();
    assert_eq!(build.reused, 1);
    assert_eq!(build.hashed, 0);
    assert_eq!(second.processed, 1);
    assert_eq!(second.index.unwrap().total_files, 2);
}

#[test]
fn test_cache_dir_keeps_destination_clean() {
    let s = setup();
    let cache = s.src.parent().unwrap().join("cache");
    write_dated(&s.src.join("a.jpg"), b"alpha", JAN_2021);

    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.cache_dir = Some(cache.clone());
    let (summary, _) = run(options);

    assert_eq!(summary.processed, 1);
    assert!(cache.join(CACHE_FILE_NAME).exists());
    assert!(!s.dst.join(CACHE_FILE_NAME).exists());
}

#[test]
fn test_progress_lines() {
    let s = setup();
    for i in 0..5 {
        write_dated(&s.src.join(format!("img{i}.jpg")), format!("{i}").as_bytes(), JAN_2021);
    }
    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.progress_interval = 2;
    let (summary, sink) = run(options);

    assert_eq!(summary.processed, 5);
    assert!(sink.contains("Processed 2 files so far..."));
    assert!(sink.contains("Processed 4 files so far..."));
    assert!(!sink.contains("Processed 5 files so far..."));
    assert!(sink.contains("Total files matched: 5, processed: 5"));
    assert!(sink.contains(&format!("Source Folder: {}", s.src.canonicalize().unwrap().display())));
}
