//! The destination's events.log across runs.

use super::common::{folder_for, setup, write_dated, JAN_2021};
use orgphoto::cache::ContentIndex;
use orgphoto::duplicates::ScriptedPrompter;
use orgphoto::logging::{EventLog, EVENT_LOG_NAME};
use orgphoto::organizer::{NoEmbeddedDates, OrganizeOptions, Organizer};
use std::fs;

fn run_logged(options: OrganizeOptions, verbose: bool) {
    let mut log = EventLog::create(&options.destination, verbose).unwrap();
    let mut prompter = ScriptedPrompter::default();
    Organizer::new(options, &NoEmbeddedDates, &mut prompter, &mut log)
        .run()
        .unwrap();
    log.finish();
}

#[test]
fn test_session_is_framed_and_appended() {
    let s = setup();
    write_dated(&s.src.join("a.jpg"), b"alpha", JAN_2021);

    run_logged(OrganizeOptions::new(&s.src, &s.dst), false);
    run_logged(OrganizeOptions::new(&s.src, &s.dst), false);

    let text = fs::read_to_string(s.dst.join(EVENT_LOG_NAME)).unwrap();
    assert_eq!(text.matches("Session Started:").count(), 2);
    assert_eq!(text.matches("Session Ended:").count(), 2);
    assert!(text.contains("orgphoto - Photo Organization Tool"));
    assert!(text.contains("Total files matched: 1, processed: 1"));
    assert!(text.contains("  a.jpg"));
}

#[test]
fn test_log_file_is_never_indexed() {
    let s = setup();
    write_dated(&s.src.join("a.jpg"), b"alpha", JAN_2021);

    run_logged(OrganizeOptions::new(&s.src, &s.dst), false);
    run_logged(OrganizeOptions::new(&s.src, &s.dst), false);

    let root = s.dst.canonicalize().unwrap();
    let index = ContentIndex::open(&root, None);
    assert!(index.record(&root.join(EVENT_LOG_NAME)).is_none());
}

#[test]
fn test_log_inside_source_tree_is_not_organized() {
    let s = setup();
    let dst = s.src.join("organized");
    write_dated(&s.src.join("a.jpg"), b"alpha", JAN_2021);

    run_logged(OrganizeOptions::new(&s.src, &dst), true);
    run_logged(OrganizeOptions::new(&s.src, &dst), true);

    let day = dst.join(folder_for(JAN_2021));
    assert!(day.join("a.jpg").exists());
    assert!(!day.join(EVENT_LOG_NAME).exists());
    assert!(!dst.join("organized").exists());
}
