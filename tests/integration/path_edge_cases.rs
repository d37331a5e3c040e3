//! Odd source/destination layouts and file names.

use super::common::{run, setup, write_dated, JAN_2021};
use orgphoto::duplicates::ScriptedPrompter;
use orgphoto::logging::MemorySink;
use orgphoto::organizer::{NoEmbeddedDates, OrganizeError, OrganizeOptions, Organizer};
use std::fs;

fn run_err(options: OrganizeOptions) -> OrganizeError {
    let mut prompter = ScriptedPrompter::default();
    let mut sink = MemorySink::new();
    Organizer::new(options, &NoEmbeddedDates, &mut prompter, &mut sink)
        .run()
        .unwrap_err()
}

#[test]
fn test_missing_source_aborts_before_creating_destination() {
    let s = setup();
    let err = run_err(OrganizeOptions::new(s.src.join("nope"), &s.dst));
    assert!(matches!(err, OrganizeError::SourceMissing(_)));
    assert!(err.is_input_error());
    assert!(!s.dst.exists());
}

#[test]
fn test_same_directory_rejected() {
    let s = setup();
    fs::create_dir_all(s.src.join("sub")).unwrap();
    let err = run_err(OrganizeOptions::new(&s.src, s.src.join("sub/..")));
    assert!(matches!(err, OrganizeError::SameDirectory(_)));
}

#[test]
fn test_destination_inside_source_is_not_rewalked() {
    let s = setup();
    let dst = s.src.join("sorted");
    write_dated(&s.src.join("a.jpg"), b"alpha", JAN_2021);
    fs::create_dir_all(s.src.join("sub")).unwrap();

    let (summary, _) = run(OrganizeOptions::new(&s.src, &dst));
    assert_eq!(summary.seen, 1);

    // a second pass sees only the original file again
    let (again, _) = run(OrganizeOptions::new(&s.src, &dst));
    assert_eq!(again.seen, 1);
}

#[test]
fn test_unicode_and_spaces_in_names() {
    let s = setup();
    write_dated(&s.src.join("Été à Paris.jpg"), b"paris", JAN_2021);
    write_dated(&s.src.join("写真 01.jpg"), b"photo", JAN_2021);

    let (summary, _) = run(OrganizeOptions::new(&s.src, &s.dst));

    assert_eq!(summary.processed, 2);
    assert!(s.day(JAN_2021).join("Été à Paris.jpg").exists());
    assert!(s.day(JAN_2021).join("写真 01.jpg").exists());
}

#[test]
fn test_files_without_extension_pass_without_filter() {
    let s = setup();
    write_dated(&s.src.join("README"), b"text", JAN_2021);

    let (summary, _) = run(OrganizeOptions::new(&s.src, &s.dst));
    assert_eq!(summary.processed, 1);

    let s = setup();
    write_dated(&s.src.join("README"), b"text", JAN_2021);
    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.extensions = Some("jpg".to_string());
    let (summary, _) = run(options);
    assert_eq!(summary.seen, 0);
}

#[test]
fn test_hidden_files_skipped_on_request() {
    let s = setup();
    write_dated(&s.src.join(".hidden.jpg"), b"h", JAN_2021);
    write_dated(&s.src.join(".thumbs/t.jpg"), b"t", JAN_2021);
    write_dated(&s.src.join("shown.jpg"), b"s", JAN_2021);

    let mut options = OrganizeOptions::new(&s.src, &s.dst);
    options.skip_hidden = true;
    let (summary, _) = run(options);
    assert_eq!(summary.seen, 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_counts_as_failure() {
    use orgphoto::error::ExitCode;
    use std::os::unix::fs::PermissionsExt;

    let s = setup();
    let locked = s.src.join("locked.jpg");
    write_dated(&locked, b"secret", JAN_2021);
    write_dated(&s.src.join("open.jpg"), b"fine", JAN_2021);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // root can read anything; nothing to test then
    if fs::read(&locked).is_ok() {
        return;
    }

    let (summary, _) = run(OrganizeOptions::new(&s.src, &s.dst));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.exit_code(), ExitCode::PartialSuccess);
}
