//! Output staging tests.

use std::{fs, path::Path};

use keyshot::{OutputStaging, StagedOutput};

#[test]
fn staged_output_writes_to_a_hidden_sibling() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let target = directory.path().join("frame.jpg");

    let staged = StagedOutput::prepare(&target, OutputStaging::Staged);

    assert!(staged.is_staged());
    assert_eq!(staged.target(), target.as_path());
    assert_eq!(staged.path().parent(), Some(directory.path()));
    let name = staged
        .path()
        .file_name()
        .and_then(|name| name.to_str())
        .expect("utf-8 name");
    assert!(name.starts_with(".frame."), "{name}");
    assert!(name.ends_with(".jpg"), "{name}");
}

#[test]
fn commit_moves_the_file_into_place() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let target = directory.path().join("frame.png");

    let staged = StagedOutput::prepare(&target, OutputStaging::Staged);
    let working = staged.path().to_path_buf();
    fs::write(&working, b"image").expect("write staged file");

    let committed = staged.commit().expect("commit succeeds");

    assert_eq!(committed, target);
    assert_eq!(fs::read(&target).expect("target exists"), b"image");
    assert!(!working.exists());
}

#[test]
fn uncommitted_staged_file_is_removed() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let target = directory.path().join("frame.jpg");

    let working = {
        let staged = StagedOutput::prepare(&target, OutputStaging::Staged);
        fs::write(staged.path(), b"HEADER").expect("write staged file");
        staged.path().to_path_buf()
    };

    assert!(!working.exists());
    assert!(!target.exists());
}

#[test]
fn dropping_without_a_file_is_harmless() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let target = directory.path().join("frame.jpg");

    drop(StagedOutput::prepare(&target, OutputStaging::Staged));

    assert_eq!(fs::read_dir(directory.path()).expect("readable").count(), 0);
}

#[test]
fn existing_target_is_replaced_only_on_commit() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let target = directory.path().join("frame.jpg");
    fs::write(&target, b"old").expect("write existing target");

    {
        let staged = StagedOutput::prepare(&target, OutputStaging::Staged);
        fs::write(staged.path(), b"partial").expect("write staged file");
    }
    assert_eq!(fs::read(&target).expect("target exists"), b"old");

    let staged = StagedOutput::prepare(&target, OutputStaging::Staged);
    fs::write(staged.path(), b"new").expect("write staged file");
    staged.commit().expect("commit succeeds");
    assert_eq!(fs::read(&target).expect("target exists"), b"new");
}

#[test]
fn direct_output_writes_the_target() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let target = directory.path().join("frame.jpg");

    let staged = StagedOutput::prepare(&target, OutputStaging::Direct);
    assert!(!staged.is_staged());
    assert_eq!(staged.path(), target.as_path());

    fs::write(staged.path(), b"HEADER").expect("write target");
    drop(staged);
    assert!(target.exists(), "direct output is never cleaned up");
}

#[test]
fn url_outputs_are_never_staged() {
    let target = Path::new("rtmp://example.com/live/key");
    let staged = StagedOutput::prepare(target, OutputStaging::Staged);
    assert!(!staged.is_staged());
    assert_eq!(staged.path(), target);
}
