use std::fs;
use std::path::Path;

use ilnorm::{display_name, sha256_file};
use tempfile::tempdir;

#[test]
fn sha256_file_matches_known_digest() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("abc.txt");
    fs::write(&path, b"abc").expect("write");
    assert_eq!(
        sha256_file(&path).expect("hash"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn sha256_file_reports_missing_file() {
    let tmp = tempdir().expect("tempdir");
    let err = sha256_file(&tmp.path().join("missing.il")).unwrap_err();
    assert!(err.to_string().contains("Failed to open file for hashing"), "{err}");
}

#[test]
fn display_name_uses_last_path_component() {
    assert_eq!(display_name(Path::new("/tmp/ws/output.il")), "output.il");
    assert_eq!(display_name(Path::new("/")), "/");
}

#[test]
fn logging_init_is_idempotent() {
    ilnorm::logging::init(false);
    ilnorm::logging::init(true);
}
