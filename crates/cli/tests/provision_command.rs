use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use ilnorm_core::services::backends::TOOL_FILE_NAME;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn provision_tool_materializes_from_bundle_dir() {
    let temp = tempdir().unwrap();
    let bundle = temp.path().join("bundle");
    let nested = bundle.join("runtimes").join("any");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join(TOOL_FILE_NAME), b"#!/bin/sh\nexit 0\n").unwrap();
    let tools = temp.path().join("tools");

    cargo_bin_cmd!("ilnorm")
        .env_remove("ILNORM_BUNDLE_DIR")
        .arg("provision-tool")
        .arg("--bundle-dir")
        .arg(&bundle)
        .arg("--tool-dir")
        .arg(&tools)
        .assert()
        .success()
        .stdout(predicate::str::contains(TOOL_FILE_NAME));

    assert_eq!(fs::read(tools.join(TOOL_FILE_NAME)).unwrap(), b"#!/bin/sh\nexit 0\n");
}

#[test]
fn provision_tool_uses_bundle_dir_from_env() {
    let temp = tempdir().unwrap();
    let bundle = temp.path().join("bundle");
    fs::create_dir_all(&bundle).unwrap();
    fs::write(bundle.join(TOOL_FILE_NAME), b"tool").unwrap();
    let tools = temp.path().join("tools");

    cargo_bin_cmd!("ilnorm")
        .env("ILNORM_BUNDLE_DIR", &bundle)
        .arg("provision-tool")
        .arg("--tool-dir")
        .arg(&tools)
        .assert()
        .success();

    assert!(tools.join(TOOL_FILE_NAME).is_file());
}

#[test]
fn provision_tool_without_payload_fails() {
    let temp = tempdir().unwrap();
    let bundle = temp.path().join("bundle");
    fs::create_dir_all(&bundle).unwrap();
    fs::write(bundle.join("README.txt"), b"no tool here").unwrap();

    cargo_bin_cmd!("ilnorm")
        .env_remove("ILNORM_BUNDLE_DIR")
        .arg("provision-tool")
        .arg("--bundle-dir")
        .arg(&bundle)
        .arg("--tool-dir")
        .arg(temp.path().join("tools"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No bundled payload matching"))
        .stderr(predicate::str::contains("README.txt"));
}
