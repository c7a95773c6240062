use std::fs;
use std::sync::Barrier;
use std::thread;

use ilnorm_core::services::backends::provision::{BundleEntry, ToolBundle, ToolProvisioner};
use ilnorm_core::DisassemblyError;
use tempfile::tempdir;

static PAYLOAD: &[u8] = b"#!/bin/sh\necho bundled ildasm\n";

#[test]
fn materializes_payload_by_case_insensitive_suffix() {
    let temp = tempdir().unwrap();
    let bundle = ToolBundle::new(vec![
        BundleEntry::from_static("tools/readme.txt", b"docs"),
        BundleEntry::from_static("Tools.Linux.ILDASM", PAYLOAD),
    ]);
    let provisioner = ToolProvisioner::new(temp.path().join("bin"), bundle).with_file_name("ildasm");

    let path = provisioner.ensure_tool_available().expect("provision");
    assert_eq!(path, temp.path().join("bin").join("ildasm"));
    assert_eq!(fs::read(&path).unwrap(), PAYLOAD);
}

#[test]
fn later_calls_return_cached_path() {
    let temp = tempdir().unwrap();
    let bundle = ToolBundle::new(vec![BundleEntry::from_static("ildasm", PAYLOAD)]);
    let provisioner = ToolProvisioner::new(temp.path(), bundle).with_file_name("ildasm");

    let first = provisioner.ensure_tool_available().unwrap();
    fs::remove_file(&first).unwrap();
    let second = provisioner.ensure_tool_available().unwrap();
    assert_eq!(first, second);
    // Cached: no second materialization happened.
    assert!(!second.exists());
}

#[test]
fn existing_tool_is_never_overwritten() {
    let temp = tempdir().unwrap();
    let target = temp.path().join("ildasm");
    fs::write(&target, b"older build").unwrap();
    let bundle = ToolBundle::new(vec![BundleEntry::from_static("ildasm", PAYLOAD)]);
    let provisioner = ToolProvisioner::new(temp.path(), bundle).with_file_name("ildasm");

    assert_eq!(provisioner.ensure_tool_available().unwrap(), target);
    assert_eq!(fs::read(&target).unwrap(), b"older build");
}

#[test]
fn missing_payload_is_a_provisioning_error() {
    let temp = tempdir().unwrap();
    let bundle = ToolBundle::new(vec![BundleEntry::from_static("ildasm.dll", PAYLOAD)]);
    let provisioner = ToolProvisioner::new(temp.path(), bundle).with_file_name("ildasm");

    let err = provisioner.ensure_tool_available().unwrap_err();
    match err {
        DisassemblyError::ToolProvisioning { wanted, searched } => {
            assert_eq!(wanted, "ildasm");
            assert!(searched.contains("ildasm.dll"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!temp.path().join("ildasm").exists());
}

#[test]
fn racing_first_use_converges_on_one_tool() {
    const RACERS: usize = 8;
    let temp = tempdir().unwrap();
    let target_dir = temp.path().join("tools");
    let barrier = Barrier::new(RACERS);

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                s.spawn(|| {
                    let bundle = ToolBundle::new(vec![BundleEntry::from_static("ildasm", PAYLOAD)]);
                    let provisioner =
                        ToolProvisioner::new(&target_dir, bundle).with_file_name("ildasm");
                    barrier.wait();
                    provisioner.ensure_tool_available()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in results {
        assert_eq!(result.expect("provision"), target_dir.join("ildasm"));
    }
    assert_eq!(fs::read(target_dir.join("ildasm")).unwrap(), PAYLOAD);
    let names: Vec<_> = fs::read_dir(&target_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["ildasm"], "staging files left behind");
}

#[test]
fn large_payloads_are_streamed_intact() {
    let temp = tempdir().unwrap();
    let source = temp.path().join("payload.bin");
    let bytes: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(&source, &bytes).unwrap();
    let bundle = ToolBundle::new(vec![BundleEntry::from_file("x64/ildasm", &source)]);
    let provisioner =
        ToolProvisioner::new(temp.path().join("out"), bundle).with_file_name("ildasm");

    let path = provisioner.ensure_tool_available().unwrap();
    assert_eq!(fs::read(path).unwrap(), bytes);
}

#[test]
fn bundle_from_dir_names_entries_by_relative_path() {
    let temp = tempdir().unwrap();
    let native = temp.path().join("runtimes").join("linux-x64").join("native");
    fs::create_dir_all(&native).unwrap();
    fs::write(native.join("ildasm"), PAYLOAD).unwrap();
    fs::write(temp.path().join("LICENSE"), b"mit").unwrap();

    let bundle = ToolBundle::from_dir(temp.path()).expect("scan bundle");
    let names: Vec<&str> = bundle.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["LICENSE", "runtimes/linux-x64/native/ildasm"]);
    assert_eq!(bundle.find("ILDASM").unwrap().name, "runtimes/linux-x64/native/ildasm");
    assert!(bundle.find("ildasm.exe").is_none());
}

#[cfg(unix)]
#[test]
fn materialized_tool_is_executable() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().unwrap();
    let bundle = ToolBundle::new(vec![BundleEntry::from_static("ildasm", PAYLOAD)]);
    let provisioner = ToolProvisioner::new(temp.path(), bundle).with_file_name("ildasm");
    let path = provisioner.ensure_tool_available().unwrap();
    let mode = fs::metadata(path).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111);
}
