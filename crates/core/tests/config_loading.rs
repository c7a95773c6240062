use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use ilnorm_core::config::{load_config, BUNDLE_DIR_ENV, TOOL_BIN_ENV};
use ilnorm_core::DisassemblerConfig;
use tempfile::tempdir;

#[test]
fn json_config_round_trips_fields() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("ilnorm.json");
    fs::write(
        &path,
        r#"{"strip_version_info": true, "tool_path": "/opt/ildasm/ildasm", "timeout_secs": 30}"#,
    )
    .unwrap();

    let config = load_config(&path).expect("load json");
    assert!(config.strip_version_info);
    assert_eq!(config.tool_path, Some(PathBuf::from("/opt/ildasm/ildasm")));
    assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    assert_eq!(config.bundle_dir, None);
}

#[test]
fn yaml_config_is_selected_by_extension() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("ilnorm.yml");
    fs::write(&path, "bundle_dir: /srv/bundle\nworkspace_root: /scratch\n").unwrap();

    let config = load_config(&path).expect("load yaml");
    assert!(!config.strip_version_info);
    assert_eq!(config.bundle_dir, Some(PathBuf::from("/srv/bundle")));
    assert_eq!(config.workspace_root, Some(PathBuf::from("/scratch")));
}

#[test]
fn empty_object_gives_defaults() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("ilnorm.json");
    fs::write(&path, "{}").unwrap();
    assert_eq!(load_config(&path).unwrap(), DisassemblerConfig::default());
}

#[test]
fn malformed_and_missing_configs_fail_with_context() {
    let temp = tempdir().unwrap();
    let bad = temp.path().join("bad.json");
    fs::write(&bad, "{ not json").unwrap();
    let err = load_config(&bad).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config JSON"), "{err:#}");

    let missing = temp.path().join("missing.yaml");
    let err = load_config(&missing).unwrap_err();
    assert!(err.to_string().contains("Failed to read config"), "{err:#}");
}

#[test]
fn default_tool_dir_lives_under_temp() {
    let config = DisassemblerConfig::default();
    assert_eq!(config.tool_dir_or_default(), std::env::temp_dir().join("ilnorm-tools"));
    assert_eq!(config.timeout(), None);
}

#[test]
fn env_overrides_fill_only_unset_fields() {
    std::env::set_var(TOOL_BIN_ENV, "/env/ildasm");
    std::env::set_var(BUNDLE_DIR_ENV, "/env/bundle");

    let mut unset = DisassemblerConfig::default();
    unset.apply_env_overrides();
    assert_eq!(unset.tool_path, Some(PathBuf::from("/env/ildasm")));
    assert_eq!(unset.bundle_dir, Some(PathBuf::from("/env/bundle")));

    let mut explicit = DisassemblerConfig {
        tool_path: Some(PathBuf::from("/cfg/ildasm")),
        ..Default::default()
    };
    explicit.apply_env_overrides();
    assert_eq!(explicit.tool_path, Some(PathBuf::from("/cfg/ildasm")));
    assert_eq!(explicit.bundle_dir, Some(PathBuf::from("/env/bundle")));

    std::env::remove_var(TOOL_BIN_ENV);
    std::env::remove_var(BUNDLE_DIR_ENV);
}
