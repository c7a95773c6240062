use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Explicit disassembler executable; bypasses provisioning.
pub const TOOL_BIN_ENV: &str = "ILDASM_BIN";
/// Directory holding bundled payloads to provision the disassembler from.
pub const BUNDLE_DIR_ENV: &str = "ILNORM_BUNDLE_DIR";

/// Settings for a disassembly run.
///
/// Stored as JSON or YAML; every field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisassemblerConfig {
    /// Also erase assembly version, file version and product version stamps.
    pub strip_version_info: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_path: Option<PathBuf>,
    /// Where the provisioned disassembler lives. Defaults to `<temp>/ilnorm-tools`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_dir: Option<PathBuf>,
    /// Parent directory for per-request workspaces. Defaults to the system temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl DisassemblerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn tool_dir_or_default(&self) -> PathBuf {
        self.tool_dir.clone().unwrap_or_else(|| std::env::temp_dir().join("ilnorm-tools"))
    }

    /// Fill `tool_path` / `bundle_dir` from the environment when the config leaves them unset.
    pub fn apply_env_overrides(&mut self) {
        if self.tool_path.is_none() {
            self.tool_path = std::env::var_os(TOOL_BIN_ENV).map(PathBuf::from);
        }
        if self.bundle_dir.is_none() {
            self.bundle_dir = std::env::var_os(BUNDLE_DIR_ENV).map(PathBuf::from);
        }
    }
}

/// Load a config file; `.yaml`/`.yml` are read as YAML, anything else as JSON.
pub fn load_config(path: &Path) -> Result<DisassemblerConfig> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
    let config = if matches!(ext.as_str(), "yaml" | "yml") {
        serde_yaml::from_str(&body).context("Failed to parse config YAML")?
    } else {
        serde_json::from_str(&body).context("Failed to parse config JSON")?
    };
    Ok(config)
}
