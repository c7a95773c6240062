use std::path::Path;

use anyhow::Result;
use ilnorm_core::config::{load_config, DisassemblerConfig};

/// Load the config file when one is given (defaults otherwise), then apply
/// `ILDASM_BIN` / `ILNORM_BUNDLE_DIR` to whatever it left unset.
pub fn load_disassembler_config(path: Option<&Path>) -> Result<DisassemblerConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => DisassemblerConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}
