use std::path::Path;

use anyhow::{Context, Result};
use ilnorm_core::services::backends::{ToolBundle, ToolProvisioner};

use crate::commands::util::load_disassembler_config;

/// Materialize the disassembler from a bundle directory and print where it landed.
///
/// Explicit flags win over the config file, which wins over the environment.
pub fn provision_tool_command(
    bundle_dir: Option<&Path>,
    tool_dir: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = load_disassembler_config(config_path)?;
    if let Some(dir) = bundle_dir {
        config.bundle_dir = Some(dir.to_path_buf());
    }
    if let Some(dir) = tool_dir {
        config.tool_dir = Some(dir.to_path_buf());
    }

    let bundle = match &config.bundle_dir {
        Some(dir) => ToolBundle::from_dir(dir)
            .with_context(|| format!("Failed to scan bundle dir: {}", dir.display()))?,
        None => ToolBundle::default(),
    };
    let provisioner = ToolProvisioner::new(config.tool_dir_or_default(), bundle);
    let path = provisioner.ensure_tool_available().context("Failed to provision disassembler")?;

    println!("{}", path.display());
    Ok(())
}
