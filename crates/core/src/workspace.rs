//! Per-request scratch directories.
//!
//! Each disassembly gets its own directory so concurrent requests never see
//! each other's files. Nothing here deletes a workspace implicitly.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::services::disassembly::DisassemblyError;

pub const WORKSPACE_PREFIX: &str = "ilnorm-";

/// Create a fresh, empty, uniquely named directory under `root` (or the
/// system temp dir). Name collisions are retried with new random names.
pub fn create_workspace(root: Option<&Path>) -> Result<PathBuf, DisassemblyError> {
    let parent = root.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
    fs::create_dir_all(&parent).map_err(|e| DisassemblyError::io(&parent, e))?;
    let dir = tempfile::Builder::new()
        .prefix(WORKSPACE_PREFIX)
        .rand_bytes(12)
        .tempdir_in(&parent)
        .map_err(|e| DisassemblyError::io(&parent, e))?;
    let path = dir.keep();
    debug!(workspace = %path.display(), "created workspace");
    Ok(path)
}

/// Recursively delete a workspace. Failures are reported, not retried.
pub fn release_workspace(path: &Path) -> Result<(), DisassemblyError> {
    fs::remove_dir_all(path).map_err(|e| DisassemblyError::io(path, e))?;
    debug!(workspace = %path.display(), "released workspace");
    Ok(())
}
