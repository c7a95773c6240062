use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DisassemblerConfig;
use crate::normalize::normalize_il_file;
use crate::normalize::resources::normalize_resource_dump;
use crate::services::collect::collect;
use crate::workspace::{create_workspace, release_workspace};

/// Fixed relative name of the IL text file the disassembler writes into the workspace.
pub const TEXT_FILE_NAME: &str = "output.il";

/// Win32 resource dump emitted next to the text file when the module carries resources.
pub const RESOURCE_FILE_NAME: &str = "output.res";

#[derive(Debug, Error)]
pub enum DisassemblyError {
    #[error("Input module not found at {0}")]
    InputNotFound(PathBuf),
    #[error("No bundled payload matching '{wanted}' (searched: {searched})")]
    ToolProvisioning { wanted: String, searched: String },
    #[error("Disassembler exited with {}; output:\n{output}", describe_exit(.exit_code))]
    ExternalTool { exit_code: Option<i32>, output: String, workspace: PathBuf },
    #[error("Disassembler timed out after {after:?}")]
    Timeout { after: Duration, output: String, workspace: PathBuf },
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DisassemblyError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }

    /// Workspace left on disk by a failed tool run, kept for inspection.
    pub fn workspace(&self) -> Option<&Path> {
        match self {
            Self::ExternalTool { workspace, .. } => Some(workspace),
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// A single disassembly request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisassemblyRequest {
    pub input: PathBuf,
    /// Also erase assembly/file/product version stamps.
    #[serde(default)]
    pub strip_version_info: bool,
}

impl DisassemblyRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self { input: input.into(), strip_version_info: false }
    }
}

/// Terminal artifact of a successful disassembly.
///
/// The workspace directory is owned by the holder and is only removed by
/// [`DisassemblyResult::release`]; dropping the value leaves it on disk.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct DisassemblyResult {
    pub workspace: PathBuf,
    pub text_file: PathBuf,
    /// The resource dump, when the disassembler produced one. Also listed in
    /// `passthrough_resources`.
    pub resource_dump: Option<PathBuf>,
    pub passthrough_resources: Vec<PathBuf>,
}

impl DisassemblyResult {
    /// Delete the workspace and everything in it.
    pub fn release(self) -> Result<(), DisassemblyError> {
        release_workspace(&self.workspace)
    }
}

/// Something that can turn a managed module into IL text inside a workspace.
pub trait DisassemblyBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check the backend can run at all, before any workspace is created.
    fn prepare(&self) -> Result<(), DisassemblyError> {
        Ok(())
    }

    /// Disassemble `input`, writing [`TEXT_FILE_NAME`] (and any resource files)
    /// into `workspace`. Blocks until the work is done.
    fn invoke(&self, input: &Path, workspace: &Path) -> Result<(), DisassemblyError>;
}

/// Coordinator running a backend inside a fresh workspace and normalizing its output.
pub struct Disassembler<'a> {
    pub config: &'a DisassemblerConfig,
    pub backend: &'a dyn DisassemblyBackend,
}

impl<'a> Disassembler<'a> {
    pub fn new(config: &'a DisassemblerConfig, backend: &'a dyn DisassemblyBackend) -> Self {
        Self { config, backend }
    }

    pub fn disassemble(
        &self,
        request: &DisassemblyRequest,
    ) -> Result<DisassemblyResult, DisassemblyError> {
        if !request.input.is_file() {
            return Err(DisassemblyError::InputNotFound(request.input.clone()));
        }
        // The tool runs with the workspace as its cwd, so relative inputs must be anchored here.
        let input = std::path::absolute(&request.input)
            .map_err(|e| DisassemblyError::io(&request.input, e))?;

        self.backend.prepare()?;
        let workspace = create_workspace(self.config.workspace_root.as_deref())?;
        info!(
            backend = self.backend.name(),
            input = %input.display(),
            workspace = %workspace.display(),
            "disassembling module"
        );

        self.run_in(&input, &workspace, request.strip_version_info).map_err(|err| {
            // Only a failed tool run hands its workspace back to the caller.
            if err.workspace().is_none() {
                if let Err(release_err) = release_workspace(&workspace) {
                    warn!(workspace = %workspace.display(), "failed to release workspace: {release_err}");
                }
            }
            err
        })
    }

    fn run_in(
        &self,
        input: &Path,
        workspace: &Path,
        strip_version_info: bool,
    ) -> Result<DisassemblyResult, DisassemblyError> {
        self.backend.invoke(input, workspace)?;

        let text_file = workspace.join(TEXT_FILE_NAME);
        let stats = normalize_il_file(&text_file, strip_version_info)?;
        debug!(
            lines_read = stats.lines_read,
            lines_erased = stats.lines_erased,
            lines_skipped = stats.lines_skipped,
            "normalized IL text"
        );

        let resource_file = workspace.join(RESOURCE_FILE_NAME);
        if resource_file.is_file() {
            let rewritten = normalize_resource_dump(&resource_file, strip_version_info)?;
            debug!(rewritten, "processed resource dump");
        }

        collect(workspace, &text_file)
    }
}
