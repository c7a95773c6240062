use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::DisassemblerConfig;
use crate::services::backends::process::{run_captured, ProcessOutcome};
use crate::services::backends::provision::{ToolBundle, ToolProvisioner};
use crate::services::disassembly::{DisassemblyBackend, DisassemblyError, TEXT_FILE_NAME};

/// How the backend finds its executable.
#[derive(Debug, Clone)]
pub enum ToolLocation {
    /// Use this executable as-is.
    Explicit(PathBuf),
    /// Materialize the executable from a bundle on first use.
    Provisioned(Arc<ToolProvisioner>),
}

/// ildasm-backed disassembler: full dump of a module into `output.il`.
#[derive(Debug, Clone)]
pub struct IldasmBackend {
    tool: ToolLocation,
    timeout: Option<Duration>,
}

impl IldasmBackend {
    pub fn with_tool_path(path: impl Into<PathBuf>) -> Self {
        Self { tool: ToolLocation::Explicit(path.into()), timeout: None }
    }

    pub fn provisioned(provisioner: Arc<ToolProvisioner>) -> Self {
        Self { tool: ToolLocation::Provisioned(provisioner), timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from config: an explicit `tool_path` wins, otherwise the
    /// process-wide provisioner is used.
    ///
    /// The shared provisioner is set up by the first call that needs it; its
    /// `tool_dir` and `bundle_dir` stay in effect for the rest of the process
    /// and later configs naming other directories do not replace it.
    pub fn from_config(config: &DisassemblerConfig) -> Result<Self, DisassemblyError> {
        if config.timeout_secs == Some(0) {
            return Err(DisassemblyError::Config("timeout_secs must be at least 1".to_string()));
        }
        let backend = match &config.tool_path {
            Some(path) => Self::with_tool_path(path),
            None => {
                let tool_dir = config.tool_dir_or_default();
                let provisioner = ToolProvisioner::shared(|| {
                    let bundle = match &config.bundle_dir {
                        Some(dir) => ToolBundle::from_dir(dir)?,
                        None => ToolBundle::default(),
                    };
                    Ok(ToolProvisioner::new(&tool_dir, bundle))
                })?;
                if provisioner.target_dir() != tool_dir.as_path() {
                    debug!(
                        requested = %tool_dir.display(),
                        in_use = %provisioner.target_dir().display(),
                        "shared disassembler provisioner already initialized elsewhere"
                    );
                }
                Self::provisioned(provisioner)
            }
        };
        Ok(backend.with_timeout(config.timeout()))
    }

    pub fn tool(&self) -> &ToolLocation {
        &self.tool
    }

    fn resolve_tool(&self) -> Result<PathBuf, DisassemblyError> {
        match &self.tool {
            ToolLocation::Explicit(path) => Ok(path.clone()),
            ToolLocation::Provisioned(provisioner) => provisioner.ensure_tool_available(),
        }
    }
}

/// Fixed argument template: everything ildasm can print, UTF-8, no progress
/// window, written to [`TEXT_FILE_NAME`] relative to the working directory.
pub fn disassembly_args(input: &Path) -> Vec<OsString> {
    vec![
        OsString::from("-all"),
        OsString::from("-utf8"),
        OsString::from("-nobar"),
        OsString::from(format!("-out={TEXT_FILE_NAME}")),
        input.as_os_str().to_owned(),
    ]
}

impl DisassemblyBackend for IldasmBackend {
    fn name(&self) -> &'static str {
        "ildasm"
    }

    /// Materializes a provisioned tool before the pipeline creates a workspace.
    fn prepare(&self) -> Result<(), DisassemblyError> {
        self.resolve_tool().map(|_| ())
    }

    fn invoke(&self, input: &Path, workspace: &Path) -> Result<(), DisassemblyError> {
        let tool = self.resolve_tool()?;
        let mut command = Command::new(&tool);
        command.args(disassembly_args(input)).current_dir(workspace);
        hide_console_window(&mut command);

        debug!(tool = %tool.display(), workspace = %workspace.display(), "spawning disassembler");
        let outcome =
            run_captured(&mut command, self.timeout).map_err(|e| DisassemblyError::io(&tool, e))?;

        match outcome {
            ProcessOutcome::Exited(captured) => {
                let exit_code = captured.status.code();
                // Negative codes are not failures; only strictly positive ones (or a signal) are.
                if exit_code.map_or(true, |code| code > 0) {
                    warn!(?exit_code, workspace = %workspace.display(), "disassembler failed");
                    return Err(DisassemblyError::ExternalTool {
                        exit_code,
                        output: captured.combined,
                        workspace: workspace.to_path_buf(),
                    });
                }
                Ok(())
            }
            ProcessOutcome::TimedOut { combined } => Err(DisassemblyError::Timeout {
                after: self.timeout.unwrap_or_default(),
                output: combined,
                workspace: workspace.to_path_buf(),
            }),
        }
    }
}

#[cfg(windows)]
fn hide_console_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_command: &mut Command) {}
