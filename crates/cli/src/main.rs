use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ilnorm::commands::{
    disassemble_command, normalize_command, normalize_resources_command, provision_tool_command,
};

/// Deterministic IL disassembly CLI.
///
/// This CLI is a thin wrapper around `ilnorm-core` (exposed in code as `ilnorm_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "ilnorm",
    version,
    about = "Deterministic, normalized IL disassembly of .NET assemblies",
    long_about = None
)]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Disassemble a managed module with ildasm and normalize the output.
    ///
    /// Prints the SHA-256 of the normalized IL text and of every passthrough
    /// resource, then deletes the temporary workspace unless `--keep-workspace`.
    Disassemble {
        /// Path to the assembly (.dll / .exe) to disassemble.
        #[arg(long)]
        input: PathBuf,

        /// Also erase assembly, file and product version stamps.
        #[arg(long, default_value_t = false)]
        strip_version_info: bool,

        /// Optional JSON or YAML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Copy the normalized text and resources into this directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Leave the workspace on disk after the run.
        #[arg(long, default_value_t = false)]
        keep_workspace: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Normalize an existing IL text file in place.
    Normalize {
        #[arg(long)]
        file: PathBuf,

        #[arg(long, default_value_t = false)]
        strip_version_info: bool,

        /// Emit rewrite counters as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Strip version stamps from a UTF-16LE resource dump in place.
    ///
    /// Without `--strip-version-info` the file is left untouched.
    NormalizeResources {
        #[arg(long)]
        file: PathBuf,

        #[arg(long, default_value_t = false)]
        strip_version_info: bool,
    },

    /// Materialize the bundled disassembler and print its path.
    ProvisionTool {
        /// Directory holding the bundled payloads (falls back to ILNORM_BUNDLE_DIR).
        #[arg(long)]
        bundle_dir: Option<PathBuf>,

        /// Where to place the tool. Defaults to `<temp>/ilnorm-tools`.
        #[arg(long)]
        tool_dir: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ilnorm::logging::init(cli.log_json);

    match cli.command {
        Command::Disassemble { input, strip_version_info, config, out, keep_workspace, json } => {
            disassemble_command(
                &input,
                strip_version_info,
                config.as_deref(),
                out.as_deref(),
                keep_workspace,
                json,
            )?
        }
        Command::Normalize { file, strip_version_info, json } => {
            normalize_command(&file, strip_version_info, json)?
        }
        Command::NormalizeResources { file, strip_version_info } => {
            normalize_resources_command(&file, strip_version_info)?
        }
        Command::ProvisionTool { bundle_dir, tool_dir, config } => {
            provision_tool_command(bundle_dir.as_deref(), tool_dir.as_deref(), config.as_deref())?
        }
    }

    Ok(())
}
