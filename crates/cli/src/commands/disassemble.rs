use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use ilnorm_core::services::backends::IldasmBackend;
use ilnorm_core::{
    Disassembler, DisassemblerConfig, DisassemblyBackend, DisassemblyError, DisassemblyRequest,
};

use crate::commands::util::load_disassembler_config;
use crate::{display_name, sha256_file};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDigest {
    pub name: String,
    pub sha256: String,
}

/// What a `disassemble` run produced, captured before the workspace is released.
#[derive(Debug, Clone, Serialize)]
pub struct DisassembleSummary {
    pub input: PathBuf,
    pub backend: String,
    pub strip_version_info: bool,
    pub text_sha256: String,
    pub resource_dump: Option<String>,
    pub resources: Vec<ArtifactDigest>,
    pub workspace: PathBuf,
    pub workspace_kept: bool,
    /// Directory the text file and resources were copied to, if requested.
    pub copied_to: Option<PathBuf>,
}

/// Disassemble `input` with the ildasm backend and report the normalized output.
pub fn disassemble_command(
    input: &Path,
    strip_version_info: bool,
    config_path: Option<&Path>,
    out: Option<&Path>,
    keep_workspace: bool,
    json: bool,
) -> Result<()> {
    let config = load_disassembler_config(config_path)?;
    let backend =
        IldasmBackend::from_config(&config).context("Failed to configure the disassembler")?;
    let request = DisassemblyRequest {
        input: input.to_path_buf(),
        strip_version_info: strip_version_info || config.strip_version_info,
    };

    let summary = disassemble_with_backend(&config, &backend, &request, out, keep_workspace)?;

    if json {
        let serialized = serde_json::to_string_pretty(&summary)
            .context("Failed to serialize disassembly summary to JSON")?;
        println!("{}", serialized);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Run the pipeline with any backend, hash the results, optionally copy them
/// out, then release the workspace unless asked to keep it.
pub fn disassemble_with_backend(
    config: &DisassemblerConfig,
    backend: &dyn DisassemblyBackend,
    request: &DisassemblyRequest,
    out: Option<&Path>,
    keep_workspace: bool,
) -> Result<DisassembleSummary> {
    let result = Disassembler::new(config, backend).disassemble(request).map_err(|err| {
        let hint = failure_hint(&err);
        anyhow::Error::new(err)
            .context(format!("Failed to disassemble {}{hint}", request.input.display()))
    })?;

    let text_sha256 = sha256_file(&result.text_file)?;
    let resources = result
        .passthrough_resources
        .iter()
        .map(|path| -> Result<ArtifactDigest> {
            Ok(ArtifactDigest { name: display_name(path), sha256: sha256_file(path)? })
        })
        .collect::<Result<Vec<_>>>()?;

    let copied_to = match out {
        Some(dir) => {
            copy_artifacts(dir, &result.text_file, &result.passthrough_resources)?;
            Some(dir.to_path_buf())
        }
        None => None,
    };

    let summary = DisassembleSummary {
        input: request.input.clone(),
        backend: backend.name().to_string(),
        strip_version_info: request.strip_version_info,
        text_sha256,
        resource_dump: result.resource_dump.as_deref().map(display_name),
        resources,
        workspace: result.workspace.clone(),
        workspace_kept: keep_workspace,
        copied_to,
    };

    if !keep_workspace {
        result.release().context("Failed to release disassembly workspace")?;
    }
    Ok(summary)
}

fn failure_hint(err: &DisassemblyError) -> String {
    match err.workspace() {
        Some(workspace) => format!(" (workspace kept at {})", workspace.display()),
        None => String::new(),
    }
}

fn copy_artifacts(dir: &Path, text_file: &Path, resources: &[PathBuf]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
    for source in std::iter::once(text_file).chain(resources.iter().map(PathBuf::as_path)) {
        let target = dir.join(display_name(source));
        fs::copy(source, &target).with_context(|| {
            format!("Failed to copy {} to {}", source.display(), target.display())
        })?;
    }
    Ok(())
}

fn print_summary(summary: &DisassembleSummary) {
    println!("Disassembled: {}", summary.input.display());
    println!("  Backend: {}", summary.backend);
    println!("  Strip version info: {}", summary.strip_version_info);
    println!("  Text SHA-256: {}", summary.text_sha256);
    println!("  Resources ({}):", summary.resources.len());
    if summary.resources.is_empty() {
        println!("    (none)");
    }
    for resource in &summary.resources {
        println!("    - {} {}", resource.name, resource.sha256);
    }
    if let Some(dir) = &summary.copied_to {
        println!("  Copied to: {}", dir.display());
    }
    let state = if summary.workspace_kept { "kept" } else { "released" };
    println!("  Workspace: {} ({state})", summary.workspace.display());
}
