use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::services::disassembly::{DisassemblyError, DisassemblyResult, RESOURCE_FILE_NAME};

/// Support library whose versioned resource payloads ildasm drops next to the text.
pub const SUPPORT_LIBRARY_NAME: &str = "FSharp.Core";

/// `FSharp.Core.<digits>.<digits>[...]`, any case.
static NOISE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^FSharp\.Core(?:\.[0-9]+){2,}$").expect("valid noise file regex")
});

/// True when `file_name` is a known non-deterministic build byproduct.
pub fn is_known_noise(file_name: &str) -> bool {
    NOISE_PATTERN.is_match(file_name)
}

/// Classify the top-level files of a populated workspace.
///
/// Everything except the text file and known noise is passed through, sorted
/// by path. Subdirectories are ignored.
pub fn collect(workspace: &Path, text_file: &Path) -> Result<DisassemblyResult, DisassemblyError> {
    let mut passthrough = Vec::new();
    for entry in fs::read_dir(workspace).map_err(|e| DisassemblyError::io(workspace, e))? {
        let entry = entry.map_err(|e| DisassemblyError::io(workspace, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| DisassemblyError::io(&path, e))?;
        if !file_type.is_file() || path == text_file {
            continue;
        }
        if is_known_noise(&entry.file_name().to_string_lossy()) {
            debug!(file = %path.display(), "skipping known noise");
            continue;
        }
        passthrough.push(path);
    }
    passthrough.sort();

    let resource_dump = passthrough
        .iter()
        .find(|p| p.file_name() == Some(OsStr::new(RESOURCE_FILE_NAME)))
        .cloned();

    Ok(DisassemblyResult {
        workspace: workspace.to_path_buf(),
        text_file: text_file.to_path_buf(),
        resource_dump,
        passthrough_resources: passthrough,
    })
}
