use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ilnorm_core::normalize::normalize_il_file;
use ilnorm_core::normalize::resources::normalize_resource_dump;

/// Normalize an existing IL text file in place.
pub fn normalize_command(file: &Path, strip_version_info: bool, json: bool) -> Result<()> {
    if !file.is_file() {
        return Err(anyhow!("IL file does not exist: {}", file.display()));
    }
    let stats = normalize_il_file(file, strip_version_info)
        .with_context(|| format!("Failed to normalize {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("Normalized: {}", file.display());
    println!("  Lines read: {}", stats.lines_read);
    println!("  Lines emitted: {}", stats.lines_emitted);
    println!("  Lines erased: {}", stats.lines_erased);
    println!("  Lines skipped: {}", stats.lines_skipped);
    Ok(())
}

/// Strip version stamps from a UTF-16LE resource dump in place.
pub fn normalize_resources_command(file: &Path, strip_version_info: bool) -> Result<()> {
    if !file.is_file() {
        return Err(anyhow!("Resource dump does not exist: {}", file.display()));
    }
    let rewritten = normalize_resource_dump(file, strip_version_info)
        .with_context(|| format!("Failed to normalize resource dump {}", file.display()))?;
    if rewritten {
        println!("Normalized resource dump: {}", file.display());
    } else {
        println!("Resource dump left unchanged (no --strip-version-info): {}", file.display());
    }
    Ok(())
}
