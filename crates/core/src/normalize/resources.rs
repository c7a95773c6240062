//! Version-stamp scrubbing for the Win32 resource dump (`output.res`).
//!
//! The dump is read as UTF-16LE text and run through an erase-only rule set.
//! Malformed code units are replaced with U+FFFD, so a rewrite is lossy for
//! non-text bytes; it only happens when version info is being stripped.

use std::io::{BufWriter, Write};
use std::path::Path;

use encoding_rs::UTF_16LE;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::normalize::{replace_file_with, RedactionRule, RuleSet};
use crate::services::disassembly::DisassemblyError;

/// The version-info block marker through its `VarFileInfo` marker.
pub const VERSION_INFO_BLOCK: &str = r"VS_VERSION_INFO.*?VarFileInfo";
/// Dotted number after a version field label and its NUL padding.
pub const VERSION_FIELD_VALUE: &str =
    r"(?P<keep>(?:FileVersion|ProductVersion|Assembly Version)\x00*)[0-9]+(?:\.[0-9]+)*";

static RESOURCE_RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new(
        [VERSION_INFO_BLOCK, VERSION_FIELD_VALUE]
            .into_iter()
            .map(|pattern| RedactionRule::erase(pattern).expect("valid resource erase regex"))
            .collect(),
    )
});

pub fn resource_rules() -> &'static RuleSet {
    &*RESOURCE_RULES
}

/// Strip version stamps from a resource dump in place.
///
/// Without `strip_version_info` the file is not touched. Returns whether it was rewritten.
pub fn normalize_resource_dump(
    path: &Path,
    strip_version_info: bool,
) -> Result<bool, DisassemblyError> {
    if !strip_version_info {
        return Ok(false);
    }

    let bytes = std::fs::read(path).map_err(|e| DisassemblyError::io(path, e))?;
    let (text, had_errors) = UTF_16LE.decode_without_bom_handling(&bytes);
    if had_errors {
        warn!(file = %path.display(), "resource dump has malformed UTF-16; rewrite is lossy");
    }
    let (normalized, stats) = RESOURCE_RULES.rewrite_str(&text);

    replace_file_with(path, |staged| {
        let mut writer = BufWriter::new(staged);
        writer.write_all(&encode_wide(&normalized))?;
        writer.flush()
    })?;
    debug!(file = %path.display(), ?stats, "normalized resource dump");
    Ok(true)
}

/// Decode UTF-16LE without BOM sniffing; a BOM survives as U+FEFF.
pub fn decode_wide(bytes: &[u8]) -> String {
    let (text, _had_errors) = UTF_16LE.decode_without_bom_handling(bytes);
    text.into_owned()
}

pub fn encode_wide(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
