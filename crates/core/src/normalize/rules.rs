//! Fixed rule sets for ildasm text output.

use once_cell::sync::Lazy;

use crate::normalize::{RedactionRule, RuleSet};

/// `// MVID: {...}`
pub const MVID_COMMENT: &str = r"^\s*// MVID:.*$";
/// `// Image base: 0x...`
pub const IMAGE_BASE_COMMENT: &str = r"^\s*// Image base:.*$";
/// `.imagebase 0x...`
pub const IMAGE_BASE_DIRECTIVE: &str = r"^\s*\.imagebase\b.*$";
/// `// Time-date stamp: 0x...`
pub const TIME_DATE_STAMP_COMMENT: &str = r"^\s*// Time-date stamp:.*$";
/// The GUID suffix compilers append to `<PrivateImplementationDetails>`.
pub const PRIVATE_IMPLEMENTATION_DETAILS: &str = r"(?P<keep><PrivateImplementationDetails>)\{[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}\}";
/// A commented-out custom attribute line, from `// .custom` to end of line.
/// Only lines that begin with the comment match.
pub const CUSTOM_ATTRIBUTE_COMMENT: &str = r"^(?P<keep>\s*)//\s*\.custom\b.*$";
/// A raw hex-dump line: byte groups, optional `)`, then a `//` comment. Erased whole.
pub const HEX_DUMP_COMMENT: &str =
    r"^\s*[0-9A-Fa-f]{2}(?:\s+[0-9A-Fa-f]{2})*(?:\s*\))?\s*//.*$";
/// Header announcing the entry point stub; it and the next two lines vary with layout.
pub const ENTRY_POINT_CODE: &str = r"^\s*//.*Entry point code";
pub const ENTRY_POINT_SKIP: usize = 2;

/// `.ver 1:2:3:4`
pub const VERSION_DIRECTIVE: &str = r"^\s*\.ver\s+[0-9]+:[0-9]+:[0-9]+:[0-9]+\s*$";
/// `.custom ... AssemblyFileVersionAttribute::.ctor(string) = ( ... )`
pub const FILE_VERSION_ATTRIBUTE: &str = r"^\s*\.custom\b.*\bAssemblyFileVersionAttribute\b.*$";

static IL_RULES: Lazy<RuleSet> = Lazy::new(|| build(false));
static IL_RULES_STRIP_VERSION: Lazy<RuleSet> = Lazy::new(|| build(true));

/// The rule set for ildasm text, optionally also erasing version stamps.
pub fn il_rules(strip_version_info: bool) -> &'static RuleSet {
    if strip_version_info {
        &*IL_RULES_STRIP_VERSION
    } else {
        &*IL_RULES
    }
}

fn build(strip_version_info: bool) -> RuleSet {
    let mut erase = vec![
        MVID_COMMENT,
        IMAGE_BASE_COMMENT,
        IMAGE_BASE_DIRECTIVE,
        TIME_DATE_STAMP_COMMENT,
        PRIVATE_IMPLEMENTATION_DETAILS,
        CUSTOM_ATTRIBUTE_COMMENT,
        HEX_DUMP_COMMENT,
    ];
    if strip_version_info {
        erase.extend([VERSION_DIRECTIVE, FILE_VERSION_ATTRIBUTE]);
    }

    let mut rules: Vec<RedactionRule> = erase
        .into_iter()
        .map(|pattern| RedactionRule::erase(pattern).expect("valid IL erase regex"))
        .collect();
    rules.push(
        RedactionRule::skip(ENTRY_POINT_CODE, ENTRY_POINT_SKIP).expect("valid entry point regex"),
    );
    RuleSet::new(rules)
}
