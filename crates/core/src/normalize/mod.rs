//! Line-streaming rewriter that strips build noise from disassembly text.
//!
//! A [`RuleSet`] is an ordered list of [`RedactionRule`]s. For every input line
//! the rewriter first applies each erase rule in order, then tests each skip
//! trigger in order against the erased line. A trigger drops the line and the
//! next `count` lines whatever they contain; those lines bypass all rules.
//! The only state carried between lines is the pending-skip counter.
//!
//! Erasing never removes a line: a fully erased line is emitted empty.

pub mod resources;
pub mod rules;

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use regex::{Captures, Regex};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::services::disassembly::DisassemblyError;

/// Capture group an erase pattern may use to keep part of its match.
pub const KEEP_GROUP: &str = "keep";

#[derive(Debug, Clone)]
pub enum RedactionRule {
    /// Erase every match within the line. Text captured by a group named
    /// [`KEEP_GROUP`] survives in place of the match.
    Erase(Regex),
    /// Drop a matching line plus the `count` lines after it.
    Skip { trigger: Regex, count: usize },
}

impl RedactionRule {
    pub fn erase(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Erase(Regex::new(pattern)?))
    }

    pub fn skip(pattern: &str, count: usize) -> Result<Self, regex::Error> {
        Ok(Self::Skip { trigger: Regex::new(pattern)?, count })
    }
}

/// Counters reported by a rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    pub lines_read: usize,
    pub lines_emitted: usize,
    /// Emitted lines that at least one erase rule changed.
    pub lines_erased: usize,
    /// Trigger lines plus the lines they suppressed.
    pub lines_skipped: usize,
    /// Lines holding invalid UTF-8, decoded with replacement characters.
    pub lines_lossy: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<RedactionRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<RedactionRule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: RedactionRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[RedactionRule] {
        &self.rules
    }

    pub fn rewriter(&self) -> LineRewriter<'_> {
        LineRewriter { rules: self, pending_skip: 0, stats: RewriteStats::default() }
    }

    /// Stream `reader` into `writer`, keeping each surviving line's terminator.
    ///
    /// Invalid UTF-8 does not abort the pass; such lines are decoded lossily.
    pub fn rewrite<R: BufRead, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
    ) -> io::Result<RewriteStats> {
        let mut rewriter = self.rewriter();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            if let Cow::Owned(_) = line {
                rewriter.stats.lines_lossy += 1;
            }
            let (body, terminator) = split_terminator(&line);
            if let Some(out) = rewriter.feed(body) {
                writer.write_all(out.as_bytes())?;
                writer.write_all(terminator.as_bytes())?;
            }
        }
        writer.flush()?;
        let stats = rewriter.finish();
        if stats.lines_lossy > 0 {
            warn!(lines = stats.lines_lossy, "input had malformed UTF-8; replaced with U+FFFD");
        }
        Ok(stats)
    }

    pub fn rewrite_str(&self, text: &str) -> (String, RewriteStats) {
        let mut rewriter = self.rewriter();
        let mut out = String::with_capacity(text.len());
        for piece in text.split_inclusive('\n') {
            let (body, terminator) = split_terminator(piece);
            if let Some(line) = rewriter.feed(body) {
                out.push_str(&line);
                out.push_str(terminator);
            }
        }
        (out, rewriter.finish())
    }
}

/// One pass of a [`RuleSet`] over a sequence of lines.
#[derive(Debug)]
pub struct LineRewriter<'r> {
    rules: &'r RuleSet,
    pending_skip: usize,
    stats: RewriteStats,
}

impl<'r> LineRewriter<'r> {
    /// Rewrite one line (without terminator). `None` means the line is dropped.
    pub fn feed<'l>(&mut self, line: &'l str) -> Option<Cow<'l, str>> {
        self.stats.lines_read += 1;
        if self.pending_skip > 0 {
            self.pending_skip -= 1;
            self.stats.lines_skipped += 1;
            return None;
        }

        let mut current = Cow::Borrowed(line);
        for rule in &self.rules.rules {
            if let RedactionRule::Erase(pattern) = rule {
                let erased = match erase(pattern, &current) {
                    Cow::Owned(text) => Some(text),
                    Cow::Borrowed(_) => None,
                };
                if let Some(text) = erased {
                    current = Cow::Owned(text);
                }
            }
        }

        for rule in &self.rules.rules {
            if let RedactionRule::Skip { trigger, count } = rule {
                if trigger.is_match(&current) {
                    self.pending_skip = *count;
                    self.stats.lines_skipped += 1;
                    return None;
                }
            }
        }

        if current != line {
            self.stats.lines_erased += 1;
        }
        self.stats.lines_emitted += 1;
        Some(current)
    }

    pub fn pending_skip(&self) -> usize {
        self.pending_skip
    }

    /// Stats so far. A pending skip running past the end simply lapses.
    pub fn finish(self) -> RewriteStats {
        self.stats
    }
}

fn erase<'h>(pattern: &Regex, line: &'h str) -> Cow<'h, str> {
    pattern.replace_all(line, |caps: &Captures<'_>| {
        caps.name(KEEP_GROUP).map(|m| m.as_str().to_string()).unwrap_or_default()
    })
}

fn split_terminator(line: &str) -> (&str, &str) {
    let body_len = match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest).len(),
        None => line.len(),
    };
    line.split_at(body_len)
}

/// Normalize an IL text file in place.
///
/// The output is staged next to the file and swapped in only on success;
/// on error the original is left untouched.
pub fn normalize_il_file(
    path: &Path,
    strip_version_info: bool,
) -> Result<RewriteStats, DisassemblyError> {
    let input = File::open(path).map_err(|e| DisassemblyError::io(path, e))?;
    let rules = rules::il_rules(strip_version_info);
    let stats = replace_file_with(path, |staged| {
        rules.rewrite(BufReader::new(input), BufWriter::new(staged))
    })?;
    debug!(file = %path.display(), strip_version_info, ?stats, "normalized IL file");
    Ok(stats)
}

/// In-memory form of [`normalize_il_file`].
pub fn normalize_text(text: &str, strip_version_info: bool) -> String {
    rules::il_rules(strip_version_info).rewrite_str(text).0
}

/// Write new contents for `path` through a sibling temp file, then rename it over `path`.
pub(crate) fn replace_file_with<T>(
    path: &Path,
    write: impl FnOnce(&mut File) -> io::Result<T>,
) -> Result<T, DisassemblyError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(parent).map_err(|e| DisassemblyError::io(parent, e))?;
    let value = write(staged.as_file_mut()).map_err(|e| DisassemblyError::io(path, e))?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(staged.path(), meta.permissions())
            .map_err(|e| DisassemblyError::io(staged.path(), e))?;
    }
    staged.persist(path).map_err(|e| DisassemblyError::io(path, e.error))?;
    Ok(value)
}
