use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::services::disassembly::DisassemblyError;

/// File name of the disassembler executable on this platform.
pub const TOOL_FILE_NAME: &str = if cfg!(windows) { "ildasm.exe" } else { "ildasm" };

const COPY_BUFFER_SIZE: usize = 8192;

static SHARED: OnceCell<Arc<ToolProvisioner>> = OnceCell::new();

/// Where a bundled payload's bytes come from.
#[derive(Debug, Clone)]
pub enum PayloadSource {
    Static(&'static [u8]),
    File(PathBuf),
}

/// A named payload that can be materialized onto disk.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub name: String,
    pub source: PayloadSource,
}

impl BundleEntry {
    /// Payload compiled into the binary, e.g. via `include_bytes!`.
    pub fn from_static(name: impl Into<String>, bytes: &'static [u8]) -> Self {
        Self { name: name.into(), source: PayloadSource::Static(bytes) }
    }

    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), source: PayloadSource::File(path.into()) }
    }

    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        match &self.source {
            PayloadSource::Static(bytes) => Ok(Box::new(*bytes)),
            PayloadSource::File(path) => Ok(Box::new(File::open(path)?)),
        }
    }

    fn origin(&self) -> PathBuf {
        match &self.source {
            PayloadSource::Static(_) => PathBuf::from(&self.name),
            PayloadSource::File(path) => path.clone(),
        }
    }
}

/// The set of payloads shipped alongside the program.
#[derive(Debug, Clone, Default)]
pub struct ToolBundle {
    entries: Vec<BundleEntry>,
}

impl ToolBundle {
    pub fn new(entries: Vec<BundleEntry>) -> Self {
        Self { entries }
    }

    /// Every regular file under `dir`, named by its `/`-separated relative path.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, DisassemblyError> {
        let dir = dir.as_ref();
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                DisassemblyError::io(path, io::Error::from(e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push(BundleEntry::from_file(name, entry.path()));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// First entry whose name ends with `suffix`, ignoring ASCII case.
    pub fn find(&self, suffix: &str) -> Option<&BundleEntry> {
        let suffix = suffix.to_ascii_lowercase();
        self.entries.iter().find(|entry| entry.name.to_ascii_lowercase().ends_with(&suffix))
    }

    fn describe(&self) -> String {
        if self.entries.is_empty() {
            "empty bundle".to_string()
        } else {
            self.entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>().join(", ")
        }
    }
}

/// Materializes the disassembler into a well-known directory, at most once.
///
/// An existing file at the target is always accepted as-is, even if it came
/// from an older bundle.
#[derive(Debug)]
pub struct ToolProvisioner {
    target_dir: PathBuf,
    file_name: String,
    bundle: ToolBundle,
    resolved: OnceCell<PathBuf>,
}

impl ToolProvisioner {
    pub fn new(target_dir: impl Into<PathBuf>, bundle: ToolBundle) -> Self {
        Self {
            target_dir: target_dir.into(),
            file_name: TOOL_FILE_NAME.to_string(),
            bundle,
            resolved: OnceCell::new(),
        }
    }

    /// Override the executable name looked up in the bundle and written to disk.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Process-wide provisioner. The first successful `init` wins; later calls
    /// get the same instance without running theirs. A failed `init` leaves
    /// the slot empty for the next caller.
    pub fn shared(
        init: impl FnOnce() -> Result<ToolProvisioner, DisassemblyError>,
    ) -> Result<Arc<ToolProvisioner>, DisassemblyError> {
        SHARED.get_or_try_init(|| init().map(Arc::new)).cloned()
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn target_path(&self) -> PathBuf {
        self.target_dir.join(&self.file_name)
    }

    /// Path to a usable tool, materializing it from the bundle on first use.
    pub fn ensure_tool_available(&self) -> Result<PathBuf, DisassemblyError> {
        self.resolved.get_or_try_init(|| self.materialize()).cloned()
    }

    fn materialize(&self) -> Result<PathBuf, DisassemblyError> {
        let target = self.target_path();
        if target.is_file() {
            debug!(tool = %target.display(), "disassembler already present");
            return Ok(target);
        }

        let entry = self.bundle.find(&self.file_name).ok_or_else(|| {
            DisassemblyError::ToolProvisioning {
                wanted: self.file_name.clone(),
                searched: self.bundle.describe(),
            }
        })?;

        fs::create_dir_all(&self.target_dir)
            .map_err(|e| DisassemblyError::io(&self.target_dir, e))?;
        let mut staged = NamedTempFile::new_in(&self.target_dir)
            .map_err(|e| DisassemblyError::io(&self.target_dir, e))?;
        {
            let mut reader = entry.open().map_err(|e| DisassemblyError::io(entry.origin(), e))?;
            let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, staged.as_file_mut());
            let copied = copy_bounded(&mut reader, &mut writer)
                .map_err(|e| DisassemblyError::io(&target, e))?;
            debug!(bytes = copied, source = %entry.name, "staged disassembler payload");
        }
        make_executable(staged.path())?;

        match staged.persist_noclobber(&target) {
            Ok(_) => info!(tool = %target.display(), "materialized disassembler"),
            // Someone else materialized it between our check and our write.
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                debug!(tool = %target.display(), "disassembler materialized concurrently")
            }
            Err(err) => return Err(DisassemblyError::io(&target, err.error)),
        }
        Ok(target)
    }
}

fn copy_bounded(reader: &mut dyn Read, writer: &mut dyn Write) -> io::Result<u64> {
    let mut buf = [0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    Ok(total)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), DisassemblyError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| DisassemblyError::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), DisassemblyError> {
    Ok(())
}
