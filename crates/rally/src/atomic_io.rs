use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `text` next to `path` first and renames it into place, so a crash
/// mid-write never leaves a truncated save behind.
pub(crate) fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let staged = StagedFile::write(path, text)?;
    staged.commit(path)
}

/// `Ok(None)` when the file does not exist.
pub(crate) fn read_text_if_present(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

/// Sibling file holding the new contents. Removed on drop unless committed.
struct StagedFile {
    path: Option<PathBuf>,
}

impl StagedFile {
    fn write(target: &Path, text: &str) -> io::Result<Self> {
        let staged = Self {
            path: Some(sibling_staging_path(target)),
        };
        if let Some(path) = &staged.path {
            fs::write(path, text)?;
        }
        Ok(staged)
    }

    fn commit(mut self, target: &Path) -> io::Result<()> {
        let Some(staging) = self.path.as_deref() else {
            return Ok(());
        };
        if fs::rename(staging, target).is_err() {
            // Platforms without replacing rename need the old file gone first.
            match fs::remove_file(target) {
                Err(error) if error.kind() != io::ErrorKind::NotFound => return Err(error),
                _ => fs::rename(staging, target)?,
            }
        }
        self.path = None;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = fs::remove_file(path);
        }
    }
}

/// `.<name>.<pid>.partial` in the target's directory.
fn sibling_staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(|| "rally".into(), |name| name.to_string_lossy());
    target.with_file_name(format!(".{name}.{}.partial", std::process::id()))
}
