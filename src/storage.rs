//! Uploaded-file storage.
//!
//! Keeps the original uploaded files in a flat directory so they can be
//! listed and wiped on knowledge-base reset. The vector store is the only
//! component that reads the indexed content; this module only deals in
//! raw bytes.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create upload directory: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `bytes` under `filename` (the bare name only; path components
    /// are rejected so an upload cannot escape the directory).
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if name.is_empty() || name != filename {
            bail!("invalid upload filename: {}", filename);
        }

        let path = self.dir.join(name);
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to save upload: {}", path.display()))?;
        Ok(path)
    }

    /// Names of all stored files, sorted for stable output.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete every stored file. Returns the number removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())
                    .with_context(|| format!("Failed to delete {}", entry.path().display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
