//! Scoped allocation of temporary files for a single render.
//!
//! Files handed out by [`TempFiles`] live until the allocator is dropped,
//! unless it was rooted at a caller-owned directory.
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug)]
enum TempRoot {
    Scoped(TempDir),
    Kept(PathBuf),
}

#[derive(Debug)]
pub struct TempFiles {
    root: TempRoot,
}

impl TempFiles {
    /// Allocate into a fresh directory removed when `self` is dropped.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("docfreeze-")
            .tempdir()
            .context("create temp dir")?;
        Ok(Self {
            root: TempRoot::Scoped(dir),
        })
    }

    /// Allocate into `dir`, leaving the files in place after drop.
    pub fn in_dir(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(Self {
            root: TempRoot::Kept(dir.to_path_buf()),
        })
    }

    pub fn dir(&self) -> &Path {
        match &self.root {
            TempRoot::Scoped(dir) => dir.path(),
            TempRoot::Kept(dir) => dir,
        }
    }

    /// Write `contents` into a new uniquely named file and return its path.
    pub fn write_text(&self, prefix: &str, contents: &str) -> Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{prefix}-"))
            .tempfile_in(self.dir())
            .with_context(|| format!("create temp file in {}", self.dir().display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("write {}", file.path().display()))?;
        let (_, path) = file.keep().context("keep temp file")?;
        Ok(path)
    }
}
