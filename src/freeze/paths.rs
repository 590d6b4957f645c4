//! Path derivation for per-input result stores.
//!
//! Every location is a pure function of the input and output paths; the only
//! side effect is the optional directory creation in [`freeze_result_file`].
use super::{FILES_DIR_SUFFIX, FREEZE_RESULTS_DIR, RECORD_EXT};
use crate::fsutil::{remove_if_empty_dir, remove_if_exists};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layouts a files directory may carry results in.
///
/// Only [`StoreLayout::Current`] is ever read; older layouts are known so
/// cleanup can remove them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLayout {
    Current,
    Legacy,
}

impl StoreLayout {
    pub const ALL: [StoreLayout; 2] = [StoreLayout::Current, StoreLayout::Legacy];

    pub fn dir_name(self) -> &'static str {
        match self {
            StoreLayout::Current => FREEZE_RESULTS_DIR,
            StoreLayout::Legacy => "execute",
        }
    }
}

/// Name of the files directory for `input` (`doc.md` -> `doc_files`).
pub fn input_files_dir(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}{FILES_DIR_SUFFIX}")
}

/// Extension naming the record for `output`.
///
/// A bare format name without an extension (`html`) is used as-is.
pub fn output_ext(output: &Path) -> String {
    output
        .extension()
        .or_else(|| output.file_name())
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory holding `input`, with an empty parent meaning the current dir.
pub(crate) fn input_dir(input: &Path) -> &Path {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Symlink-resolved directory holding `input`.
pub(crate) fn real_input_dir(input: &Path) -> Result<PathBuf> {
    let dir = input_dir(input);
    fs::canonicalize(dir).with_context(|| format!("resolve {}", dir.display()))
}

/// Record path for the `(input, output)` pair.
pub fn freeze_result_file(input: &Path, output: &Path, ensure_dir: bool) -> Result<PathBuf> {
    let files_dir = input_dir(input).join(input_files_dir(input));
    let results_dir = files_dir.join(StoreLayout::Current.dir_name());
    if ensure_dir {
        fs::create_dir_all(&results_dir)
            .with_context(|| format!("create {}", results_dir.display()))?;
    }
    Ok(results_dir.join(format!("{}.{RECORD_EXT}", output_ext(output))))
}

/// Remove every known results layout from `files_dir`, then the files
/// directory itself if nothing else is left in it.
pub fn remove_freeze_results(files_dir: &Path) -> Result<()> {
    for layout in StoreLayout::ALL {
        if remove_if_exists(&files_dir.join(layout.dir_name()))? {
            tracing::debug!(
                path = %files_dir.display(),
                layout = layout.dir_name(),
                "removed results"
            );
        }
    }
    remove_if_empty_dir(files_dir)?;
    Ok(())
}
