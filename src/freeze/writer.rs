use super::hash::hash_file;
use super::paths::{freeze_result_file, input_dir, real_input_dir};
use super::types::{ComputationResult, FrozenRecord, IncludePoint};
use crate::fsutil::write_atomic;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Persist `result` for the `(input, output)` pair and return the record path.
///
/// Include files are inlined and supporting paths under the input directory
/// are made relative, so the record stays valid after the temp files are
/// gone or the project moves.
pub fn freeze_execute_result(
    input: &Path,
    output: &Path,
    result: &ComputationResult,
) -> Result<PathBuf> {
    let mut result = result.clone();
    if let Some(includes) = result.includes.as_mut() {
        for point in IncludePoint::ALL {
            if let Some(entries) = includes.get_mut(point) {
                for entry in entries.iter_mut() {
                    *entry = fs::read_to_string(&*entry)
                        .with_context(|| format!("read {} file {entry}", point.key()))?;
                }
            }
        }
    }

    let real_dir = real_input_dir(input)?;
    let abs_dir = std::path::absolute(input_dir(input)).unwrap_or_else(|_| real_dir.clone());
    result.supporting = result
        .supporting
        .into_iter()
        .map(|file| relative_supporting(file, &[real_dir.as_path(), abs_dir.as_path()]))
        .collect();

    let record = FrozenRecord {
        hash: hash_file(input)?,
        result,
    };
    let path = freeze_result_file(input, output, true)?;
    let json = serde_json::to_string_pretty(&record).context("serialize frozen record")?;
    write_atomic(&path, json.as_bytes())?;
    tracing::info!(path = %path.display(), hash = %record.hash, "froze result");
    Ok(path)
}

/// Strip the first matching input directory prefix from an absolute path.
fn relative_supporting(file: PathBuf, input_dirs: &[&Path]) -> PathBuf {
    if !file.is_absolute() {
        return file;
    }
    for dir in input_dirs {
        if let Ok(rel) = file.strip_prefix(dir) {
            return rel.to_path_buf();
        }
    }
    file
}
