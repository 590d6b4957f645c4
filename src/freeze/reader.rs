//! Loading and validating frozen records.
//!
//! Every way a record can be unusable (missing, unparseable, stale) is a
//! cache miss. Only failures to hash the input or to materialize include
//! files surface as errors.
use super::hash::hash_file;
use super::paths::{freeze_result_file, real_input_dir};
use super::types::{ComputationResult, FrozenRecord, IncludePoint};
use crate::temp::TempFiles;
use anyhow::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Validity of the record stored for an `(input, output)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordStatus {
    Missing,
    Corrupt { reason: String },
    Stale { stored: String, current: String },
    Fresh { hash: String },
}

impl RecordStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Missing => "missing",
            RecordStatus::Corrupt { .. } => "corrupt",
            RecordStatus::Stale { .. } => "stale",
            RecordStatus::Fresh { .. } => "fresh",
        }
    }
}

enum LoadedRecord {
    Missing,
    Corrupt(String),
    Loaded(FrozenRecord),
}

fn load_record(path: &Path) -> LoadedRecord {
    if !path.is_file() {
        return LoadedRecord::Missing;
    }
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => return LoadedRecord::Corrupt(format!("read failed: {err}")),
    };
    match serde_json::from_slice::<FrozenRecord>(&bytes) {
        Ok(record) => LoadedRecord::Loaded(record),
        Err(err) => LoadedRecord::Corrupt(err.to_string()),
    }
}

/// Classify the record for `(input, output)` against the current input bytes.
pub fn record_status(input: &Path, output: &Path) -> Result<RecordStatus> {
    let path = freeze_result_file(input, output, false)?;
    Ok(match load_record(&path) {
        LoadedRecord::Missing => RecordStatus::Missing,
        LoadedRecord::Corrupt(reason) => RecordStatus::Corrupt { reason },
        LoadedRecord::Loaded(record) => {
            let current = hash_file(input)?;
            if current == record.hash {
                RecordStatus::Fresh { hash: current }
            } else {
                RecordStatus::Stale {
                    stored: record.hash,
                    current,
                }
            }
        }
    })
}

/// Restore the frozen result for `(input, output)`.
///
/// Returns `None` on any cache miss. With `force` set, a parseable record is
/// used even when the input has changed since it was written. Include
/// content is written into files allocated from `temp`, which must outlive
/// every consumer of the returned result.
pub fn defrost_execute_result(
    input: &Path,
    output: &Path,
    force: bool,
    temp: &TempFiles,
) -> Result<Option<ComputationResult>> {
    let path = freeze_result_file(input, output, false)?;
    let record = match load_record(&path) {
        LoadedRecord::Missing => {
            tracing::debug!(path = %path.display(), "no frozen result");
            return Ok(None);
        }
        LoadedRecord::Corrupt(reason) => {
            tracing::debug!(path = %path.display(), %reason, "ignoring unreadable frozen result");
            return Ok(None);
        }
        LoadedRecord::Loaded(record) => record,
    };

    if !force {
        let current = hash_file(input)?;
        if current != record.hash {
            tracing::debug!(
                path = %path.display(),
                stored = %record.hash,
                current = %current,
                "frozen result is stale"
            );
            return Ok(None);
        }
    }

    let mut result = record.result;
    let real_dir = real_input_dir(input)?;
    result.supporting = result
        .supporting
        .into_iter()
        .map(|file| absolute_supporting(file, &real_dir))
        .collect();

    if let Some(includes) = result.includes.as_mut() {
        for point in IncludePoint::ALL {
            if let Some(entries) = includes.get_mut(point) {
                for entry in entries.iter_mut() {
                    let file = temp.write_text(point.key(), entry)?;
                    *entry = file.display().to_string();
                }
            }
        }
    }

    tracing::debug!(path = %path.display(), force, "using frozen result");
    Ok(Some(result))
}

fn absolute_supporting(file: PathBuf, real_dir: &Path) -> PathBuf {
    if file.is_absolute() {
        file
    } else {
        real_dir.join(file)
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
