//! Render orchestration around the freeze cache.
//!
//! Engines and converters are external collaborators; this module decides
//! whether a frozen result can stand in for an engine run and keeps the
//! project freezer in step with the per-input store.
use crate::freeze::{
    copy_from_project_freezer, copy_to_project_freezer, defrost_execute_result,
    freeze_execute_result, freezer_freeze_file, input_files_dir, ComputationResult, IncludePoint,
    FREEZE_RESULTS_DIR,
};
use crate::project::{FreezeMode, ProjectContext};
use crate::temp::TempFiles;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Runs the embedded computations of an input document.
pub trait ComputationEngine {
    fn execute(&self, input: &Path, output: &Path) -> Result<ComputationResult>;
}

/// Turns an input plus its computation result into the final output.
pub trait Converter {
    fn convert(&self, input: &Path, output: &Path, result: &ComputationResult) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub project: Option<&'a ProjectContext>,
    pub freeze: FreezeMode,
    /// Use the hidden scratch freezer instead of `_freeze/`.
    pub hidden_freezer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Frozen,
    Computed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub source: ResultSource,
    pub record_path: Option<PathBuf>,
    /// Mirror of `record_path` in the project freezer, once synced.
    pub freezer_record_path: Option<PathBuf>,
}

/// Render one input, reusing a frozen result when the freeze mode allows.
pub fn render(
    request: &RenderRequest<'_>,
    engine: &dyn ComputationEngine,
    converter: &dyn Converter,
) -> Result<RenderOutcome> {
    let temp = TempFiles::new()?;
    // The freezer is only consulted when results may be frozen.
    let files_dir = match request.project {
        Some(project) if request.freeze != FreezeMode::Off => {
            Some(project_files_dir(project, request.input)?)
        }
        _ => None,
    };

    if let (Some(project), Some(files_dir)) = (request.project, files_dir.as_deref()) {
        if let Err(err) = copy_from_project_freezer(project, files_dir, request.hidden_freezer) {
            tracing::warn!(error = %format!("{err:#}"), "failed to copy from freezer");
        }
    }

    let frozen = match request.freeze {
        FreezeMode::Off => None,
        FreezeMode::Auto => defrost_execute_result(request.input, request.output, false, &temp)?,
        FreezeMode::Always => defrost_execute_result(request.input, request.output, true, &temp)?,
    };

    let mut freezer_record_path = None;
    let (result, source, record_path) = match frozen {
        Some(result) => (result, ResultSource::Frozen, None),
        None => {
            let result = engine
                .execute(request.input, request.output)
                .with_context(|| format!("execute {}", request.input.display()))?;
            let record_path = if request.freeze == FreezeMode::Off {
                None
            } else {
                let path = freeze_execute_result(request.input, request.output, &result)?;
                if let (Some(project), Some(files_dir)) = (request.project, files_dir.as_deref())
                {
                    match sync_to_freezer(project, files_dir, &path, request.hidden_freezer) {
                        Ok(mirror) => freezer_record_path = Some(mirror),
                        Err(err) => {
                            tracing::warn!(error = %format!("{err:#}"), "failed to copy to freezer");
                        }
                    }
                }
                Some(path)
            };
            (result, ResultSource::Computed, record_path)
        }
    };

    let include_files: usize = result
        .includes
        .as_ref()
        .map(|includes| {
            IncludePoint::ALL
                .iter()
                .filter_map(|point| includes.get(*point))
                .map(Vec::len)
                .sum()
        })
        .unwrap_or(0);
    tracing::info!(
        input = %request.input.display(),
        source = ?source,
        mode = %request.freeze,
        include_files,
        "rendering"
    );
    converter
        .convert(request.input, request.output, &result)
        .with_context(|| format!("convert {}", request.input.display()))?;
    Ok(RenderOutcome {
        source,
        record_path,
        freezer_record_path,
    })
}

/// Incrementally copy `files_dir` into the freezer and return the mirror of
/// `record`.
fn sync_to_freezer(
    project: &ProjectContext,
    files_dir: &Path,
    record: &Path,
    hidden: bool,
) -> Result<PathBuf> {
    copy_to_project_freezer(project, files_dir, hidden, true)?;
    let name = record
        .file_name()
        .with_context(|| format!("record path has no file name: {}", record.display()))?;
    freezer_freeze_file(project, &files_dir.join(FREEZE_RESULTS_DIR).join(name), hidden)
}

/// Files directory of `input`, relative to the project root.
fn project_files_dir(project: &ProjectContext, input: &Path) -> Result<PathBuf> {
    let input = input
        .canonicalize()
        .with_context(|| format!("resolve {}", input.display()))?;
    let rel = input
        .strip_prefix(&project.dir)
        .with_context(|| format!("{} is outside the project", input.display()))?;
    let parent = rel.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(input_files_dir(rel)))
}
