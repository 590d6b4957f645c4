//! The project freezer: a durable mirror of per-input files directories.
//!
//! Subtrees are addressed by the files directory's project-relative path
//! without the `_files` suffix, under `_freeze/` at the project root or in
//! the hidden scratch area.
use super::{FILES_DIR_SUFFIX, FREEZE_RESULTS_DIR, PROJECT_FREEZE_DIR};
use crate::fsutil::{copy_file, copy_tree, remove_if_empty_dir, remove_if_exists};
use crate::project::ProjectContext;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Freezer root for `project`, without touching the filesystem.
fn freezer_root(project: &ProjectContext, hidden: bool) -> PathBuf {
    if hidden {
        project.scratch_path(PROJECT_FREEZE_DIR)
    } else {
        project.dir.join(PROJECT_FREEZE_DIR)
    }
}

/// Resolve (creating if needed) the freezer root for `project`.
pub fn project_freezer_dir(project: &ProjectContext, hidden: bool) -> Result<PathBuf> {
    let dir = freezer_root(project, hidden);
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    dir.canonicalize()
        .with_context(|| format!("resolve freezer {}", dir.display()))
}

/// Freezer subpath for a files directory (`posts/doc_files` -> `posts/doc`).
pub fn as_freezer_dir(files_dir: &Path) -> PathBuf {
    let text = files_dir.to_string_lossy();
    match text.strip_suffix(FILES_DIR_SUFFIX) {
        Some(stripped) => PathBuf::from(stripped),
        None => files_dir.to_path_buf(),
    }
}

/// Reject paths that could resolve outside the directory they are joined to.
fn ensure_contained<'a>(path: &'a Path, what: &str) -> Result<&'a Path> {
    let mut named = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            _ => {
                return Err(anyhow!(
                    "{what} must be a relative path inside the project, got {}",
                    path.display()
                ))
            }
        }
    }
    if !named {
        return Err(anyhow!("{what} is empty"));
    }
    Ok(path)
}

/// Freezer location of a frozen record, given its project-relative path
/// (`posts/doc_files/execute-results/html.json`).
pub fn freezer_freeze_file(
    project: &ProjectContext,
    freeze_file: &Path,
    hidden: bool,
) -> Result<PathBuf> {
    let freeze_file = ensure_contained(freeze_file, "frozen record path")?;
    let (Some(name), Some(files_dir)) = (
        freeze_file.file_name(),
        freeze_file.parent().and_then(Path::parent),
    ) else {
        return Err(anyhow!(
            "frozen record path has no files directory: {}",
            freeze_file.display()
        ));
    };
    let files_dir = ensure_contained(files_dir, "files directory")?;
    Ok(freezer_root(project, hidden)
        .join(as_freezer_dir(files_dir))
        .join(FREEZE_RESULTS_DIR)
        .join(name))
}

/// Freezer location of a supporting directory (`figure-html`) of a files
/// directory.
pub fn freezer_figs_dir(
    project: &ProjectContext,
    files_dir: &Path,
    figs_dir: &Path,
    hidden: bool,
) -> Result<PathBuf> {
    let files_dir = ensure_contained(files_dir, "files directory")?;
    let figs_dir = ensure_contained(figs_dir, "supporting directory")?;
    Ok(freezer_root(project, hidden)
        .join(as_freezer_dir(files_dir))
        .join(figs_dir))
}

/// Copy a project files directory into the freezer.
///
/// Incremental copies add or overwrite individual record files and copy
/// every other entry wholesale; records already in the freezer are never
/// deleted.
pub fn copy_to_project_freezer(
    project: &ProjectContext,
    files_dir: &Path,
    hidden: bool,
    incremental: bool,
) -> Result<usize> {
    let files_dir = ensure_contained(files_dir, "files directory")?;
    let freezer_dir = project_freezer_dir(project, hidden)?;
    let src_files_dir = project.dir.join(files_dir);
    let dest_files_dir = freezer_dir.join(as_freezer_dir(files_dir));
    if !src_files_dir.is_dir() {
        return Err(anyhow!(
            "no files directory at {}",
            src_files_dir.display()
        ));
    }

    let copied = if incremental {
        let mut copied = 0;
        for entry in fs::read_dir(&src_files_dir)
            .with_context(|| format!("read {}", src_files_dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name();
            if name == FREEZE_RESULTS_DIR {
                copied += copy_records(project, files_dir, &entry.path(), hidden)?;
            } else {
                let dest = freezer_figs_dir(project, files_dir, Path::new(&name), hidden)?;
                copied += copy_tree(&entry.path(), &dest)?;
            }
        }
        copied
    } else {
        copy_tree(&src_files_dir, &dest_files_dir)?
    };

    tracing::info!(
        src = %src_files_dir.display(),
        dest = %dest_files_dir.display(),
        incremental,
        copied,
        "copied to freezer"
    );
    Ok(copied)
}

fn copy_records(
    project: &ProjectContext,
    files_dir: &Path,
    results_dir: &Path,
    hidden: bool,
) -> Result<usize> {
    let mut copied = 0;
    for entry in
        fs::read_dir(results_dir).with_context(|| format!("read {}", results_dir.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let record = files_dir.join(FREEZE_RESULTS_DIR).join(entry.file_name());
            copy_file(&entry.path(), &freezer_freeze_file(project, &record, hidden)?)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Seed a project files directory from the freezer, if the freezer has it.
pub fn copy_from_project_freezer(
    project: &ProjectContext,
    files_dir: &Path,
    hidden: bool,
) -> Result<bool> {
    let files_dir = ensure_contained(files_dir, "files directory")?;
    let freezer_dir = project_freezer_dir(project, hidden)?;
    let src_files_dir = freezer_dir.join(as_freezer_dir(files_dir));
    if !src_files_dir.exists() {
        return Ok(false);
    }
    let dest_files_dir = project.dir.join(files_dir);
    let copied = copy_tree(&src_files_dir, &dest_files_dir)?;
    tracing::info!(
        src = %src_files_dir.display(),
        dest = %dest_files_dir.display(),
        copied,
        "copied from freezer"
    );
    Ok(true)
}

/// Remove named entries from a freezer subtree, then the subtree if empty.
pub fn prune_project_freezer_dir(
    project: &ProjectContext,
    files_dir: &Path,
    files: &[PathBuf],
    hidden: bool,
) -> Result<()> {
    let files_dir = ensure_contained(files_dir, "files directory")?;
    for file in files {
        ensure_contained(file, "pruned entry")?;
    }
    let freezer_dir = project_freezer_dir(project, hidden)?;
    let subtree = freezer_dir.join(as_freezer_dir(files_dir));
    for file in files {
        remove_if_exists(&subtree.join(file))?;
    }
    if remove_if_empty_dir(&subtree)? {
        tracing::debug!(path = %subtree.display(), "pruned empty freezer dir");
    }
    Ok(())
}

/// Remove the freezer root when nothing but the shared library dir (or
/// nothing at all) is left in it. Returns whether the root was removed.
pub fn prune_project_freezer(project: &ProjectContext, hidden: bool) -> Result<bool> {
    let freezer_dir = project_freezer_dir(project, hidden)?;
    let removed = match project.config.lib_dir.as_deref() {
        Some(lib_dir) => {
            let mut only_lib_dir = true;
            for entry in fs::read_dir(&freezer_dir)
                .with_context(|| format!("read {}", freezer_dir.display()))?
            {
                let entry = entry?;
                if entry.file_type()?.is_file() || entry.file_name() != lib_dir {
                    only_lib_dir = false;
                    break;
                }
            }
            only_lib_dir && remove_if_exists(&freezer_dir)?
        }
        None => remove_if_empty_dir(&freezer_dir)?,
    };
    if removed {
        tracing::info!(path = %freezer_dir.display(), "removed freezer");
    }
    Ok(removed)
}

#[cfg(test)]
#[path = "freezer_tests.rs"]
mod tests;
