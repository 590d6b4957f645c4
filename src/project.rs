//! Project context and the project-owned `_project.json` config.
//!
//! A missing config file means defaults; a present one must parse and carry
//! the current schema version.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Current schema version for `_project.json`.
pub const PROJECT_SCHEMA_VERSION: u32 = 1;
/// Project config file name, relative to the project root.
pub const PROJECT_CONFIG_FILE: &str = "_project.json";
/// Scratch directory used when the config does not name one.
pub const DEFAULT_SCRATCH_DIR: &str = ".docfreeze";

/// When renders may reuse frozen results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "FreezeValue", into = "FreezeValue")]
pub enum FreezeMode {
    /// Always recompute; nothing is frozen.
    #[default]
    Off,
    /// Reuse a frozen result only while the input hash matches.
    Auto,
    /// Reuse any parseable frozen result, even for a changed input.
    Always,
}

/// Serialized form of [`FreezeMode`]: a boolean or a mode name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FreezeValue {
    Flag(bool),
    Named(String),
}

impl TryFrom<FreezeValue> for FreezeMode {
    type Error = String;

    fn try_from(value: FreezeValue) -> std::result::Result<Self, Self::Error> {
        match value {
            FreezeValue::Flag(true) => Ok(FreezeMode::Always),
            FreezeValue::Flag(false) => Ok(FreezeMode::Off),
            FreezeValue::Named(name) => name.parse(),
        }
    }
}

impl From<FreezeMode> for FreezeValue {
    fn from(mode: FreezeMode) -> Self {
        match mode {
            FreezeMode::Off => FreezeValue::Flag(false),
            FreezeMode::Auto => FreezeValue::Named("auto".to_string()),
            FreezeMode::Always => FreezeValue::Flag(true),
        }
    }
}

impl FromStr for FreezeMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "auto" => Ok(FreezeMode::Auto),
            "true" => Ok(FreezeMode::Always),
            "false" => Ok(FreezeMode::Off),
            other => Err(format!(
                "unknown freeze mode {other:?} (expected auto, true, or false)"
            )),
        }
    }
}

impl fmt::Display for FreezeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FreezeMode::Off => "false",
            FreezeMode::Auto => "auto",
            FreezeMode::Always => "true",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    #[serde(rename = "schema_version")]
    pub schema_version: u32,
    /// Shared library-output directory that may be left behind in the freezer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lib_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<String>,
    #[serde(default)]
    pub freeze: FreezeMode,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            schema_version: PROJECT_SCHEMA_VERSION,
            lib_dir: None,
            scratch_dir: None,
            freeze: FreezeMode::Off,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub dir: PathBuf,
    pub config: ProjectConfig,
}

impl ProjectContext {
    pub fn new(dir: PathBuf, config: ProjectConfig) -> Self {
        Self { dir, config }
    }

    /// Path under the project's hidden scratch area.
    pub fn scratch_path(&self, name: &str) -> PathBuf {
        let scratch = self
            .config
            .scratch_dir
            .as_deref()
            .unwrap_or(DEFAULT_SCRATCH_DIR);
        self.dir.join(scratch).join(name)
    }
}

/// Resolve the project root and load its config.
pub fn load_project(dir: &Path) -> Result<ProjectContext> {
    let root = dir
        .canonicalize()
        .with_context(|| format!("resolve project root {}", dir.display()))?;
    let path = root.join(PROJECT_CONFIG_FILE);
    let config = if path.is_file() {
        let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
        let config: ProjectConfig =
            serde_json::from_slice(&bytes).context("parse project config JSON")?;
        validate_config(&config)?;
        config
    } else {
        ProjectConfig::default()
    };
    Ok(ProjectContext::new(root, config))
}

pub fn validate_config(config: &ProjectConfig) -> Result<()> {
    if config.schema_version != PROJECT_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported {PROJECT_CONFIG_FILE} schema_version {} (expected {PROJECT_SCHEMA_VERSION})",
            config.schema_version
        ));
    }
    for (field, value) in [
        ("lib-dir", config.lib_dir.as_deref()),
        ("scratch-dir", config.scratch_dir.as_deref()),
    ] {
        if let Some(value) = value {
            let path = Path::new(value);
            if value.trim().is_empty() || path.is_absolute() || path.components().count() != 1 {
                return Err(anyhow!(
                    "{field} must be a single relative directory name, got {value:?}"
                ));
            }
        }
    }
    Ok(())
}
