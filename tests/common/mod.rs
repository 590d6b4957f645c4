//! Shared test infrastructure for integration tests.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Scratch project tree that runs the `docfreeze` binary against itself.
pub struct TestProject {
    _dir: TempDir,
    pub root: PathBuf,
}

/// Captured result of one `docfreeze` invocation.
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl TestProject {
    pub fn new() -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let root = dir.path().canonicalize()?;
        Ok(Self { _dir: dir, root })
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent directory");
        }
        std::fs::write(&path, contents).expect("write file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).expect("read file")
    }

    /// Run `docfreeze` with the project root as working directory.
    pub fn run(&self, args: &[&str]) -> RunResult {
        Command::new(env!("CARGO_BIN_EXE_docfreeze"))
            .args(args)
            .current_dir(&self.root)
            .env_remove("RUST_LOG")
            .output()
            .expect("spawn docfreeze")
            .into()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }
}
