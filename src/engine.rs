//! Command-backed engine and converter adapters.
//!
//! Both run an external command line parsed with shell quoting rules and
//! append the input and output paths as the final two arguments.
use crate::freeze::ComputationResult;
use crate::render::{ComputationEngine, Converter};
use anyhow::{anyhow, Context, Result};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Instant;

/// Engine whose command prints a computation result as JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    command: String,
}

impl CommandEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl ComputationEngine for CommandEngine {
    fn execute(&self, input: &Path, output: &Path) -> Result<ComputationResult> {
        let out = run_command(&self.command, input, output, None)?;
        let result: ComputationResult = serde_json::from_slice(&out.stdout)
            .with_context(|| format!("parse result JSON from engine: {}", self.command))?;
        Ok(result)
    }
}

/// Converter whose command reads the computation result JSON on stdin.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    command: String,
}

impl CommandConverter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Converter for CommandConverter {
    fn convert(&self, input: &Path, output: &Path, result: &ComputationResult) -> Result<()> {
        let json = serde_json::to_vec(result).context("serialize result for converter")?;
        run_command(&self.command, input, output, Some(&json))?;
        Ok(())
    }
}

fn run_command(command: &str, input: &Path, output: &Path, stdin: Option<&[u8]>) -> Result<Output> {
    let args = shell_words::split(command).with_context(|| format!("parse command: {command}"))?;
    if args.is_empty() {
        return Err(anyhow!("command is empty"));
    }

    let start = Instant::now();
    let mut child = Command::new(&args[0])
        .args(&args[1..])
        .arg(input)
        .arg(output)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn command: {}", args[0]))?;

    // Feed stdin from its own thread so a command that fills its stdout pipe
    // before reading input cannot stall us.
    let out = std::thread::scope(|scope| -> Result<Output> {
        let writer = match (stdin, child.stdin.take()) {
            (Some(bytes), Some(mut pipe)) => Some(scope.spawn(move || pipe.write_all(bytes))),
            _ => None,
        };
        let out = child.wait_with_output().context("wait for command")?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.kind() == ErrorKind::BrokenPipe => {
                    tracing::debug!(command = %args[0], "command closed stdin early");
                }
                Ok(Err(err)) => return Err(err).context("write command stdin"),
                Err(_) => return Err(anyhow!("stdin writer thread panicked")),
            }
        }
        Ok(out)
    })?;
    tracing::debug!(
        command = %args[0],
        elapsed_ms = start.elapsed().as_millis(),
        stdout_bytes = out.stdout.len(),
        "command complete"
    );

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        return Err(anyhow!(
            "command {} failed with status {}: {}",
            args[0],
            out.status,
            stderr.trim()
        ));
    }
    Ok(out)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn engine_parses_stdout_json() {
        let engine = CommandEngine::new(r#"sh -c 'echo "{\"supporting\": [\"fig.png\"]}"' sh"#);
        let result = engine
            .execute(Path::new("doc.md"), Path::new("doc.html"))
            .unwrap();
        assert_eq!(result.supporting, vec![PathBuf::from("fig.png")]);
    }

    #[test]
    fn converter_receives_paths_and_result_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("doc.html");
        let converter = CommandConverter::new(r#"sh -c 'cat > "$2"' sh"#);
        let result = ComputationResult {
            supporting: vec![PathBuf::from("fig.png")],
            ..Default::default()
        };
        converter
            .convert(Path::new("doc.md"), &out, &result)
            .unwrap();
        let written: ComputationResult =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written, result);
    }

    #[test]
    fn converter_may_ignore_stdin() {
        let converter = CommandConverter::new(r#"sh -c 'exit 0' sh"#);
        let mut extra = serde_json::Map::new();
        extra.insert("markdown".to_string(), "x".repeat(1 << 20).into());
        let result = ComputationResult {
            extra,
            ..Default::default()
        };
        converter
            .convert(Path::new("doc.md"), Path::new("doc.html"), &result)
            .unwrap();
    }

    #[test]
    fn converter_writing_before_reading_does_not_stall() {
        let converter =
            CommandConverter::new(r#"sh -c 'head -c 1048576 /dev/zero; cat > /dev/null' sh"#);
        let mut extra = serde_json::Map::new();
        extra.insert("markdown".to_string(), "x".repeat(1 << 20).into());
        let result = ComputationResult {
            extra,
            ..Default::default()
        };
        converter
            .convert(Path::new("doc.md"), Path::new("doc.html"), &result)
            .unwrap();
    }

    #[test]
    fn failing_command_reports_stderr() {
        let engine = CommandEngine::new(r#"sh -c 'echo boom >&2; exit 3' sh"#);
        let err = engine
            .execute(Path::new("doc.md"), Path::new("doc.html"))
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn empty_command_is_rejected() {
        let engine = CommandEngine::new("  ");
        assert!(engine
            .execute(Path::new("doc.md"), Path::new("doc.html"))
            .is_err());
    }
}
