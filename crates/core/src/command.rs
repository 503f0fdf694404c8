// crates/core/src/command.rs
//! Subprocess helper for the per-tool mutators.
//!
//! Runs external CLIs (`pip`, `conda`, `npm`, `git`, …) with stdout and
//! stderr piped through [`AnsiLineBuffer`] into the caller's console, so
//! a legacy tool that only knows how to print still produces structured
//! log events.

use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::console::{AnsiLineBuffer, Console, LogLevel};
use crate::error::ToolError;

/// Read one piped stream to EOF, forwarding cleaned lines to the console.
async fn pump<R: AsyncRead + Unpin>(mut reader: R, console: &dyn Console, level: LogLevel) {
    let mut buf = AnsiLineBuffer::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                for line in buf.feed(&chunk[..n]) {
                    console.log(level, &line);
                }
            }
        }
    }
    if let Some(tail) = buf.finish() {
        console.log(level, &tail);
    }
}

/// Run `program` with `args`, streaming output into `console`.
///
/// Returns `Err(CommandFailed)` on a non-zero exit and
/// `Err(MissingBinary)` when the program cannot be found.
pub async fn run_streamed(
    program: &str,
    args: &[&str],
    console: &dyn Console,
) -> Result<(), ToolError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolError::MissingBinary {
                tool: program.to_string(),
            },
            _ => ToolError::Io {
                path: program.into(),
                source: e,
            },
        })?;

    let stdout = child.stdout.take().expect("stdout is piped");
    let stderr = child.stderr.take().expect("stderr is piped");
    tokio::join!(
        pump(stdout, console, LogLevel::Info),
        pump(stderr, console, LogLevel::Info),
    );

    let status = child.wait().await.map_err(|e| ToolError::Io {
        path: program.into(),
        source: e,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(ToolError::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            code: status.code().unwrap_or(-1),
        })
    }
}

/// Like [`run_streamed`] but tolerant: a missing binary or non-zero exit
/// only logs a warning. Used for best-effort cleanup commands
/// (`pip config unset …`, `conda config --remove-key …`) that fail
/// harmlessly when the key was never set.
pub async fn run_tolerant(program: &str, args: &[&str], console: &dyn Console) {
    if let Err(err) = run_streamed(program, args, console).await {
        match err {
            ToolError::CommandFailed { .. } => {
                tracing::debug!(program, ?args, "tolerated command failure");
            }
            other => console.warning(&other.to_string()),
        }
    }
}

/// Check whether `tool` is on PATH by probing `tool --version`.
pub async fn is_installed(tool: &str) -> bool {
    Command::new(tool)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
