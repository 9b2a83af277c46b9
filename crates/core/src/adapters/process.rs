//! Spawning a child and draining its output into a progress parser.

use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;

use super::progress::LineSplitter;
use super::ProgressFn;
use crate::error::AdapterError;

/// Program plus the leading arguments that precede adapter-specific ones
/// (e.g. `python -m demucs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Run `spec` followed by `extra_args` until it exits.
///
/// stdout and stderr are drained concurrently; every line is logged at
/// `debug` and fed through `parse`, and parsed fractions go to
/// `on_progress`. Both readers finish before this returns, so no progress
/// update can arrive after the caller moves on.
pub async fn run_with_progress(
    label: &'static str,
    spec: &CommandSpec,
    extra_args: Vec<OsString>,
    parse: fn(&str) -> Option<f64>,
    on_progress: &ProgressFn,
) -> Result<ExitStatus, AdapterError> {
    let mut cmd = TokioCommand::new(&spec.program);
    cmd.args(&spec.args)
        .args(&extra_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::info!(adapter = label, program = %spec.program, "spawning");

    let mut child = cmd.spawn().map_err(|source| {
        tracing::error!(adapter = label, error = %source, "failed to spawn");
        AdapterError::Spawn {
            program: spec.program.clone(),
            source,
        }
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    tokio::join!(
        drain(label, "stdout", stdout, parse, on_progress),
        drain(label, "stderr", stderr, parse, on_progress),
    );

    let status = child.wait().await.map_err(|source| AdapterError::Spawn {
        program: spec.program.clone(),
        source,
    })?;
    tracing::info!(adapter = label, exit_code = ?status.code(), "process exited");
    Ok(status)
}

async fn drain<R>(
    label: &'static str,
    stream: &'static str,
    reader: Option<R>,
    parse: fn(&str) -> Option<f64>,
    on_progress: &ProgressFn,
) where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut splitter = LineSplitter::new();
    let mut chunk = [0u8; 8 * 1024];
    let emit = |line: &str| {
        tracing::debug!(adapter = label, stream, line, "output");
        if let Some(fraction) = parse(line) {
            on_progress(fraction);
        }
    };
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                for line in splitter.push(&chunk[..n]) {
                    emit(line.as_str());
                }
            }
            Err(e) => {
                tracing::warn!(adapter = label, stream, error = %e, "stopped reading output");
                break;
            }
        }
    }
    if let Some(line) = splitter.finish() {
        emit(line.as_str());
    }
}
