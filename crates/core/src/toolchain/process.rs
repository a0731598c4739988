//! Synchronous external process invocation with captured output.
//!
//! One invocation per call, no retry; the caller decides whether a failure is
//! fatal. Every run is bounded by a timeout so a wedged tool cannot hang the
//! pipeline; a timeout is reported as a [`ProcessError`] like any other
//! launch-level failure.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Default upper bound for one tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),
    #[error("failed to run {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} did not exit within {timeout_secs}s", program.display())]
    TimedOut { program: PathBuf, timeout_secs: u64 },
    #[error("failed to capture output of {}: {source}", program.display())]
    Capture {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Captured result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code; -1 when the process was terminated by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Stdout followed by stderr, for diagnostics that want both streams.
    pub fn combined_text(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

/// Run `program` with `args`, capturing stdout/stderr as (lossy) UTF-8 text.
///
/// The child is killed once `timeout` elapses. Stdin is closed.
pub fn run_tool(
    program: &Path,
    args: &[OsString],
    timeout: Duration,
) -> Result<ToolOutput, ProcessError> {
    if !program.is_file() {
        return Err(ProcessError::ExecutableNotFound(program.to_path_buf()));
    }

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ProcessError::ExecutableNotFound(program.to_path_buf()),
            _ => ProcessError::Launch { program: program.to_path_buf(), source: e },
        })?;

    // Drain both pipes on threads so a chatty tool cannot deadlock on a full
    // pipe buffer while we wait for it to exit.
    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let status = wait_with_timeout(&mut child, program, timeout)?;

    let stdout = join_reader(stdout, program)?;
    let stderr = join_reader(stderr, program)?;

    Ok(ToolOutput { code: status.code().unwrap_or(-1), stdout, stderr })
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> Option<JoinHandle<io::Result<String>>> {
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        })
    })
}

fn join_reader(
    handle: Option<JoinHandle<io::Result<String>>>,
    program: &Path,
) -> Result<String, ProcessError> {
    match handle {
        Some(handle) => match handle.join() {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(source)) => {
                Err(ProcessError::Capture { program: program.to_path_buf(), source })
            }
            Err(_) => Err(ProcessError::Capture {
                program: program.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "output reader thread panicked"),
            }),
        },
        None => Ok(String::new()),
    }
}

fn wait_with_timeout(
    child: &mut Child,
    program: &Path,
    timeout: Duration,
) -> Result<ExitStatus, ProcessError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProcessError::TimedOut {
                        program: program.to_path_buf(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                thread::sleep(WAIT_POLL_INTERVAL);
            }
            Err(source) => {
                return Err(ProcessError::Launch { program: program.to_path_buf(), source })
            }
        }
    }
}
