use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::foundation::error::{VidError, VidResult};
use crate::process::cancel::CancelToken;
use crate::process::table::{self, SharedChild};

/// Largest single `write` issued to the engine, so cancellation is observed within a frame.
const WRITE_CHUNK: usize = 1 << 16;
const REAP_POLL: Duration = Duration::from_millis(2);

/// Result of filling one frame buffer from a decode pipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillOutcome {
    /// The whole buffer was filled.
    Full,
    /// The engine closed its output after `filled` bytes (`filled < buf.len()`).
    Eof {
        /// Bytes transferred before end-of-input.
        filled: usize,
    },
}

/// Lifecycle of a reader's or writer's engine pipeline. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// No process has been started yet.
    Unopened,
    /// The engine is running and its pipe is open.
    Running,
    /// The pipe is closed and the engine has been waited on.
    Closed,
}

/// The spawned engine process shared by both pipeline directions.
struct EngineProcess {
    id: u64,
    program: String,
    child: SharedChild,
    cancel: CancelToken,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    reaped: bool,
}

impl EngineProcess {
    fn spawn(
        program: &Path,
        args: &[String],
        stdin: Stdio,
        stdout: Stdio,
        cancel: CancelToken,
    ) -> VidResult<(Self, Option<ChildStdin>, Option<ChildStdout>)> {
        let label = program.display().to_string();
        debug!(program = %label, argv = ?args, "spawning engine process");

        let mut child = Command::new(program)
            .args(args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    VidError::tool_missing(format!("'{label}' is not installed or not on PATH"))
                } else {
                    VidError::pipe_io(format!("failed to start '{label}': {e}"))
                }
            })?;

        let child_stdin = child.stdin.take();
        let child_stdout = child.stdout.take();
        let stderr_drain = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut bytes = Vec::new();
                stderr.read_to_end(&mut bytes)?;
                Ok(bytes)
            })
        });

        let child = Arc::new(Mutex::new(child));
        table::ensure_signal_teardown();
        let id = table::register(Arc::clone(&child), cancel.clone());

        Ok((
            Self {
                id,
                program: label,
                child,
                cancel,
                stderr_drain,
                reaped: false,
            },
            child_stdin,
            child_stdout,
        ))
    }

    fn kill(&self) {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = child.kill();
    }

    /// Wait for exit without holding the child lock across the whole wait, so the interrupt
    /// teardown can still kill a hung process. A cancelled token kills the child.
    fn reap(&mut self) -> VidResult<ExitStatus> {
        let status = loop {
            {
                let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
                match child.try_wait() {
                    Ok(Some(status)) => break status,
                    Ok(None) => {
                        if self.cancel.is_cancelled() {
                            let _ = child.kill();
                        }
                    }
                    Err(e) => {
                        return Err(VidError::pipe_io(format!(
                            "failed to wait for '{}': {e}",
                            self.program
                        )));
                    }
                }
            }
            std::thread::sleep(REAP_POLL);
        };
        self.reaped = true;
        table::deregister(self.id);
        debug!(program = %self.program, %status, "engine process exited");
        Ok(status)
    }

    fn stderr_text(&mut self) -> String {
        let bytes = match self.stderr_drain.take() {
            Some(handle) => handle.join().ok().and_then(Result::ok).unwrap_or_default(),
            None => Vec::new(),
        };
        String::from_utf8_lossy(&bytes).trim().to_string()
    }

    fn exit_error(&mut self, status: ExitStatus) -> VidError {
        let stderr = self.stderr_text();
        if stderr.is_empty() {
            VidError::pipe_io(format!("'{}' exited with status {status}", self.program))
        } else {
            VidError::pipe_io(format!(
                "'{}' exited with status {status}: {stderr}",
                self.program
            ))
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = child.kill();
        let _ = child.wait();
        drop(child);
        table::deregister(self.id);
    }
}

/// Engine process whose stdout streams raw frames to us.
pub struct DecodePipeline {
    process: EngineProcess,
    stdout: Option<ChildStdout>,
    reached_eof: bool,
}

impl DecodePipeline {
    /// Start `program args...` with its stdout wired as the readable frame stream.
    pub fn open(program: &Path, args: &[String], cancel: CancelToken) -> VidResult<Self> {
        let (process, _, stdout) =
            EngineProcess::spawn(program, args, Stdio::null(), Stdio::piped(), cancel)?;
        let stdout = stdout.ok_or_else(|| {
            VidError::pipe_io(format!("failed to open '{}' stdout", process.program))
        })?;
        Ok(Self {
            process,
            stdout: Some(stdout),
            reached_eof: false,
        })
    }

    /// Fill `buf` completely, looping over short reads, unless the engine ends its output first.
    pub fn fill(&mut self, buf: &mut [u8]) -> VidResult<FillOutcome> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Err(VidError::pipe_io("decode pipe is already closed"));
        };

        let mut filled = 0;
        while filled < buf.len() {
            if self.process.cancel.is_cancelled() {
                self.process.kill();
                return Err(VidError::Cancelled);
            }
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.reached_eof = true;
                    return Ok(FillOutcome::Eof { filled });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(VidError::pipe_io(format!(
                        "failed to read frame from '{}': {e}",
                        self.process.program
                    )));
                }
            }
        }
        Ok(FillOutcome::Full)
    }

    /// Close the pipe and wait for the engine.
    ///
    /// A non-zero exit is an error only when the engine had reached end-of-output on its own;
    /// closing mid-stream makes the engine fail on its broken pipe, which is expected.
    pub fn close(mut self) -> VidResult<()> {
        drop(self.stdout.take());
        if !self.reached_eof {
            self.process.kill();
        }
        let status = self.process.reap()?;
        if self.reached_eof && !status.success() {
            return Err(self.process.exit_error(status));
        }
        Ok(())
    }
}

/// Engine process whose stdin consumes raw frames from us.
pub struct EncodePipeline {
    process: EngineProcess,
    stdin: Option<ChildStdin>,
}

impl EncodePipeline {
    /// Start `program args...` with its stdin wired as the writable frame stream.
    pub fn open(program: &Path, args: &[String], cancel: CancelToken) -> VidResult<Self> {
        let (process, stdin, _) =
            EngineProcess::spawn(program, args, Stdio::piped(), Stdio::null(), cancel)?;
        let stdin = stdin.ok_or_else(|| {
            VidError::pipe_io(format!("failed to open '{}' stdin", process.program))
        })?;
        Ok(Self {
            process,
            stdin: Some(stdin),
        })
    }

    /// Write every byte of `frame`, looping until the full length is transferred.
    pub fn write_all(&mut self, frame: &[u8]) -> VidResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(VidError::pipe_io("encode pipe is already closed"));
        };

        for chunk in frame.chunks(WRITE_CHUNK) {
            if self.process.cancel.is_cancelled() {
                self.process.kill();
                return Err(VidError::Cancelled);
            }
            stdin.write_all(chunk).map_err(|e| {
                VidError::pipe_io(format!(
                    "failed to write frame to '{}' stdin (likely invalid encode parameters \
                     or frame size): {e}",
                    self.process.program
                ))
            })?;
        }
        Ok(())
    }

    /// Close stdin so the engine finalizes the output, then wait; non-zero exit is an error.
    pub fn close(mut self) -> VidResult<()> {
        drop(self.stdin.take());
        let status = self.process.reap()?;
        if self.process.cancel.is_cancelled() {
            return Err(VidError::Cancelled);
        }
        if !status.success() {
            return Err(self.process.exit_error(status));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/process/pipeline.rs"]
mod tests;
