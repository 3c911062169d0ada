use super::error::ToolError;
use serde_json::Value;
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};
use wait_timeout::ChildExt;

/// Granularity at which a running tool checks for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// stderr kept in `NonZeroExit` errors.
const STDERR_EXCERPT: usize = 512;

/// Shared cancellation switch. Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelFlag>,
    /// Exit codes treated as success. Scanners such as Checkov exit 1 when
    /// they report failed checks.
    pub accept_exit_codes: Vec<i32>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            cancel: None,
            accept_exit_codes: vec![0],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: Option<CancelFlag>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn accept_exit_codes(mut self, codes: &[i32]) -> Self {
        self.accept_exit_codes = codes.to_vec();
        self
    }

    /// `program arg1 arg2`, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external tool to completion.
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;
}

/// Runs tools as child processes with piped output, a deadline and cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn wait(
        child: &mut Child,
        invocation: &ToolInvocation,
    ) -> Result<std::process::ExitStatus, ToolError> {
        let program = &invocation.program;
        let deadline = invocation.timeout.map(|t| Instant::now() + t);
        loop {
            if invocation.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                kill(child, program);
                return Err(ToolError::Cancelled(program.clone()));
            }
            let slice = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) if !remaining.is_zero() => remaining.min(POLL_INTERVAL),
                    _ => {
                        kill(child, program);
                        return Err(ToolError::Timeout {
                            program: program.clone(),
                            timeout: invocation.timeout.unwrap_or_default(),
                        });
                    }
                },
                None => POLL_INTERVAL,
            };
            let status = child.wait_timeout(slice).map_err(|source| ToolError::Io {
                program: program.clone(),
                source,
            })?;
            if let Some(status) = status {
                return Ok(status);
            }
        }
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let program = &invocation.program;
        debug!(command = %invocation.command_line(), timeout = ?invocation.timeout, "Running tool");

        let mut child = Command::new(program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => ToolError::NotFound(program.clone()),
                _ => ToolError::Spawn {
                    program: program.clone(),
                    source,
                },
            })?;

        // Drain both pipes while waiting so a chatty tool cannot block on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = Self::wait(&mut child, invocation)?;
        let output = ToolOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: collect(stdout),
            stderr: collect(stderr),
        };
        trace!(program = %program, exit_code = output.exit_code, stdout_bytes = output.stdout.len(), "Tool finished");

        if !invocation.accept_exit_codes.contains(&output.exit_code) {
            return Err(ToolError::NonZeroExit {
                program: program.clone(),
                code: output.exit_code,
                stderr: excerpt(&output.stderr),
            });
        }
        Ok(output)
    }
}

fn kill(child: &mut Child, program: &str) {
    if let Err(e) = child.kill() {
        warn!(program, error = %e, "Failed to kill tool process");
    }
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Parse a tool's stdout as JSON.
pub fn parse_json_stdout(program: &str, output: &ToolOutput) -> Result<Value, ToolError> {
    serde_json::from_str(output.stdout.trim()).map_err(|source| ToolError::InvalidJson {
        program: program.to_string(),
        source,
    })
}
