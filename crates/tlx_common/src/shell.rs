//! Shell runner
//!
//! Executes an argument vector directly (never through `sh -c`), with a
//! timeout, and captures exit code, stdout and stderr. Spawn failures and
//! timeouts come back as a `ShellResult` with a synthetic stderr message,
//! so callers always get a result and never an error.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Ceiling for every subprocess
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default line cap for `summarize_output`
pub const DEFAULT_SUMMARY_LINES: usize = 10;

pub const NO_OUTPUT: &str = "<no output>";

const STDERR_MARKER: &str = "--- STDERR ---";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Outcome of one subprocess invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellResult {
    pub command: Vec<String>,
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
    /// Set by the workflow when this was a simulate run
    pub simulated: bool,
}

impl ShellResult {
    /// Result for a command that never produced an exit status
    pub fn synthetic_failure(command: &[String], message: impl Into<String>) -> Self {
        Self {
            command: command.to_vec(),
            returncode: -1,
            stdout: String::new(),
            stderr: message.into(),
            simulated: false,
        }
    }

    pub fn success(&self) -> bool {
        self.returncode == 0
    }
}

/// Anything that can run an argv and report a `ShellResult`
pub trait ShellRunner: Send + Sync {
    fn run(&self, argv: &[String]) -> ShellResult;
}

/// Runs commands on the real system
#[derive(Debug, Clone)]
pub struct SystemShell {
    timeout: Duration,
}

impl Default for SystemShell {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl SystemShell {
    /// Timeouts above the 300 second ceiling are clamped
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout: timeout.min(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ShellRunner for SystemShell {
    fn run(&self, argv: &[String]) -> ShellResult {
        let Some((program, args)) = argv.split_first() else {
            return ShellResult::synthetic_failure(argv, "ERROR: empty command");
        };

        debug!("Running: {}", argv.join(" "));

        let mut child = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return ShellResult::synthetic_failure(argv, format!("ERROR: {}", e)),
        };

        // Child blocks once a pipe buffer fills, so drain both off-thread
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    warn!("Command timed out after {:?}: {}", self.timeout, argv.join(" "));
                    let _ = child.kill();
                    let _ = child.wait();
                    break Err("TIMEOUT: command exceeded limit".to_string());
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    break Err(format!("ERROR: {}", e));
                }
            }
        };

        match status {
            Ok(status) => {
                // Grandchildren may still hold the pipes open; the deadline
                // bounds the wait for them too
                let stdout = collect(stdout_reader, deadline);
                let stderr = collect(stderr_reader, deadline);
                let returncode = status.code().unwrap_or(-1);
                debug!("Exit code {} for: {}", returncode, program);
                ShellResult {
                    command: argv.to_vec(),
                    returncode,
                    stdout,
                    stderr,
                    simulated: false,
                }
            }
            Err(message) => ShellResult::synthetic_failure(argv, message),
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Output read before the deadline; a reader still blocked is abandoned
fn collect(reader: Option<Receiver<String>>, deadline: Instant) -> String {
    let Some(rx) = reader else {
        return String::new();
    };
    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining.max(POLL_INTERVAL)) {
        Ok(text) => text,
        Err(_) => {
            warn!("Output pipe still open at deadline; dropping its output");
            String::new()
        }
    }
}

/// Tail of stdout plus a stderr trailer, capped at `max_lines` lines.
///
/// Blank lines are dropped. When stderr has content it follows a
/// `--- STDERR ---` marker. Returns `<no output>` when both streams are empty.
pub fn summarize_output(stdout: &str, stderr: &str, max_lines: usize) -> String {
    let out_lines = non_blank_lines(stdout);
    let err_lines = non_blank_lines(stderr);

    let mut combined = out_lines;
    if !err_lines.is_empty() {
        combined.push(STDERR_MARKER);
        combined.extend(err_lines);
    }

    if combined.is_empty() {
        return NO_OUTPUT.to_string();
    }

    let start = combined.len().saturating_sub(max_lines);
    combined[start..].join("\n")
}

fn non_blank_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect()
}
