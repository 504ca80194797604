//! External command execution.
//!
//! Commands run directly, never through a shell, with `LC_ALL=C` so that
//! their output is predictable. Standard output and error are drained on
//! helper threads while the child is waited on with a timeout. A child that
//! leaves a background process holding its pipes cannot stall the run: after
//! a kill the readers are abandoned, and after an exit they get
//! [`OUTPUT_GRACE`] to reach end of file.
//!
//! A rule may declare [`OutputRules`]: a regex whose first capture group
//! reports freed space (`"freed 8.0M"`), and regexes for lines that mean
//! the command failed despite a zero exit status.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use regex::Regex;
use thiserror::Error;
use wait_timeout::ChildExt;

use crate::outcome::{FailureKind, RunOutcome};

/// How long output readers may run on after the child has exited.
pub const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// Error type for external commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The program did not finish in time and was killed.
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    /// The program exited unsuccessfully.
    #[error("{program} exited with {status}{}", stderr_suffix(.stderr))]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    /// The program printed a line declared as an error.
    #[error("{program} reported an error: {line}")]
    ErrorLine { program: String, line: String },

    /// An output rule is not a valid regex.
    #[error("invalid output rule '{pattern}': {message}")]
    InvalidRule { pattern: String, message: String },

    /// Waiting on the program failed.
    #[error("I/O error while waiting for {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

impl CommandError {
    /// The outcome recorded for this error.
    #[must_use]
    pub fn to_outcome(&self) -> RunOutcome {
        RunOutcome::Failed(FailureKind::ExternalCommand, self.to_string())
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// How a command's output is interpreted.
///
/// Patterns are kept as text so targets stay hashable; they are compiled
/// when the output is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OutputRules {
    /// First capture group (or whole match) is a size such as `74.7MB`.
    pub freed_space: Option<String>,
    /// Lines matching any of these mean failure.
    pub error_lines: Vec<String>,
}

impl OutputRules {
    /// Bytes the command reports as freed, summed over all output lines.
    ///
    /// Standard output is read before standard error. Sizes that do not
    /// parse are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::ErrorLine`] for the first line matching an
    /// error rule, or [`CommandError::InvalidRule`] for a bad pattern.
    pub fn freed_bytes(&self, program: &str, output: &CommandOutput) -> Result<u64, CommandError> {
        let freed = self.freed_space.as_deref().map(compile).transpose()?;
        let errors = self
            .error_lines
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut total = 0u64;
        for line in output.stdout.lines().chain(output.stderr.lines()) {
            if let Some(hit) = errors.iter().find(|re| re.is_match(line)) {
                log::debug!("{} output matched error rule {}", program, hit.as_str());
                return Err(CommandError::ErrorLine {
                    program: program.to_string(),
                    line: line.trim().to_string(),
                });
            }
            let Some(caps) = freed.as_ref().and_then(|re| re.captures(line)) else {
                continue;
            };
            let text = caps.get(1).or_else(|| caps.get(0)).map_or("", |m| m.as_str());
            match text.trim().parse::<ByteSize>() {
                Ok(size) => total = total.saturating_add(size.as_u64()),
                Err(e) => log::debug!("Ignoring size '{}' from {}: {}", text, program, e),
            }
        }
        Ok(total)
    }
}

fn compile(pattern: &str) -> Result<Regex, CommandError> {
    Regex::new(pattern).map_err(|e| CommandError::InvalidRule {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Locate an executable by name or path.
///
/// # Errors
///
/// Returns an error if the program is not on `PATH` (or the given path is
/// not executable).
pub fn resolve_executable(name: &str) -> Result<PathBuf, which::Error> {
    which::which(name)
}

/// Run `executable` with `args`, waiting at most `timeout`.
///
/// # Errors
///
/// Returns [`CommandError`] on launch failure, timeout or non-zero exit.
pub fn run_command(
    executable: &Path,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<CommandOutput, CommandError> {
    let program = executable.display().to_string();
    log::debug!("Running {} {:?}", program, args);

    let mut child = Command::new(executable)
        .args(args)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CommandError::Launch {
            program: program.clone(),
            source,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait(&mut child, timeout).map_err(|source| CommandError::Io {
        program: program.clone(),
        source,
    })?;

    let Some(status) = status else {
        // Readers stay blocked while anything inherited the pipes; leave them.
        drop((stdout, stderr));
        let timeout = timeout.unwrap_or_default();
        log::warn!("{} timed out after {:?}", program, timeout);
        return Err(CommandError::Timeout { program, timeout });
    };

    let deadline = Instant::now() + OUTPUT_GRACE;
    let output = CommandOutput {
        stdout: collect(stdout, deadline, &program),
        stderr: collect(stderr, deadline, &program),
    };

    if status.success() {
        log::info!("Ran: {}", program);
        Ok(output)
    } else {
        Err(CommandError::ExitStatus {
            program,
            status: describe_status(status),
            stderr: output.stderr,
        })
    }
}

/// Wait for the child; `None` means it was killed after the timeout.
fn wait(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };
    match child.wait_timeout(timeout)? {
        Some(status) => Ok(Some(status)),
        None => {
            child.kill()?;
            child.wait()?;
            Ok(None)
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<String>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buf) {
                log::trace!("Reading child output failed: {}", e);
            }
            // The receiver is gone once the run has given up on this output.
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
        rx
    })
}

fn collect(reader: Option<Receiver<String>>, deadline: Instant, program: &str) -> String {
    let Some(rx) = reader else {
        return String::new();
    };
    let remaining = deadline.saturating_duration_since(Instant::now());
    rx.recv_timeout(remaining).unwrap_or_else(|_| {
        log::debug!("{} left its output open; continuing without it", program);
        String::new()
    })
}

fn describe_status(status: ExitStatus) -> String {
    status
        .code()
        .map_or_else(|| "a signal".to_string(), |code| format!("status {code}"))
}
