//! Process execution helpers.
//!
//! Every native tool the pipelines drive (build system, asset processor, asset
//! bundler, Gradle, the test-impact runtime) goes through this module, so the
//! command line is logged once and interrupts are handled in one place.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::UtilError;

/// Structured output from a command execution.
#[derive(Debug)]
pub struct CommandOutput {
    /// Standard output as a string.
    pub stdout: String,
    /// Standard error as a string.
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
    /// The exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Stdout if it has content, stderr otherwise. Several tools print their
    /// version banner to stderr.
    pub fn text(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

/// Shared interrupt flag.
///
/// Set from a signal handler; checked between pipeline stages and while a
/// child process is running.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
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

/// Render a command as a single shell-like line for logging.
pub fn command_line(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        line.push(' ');
        let arg = arg.to_string_lossy();
        if arg.contains(' ') {
            line.push('"');
            line.push_str(&arg);
            line.push('"');
        } else {
            line.push_str(&arg);
        }
    }
    line
}

fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

/// Execute a command and capture its output.
///
/// # Errors
/// Returns an error if the command cannot be spawned (e.g. binary not found).
/// A non-zero exit code is **not** an error; check `CommandOutput::success` instead.
pub fn run_command(cmd: &mut Command) -> Result<CommandOutput, UtilError> {
    tracing::debug!(command = %command_line(cmd), "running");
    let output = cmd.output().map_err(|source| UtilError::CommandExec {
        program: program_name(cmd),
        source,
    })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        exit_code: output.status.code(),
    })
}

/// Run a command with inherited stdio and block until it exits.
///
/// The child is polled so that a cancelled `token` kills it promptly. Returns
/// the exit code (`None` if the child was terminated by a signal).
///
/// # Errors
/// Returns an error if the command cannot be spawned or waited on, or
/// `UtilError::Interrupted` when the token was cancelled.
pub fn run_streamed(cmd: &mut Command, token: &CancelToken) -> Result<Option<i32>, UtilError> {
    let program = program_name(cmd);
    if token.is_cancelled() {
        return Err(UtilError::Interrupted { program });
    }
    tracing::debug!(command = %command_line(cmd), "spawning");
    let mut child = cmd.spawn().map_err(|source| UtilError::CommandExec {
        program: program.clone(),
        source,
    })?;

    loop {
        let status = child.try_wait().map_err(|source| UtilError::CommandExec {
            program: program.clone(),
            source,
        })?;
        if let Some(status) = status {
            return Ok(status.code());
        }
        if token.is_cancelled() {
            tracing::warn!(program = %program, "interrupt received, terminating child process");
            let _ = child.kill();
            let _ = child.wait();
            return Err(UtilError::Interrupted { program });
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Locate an executable on `PATH`.
///
/// On Windows the `.exe`, `.bat` and `.cmd` suffixes are tried as well.
pub fn which(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| find_executable_in(&dir, name))
}

/// Look for `name` (or a platform executable variant of it) inside `dir`.
pub fn find_executable_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let candidate = dir.join(name);
    if candidate.is_file() {
        return Some(candidate);
    }
    if cfg!(windows) {
        for ext in ["exe", "bat", "cmd"] {
            let with_ext = dir.join(format!("{name}.{ext}"));
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
    }
    None
}
