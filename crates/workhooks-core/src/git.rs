//! Blocking `git` invocation with optional timeouts.
//!
//! Every repository query the hooks make goes through [`Git`]. Output is read
//! on dedicated threads so a chatty command can never fill a pipe buffer and
//! deadlock, and a waiter thread plus `recv_timeout` bounds network-bound and
//! query operations without busy-waiting. On expiry the child is killed and
//! [`HookError::Timeout`] is returned.

use crate::error::{HookError, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

/// Captured result of a finished git process.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// A git working directory.
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
}

impl Git {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Verify a usable git binary exists before touching the repository.
    pub fn ensure_available(&self) -> Result<()> {
        which::which("git").map_err(|_| HookError::GitNotFound)?;
        let out = self.output(&["--version"], None)?;
        if !out.success() {
            return Err(HookError::GitNotFound);
        }
        Ok(())
    }

    /// Run git and return stdout, failing on a non-zero exit.
    pub fn run(&self, args: &[&str], timeout: Option<Duration>) -> Result<String> {
        let out = self.output(args, timeout)?;
        if !out.success() {
            tracing::debug!("git command failed with exit code {}", out.code);
            return Err(HookError::GitFailed {
                command: command_label(args),
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout)
    }

    /// Run git and return its captured output regardless of exit status.
    pub fn output(&self, args: &[&str], timeout: Option<Duration>) -> Result<GitOutput> {
        tracing::debug!("running git {}", args.join(" "));

        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => HookError::GitNotFound,
                _ => HookError::Spawn(e.to_string()),
            })?;

        let child_pid = child.id();

        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let stdout_thread = std::thread::spawn(move || read_all(stdout_handle));
        let stderr_thread = std::thread::spawn(move || read_all(stderr_handle));

        let status = match timeout {
            None => child.wait()?,
            Some(limit) => {
                let (tx, rx) = mpsc::channel();
                std::thread::spawn(move || {
                    let _ = tx.send(child.wait());
                });
                match rx.recv_timeout(limit) {
                    Ok(result) => result?,
                    Err(_) => {
                        // Reader threads see EOF once the killed process exits.
                        kill_process(child_pid);
                        tracing::debug!("git command timed out after {}s", limit.as_secs());
                        return Err(HookError::Timeout {
                            command: command_label(args),
                            secs: limit.as_secs(),
                        });
                    }
                }
            }
        };

        let stdout = stdout_thread.join().unwrap_or_default();
        let stderr = stderr_thread.join().unwrap_or_default();

        Ok(GitOutput {
            code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

fn read_all<R: Read>(handle: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut r) = handle {
        let _ = r.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn command_label(args: &[&str]) -> String {
    args.first().copied().unwrap_or("").to_string()
}

fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}
