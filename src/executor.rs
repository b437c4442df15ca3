//! A safe, retrying git command executor.
//!
//! Centralizes timeout, retry, and stderr capture so every higher layer
//! (`repository`, `engine`) stays free of those concerns.
use crate::error::GitError;
use log::{debug, trace, warn};
use std::ffi::OsStr;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

/// Configuration for a [`GitExecutor`]: per-call timeout and retry budget.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl ExecutorConfig {
    /// Builds a configuration, rejecting non-positive timeout/retry_delay.
    pub fn new(
        timeout: Duration,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Self, GitError> {
        if timeout.is_zero() {
            return Err(GitError::Execution(
                "timeout must be a positive duration".to_string(),
            ));
        }
        if retry_delay.is_zero() {
            return Err(GitError::Execution(
                "retry_delay must be a positive duration".to_string(),
            ));
        }
        Ok(ExecutorConfig {
            timeout,
            max_retries,
            retry_delay,
        })
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            timeout: Duration::from_secs(30),
            max_retries: 0,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Parses the `major.minor.patch` triple out of `git --version`'s output
/// (e.g. `"git version 2.43.0"`), tolerating vendor suffixes like
/// `2.43.0.windows.1`.
pub fn parse_git_version(version_output: &str) -> Result<(u32, u32, u32), GitError> {
    let token = version_output.split_whitespace().nth(2).ok_or_else(|| {
        GitError::Execution(format!("could not find a version number in: {version_output:?}"))
    })?;
    let mut parts = token.split('.');
    let leading_digits = |part: Option<&str>| -> Option<u32> {
        part.and_then(|s| {
            let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
    };
    let major = leading_digits(parts.next());
    let minor = leading_digits(parts.next());
    let patch = leading_digits(parts.next()).unwrap_or(0);
    match (major, minor) {
        (Some(major), Some(minor)) => Ok((major, minor, patch)),
        _ => Err(GitError::Execution(format!(
            "could not parse a semantic version from: {token}"
        ))),
    }
}

/// Raw result of a single, non-retried git invocation.
struct RawOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

/// Runs `git <args...>` in a working directory, applying a per-call
/// timeout, bounded retries with a fixed delay, and a non-checking
/// "predicate" mode for ancestry tests whose exit code carries meaning
/// rather than indicating failure.
#[derive(Debug, Clone)]
pub struct GitExecutor {
    working_dir: PathBuf,
    config: ExecutorConfig,
}

impl GitExecutor {
    /// Creates an executor rooted at `working_dir`. Verifies that a `git`
    /// binary is reachable on `PATH`, returning `GitNotInstalled` if not.
    pub fn new<P: AsRef<Path>>(working_dir: P, config: ExecutorConfig) -> Result<Self, GitError> {
        let executor = GitExecutor {
            working_dir: working_dir.as_ref().to_path_buf(),
            config,
        };
        executor.run_once(&["--version"])?;
        Ok(executor)
    }

    /// Fails with [`GitError::Execution`] when the installed `git` is older
    /// than `minimum`. Not called implicitly by any other operation; a
    /// caller (CLI, worker adapter) invokes this once at startup if it
    /// wants the check.
    pub fn check_version(&self, minimum: (u32, u32, u32)) -> Result<(), GitError> {
        let out = self.execute(["--version"])?;
        let version = parse_git_version(&out)?;
        if version < minimum {
            return Err(GitError::Execution(format!(
                "git version {}.{}.{} is older than the required {}.{}.{}",
                version.0, version.1, version.2, minimum.0, minimum.1, minimum.2
            )));
        }
        Ok(())
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Returns an executor sharing this one's configuration but rooted at a
    /// different directory (e.g. a submodule checkout), without re-verifying
    /// that `git` is on `PATH`.
    pub(crate) fn with_working_dir<P: AsRef<Path>>(&self, working_dir: P) -> GitExecutor {
        GitExecutor {
            working_dir: working_dir.as_ref().to_path_buf(),
            config: self.config,
        }
    }

    /// Executes `git <args...>`, retrying up to `max_retries` times on
    /// failure (nonzero exit, timeout, or spawn failure), sleeping
    /// `retry_delay` between attempts. Returns trimmed-free stdout; callers
    /// trim as needed.
    pub fn execute<I, S>(&self, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|s| s.as_ref().to_os_string()).collect();
        let mut attempt = 0u32;
        loop {
            match self.run_once(&args) {
                Ok(out) if out.success => return Ok(out.stdout),
                Ok(out) => {
                    if attempt < self.config.max_retries {
                        warn!(
                            "git command failed, retrying in {:?}: {}",
                            self.config.retry_delay, out.stderr
                        );
                        thread::sleep(self.config.retry_delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(GitError::GitCommandError {
                        stdout: out.stdout,
                        stderr: out.stderr,
                    });
                }
                Err(e) => {
                    if attempt < self.config.max_retries {
                        warn!("git command failed, retrying in {:?}: {e}", self.config.retry_delay);
                        thread::sleep(self.config.retry_delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Evaluates a predicate git invocation (e.g. `merge-base
    /// --is-ancestor`) in non-checking mode: a nonzero exit is not an
    /// error, it is the predicate's `false` answer. Never retries.
    pub fn predicate<I, S>(&self, args: I) -> Result<bool, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|s| s.as_ref().to_os_string()).collect();
        let out = self.run_once(&args)?;
        Ok(out.success)
    }

    fn run_once<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<RawOutput, GitError> {
        let arg_strs: Vec<_> = args.iter().map(|a| a.as_ref()).collect();
        debug!("execute: git {:?} (in {:?})", arg_strs, self.working_dir);

        let mut child = Command::new("git")
            .current_dir(&self.working_dir)
            .args(&arg_strs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    GitError::GitNotInstalled
                } else {
                    GitError::Execution(e.to_string())
                }
            })?;

        let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr was piped");
        let stdout_handle = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf);
            buf
        });
        let stderr_handle = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf);
            buf
        });

        let status = child
            .wait_timeout(self.config.timeout)
            .map_err(|e| GitError::Execution(e.to_string()))?;

        let status = match status {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(GitError::Timeout(self.config.timeout));
            }
        };

        let stdout_bytes = stdout_handle.join().unwrap_or_default();
        let stderr_bytes = stderr_handle.join().unwrap_or_default();

        let stdout = String::from_utf8(stdout_bytes).map_err(|_| GitError::Undecodable)?;
        let stderr = String::from_utf8(stderr_bytes).map_err(|_| GitError::Undecodable)?;
        trace!("stdout: {stdout}");
        trace!("stderr: {stderr}");

        Ok(RawOutput {
            stdout,
            stderr,
            success: status.success(),
        })
    }
}
