//! Defines the error types used throughout the version-finder engine.
use thiserror::Error;

/// Represents errors that can occur during version-finder operations.
///
/// This is a closed set: every public operation on
/// [`Repository`](crate::repository::Repository) or the query engine fails
/// with one of these variants, never a raw [`std::io::Error`] or git stderr
/// blob.
#[derive(Debug, Error)]
pub enum GitError {
    /// The 'git' executable was not found in the system's PATH.
    #[error("'git' command not found. Please ensure Git is installed and that its executable is included in your system's PATH environment variable.")]
    GitNotInstalled,

    /// The given path is not the root of a git working tree.
    #[error("path is not a valid git repository: {0}")]
    InvalidRepository(String),

    /// The working tree has uncommitted changes against `HEAD`.
    #[error("repository has uncommitted changes")]
    RepositoryNotClean,

    /// A git invocation failed after exhausting the retry budget.
    /// Carries the captured stdout/stderr from the final attempt.
    #[error("git command failed with the following stdout: {stdout} stderr: {stderr}")]
    GitCommandError { stdout: String, stderr: String },

    /// A single `Execute` call exceeded its configured timeout on every
    /// attempt allowed by the retry budget.
    #[error("git command timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A query was invoked before `UpdateRepository` succeeded.
    #[error("repository is not task-ready; call update_repository() first")]
    NotReady,

    /// The named branch does not exist in the repository.
    #[error("invalid branch: {0}")]
    InvalidBranch(String),

    /// The named submodule does not exist in the repository.
    #[error("invalid submodule: {0}")]
    InvalidSubmodule(String),

    /// The commit identifier does not resolve to an object in the repository.
    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    /// `FindCommitByVersion` returned no match for a version string.
    #[error("version not found: {0}")]
    VersionNotFound(String),

    /// A submodule pointer scan produced no candidate parent-repo commit.
    #[error("no parent-repo commit touches submodule: {0}")]
    NoSubmoduleChange(String),

    /// The ref name does not conform to git's reference-naming rules.
    #[error("ref name is invalid: {0}")]
    InvalidRefName(String),

    /// The output (stdout or stderr) from the 'git' process was not valid UTF-8.
    #[error("unable to decode output from git executable")]
    Undecodable,

    /// Failed to access the current working directory, e.g. due to permissions.
    #[error("unable to access current working directory")]
    WorkingDirectoryInaccessible,

    /// Failed to execute the external 'git' process for a reason other than
    /// "not found" (e.g. permissions, resource exhaustion).
    #[error("unable to execute git process: {0}")]
    Execution(String),
}

/// A specialized `Result` type for version-finder operations.
pub type Result<T> = std::result::Result<T, GitError>;
