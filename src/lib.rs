//! A library for answering version-resolution questions against a git
//! repository and its submodules: which version first contained a given
//! commit, which commits lie between two versions, and which commits match
//! free text.
//!
//! Built on the `git` command-line tool; requires a `git` executable
//! reachable on the host's `PATH`.

pub mod engine;
pub mod error;
pub mod executor;
pub mod record;
pub mod repository;
pub mod task_registry;
pub mod types;
pub mod version;

/// The minimum git version this crate's plumbing invocations are verified
/// against. Not enforced automatically; a caller opts in via
/// [`executor::GitExecutor::check_version`].
pub const MINIMUM_GIT_VERSION: (u32, u32, u32) = (2, 17, 0);

pub use crate::engine::QueryEngine;
pub use crate::error::GitError;
pub use crate::executor::{ExecutorConfig, GitExecutor};
pub use crate::record::CommitRecord;
pub use crate::repository::{CommitKind, Repository};
pub use crate::types::{BranchName, Result, SubmodulePath, Version};

pub mod prelude {
    //! Convenient import for the common types needed to open a repository
    //! and run a query.
    pub use crate::engine::QueryEngine;
    pub use crate::error::GitError;
    pub use crate::executor::{ExecutorConfig, GitExecutor};
    pub use crate::record::CommitRecord;
    pub use crate::repository::{CommitKind, Repository};
    pub use crate::types::{BranchName, Result, SubmodulePath, Version};
    pub use crate::MINIMUM_GIT_VERSION;
}
