//! The Repository Model: tracks branches, submodules, remote presence, and
//! task-readiness for a single git working tree.
use crate::error::GitError;
use crate::executor::{ExecutorConfig, GitExecutor};
use crate::types::{BranchName, Result, SubmodulePath};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The git object type a sha resolves to, as reported by `cat-file -t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl FromStr for CommitKind {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "commit" => Ok(CommitKind::Commit),
            "tree" => Ok(CommitKind::Tree),
            "blob" => Ok(CommitKind::Blob),
            "tag" => Ok(CommitKind::Tag),
            other => Err(GitError::Execution(format!(
                "unrecognized git object type: {other}"
            ))),
        }
    }
}

/// A git working tree together with its cached branch/submodule state and
/// `task_ready` flag.
///
/// A `Repository` is constructed only for a directory `git status` accepts,
/// with a clean diff against `HEAD`. Every Query-Engine operation requires
/// `task_ready`, which only [`Repository::update_repository`] can set.
#[derive(Debug)]
pub struct Repository {
    path: PathBuf,
    executor: GitExecutor,
    has_remote: bool,
    branches: BTreeSet<BranchName>,
    submodules: Vec<SubmodulePath>,
    task_ready: bool,
}

impl Repository {
    /// Opens the working tree at `path`, validating it is a clean git
    /// repository and loading its branch/submodule/remote state.
    ///
    /// Fetches from any configured remote; a fetch failure is logged as a
    /// warning and does not fail construction.
    pub fn open(path: impl AsRef<Path>, config: ExecutorConfig) -> Result<Repository> {
        let raw_path = path.as_ref();
        if !raw_path.is_dir() {
            return Err(GitError::InvalidRepository(raw_path.display().to_string()));
        }
        let path = raw_path
            .canonicalize()
            .map_err(|_| GitError::InvalidRepository(raw_path.display().to_string()))?;

        let executor = GitExecutor::new(&path, config)?;

        executor
            .execute(["status"])
            .map_err(|_| GitError::InvalidRepository(path.display().to_string()))?;

        let has_remote = !executor.execute(["remote"])?.trim().is_empty();

        let clean = executor.predicate(["diff", "--quiet", "HEAD"])?;
        if !clean {
            return Err(GitError::RepositoryNotClean);
        }

        if has_remote {
            if let Err(e) = executor.execute(["fetch", "--all"]) {
                warn!("failed to fetch remotes for {}: {e}", path.display());
            }
        }

        let branches = Self::load_branches(&executor)?;
        let submodules = Self::load_submodules(&executor);

        debug!(
            "opened repository at {} ({} branches, {} submodules, has_remote={has_remote})",
            path.display(),
            branches.len(),
            submodules.len()
        );

        Ok(Repository {
            path,
            executor,
            has_remote,
            branches,
            submodules,
            task_ready: false,
        })
    }

    fn load_branches(executor: &GitExecutor) -> Result<BTreeSet<BranchName>> {
        let out = executor.execute(["branch", "-a"])?;
        let mut branches = BTreeSet::new();
        for raw_line in out.lines() {
            let mut line = raw_line.trim();
            if let Some(rest) = line.strip_prefix("* ") {
                line = rest.trim();
            }
            // `git branch -a` marks a remote's symbolic HEAD as
            // `remotes/origin/HEAD -> remotes/origin/main`; keep only the
            // left-hand side.
            if let Some(idx) = line.find(" -> ") {
                line = &line[..idx];
            }
            let name = line.strip_prefix("remotes/origin/").unwrap_or(line).trim();
            if name.is_empty() {
                continue;
            }
            if let Ok(branch) = BranchName::from_str(name) {
                branches.insert(branch);
            }
        }
        Ok(branches)
    }

    /// Parses `git submodule status`; swallows failures (e.g. no
    /// `.gitmodules`) by logging and returning an empty list.
    fn load_submodules(executor: &GitExecutor) -> Vec<SubmodulePath> {
        match executor.execute(["submodule", "status"]) {
            Ok(out) => out
                .lines()
                .filter_map(|line| line.split_whitespace().nth(1))
                .map(SubmodulePath::new)
                .collect(),
            Err(e) => {
                warn!("failed to load submodules: {e}");
                Vec::new()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_remote(&self) -> bool {
        self.has_remote
    }

    pub fn branches(&self) -> &BTreeSet<BranchName> {
        &self.branches
    }

    pub fn submodules(&self) -> &[SubmodulePath] {
        &self.submodules
    }

    pub fn task_ready(&self) -> bool {
        self.task_ready
    }

    pub(crate) fn executor(&self) -> &GitExecutor {
        &self.executor
    }

    /// An executor rooted at `submodule`'s own working tree, for running
    /// git commands against the submodule's own history.
    pub(crate) fn submodule_executor(&self, submodule: &SubmodulePath) -> GitExecutor {
        self.executor
            .with_working_dir(self.path.join(submodule.as_str()))
    }

    fn find_submodule(&self, name: &str) -> Result<&SubmodulePath> {
        self.submodules
            .iter()
            .find(|s| s.as_str() == name)
            .ok_or_else(|| GitError::InvalidSubmodule(name.to_string()))
    }

    /// The current branch, or `None` when `HEAD` is detached.
    pub fn current_branch(&self) -> Result<Option<BranchName>> {
        let out = self.executor.execute(["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim();
        if name.is_empty() || name == "HEAD" {
            Ok(None)
        } else {
            Ok(Some(BranchName::from_str(name)?))
        }
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.iter().any(|b| b.as_str() == name)
    }

    pub fn has_commit(&self, sha: &str) -> bool {
        self.executor
            .predicate(["cat-file", "-e", sha])
            .unwrap_or(false)
    }

    pub fn submodule_has_commit(&self, submodule: &str, sha: &str) -> Result<bool> {
        let path = self.find_submodule(submodule)?;
        let exec = self.submodule_executor(path);
        Ok(exec.predicate(["cat-file", "-e", sha])?)
    }

    /// Checks out `branch` (or the current branch, if `None`), pulls from
    /// the remote when one is configured, reloads submodule membership
    /// (which can differ per branch), and recursively updates submodules.
    /// Sets `task_ready` only on full success; a failure leaves the prior
    /// value untouched and the error propagates to the caller.
    pub fn update_repository(&mut self, branch: Option<&str>) -> Result<()> {
        let target = match branch {
            Some(b) => b.to_string(),
            None => self
                .current_branch()?
                .ok_or_else(|| GitError::InvalidBranch("<detached HEAD>".to_string()))?
                .as_str()
                .to_string(),
        };
        if !self.has_branch(&target) {
            return Err(GitError::InvalidBranch(target));
        }

        self.executor.execute(["checkout", &target])?;
        if self.has_remote {
            self.executor.execute(["pull", "origin", &target])?;
        }

        self.submodules = Self::load_submodules(&self.executor);
        self.executor
            .execute(["submodule", "update", "--init", "--recursive"])?;

        self.task_ready = true;
        debug!("repository ready on branch {target}");
        Ok(())
    }

    /// `git verify-commit <sha>`, never erroring: an unsigned or
    /// unverifiable commit simply reports `false`.
    pub fn verify_commit_signature(&self, sha: &str) -> bool {
        self.executor
            .predicate(["verify-commit", sha])
            .unwrap_or(false)
    }

    /// `git cat-file -t <sha>`, for diagnostic/CLI use.
    pub fn commit_kind(&self, sha: &str) -> Result<CommitKind> {
        let out = self.executor.execute(["cat-file", "-t", sha])?;
        out.trim().parse()
    }
}
