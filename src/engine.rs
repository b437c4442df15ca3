//! The Query Engine: the three public queries (find-commits-by-text,
//! commits-between-versions, first-version-containing-commit) built on the
//! Repository Model and Git Executor.
use crate::error::GitError;
use crate::executor::GitExecutor;
use crate::record::{parse_commit_record, CommitRecord, FIELD_SEP};
use crate::repository::Repository;
use crate::types::{Result, SubmodulePath};
use crate::version::GIT_VERSION_REGEX;
use log::warn;

/// Field terminator appended after each record in a multi-commit `git log`
/// format string, so a multi-line commit body can't be confused with a
/// record boundary (bodies may contain blank lines; they never contain the
/// ASCII Record Separator).
const RECORD_SEP: char = '\u{1E}';

/// Every public operation here requires [`Repository::task_ready`]; that
/// check happens once per call via [`QueryEngine::require_ready`].
pub struct QueryEngine<'a> {
    repo: &'a Repository,
    history_window: usize,
}

impl<'a> QueryEngine<'a> {
    /// The number of parent-repo log entries scanned for a
    /// submodule-pointer boundary. Overridable via
    /// [`QueryEngine::with_history_window`].
    pub const DEFAULT_HISTORY_WINDOW: usize = 1500;

    pub fn new(repo: &'a Repository) -> Self {
        QueryEngine {
            repo,
            history_window: Self::DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_history_window(repo: &'a Repository, history_window: usize) -> Self {
        QueryEngine {
            repo,
            history_window,
        }
    }

    fn require_ready(&self) -> Result<()> {
        if self.repo.task_ready() {
            Ok(())
        } else {
            Err(GitError::NotReady)
        }
    }

    /// An executor scoped to `submodule`, or the parent repo's own
    /// executor when `submodule` is `None`. Validates submodule membership.
    fn executor_for(&self, submodule: Option<&str>) -> Result<GitExecutor> {
        match submodule {
            None => Ok(self.repo.executor().clone()),
            Some(name) => {
                let path = self
                    .repo
                    .submodules()
                    .iter()
                    .find(|s| s.as_str() == name)
                    .ok_or_else(|| GitError::InvalidSubmodule(name.to_string()))?;
                Ok(self.repo.submodule_executor(path))
            }
        }
    }

    /// Fetches a single commit's sha, subject, full message, author, and
    /// timestamp, and parses a version token out of the message if present.
    pub fn get_commit_info(&self, sha: &str, submodule: Option<&str>) -> Result<CommitRecord> {
        self.require_ready()?;
        let exec = self.executor_for(submodule)?;
        if !exec.predicate(["cat-file", "-e", sha])? {
            return Err(GitError::InvalidCommit(sha.to_string()));
        }
        let format = format!("--format=%H{s}%s{s}%B{s}%an{s}%at", s = FIELD_SEP);
        let out = exec.execute(["show", "-s", &format, sha])?;
        parse_commit_record(&out).ok_or_else(|| GitError::GitCommandError {
            stdout: out,
            stderr: format!("malformed commit record for {sha}"),
        })
    }

    /// Finds commits whose subject or body contains `text`. The
    /// case-insensitive match over subject and body happens in-process, not
    /// via `git log --grep -i`, so a match spanning both is found uniformly.
    pub fn find_commits_by_text(
        &self,
        text: &str,
        submodule: Option<&str>,
    ) -> Result<Vec<CommitRecord>> {
        self.require_ready()?;
        let exec = self.executor_for(submodule)?;
        let format = format!("--format=%H{f}%s{f}%b{r}", f = FIELD_SEP, r = RECORD_SEP);
        let out = exec.execute(["log", &format])?;
        let needle = text.to_lowercase();

        let mut matches = Vec::new();
        for record in out.split(RECORD_SEP) {
            let record = record.trim_start_matches('\n');
            if record.trim().is_empty() {
                continue;
            }
            let mut fields = record.splitn(3, FIELD_SEP);
            let sha = match fields.next() {
                Some(s) if !s.is_empty() => s,
                _ => continue,
            };
            let subject = fields.next().unwrap_or_default();
            let body = fields.next().unwrap_or_default();
            if subject.to_lowercase().contains(&needle) || body.to_lowercase().contains(&needle) {
                matches.push(sha.to_string());
            }
        }

        matches
            .into_iter()
            .map(|sha| self.get_commit_info(&sha, submodule))
            .collect()
    }

    /// Finds every commit whose message matches `version`. Always scoped to
    /// the parent repository; a submodule's own version history has no
    /// bearing on this lookup.
    pub fn find_commit_by_version(&self, version: &str) -> Result<Vec<String>> {
        self.require_ready()?;
        let grep = format!("--grep={version}");
        let out = self
            .repo
            .executor()
            .execute(["log", "-i", &grep, "--format=%H"])?;
        Ok(out
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// The nearest version commits strictly before and at-or-after `sha`,
    /// as commit shas. The caller extracts the version token from whichever
    /// of these it needs via [`QueryEngine::get_commit_info`].
    pub fn surrounding_versions(&self, sha: &str) -> Result<(Option<String>, Option<String>)> {
        self.require_ready()?;
        let exec = self.repo.executor();
        let grep = format!("--grep={GIT_VERSION_REGEX}");

        let previous = exec.execute([
            "log",
            "--extended-regexp",
            &grep,
            "--format=%H",
            "-n",
            "1",
            &format!("{sha}~1"),
        ])?;
        let previous = previous.lines().next().map(str::trim).filter(|s| !s.is_empty()).map(String::from);

        let next_range = format!("{sha}^1..HEAD");
        let next = exec.execute(["log", "--extended-regexp", &grep, "--format=%H", &next_range])?;
        let next = next
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(String::from);

        Ok((previous, next))
    }

    /// The central query: the first version whose ancestry includes `sha`,
    /// resolving through a submodule's own history first when `submodule`
    /// is given.
    pub fn first_version_containing_commit(
        &self,
        sha: &str,
        submodule: Option<&str>,
    ) -> Result<Option<String>> {
        self.require_ready()?;

        let resolved_sha = match submodule {
            None => {
                if !self.repo.has_commit(sha) {
                    return Err(GitError::InvalidCommit(sha.to_string()));
                }
                sha.to_string()
            }
            Some(name) => {
                if !self.repo.submodules().iter().any(|s| s.as_str() == name) {
                    return Err(GitError::InvalidSubmodule(name.to_string()));
                }
                if !self.repo.submodule_has_commit(name, sha)? {
                    return Err(GitError::InvalidCommit(sha.to_string()));
                }
                self.parent_of_submodule_change(name, sha)?
            }
        };

        let (_, next) = self.surrounding_versions(&resolved_sha)?;
        match next {
            None => Ok(None),
            Some(next_sha) => {
                let record = self.get_commit_info(&next_sha, None)?;
                Ok(record.version.map(|v| v.as_str().to_string()))
            }
        }
    }

    /// A single `(parent_sha, submodule_sha)` pair parsed out of one
    /// `git log -p -- <submodule>` diff hunk.
    fn scan_submodule_pointers(&self, submodule: &str) -> Result<Vec<(String, String)>> {
        let format = "--format=Commit: %H".to_string();
        let count = self.history_window.to_string();
        let out = self.repo.executor().execute([
            "log",
            &format,
            "-n",
            &count,
            "-p",
            "--",
            submodule,
        ])?;

        let mut entries = Vec::new();
        let mut current: Option<String> = None;
        for line in out.lines() {
            if let Some(h) = line.strip_prefix("Commit: ") {
                current = Some(h.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("+Subproject commit ") {
                if let Some(h) = current.take() {
                    let sub_h = rest.split_whitespace().next().unwrap_or(rest).to_string();
                    entries.push((h, sub_h));
                }
            }
        }
        if entries.len() == self.history_window {
            warn!(
                "submodule pointer scan for {submodule} exhausted the {}-commit history window without necessarily reaching the oldest change; results may be incomplete",
                self.history_window
            );
        }
        Ok(entries)
    }

    /// The newest parent-repo commit whose recorded submodule pointer
    /// already has `target_subsha` as an ancestor-or-equal — the commit
    /// *after* which the submodule change became visible in the parent
    /// repository. See DESIGN.md for the boundary-direction rationale.
    fn parent_of_submodule_change(&self, submodule: &str, target_subsha: &str) -> Result<String> {
        let entries = self.scan_submodule_pointers(submodule)?;
        if entries.is_empty() {
            return Err(GitError::NoSubmoduleChange(submodule.to_string()));
        }
        if entries.len() == 1 {
            return Ok(entries[0].0.clone());
        }

        let sub_exec = self
            .repo
            .submodule_executor(&SubmodulePath::new(submodule));
        let predicate = |sub_h: &str| -> Result<bool> {
            if sub_h == target_subsha {
                return Ok(true);
            }
            Ok(sub_exec.predicate(["merge-base", "--is-ancestor", target_subsha, sub_h])?)
        };

        // Entries are newest-first; the predicate is true for newest
        // entries (submodule already advanced past the target) and false
        // for the oldest ones, assuming monotone inclusion per branch.
        // Binary search for `lo`, the first (newest-to-oldest) index where
        // the predicate flips to false.
        let mut lo = 0usize;
        let mut hi = entries.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if predicate(&entries[mid].1)? {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        let boundary = if lo == 0 {
            // Every entry in the window fails the predicate: the
            // submodule never visibly advances past the target within
            // this scan. Fall back to the newest entry in the list as a
            // diagnostic boundary.
            warn!(
                "submodule pointer scan for {submodule} found no entry ancestor-or-equal to {target_subsha} within the window; returning the newest scanned commit as a diagnostic boundary"
            );
            0
        } else if lo == entries.len() {
            // Every entry satisfies the predicate: return the oldest.
            entries.len() - 1
        } else {
            lo - 1
        };
        Ok(entries[boundary].0.clone())
    }

    fn ls_tree_submodule_ptr(&self, commit: &str, submodule: &str) -> Result<Option<String>> {
        let out = self
            .repo
            .executor()
            .execute(["ls-tree", "-r", "--full-tree", commit, submodule])?;
        Ok(out
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(2))
            .map(String::from))
    }

    /// `<sha>^` if it resolves, else `sha` itself (root commits have no
    /// parent).
    fn parent_or_self(&self, exec: &GitExecutor, sha: &str) -> Result<String> {
        let parent_ref = format!("{sha}^");
        if exec.predicate(["rev-parse", "--verify", "-q", &parent_ref])? {
            Ok(exec.execute(["rev-parse", &parent_ref])?.trim().to_string())
        } else {
            Ok(sha.to_string())
        }
    }

    /// Every commit strictly after `v1`'s version commit up to and
    /// including `v2`'s, translated into a submodule's own history when
    /// `submodule` is given.
    pub fn commits_between_versions(
        &self,
        v1: &str,
        v2: &str,
        submodule: Option<&str>,
    ) -> Result<Vec<CommitRecord>> {
        self.require_ready()?;

        let c1 = self
            .find_commit_by_version(v1)?
            .into_iter()
            .next()
            .ok_or_else(|| GitError::VersionNotFound(v1.to_string()))?;
        let c2 = self
            .find_commit_by_version(v2)?
            .into_iter()
            .next()
            .ok_or_else(|| GitError::VersionNotFound(v2.to_string()))?;

        let (exec, lower_ref, upper_ref) = match submodule {
            None => (self.repo.executor().clone(), c1, c2),
            Some(name) => {
                if !self.repo.submodules().iter().any(|s| s.as_str() == name) {
                    return Err(GitError::InvalidSubmodule(name.to_string()));
                }
                let sub_c1 = self.ls_tree_submodule_ptr(&c1, name)?.ok_or_else(|| {
                    GitError::GitCommandError {
                        stdout: String::new(),
                        stderr: format!("no submodule pointer for {name} at {c1}"),
                    }
                })?;
                let sub_c2 = self.ls_tree_submodule_ptr(&c2, name)?.ok_or_else(|| {
                    GitError::GitCommandError {
                        stdout: String::new(),
                        stderr: format!("no submodule pointer for {name} at {c2}"),
                    }
                })?;
                (self.executor_for(Some(name))?, sub_c1, sub_c2)
            }
        };

        let lower = self.parent_or_self(&exec, &lower_ref)?;
        let range = format!("{lower}..{upper_ref}");
        let out = exec.execute(["log", "--format=%H", &range])?;
        out.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|sha| self.get_commit_info(sha, submodule))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorConfig;
    use crate::repository::test_support::*;
    use std::path::Path;

    fn ready_repo(dir: &Path) -> Repository {
        let mut repo = Repository::open(dir, ExecutorConfig::default()).unwrap();
        repo.update_repository(Some("main")).unwrap();
        repo
    }

    #[test]
    fn not_ready_repo_rejects_every_query() {
        let dir = init_repo();
        let repo = Repository::open(dir.path(), ExecutorConfig::default()).unwrap();
        let engine = QueryEngine::new(&repo);
        assert!(matches!(
            engine.find_commit_by_version("1_0_0"),
            Err(GitError::NotReady)
        ));
        assert!(matches!(
            engine.find_commits_by_text("x", None),
            Err(GitError::NotReady)
        ));
    }

    #[test]
    fn scenario_linear_version_discovery() {
        let dir = init_repo();
        empty_commit(dir.path(), "Version: 2024_01");
        let x = empty_commit(dir.path(), "a non-version commit");
        empty_commit(dir.path(), "Version: 2024_02");
        empty_commit(dir.path(), "Version: 2024_03");

        let repo = ready_repo(dir.path());
        let engine = QueryEngine::new(&repo);
        let version = engine.first_version_containing_commit(&x, None).unwrap();
        assert_eq!(version.as_deref(), Some("2024_02"));
    }

    #[test]
    fn scenario_no_later_version() {
        let dir = init_repo();
        empty_commit(dir.path(), "Version: 2024_01");
        let y = empty_commit(dir.path(), "last commit, no version after");

        let repo = ready_repo(dir.path());
        let engine = QueryEngine::new(&repo);
        let version = engine.first_version_containing_commit(&y, None).unwrap();
        assert_eq!(version, None);
    }

    #[test]
    fn scenario_surrounding_versions() {
        let dir = init_repo();
        empty_commit(dir.path(), "Version: 2024_01");
        let m = empty_commit(dir.path(), "middle commit");
        empty_commit(dir.path(), "Version: 2024_02");

        let repo = ready_repo(dir.path());
        let engine = QueryEngine::new(&repo);
        let (prev, next) = engine.surrounding_versions(&m).unwrap();
        let prev_version = engine
            .get_commit_info(&prev.unwrap(), None)
            .unwrap()
            .version
            .unwrap()
            .as_str()
            .to_string();
        let next_version = engine
            .get_commit_info(&next.unwrap(), None)
            .unwrap()
            .version
            .unwrap()
            .as_str()
            .to_string();
        assert_eq!(prev_version, "2024_01");
        assert_eq!(next_version, "2024_02");
    }

    #[test]
    fn scenario_between_versions_no_submodule() {
        let dir = init_repo();
        empty_commit(dir.path(), "Version: 1_0_0");
        let add_file = commit(dir.path(), "add file2");
        empty_commit(dir.path(), "Version: 1_1_0");

        let repo = ready_repo(dir.path());
        let engine = QueryEngine::new(&repo);
        let commits = engine
            .commits_between_versions("1_0_0", "1_1_0", None)
            .unwrap();
        let shas: Vec<_> = commits.iter().map(|c| c.sha.as_str()).collect();
        assert!(shas.contains(&add_file.as_str()));
        // `git log` orders newest-first, so the `Version: 1_1_0` commit is
        // the first entry, not the last.
        assert_eq!(commits.first().unwrap().version.as_ref().unwrap().as_str(), "1_1_0");
    }

    #[test]
    fn scenario_text_search_scoping() {
        let parent_dir = init_repo();
        let sub_dir = init_repo();
        empty_commit(sub_dir.path(), "hello world");

        run_git(
            parent_dir.path(),
            &[
                "-c",
                "protocol.file.allow=always",
                "submodule",
                "add",
                sub_dir.path().to_str().unwrap(),
                "sub",
            ],
        );
        run_git(parent_dir.path(), &["commit", "-m", "add submodule"]);
        let parent_hello = empty_commit(parent_dir.path(), "hello world");

        let repo = ready_repo(parent_dir.path());
        let engine = QueryEngine::new(&repo);

        let parent_matches = engine.find_commits_by_text("hello", None).unwrap();
        assert_eq!(parent_matches.len(), 1);
        assert_eq!(parent_matches[0].sha, parent_hello);

        let sub_matches = engine.find_commits_by_text("hello", Some("sub")).unwrap();
        assert_eq!(sub_matches.len(), 1);
        assert_ne!(sub_matches[0].sha, parent_hello);
    }

    #[test]
    fn scenario_submodule_pointer_walk() {
        let parent_dir = init_repo();
        let sub_dir = init_repo();
        let before = empty_commit(sub_dir.path(), "sub: before change");
        let target = empty_commit(sub_dir.path(), "sub: the change, C");

        run_git(
            parent_dir.path(),
            &[
                "-c",
                "protocol.file.allow=always",
                "submodule",
                "add",
                sub_dir.path().to_str().unwrap(),
                "sub",
            ],
        );
        run_git(parent_dir.path(), &["-C", "sub", "checkout", &before]);
        run_git(parent_dir.path(), &["add", "sub"]);
        let p1 = {
            run_git(parent_dir.path(), &["commit", "-m", "P1: before target"]);
            run_git(parent_dir.path(), &["rev-parse", "HEAD"])
        };

        run_git(parent_dir.path(), &["-C", "sub", "checkout", &target]);
        run_git(parent_dir.path(), &["add", "sub"]);
        let p2 = {
            run_git(parent_dir.path(), &["commit", "-m", "P2: after target"]);
            run_git(parent_dir.path(), &["rev-parse", "HEAD"])
        };
        let _ = p1;

        empty_commit(parent_dir.path(), "Version: 2024_01");

        let repo = ready_repo(parent_dir.path());
        let engine = QueryEngine::new(&repo);

        let boundary = engine.parent_of_submodule_change("sub", &target).unwrap();
        assert_eq!(boundary, p2);

        let version = engine
            .first_version_containing_commit(&target, Some("sub"))
            .unwrap();
        assert_eq!(version.as_deref(), Some("2024_01"));
    }

    #[test]
    fn invalid_submodule_is_rejected() {
        let dir = init_repo();
        let repo = ready_repo(dir.path());
        let engine = QueryEngine::new(&repo);
        let err = engine
            .find_commits_by_text("x", Some("does-not-exist"))
            .unwrap_err();
        assert!(matches!(err, GitError::InvalidSubmodule(_)));
    }

    #[test]
    fn version_not_found_is_reported() {
        let dir = init_repo();
        let repo = ready_repo(dir.path());
        let engine = QueryEngine::new(&repo);
        let err = engine
            .commits_between_versions("9_9_9", "9_9_9", None)
            .unwrap_err();
        assert!(matches!(err, GitError::VersionNotFound(_)));
    }
}
