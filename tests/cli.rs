//! End-to-end tests of the `version-finder` binary against a throwaway git
//! repository.
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command as StdCommand;

fn hermetic_env() {
    std::env::set_var("GIT_CONFIG_NOSYSTEM", "true");
    std::env::set_var("GIT_CONFIG_GLOBAL", "/dev/null");
    std::env::set_var("GIT_AUTHOR_NAME", "testuser");
    std::env::set_var("GIT_AUTHOR_EMAIL", "testuser@example.com");
    std::env::set_var("GIT_COMMITTER_NAME", "testuser");
    std::env::set_var("GIT_COMMITTER_EMAIL", "testuser@example.com");
}

fn run_git(dir: &Path, args: &[&str]) -> String {
    let out = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git");
    assert!(out.status.success(), "git {args:?} failed: {}", String::from_utf8_lossy(&out.stderr));
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn init_repo() -> tempfile::TempDir {
    hermetic_env();
    let dir = tempfile::tempdir().unwrap();
    run_git(dir.path(), &["init", "--initial-branch", "main"]);
    run_git(dir.path(), &["commit", "--allow-empty", "-m", "Initial commit"]);
    dir
}

fn empty_commit(dir: &Path, subject: &str) -> String {
    run_git(dir, &["commit", "--allow-empty", "-m", subject]);
    run_git(dir, &["rev-parse", "HEAD"])
}

fn version_finder_command() -> Command {
    Command::cargo_bin("version-finder").unwrap()
}

#[test]
fn lists_tasks_when_none_selected() {
    let dir = init_repo();
    version_finder_command()
        .arg("--path")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("first-version-for-commit"))
        .stdout(predicate::str::contains("commits-between-versions"))
        .stdout(predicate::str::contains("commits-by-text"));
}

#[test]
fn finds_first_version_containing_commit() {
    let dir = init_repo();
    empty_commit(dir.path(), "Version: 2024_01");
    let target = empty_commit(dir.path(), "a change worth tracking");
    empty_commit(dir.path(), "Version: 2024_02");

    version_finder_command()
        .arg("--path")
        .arg(dir.path())
        .arg("--task")
        .arg("0")
        .arg("--commit")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("2024_02"));
}

#[test]
fn reports_invalid_commit() {
    let dir = init_repo();
    empty_commit(dir.path(), "Version: 2024_01");

    version_finder_command()
        .arg("--path")
        .arg(dir.path())
        .arg("--task")
        .arg("0")
        .arg("--commit")
        .arg("deadbeefdeadbeefdeadbeefdeadbeefdeadbeef")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid-commit"));
}

#[test]
fn finds_commits_by_text() {
    let dir = init_repo();
    empty_commit(dir.path(), "fix the frobnicator");

    version_finder_command()
        .arg("--path")
        .arg(dir.path())
        .arg("--task")
        .arg("2")
        .arg("--search-text")
        .arg("frobnicator")
        .assert()
        .success()
        .stdout(predicate::str::contains("fix the frobnicator"));
}

#[test]
fn rejects_dirty_repository() {
    let dir = init_repo();
    std::fs::write(dir.path().join("dirty.txt"), "uncommitted").unwrap();
    // `git diff --quiet HEAD` ignores untracked files; stage the file so
    // the diff against HEAD is actually non-empty.
    run_git(dir.path(), &["add", "dirty.txt"]);

    version_finder_command()
        .arg("--path")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("repository-not-clean"));
}
