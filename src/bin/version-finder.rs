//! Command-line entry point: opens a repository, brings it to a task-ready
//! state, and runs one of the tasks in [`version_finder::task_registry`].
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::Level;

use version_finder::prelude::*;
use version_finder::task_registry::{self, TaskKind};

/// Locates versions and their surrounding commits across a repository and
/// its submodules.
#[derive(Parser)]
#[command(version, name = "version-finder")]
struct Cli {
    /// Path to the git repository to operate on.
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Index of the task to run (see the task listing printed with no
    /// `--task` given).
    #[arg(long)]
    task: Option<usize>,

    /// Branch to check out before running a task.
    #[arg(long)]
    branch: Option<String>,

    /// Commit sha, for `first-version-for-commit`.
    #[arg(long)]
    commit: Option<String>,

    /// Submodule path, for tasks that may be scoped to a submodule.
    #[arg(long)]
    submodule: Option<String>,

    /// Lower bound version, for `commits-between-versions`.
    #[arg(long = "start-version")]
    start_version: Option<String>,

    /// Upper bound version, for `commits-between-versions`.
    #[arg(long = "end-version")]
    end_version: Option<String>,

    /// Free text to search for, for `commits-by-text`.
    #[arg(long = "search-text")]
    search_text: Option<String>,

    /// Per-call git command timeout, in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Number of retries for a failing git command.
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Increase verbosity (can be specified multiple times).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let logger_level = match cli.verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(logger_level.as_str())).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", error_kind(&e));
            ExitCode::FAILURE
        }
    }
}

/// Maps a [`GitError`] to the short kind name a caller can match on,
/// mirroring the taxonomy a structured log consumer would key off of.
fn error_kind(e: &GitError) -> &'static str {
    match e {
        GitError::GitNotInstalled => "git-not-installed",
        GitError::InvalidRepository(_) => "invalid-repository",
        GitError::RepositoryNotClean => "repository-not-clean",
        GitError::GitCommandError { .. } => "git-command-error",
        GitError::Timeout(_) => "timeout",
        GitError::NotReady => "not-ready",
        GitError::InvalidBranch(_) => "invalid-branch",
        GitError::InvalidSubmodule(_) => "invalid-submodule",
        GitError::InvalidCommit(_) => "invalid-commit",
        GitError::VersionNotFound(_) => "version-not-found",
        GitError::NoSubmoduleChange(_) => "no-submodule-change",
        GitError::InvalidRefName(_) => "invalid-ref-name",
        GitError::Undecodable => "undecodable-output",
        GitError::WorkingDirectoryInaccessible => "working-directory-inaccessible",
        GitError::Execution(_) => "execution-error",
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ExecutorConfig::new(
        Duration::from_secs(cli.timeout),
        cli.retries,
        Duration::from_secs(1),
    )?;

    // Preflight: fail fast and clearly on a too-old git, before anything
    // else touches the repository.
    let preflight = GitExecutor::new(&cli.path, config)?;
    preflight.check_version(MINIMUM_GIT_VERSION)?;

    let mut repo = Repository::open(&cli.path, config)?;
    repo.update_repository(cli.branch.as_deref())?;
    let engine = QueryEngine::new(&repo);

    let Some(task_index) = cli.task else {
        print_task_listing();
        return Ok(());
    };

    let task = task_registry::by_index(task_index).ok_or_else(|| {
        GitError::Execution(format!("no task with index {task_index}; run without --task to list them"))
    })?;

    match task.kind {
        TaskKind::FirstVersionForCommit => {
            let commit = cli
                .commit
                .ok_or_else(|| GitError::Execution("--commit is required for this task".to_string()))?;
            match engine.first_version_containing_commit(&commit, cli.submodule.as_deref())? {
                Some(version) => println!("{version}"),
                None => println!("no later version contains this commit"),
            }
        }
        TaskKind::CommitsBetweenVersions => {
            let start = cli.start_version.ok_or_else(|| {
                GitError::Execution("--start-version is required for this task".to_string())
            })?;
            let end = cli.end_version.ok_or_else(|| {
                GitError::Execution("--end-version is required for this task".to_string())
            })?;
            let commits =
                engine.commits_between_versions(&start, &end, cli.submodule.as_deref())?;
            print_commits(&commits);
        }
        TaskKind::CommitsByText => {
            let text = cli.search_text.ok_or_else(|| {
                GitError::Execution("--search-text is required for this task".to_string())
            })?;
            let commits = engine.find_commits_by_text(&text, cli.submodule.as_deref())?;
            print_commits(&commits);
        }
    }

    Ok(())
}

fn print_task_listing() {
    println!("available tasks:");
    for task in task_registry::all() {
        println!(
            "  {} {} - {} (args: {})",
            task.index,
            task.name,
            task.description,
            task.argument_names.join(", ")
        );
    }
}

fn print_commits(commits: &[CommitRecord]) {
    for commit in commits {
        println!("{} {}", commit.sha, commit.subject);
    }
}
