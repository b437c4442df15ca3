//! A static catalog of the tasks the query engine can run, addressed by
//! index or name.
//!
//! The catalog only describes *which* typed
//! [`QueryEngine`](crate::engine::QueryEngine) method a task maps to; a
//! caller (the CLI binary) still does the actual dispatch, since argument
//! shapes differ per task and a closed `enum` keeps that match exhaustive.
use once_cell::sync::Lazy;

/// Identifies which query a [`TaskDescriptor`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    FirstVersionForCommit,
    CommitsBetweenVersions,
    CommitsByText,
}

/// A single entry in the task catalog: a stable index, a name, a short
/// description, and the argument names a caller must supply.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub index: usize,
    pub name: &'static str,
    pub description: &'static str,
    pub argument_names: &'static [&'static str],
    pub kind: TaskKind,
}

static TASKS: Lazy<Vec<TaskDescriptor>> = Lazy::new(|| {
    vec![
        TaskDescriptor {
            index: 0,
            name: "first-version-for-commit",
            description: "Find the first version whose release includes a given commit",
            argument_names: &["commit"],
            kind: TaskKind::FirstVersionForCommit,
        },
        TaskDescriptor {
            index: 1,
            name: "commits-between-versions",
            description: "List every commit between two version-marker commits",
            argument_names: &["start_version", "end_version"],
            kind: TaskKind::CommitsBetweenVersions,
        },
        TaskDescriptor {
            index: 2,
            name: "commits-by-text",
            description: "Find commits whose subject or body matches free text",
            argument_names: &["search_text"],
            kind: TaskKind::CommitsByText,
        },
    ]
});

/// The full task catalog, in stable index order.
pub fn all() -> &'static [TaskDescriptor] {
    &TASKS
}

pub fn by_index(index: usize) -> Option<&'static TaskDescriptor> {
    TASKS.iter().find(|t| t.index == index)
}

pub fn by_name(name: &str) -> Option<&'static TaskDescriptor> {
    TASKS.iter().find(|t| t.name == name)
}

pub fn has_index(index: usize) -> bool {
    by_index(index).is_some()
}

pub fn has_name(name: &str) -> bool {
    by_name(name).is_some()
}
