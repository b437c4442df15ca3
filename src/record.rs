//! The structured description of a git commit returned by the query engine.
use crate::types::Version;
use crate::version::extract_version;

/// The ASCII Unit Separator used to delimit fields within a single
/// `git show`/`git log` pretty-format record (`%x1F` in the format string).
pub(crate) const FIELD_SEP: char = '\u{1F}';

/// A structured description of a git commit.
///
/// Constructed on demand from `git show`/`git log` output; never mutated
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Full (or, rarely, abbreviated) commit identifier as reported by git.
    pub sha: String,
    /// First line of the commit message.
    pub subject: String,
    /// Full commit message body, subject included.
    pub message: String,
    /// Author display name.
    pub author: String,
    /// Commit timestamp, seconds since the Unix epoch.
    pub timestamp: i64,
    /// The version token extracted from `message`, if any.
    pub version: Option<Version>,
}

impl CommitRecord {
    /// `timestamp` as a UTC instant, for display purposes. `None` only for
    /// the handful of out-of-range timestamps `chrono` itself rejects.
    pub fn timestamp_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Parses a single `%H%x1F%s%x1F%B%x1F%an%x1F%at`-formatted record, as
/// produced by `git show -s --format=...`.
pub(crate) fn parse_commit_record(raw: &str) -> Option<CommitRecord> {
    let raw = raw.trim_end_matches('\n');
    let mut fields = raw.splitn(5, FIELD_SEP);
    let sha = fields.next()?.to_string();
    let subject = fields.next()?.to_string();
    let message = fields.next()?.trim_end_matches('\n').to_string();
    let author = fields.next()?.to_string();
    let timestamp = fields.next()?.trim().parse().ok()?;
    let version = extract_version(&message);
    Some(CommitRecord {
        sha,
        subject,
        message,
        author,
        timestamp,
        version,
    })
}
