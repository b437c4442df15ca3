//! Defines core data types: branch/submodule identifiers and the parsed
//! version token.
use crate::error::GitError;
use std::ffi::OsStr;
use std::fmt::{self, Display, Formatter};
use std::result::Result as StdResult;
use std::str::FromStr;

/// A specialized `Result` type, re-exported for convenience alongside the
/// newtypes defined here.
pub type Result<A> = StdResult<A, GitError>;

/// Represents a validated Git branch name (or more generally, a reference
/// name).
///
/// Can be created from a string using `FromStr`, which validates the format
/// according to Git's reference naming rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchName {
    pub(crate) value: String,
}

impl FromStr for BranchName {
    type Err = GitError;

    /// Parses a string into a `BranchName`, returning `Err(GitError::InvalidRefName)` if
    /// the string does not conform to Git's reference naming rules.
    fn from_str(s: &str) -> Result<Self> {
        if is_valid_reference_name(s) {
            Ok(BranchName {
                value: String::from(s),
            })
        } else {
            Err(GitError::InvalidRefName(s.to_string()))
        }
    }
}

impl Display for BranchName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl AsRef<OsStr> for BranchName {
    fn as_ref(&self) -> &OsStr {
        self.value.as_ref()
    }
}

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// Represents a submodule's path relative to the parent repository root.
///
/// Unlike [`BranchName`], submodule paths are opaque filesystem paths
/// reported by `git submodule status` — they are treated purely as set
/// members for membership checks, not validated against ref-name rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmodulePath {
    pub(crate) value: String,
}

impl SubmodulePath {
    pub fn new(value: impl Into<String>) -> Self {
        SubmodulePath {
            value: value.into(),
        }
    }
}

impl Display for SubmodulePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl AsRef<str> for SubmodulePath {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl AsRef<OsStr> for SubmodulePath {
    fn as_ref(&self) -> &OsStr {
        self.value.as_ref()
    }
}

impl SubmodulePath {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// A parsed version token, e.g. `2024_01_15` or `1.0.0-rc1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub(crate) value: String,
}

impl Version {
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Version {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

// --- Internal validation logic ---

const INVALID_REFERENCE_CHARS: [char; 5] = [' ', '~', '^', ':', '\\'];
const INVALID_REFERENCE_START: &str = "-";
const INVALID_REFERENCE_END: &str = ".";

/// Checks if a string is a valid Git reference name based on common rules.
///
/// Rules approximated from `git check-ref-format`.
/// See: https://git-scm.com/docs/git-check-ref-format
fn is_valid_reference_name(name: &str) -> bool {
    !name.is_empty() // Cannot be empty
        && !name.starts_with(INVALID_REFERENCE_START)
        && !name.ends_with(INVALID_REFERENCE_END)
        && !name.starts_with('.')
        && !name.starts_with('/')
        && !name.ends_with('/')
        && name.chars().all(|c| {
            !c.is_ascii_control() && INVALID_REFERENCE_CHARS.iter().all(|invalid| c != *invalid)
        })
        && !name.contains("/.")
        && !name.contains("@{")
        && !name.contains("..")
        && name != "@"
        && !name.contains("//") && !name.contains("/*") && !name.contains('?') && !name.contains('[') && !name.contains(']')
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_reference_names() {
        let valid_references = vec![
            "avalidreference",
            "a/valid/ref",
            "a-valid-ref",
            "v1.0.0",
            "HEAD", // Although special, it's structurally valid
            "feature/new_stuff",
            "fix_123",
        ];

        for reference_name in valid_references.iter() {
            assert!(
                is_valid_reference_name(reference_name),
                "Expected valid: {}",
                reference_name
            );
            assert!(
                BranchName::from_str(reference_name).is_ok(),
                "Expected OK: {}",
                reference_name
            );
        }
    }

    #[test]
    fn test_invalid_reference_names() {
        let invalid_references = vec![
            "", // Empty
            "double..dot",
            "inavlid^character",
            "invalid~character",
            "invalid:character",
            "invalid\\character",
            "@",
            "inavlid@{sequence",
            ".start", // Does not start with .
            "end.",
            "/start", // Does not start with /
            "end/",   // Does not end with /
            "with space",
            "with\tcontrol",
            "with//double",
            "path/./dotslash",
            "-startwithdash",
        ];

        for reference_name in invalid_references.iter() {
            assert!(
                !is_valid_reference_name(reference_name),
                "Expected invalid: {}",
                reference_name
            );
            assert!(
                BranchName::from_str(reference_name).is_err(),
                "Expected Err: {}",
                reference_name
            );
        }
    }
}
