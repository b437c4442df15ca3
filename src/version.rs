//! Pure parsing of the version grammar embedded in commit subjects/bodies.
use crate::types::Version;
use once_cell::sync::Lazy;
use regex::Regex;

/// Extended-regex string used when asking git itself to select version
/// commits (`git log --extended-regexp --grep=<GIT_VERSION_REGEX>`).
///
/// This is intentionally narrower than [`extract_version`]'s in-process
/// grammar: it always requires one of the three keyword prefixes. Any
/// subject this regex accepts is guaranteed to be parsed successfully by
/// [`extract_version`], but the converse does not hold — a bare digit run
/// with no keyword prefix parses in-process but would not match here.
pub const GIT_VERSION_REGEX: &str =
    r"(Version|VERSION|Updated version)(:)? (XX_)?[0-9]+(_|.)[0-9]+((-|.)[0-9]+)?";

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(?:Version|VERSION):\s*|Updated version\s*)?(?:XX_)?(\d{1,4}(?:[._-]\d{1,4})+)")
        .expect("invalid static version regex")
});

/// Extracts a version token from a commit subject or full message.
///
/// The prefix (`Version:`, `VERSION:`, or the literal phrase
/// `Updated version`) and the `XX_` marker are optional and, when present,
/// excluded from the returned token. Returns `None` when no version-shaped
/// token is found anywhere in `message`.
pub fn extract_version(message: &str) -> Option<Version> {
    VERSION_REGEX
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| Version::new(m.as_str()))
}
