/*!
 * Core types and data structures for the extractfs engine
 */

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Why a visited file was left out of the artifact
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Extension is in the extension skip-set
    ExcludedExt,
    /// Base name is in the name skip-set
    ExcludedName,
    /// A path segment or skip pattern matched
    ExcludedPath,
    /// A user exclude pattern matched
    ExcludedPattern,
    /// The root .gitignore matched
    Gitignore,
    /// Include patterns are set and none matched
    NotIncluded,
    /// Zero bytes while empty files are skipped
    Empty,
    /// Larger than the configured maximum
    TooLarge,
    /// Content classified as binary
    Binary,
    /// Anything else, including stat failures
    #[serde(other)]
    Other,
}

impl SkipReason {
    /// Parse a reason tag, folding anything unknown into [`SkipReason::Other`]
    pub fn canonical(tag: &str) -> Self {
        tag.parse().unwrap_or(SkipReason::Other)
    }
}

/// A regular file visited during traversal
#[derive(Debug)]
pub struct ScanEntry {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the scan root, always `/`-separated
    pub relative: String,
    /// Size in bytes, or the error the stat produced
    pub size: io::Result<u64>,
}

impl ScanEntry {
    /// Final path component
    pub fn file_name(&self) -> &str {
        self.relative
            .rsplit('/')
            .next()
            .unwrap_or(self.relative.as_str())
    }

    /// Lowercased extension with its leading dot, empty when there is none.
    ///
    /// Dotfiles such as `.env` have no extension.
    pub fn extension(&self) -> String {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => String::new(),
            Some(idx) if idx + 1 == name.len() => String::new(),
            Some(idx) => name[idx..].to_lowercase(),
        }
    }
}

/// Outcome of the filter pipeline for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep the file; `include_override` records whether an include pattern matched
    Accept { include_override: bool },
    /// Leave the file out for the given reason
    Skip(SkipReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(relative: &str) -> ScanEntry {
        ScanEntry {
            path: PathBuf::from("/root").join(relative),
            relative: relative.to_string(),
            size: Ok(1),
        }
    }

    #[test]
    fn test_skip_reason_tags() {
        assert_eq!(SkipReason::ExcludedExt.to_string(), "excluded_ext");
        assert_eq!(SkipReason::TooLarge.as_ref(), "too_large");
        assert_eq!(SkipReason::canonical("gitignore"), SkipReason::Gitignore);
        assert_eq!(SkipReason::canonical("permission_denied"), SkipReason::Other);
    }

    #[test]
    fn test_unknown_reason_deserializes_as_other() {
        let reason: SkipReason = serde_json::from_str("\"vanished\"").unwrap();
        assert_eq!(reason, SkipReason::Other);
    }

    #[test]
    fn test_entry_name_and_extension() {
        let e = entry("src/lib/Main.RS");
        assert_eq!(e.file_name(), "Main.RS");
        assert_eq!(e.extension(), ".rs");

        assert_eq!(entry("archive.tar.gz").extension(), ".gz");
        assert_eq!(entry(".env").extension(), "");
        assert_eq!(entry("Makefile").extension(), "");
        assert_eq!(entry("weird.").extension(), "");
    }
}
