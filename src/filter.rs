/*!
 * Inclusion and exclusion rules applied to every visited file
 *
 * Rules run in a fixed order and the first one that fires wins:
 *
 * 1. exclude patterns (bypassed by a forced include)
 * 2. .gitignore (bypassed by a forced include)
 * 3. include patterns, when any are configured
 * 4. name, extension and path skip-sets (bypassed by any include match)
 * 5. empty files, then the size limit
 *
 * An include match can rescue a file from the user's exclude rules but
 * never from the size checks.
 */

use std::collections::BTreeSet;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::Config;
use crate::error::{ExtractError, Result};
use crate::gitignore::IgnoreMatcher;
use crate::types::{Decision, ScanEntry, SkipReason};

/// Compile shell-style patterns into a single matcher.
///
/// `*` also crosses `/`, so `*.log` matches `logs/debug.log`.
pub fn build_globset<I, S>(patterns: I) -> Result<GlobSet>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(&fnmatch_to_glob(pattern.as_ref()))?);
    }
    Ok(builder.build()?)
}

/// Rewrite an fnmatch pattern in globset syntax.
///
/// fnmatch has no `{a,b}` alternation and reads a `[` without a closing
/// `]` as a literal, so those characters become one-character classes.
fn fnmatch_to_glob(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut glob = String::with_capacity(pattern.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    glob.extend(&chars[i..=end]);
                    i = end + 1;
                    continue;
                }
                None => glob.push_str("[[]"),
            },
            '{' => glob.push_str("[{]"),
            '}' => glob.push_str("[}]"),
            c => glob.push(c),
        }
        i += 1;
    }
    glob
}

// A `]` right after `[` or `[!` is a class member, not the end
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut start = open + 1;
    if chars.get(start) == Some(&'!') {
        start += 1;
    }
    if chars.get(start) == Some(&']') {
        start += 1;
    }
    chars
        .get(start..)?
        .iter()
        .position(|&c| c == ']')
        .map(|offset| start + offset)
}

/// Compiled form of a [`Config`]'s filtering rules
pub struct FilterPipeline<'a> {
    config: &'a Config,
    include: GlobSet,
    exclude: GlobSet,
    skip_patterns: GlobSet,
    ignore: &'a dyn IgnoreMatcher,
}

impl<'a> FilterPipeline<'a> {
    /// Compile the configured patterns; `ignore` is consulted for rule 2
    pub fn new(config: &'a Config, ignore: &'a dyn IgnoreMatcher) -> Result<Self> {
        Ok(Self {
            config,
            include: build_globset(&config.include_patterns)?,
            exclude: build_globset(&config.exclude_patterns)?,
            skip_patterns: build_globset(&config.skip_patterns)?,
            ignore,
        })
    }

    /// Whether the relative path matches a configured include pattern
    pub fn include_override(&self, relative: &str) -> bool {
        !self.config.include_patterns.is_empty() && self.include.is_match(relative)
    }

    /// Decide whether `entry` belongs in the artifact.
    ///
    /// Returns an error only when the size is needed and the stat failed.
    pub fn decide(&self, entry: &ScanEntry) -> Result<Decision> {
        let rel = entry.relative.as_str();
        let include_override = self.include_override(rel);
        let include_forced = include_override && self.config.force_include;

        if !include_forced && self.exclude.is_match(rel) {
            return Ok(Decision::Skip(SkipReason::ExcludedPattern));
        }

        if !include_forced && self.ignore.is_active() && self.ignore.is_ignored(rel) {
            return Ok(Decision::Skip(SkipReason::Gitignore));
        }

        if !self.config.include_patterns.is_empty() && !include_override {
            return Ok(Decision::Skip(SkipReason::NotIncluded));
        }

        if !include_override {
            if let Some(reason) = self.skip_set_reason(entry) {
                return Ok(Decision::Skip(reason));
            }
        }

        let size = match &entry.size {
            Ok(size) => *size,
            Err(e) => {
                return Err(ExtractError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Unable to inspect file '{}': {}", entry.path.display(), e),
                )))
            }
        };

        if self.config.skip_empty && size == 0 {
            return Ok(Decision::Skip(SkipReason::Empty));
        }

        if size > self.config.max_file_size {
            return Ok(Decision::Skip(SkipReason::TooLarge));
        }

        Ok(Decision::Accept { include_override })
    }

    fn skip_set_reason(&self, entry: &ScanEntry) -> Option<SkipReason> {
        if self.config.skip_files.contains(entry.file_name()) {
            return Some(SkipReason::ExcludedName);
        }

        if self.config.skip_extensions.contains(&entry.extension()) {
            return Some(SkipReason::ExcludedExt);
        }

        if self.skip_patterns.is_match(&entry.relative)
            || segment_is_skipped(&entry.relative, &self.config.skip_patterns)
        {
            return Some(SkipReason::ExcludedPath);
        }

        None
    }
}

// Hidden segments are skipped along with any segment named in the skip-set
fn segment_is_skipped(relative: &str, skip_patterns: &BTreeSet<String>) -> bool {
    relative
        .split('/')
        .any(|part| part.starts_with('.') || skip_patterns.contains(part))
}
