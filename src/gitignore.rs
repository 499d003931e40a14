//! `.gitignore` support
//!
//! The engine only needs to ask whether a relative path is ignored. The real
//! matcher is built from the root's `.gitignore` with the `ignore` crate; when
//! gitignore support is off, or the file cannot be loaded, [`NoopMatcher`]
//! stands in and the run carries on without it.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Answers whether a path relative to the scan root is ignored
pub trait IgnoreMatcher {
    /// `relative` uses `/` separators and never starts with `/`
    fn is_ignored(&self, relative: &str) -> bool;

    /// Whether the matcher carries rules from a loaded ignore file
    fn is_active(&self) -> bool;
}

/// Matcher used when gitignore support is unavailable or disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMatcher;

impl IgnoreMatcher for NoopMatcher {
    fn is_ignored(&self, _relative: &str) -> bool {
        false
    }

    fn is_active(&self) -> bool {
        false
    }
}

/// Matcher backed by the root `.gitignore`
pub struct GitignoreMatcher {
    inner: Gitignore,
}

impl GitignoreMatcher {
    /// Build from `<root>/.gitignore`.
    ///
    /// A missing file yields an active matcher with no rules. Lines that fail
    /// to parse are dropped and reported in the returned warnings.
    pub fn from_root(root: &Path) -> Result<(Self, Vec<String>), ignore::Error> {
        let mut builder = GitignoreBuilder::new(root);
        let mut warnings = Vec::new();

        let path = root.join(".gitignore");
        if path.is_file() {
            if let Some(err) = builder.add(&path) {
                warnings.push(format!("Failed to load .gitignore: {}", err));
            }
        }

        let inner = builder.build()?;
        Ok((Self { inner }, warnings))
    }

    /// Build from in-memory gitignore lines, anchored at `root`
    pub fn from_lines<I, S>(root: &Path, lines: I) -> Result<Self, ignore::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new(root);
        for line in lines {
            builder.add_line(None, line.as_ref())?;
        }
        Ok(Self {
            inner: builder.build()?,
        })
    }
}

impl IgnoreMatcher for GitignoreMatcher {
    fn is_ignored(&self, relative: &str) -> bool {
        self.inner
            .matched_path_or_any_parents(relative, false)
            .is_ignore()
    }

    fn is_active(&self) -> bool {
        true
    }
}

/// Load the matcher for a run.
///
/// Never fails: problems come back as warnings and degrade to [`NoopMatcher`].
pub fn load_matcher(root: &Path, enabled: bool) -> (Box<dyn IgnoreMatcher>, Vec<String>) {
    if !enabled {
        return (Box::new(NoopMatcher), Vec::new());
    }

    match GitignoreMatcher::from_root(root) {
        Ok((matcher, warnings)) => (Box::new(matcher), warnings),
        Err(e) => (
            Box::new(NoopMatcher),
            vec![format!("Failed to load .gitignore: {}", e)],
        ),
    }
}
