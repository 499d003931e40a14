/*!
 * Directory traversal
 *
 * Visits every regular file below the root exactly once, in sorted path
 * order. Siblings are sorted by name, so `a/b.txt` comes before `a.txt`.
 * Symlinks to files are visited as files; symlinked directories are not
 * descended into.
 */

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::types::ScanEntry;

/// Something that went wrong while walking, reported as a warning
pub type ScanWarning = String;

/// Walks a scan root in deterministic order
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    /// Create a scanner for `root`, which should already be canonical
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Iterate over the files below the root.
    ///
    /// Directories that cannot be read show up as `Err` items; the walk
    /// carries on past them.
    pub fn entries(&self) -> impl Iterator<Item = Result<ScanEntry, ScanWarning>> + '_ {
        WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) => self.to_scan_entry(&entry).map(Ok),
                Err(e) => Some(Err(format!("Failed to read directory entry: {}", e))),
            })
    }

    fn to_scan_entry(&self, entry: &DirEntry) -> Option<ScanEntry> {
        let file_type = entry.file_type();
        let size: io::Result<u64> = if file_type.is_file() {
            entry.metadata().map(|m| m.len()).map_err(Into::into)
        } else if file_type.is_symlink() {
            // Only links that resolve to a regular file count
            match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => Ok(meta.len()),
                _ => return None,
            }
        } else {
            return None;
        };

        Some(ScanEntry {
            path: entry.path().to_path_buf(),
            relative: relative_path(&self.root, entry.path())?,
            size,
        })
    }
}

/// `path` relative to `root`, joined with `/` on every platform
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
