/*!
 * Utility functions for extractfs
 */

use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;
use walkdir::WalkDir;

/// Count regular files under `dir` for progress tracking
pub fn count_files(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
        })
        .count() as u64
}

/// Format a human-readable file size
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

/// Normalize an extension rule to lowercase with a leading dot
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Default extensions to skip
pub static DEFAULT_SKIP_EXTENSIONS: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        // Data & tabular
        ".csv", ".parquet", ".orc", ".avro", ".feather", ".h5", ".hdf5", ".pkl",
        ".npy", ".npz", ".dat", ".idx", ".bin",
        // Images
        ".jpeg", ".jpg", ".png", ".gif", ".bmp", ".ico", ".svg",
        // Audio & video
        ".mp4", ".mkv", ".webm", ".mp3", ".wav", ".flac", ".aac", ".wma",
        // Archives
        ".zip", ".rar", ".7z", ".tar", ".gz", ".bz2",
        // Executables & libraries
        ".exe", ".dll", ".so", ".dylib", ".pyc", ".pyo", ".pyd",
        // Documents
        ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".html",
        // Databases
        ".db", ".sqlite", ".sqlite3", ".sqlite3-wal", ".sqlite3-shm",
        // Models & checkpoints
        ".model", ".pt", ".ckpt", ".lgb",
        // Fonts
        ".woff", ".woff2", ".ttf", ".eot",
        // Misc
        ".gitignore", ".env", ".lock",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
});

/// Default directory and path patterns to skip
pub static DEFAULT_SKIP_PATTERNS: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        // Version Control
        ".git", ".svn", ".hg",
        // Dependencies
        "node_modules", "vendor",
        // Python
        "__pycache__", ".pytest_cache", ".mypy_cache", "venv", "env", "virtualenv",
        // IDEs & Editors
        ".vscode", ".idea",
        // Build & coverage
        "dist", "build", ".next", "coverage", ".nyc_output",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
});

/// Default file names to skip
pub static DEFAULT_SKIP_FILES: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        "package-lock.json", "yarn.lock", "poetry.lock", "Pipfile.lock",
        ".DS_Store", "Thumbs.db", "desktop.ini",
    ]
    .iter()
    .map(|f| f.to_string())
    .collect()
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 bytes");
        assert_eq!(format_file_size(2048), "2.00 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("PNG"), ".png");
        assert_eq!(normalize_extension(".Md"), ".md");
        assert_eq!(normalize_extension(" txt "), ".txt");
    }

    #[test]
    fn test_defaults_are_normalized() {
        assert!(DEFAULT_SKIP_EXTENSIONS
            .iter()
            .all(|ext| *ext == normalize_extension(ext)));
        assert!(DEFAULT_SKIP_PATTERNS.contains("node_modules"));
        assert!(DEFAULT_SKIP_FILES.contains("yarn.lock"));
    }

    #[test]
    fn test_count_files_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/one.txt"), "1").unwrap();
        fs::write(dir.path().join("a/b/two.txt"), "2").unwrap();
        fs::write(dir.path().join("three.txt"), "3").unwrap();

        assert_eq!(count_files(dir.path()), 3);
    }
}
