/*!
 * Artifact writer for extractfs
 *
 * The artifact is plain text: a `#` header describing the run, one block per
 * accepted file, and a `#` trailer with totals. It is written to a temporary
 * file next to the destination and renamed into place only once complete.
 */

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::{Config, OutputFormat};
use crate::error::{ExtractError, Result, ResultExt};

/// Width of the `=` rule lines
const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// What the header needs to know about a run
#[derive(Debug, Clone)]
pub struct HeaderInfo<'a> {
    pub root: &'a Path,
    pub config: &'a Config,
    /// `Some(active)` when gitignore support was requested
    pub gitignore: Option<bool>,
}

/// Totals written after the last file block
#[derive(Debug, Clone, Copy, Default)]
pub struct Totals {
    pub files: usize,
    pub bytes: u64,
    pub tokens: Option<usize>,
}

/// Formats the artifact onto any writer
pub struct BundleWriter<W: Write> {
    inner: W,
    format: OutputFormat,
}

impl<W: Write> BundleWriter<W> {
    /// Create a new bundle writer
    pub fn new(inner: W, format: OutputFormat) -> Self {
        Self { inner, format }
    }

    /// Write the run description that precedes file blocks
    pub fn write_header(&mut self, info: &HeaderInfo<'_>) -> io::Result<()> {
        let config = info.config;
        writeln!(self.inner, "# Extracted from: {}", info.root.display())?;
        writeln!(self.inner, "# Max file size: {}KB", config.max_file_size_kb())?;
        writeln!(self.inner, "# Mode: {}", self.format)?;
        writeln!(self.inner, "{}", rule())?;

        if let Some(active) = info.gitignore {
            writeln!(self.inner, "# Gitignore: {}", if active { "on" } else { "off" })?;
        }
        if !config.include_patterns.is_empty() {
            writeln!(
                self.inner,
                "# Include patterns: {}",
                config.include_patterns.join(", ")
            )?;
        }
        if !config.exclude_patterns.is_empty() {
            writeln!(
                self.inner,
                "# Exclude patterns: {}",
                config.exclude_patterns.join(", ")
            )?;
        }

        Ok(())
    }

    /// Write one file block.
    ///
    /// In the standard layout a file kept by an include pattern is marked on
    /// its `FILE:` line.
    pub fn write_file(&mut self, relative: &str, content: &str, included: bool) -> io::Result<()> {
        match self.format {
            OutputFormat::Compact => write!(self.inner, "\n--- {} ---\n{}\n", relative, content),
            OutputFormat::Standard => {
                let marker = if included { " (included by pattern)" } else { "" };
                write!(
                    self.inner,
                    "\n{rule}\nFILE: {relative}{marker}\n{rule}\n{content}\n\n",
                    rule = rule(),
                )
            }
        }
    }

    /// Write the totals that close the artifact
    pub fn write_trailer(&mut self, totals: &Totals) -> io::Result<()> {
        write!(self.inner, "\n{}\n", rule())?;
        writeln!(self.inner, "# Total files processed: {}", totals.files)?;
        writeln!(self.inner, "# Total size: {}KB", totals.bytes / 1024)?;
        if let Some(tokens) = totals.tokens {
            writeln!(self.inner, "# Total tokens: {}", tokens)?;
        }
        Ok(())
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Temporary file that becomes the destination only on [`commit`](Self::commit).
///
/// Dropping it without committing deletes the temporary file and leaves the
/// destination as it was.
pub struct AtomicOutput {
    writer: BufWriter<NamedTempFile>,
    destination: PathBuf,
}

impl AtomicOutput {
    /// Create `<name>.<random>.tmp` in the destination's directory
    pub fn create(destination: &Path) -> Result<Self> {
        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let name = destination
            .file_name()
            .ok_or_else(|| {
                ExtractError::Config(format!(
                    "Output path has no file name: {}",
                    destination.display()
                ))
            })?
            .to_string_lossy()
            .to_string();

        let temp = tempfile::Builder::new()
            .prefix(&format!("{}.", name))
            .suffix(".tmp")
            .tempfile_in(parent)?;

        Ok(Self {
            writer: BufWriter::new(temp),
            destination: destination.to_path_buf(),
        })
    }

    /// Path of the in-progress temporary file
    pub fn temp_path(&self) -> &Path {
        self.writer.get_ref().path()
    }

    /// Flush, fsync and rename over the destination
    pub fn commit(self) -> Result<()> {
        let temp = self
            .writer
            .into_inner()
            .map_err(|e| ExtractError::Io(e.into_error()))?;
        temp.as_file().sync_all()?;
        temp.persist(&self.destination)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace {}", self.destination.display()))?;

        sync_parent_dir(&self.destination);
        Ok(())
    }
}

impl Write for AtomicOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

// Best effort: make the rename itself durable where the platform allows it
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(format: OutputFormat, f: impl FnOnce(&mut BundleWriter<Vec<u8>>)) -> String {
        let mut writer = BundleWriter::new(Vec::new(), format);
        f(&mut writer);
        String::from_utf8(writer.into_inner()).unwrap()
    }

    fn tmp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |ext| ext == "tmp"))
            .collect()
    }

    #[test]
    fn test_compact_block() {
        let out = render(OutputFormat::Compact, |w| {
            w.write_file("src/main.rs", "fn main() {}", false).unwrap()
        });
        assert_eq!(out, "\n--- src/main.rs ---\nfn main() {}\n");
    }

    #[test]
    fn test_standard_block() {
        let out = render(OutputFormat::Standard, |w| {
            w.write_file("a.py", "print(1)", false).unwrap();
            w.write_file("b.py", "print(2)", true).unwrap();
        });
        let rule = "=".repeat(60);
        assert_eq!(
            out,
            format!(
                "\n{rule}\nFILE: a.py\n{rule}\nprint(1)\n\n\
                 \n{rule}\nFILE: b.py (included by pattern)\n{rule}\nprint(2)\n\n"
            )
        );
    }

    #[test]
    fn test_header_and_trailer() {
        let config = Config {
            include_patterns: vec!["src/*".to_string(), "*.md".to_string()],
            ..Config::default()
        };
        let root = PathBuf::from("/work/project");
        let out = render(OutputFormat::Compact, |w| {
            w.write_header(&HeaderInfo {
                root: &root,
                config: &config,
                gitignore: Some(true),
            })
            .unwrap();
            w.write_trailer(&Totals {
                files: 3,
                bytes: 4096,
                tokens: Some(42),
            })
            .unwrap();
        });

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "# Extracted from: /work/project");
        assert_eq!(lines[1], "# Max file size: 500KB");
        assert_eq!(lines[2], "# Mode: compact");
        assert_eq!(lines[3], "=".repeat(60));
        assert_eq!(lines[4], "# Gitignore: on");
        assert_eq!(lines[5], "# Include patterns: src/*, *.md");
        assert!(!out.contains("# Exclude patterns"));
        assert!(out.ends_with(
            "# Total files processed: 3\n# Total size: 4KB\n# Total tokens: 42\n"
        ));
    }

    #[test]
    fn test_commit_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        fs::write(&dest, "old").unwrap();

        let mut output = AtomicOutput::create(&dest).unwrap();
        assert!(output.temp_path().starts_with(dir.path()));
        output.write_all(b"new content").unwrap();
        // Nothing visible until commit
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");

        output.commit().unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new content");
        assert!(tmp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_drop_without_commit_leaves_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        fs::write(&dest, "previous run").unwrap();

        {
            let mut output = AtomicOutput::create(&dest).unwrap();
            output.write_all(b"partial").unwrap();
            assert_eq!(tmp_files(dir.path()).len(), 1);
        }

        assert_eq!(fs::read_to_string(&dest).unwrap(), "previous run");
        assert!(tmp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_commit_onto_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("taken");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("inside.txt"), "keep").unwrap();

        let mut output = AtomicOutput::create(&dest).unwrap();
        output.write_all(b"data").unwrap();
        assert!(output.commit().is_err());

        assert!(dest.is_dir());
        assert_eq!(fs::read_to_string(dest.join("inside.txt")).unwrap(), "keep");
        assert!(tmp_files(dir.path()).is_empty());
    }
}
