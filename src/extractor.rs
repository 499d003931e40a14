/*!
 * Extraction run orchestration
 *
 * One run is a single sequential pass: traverse, decide, classify, read,
 * write, count. The artifact is only committed when the whole pass succeeds.
 */

use std::fs;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::classifier::{classify_file, Classification};
use crate::config::Config;
use crate::error::{ExtractError, Result, ResultExt};
use crate::filter::FilterPipeline;
use crate::gitignore::{load_matcher, IgnoreMatcher};
use crate::reader::read_file_content;
use crate::scanner::{ScanWarning, Scanner};
use crate::stats::{ExtractionResult, StatsCollector};
use crate::tokenizer::{create_tokenizer, Tokenizer, DEFAULT_MODEL};
use crate::types::{Decision, ScanEntry, SkipReason};
use crate::writer::{AtomicOutput, BundleWriter, HeaderInfo, Totals};
use crate::{ensure, error};

/// Progress callback: `(increment, description)` once per visited file
pub type ProgressCallback<'a> = &'a mut dyn FnMut(u64, &str);

/// Extraction engine
pub struct Extractor {
    config: Config,
    tokenizer: Option<Box<dyn Tokenizer>>,
    ignore: Option<Box<dyn IgnoreMatcher>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Extractor {
    /// Create an engine for `config`
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tokenizer: None,
            ignore: None,
            cancel: None,
        }
    }

    /// Count tokens with `tokenizer` instead of building one from the config.
    ///
    /// An injected tokenizer counts even when `count_tokens` is off.
    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Match paths with `matcher` instead of loading the root `.gitignore`
    pub fn with_ignore_matcher(mut self, matcher: Box<dyn IgnoreMatcher>) -> Self {
        self.ignore = Some(matcher);
        self
    }

    /// Abort the run between two files once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Extract `root` into the artifact at `output`.
    ///
    /// The result is returned only after the artifact has been committed. On
    /// any error the previous content of `output` is left untouched.
    pub fn extract(
        &self,
        root: impl AsRef<Path>,
        output: impl AsRef<Path>,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<ExtractionResult> {
        self.extract_with_sink(root.as_ref(), output.as_ref(), progress, direct)
    }

    /// Same as [`extract`](Self::extract), with the temporary file reached
    /// through whatever writer `wrap` returns.
    pub(crate) fn extract_with_sink<F>(
        &self,
        root: &Path,
        output: &Path,
        progress: Option<ProgressCallback<'_>>,
        wrap: F,
    ) -> Result<ExtractionResult>
    where
        F: for<'s> FnOnce(&'s mut AtomicOutput) -> Box<dyn Write + 's>,
    {
        self.config.validate()?;
        let root = resolve_root(root)?;
        let output = resolve_output(output)?;

        info!("Extracting {} into {}", root.display(), output.display());

        let mut sink = AtomicOutput::create(&output)?;
        let temp_path = sink.temp_path().to_path_buf();

        let scanner = Scanner::new(&root);
        let stats = {
            let mut writer = BundleWriter::new(wrap(&mut sink), self.config.format);
            let stats = self.run(
                &root,
                &output,
                &temp_path,
                scanner.entries(),
                &mut writer,
                progress,
            )?;
            writer.into_inner().flush()?;
            stats
        };

        sink.commit()?;

        let result = stats.finish(root, output);
        info!(
            "Wrote {} files ({} skipped) to {}",
            result.processed_files(),
            result.skipped_files(),
            result.output.display()
        );
        Ok(result)
    }

    fn run<W, I>(
        &self,
        root: &Path,
        output: &Path,
        temp_path: &Path,
        entries: I,
        writer: &mut BundleWriter<W>,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<StatsCollector>
    where
        W: Write,
        I: IntoIterator<Item = std::result::Result<ScanEntry, ScanWarning>>,
    {
        let mut stats = StatsCollector::new();
        let mut progress = Progress::new(progress);

        // Gitignore
        let loaded;
        let ignore: &dyn IgnoreMatcher = match &self.ignore {
            Some(matcher) => matcher.as_ref(),
            None => {
                let (matcher, warnings) = load_matcher(root, self.config.use_gitignore);
                for warning in warnings {
                    stats.warn(warning);
                }
                loaded = matcher;
                loaded.as_ref()
            }
        };

        // Tokenizer
        let created;
        let tokenizer: Option<&dyn Tokenizer> = match &self.tokenizer {
            Some(tokenizer) => Some(tokenizer.as_ref()),
            None if self.config.count_tokens => {
                let model = self.config.tokenizer_model.as_deref().unwrap_or(DEFAULT_MODEL);
                match create_tokenizer(model) {
                    Ok(tokenizer) => {
                        created = tokenizer;
                        Some(created.as_ref())
                    }
                    Err(e) => {
                        stats.warn(format!("Token counting disabled: {}", e));
                        None
                    }
                }
            }
            None => None,
        };
        if let Some(tokenizer) = tokenizer {
            stats.enable_tokens(tokenizer.model_id());
        }

        let filter = FilterPipeline::new(&self.config, ignore)?;

        writer.write_header(&HeaderInfo {
            root,
            config: &self.config,
            gitignore: self.config.use_gitignore.then(|| ignore.is_active()),
        })?;

        for item in entries {
            if self.is_cancelled() {
                info!("Extraction cancelled after {} files", stats.processed_files());
                return Err(ExtractError::Cancelled);
            }

            let entry = match item {
                Ok(entry) => entry,
                Err(warning) => {
                    stats.warn(warning);
                    continue;
                }
            };
            let rel = entry.relative.as_str();

            if entry.path == temp_path {
                continue;
            }
            if entry.path == output {
                progress.notify(&format!("Skipping {}", rel));
                continue;
            }

            let decision = match filter.decide(&entry) {
                Ok(decision) => decision,
                Err(e) => {
                    stats.warn(e.to_string());
                    stats.record_skip(SkipReason::Other, rel);
                    progress.notify(&format!("Skipping {}", rel));
                    continue;
                }
            };

            let include_override = match decision {
                Decision::Skip(reason) => {
                    debug!("Skipping {} ({})", rel, reason);
                    stats.record_skip(reason, rel);
                    progress.notify(&format!("Skipping {}", rel));
                    continue;
                }
                Decision::Accept { include_override } => include_override,
            };

            if let Classification::Binary(why) = classify_file(&entry.path) {
                debug!("Skipping {} (binary: {:?})", rel, why);
                stats.record_skip(SkipReason::Binary, rel);
                progress.notify(&format!("Skipping {}", rel));
                continue;
            }

            let content = read_file_content(&entry.path);
            writer
                .write_file(rel, &content, include_override)
                .with_context(|| format!("Failed to write {} to the output", rel))?;

            if let Some(tokenizer) = tokenizer {
                match tokenizer.count_tokens(&content) {
                    Ok(count) => stats.add_tokens(count),
                    Err(e) => warn!("Failed to count tokens for {}: {}", rel, e),
                }
            }

            debug!("Extracted {} ({} bytes)", rel, content.len());
            stats.record_processed(rel, content.len() as u64);
            progress.notify(rel);
        }

        writer.write_trailer(&Totals {
            files: stats.processed_files(),
            bytes: stats.total_bytes(),
            tokens: stats.token_count(),
        })?;

        Ok(stats)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::SeqCst))
    }
}

fn direct(sink: &mut AtomicOutput) -> Box<dyn Write + '_> {
    Box::new(sink)
}

/// Best-effort progress notifications.
///
/// A panicking callback is dropped after the first panic.
struct Progress<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> Progress<'a> {
    fn new(callback: Option<ProgressCallback<'a>>) -> Self {
        Self { callback }
    }

    fn notify(&mut self, description: &str) {
        let Some(callback) = self.callback.as_mut() else {
            return;
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(1, description)));
        if outcome.is_err() {
            warn!("Progress callback panicked; further progress updates are suppressed");
            self.callback = None;
        }
    }
}

/// Canonicalize the scan root, which must be an existing directory
fn resolve_root(root: &Path) -> Result<PathBuf> {
    let canonical = fs::canonicalize(root)
        .map_err(|_| ExtractError::InvalidRoot(root.display().to_string()))?;
    ensure!(canonical.is_dir(), InvalidRoot, "{}", root.display());
    Ok(canonical)
}

/// Create the output's parent directory and return the output under its
/// canonical parent, so it can be compared with traversed paths
fn resolve_output(output: &Path) -> Result<PathBuf> {
    let name = output
        .file_name()
        .ok_or_else(|| error!(Config, "Output path has no file name: {}", output.display()))?;
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;
    Ok(fs::canonicalize(parent)?.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn write_tree(root: &Path, files: &[(&str, &[u8])]) -> io::Result<()> {
        for (rel, content) in files {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)?;
        }
        Ok(())
    }

    #[test]
    fn test_resolve_root_rejects_files_and_missing_paths() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("file.txt");
        fs::write(&file, "x")?;

        assert!(matches!(resolve_root(&file), Err(ExtractError::InvalidRoot(_))));
        assert!(matches!(
            resolve_root(&dir.path().join("missing")),
            Err(ExtractError::InvalidRoot(_))
        ));
        assert_eq!(resolve_root(dir.path())?, fs::canonicalize(dir.path())?);
        Ok(())
    }

    #[test]
    fn test_resolve_output_creates_parent() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("deep/er/out.txt");

        let resolved = resolve_output(&output)?;
        assert!(dir.path().join("deep/er").is_dir());
        assert_eq!(resolved, fs::canonicalize(dir.path())?.join("deep/er/out.txt"));
        Ok(())
    }

    #[test]
    fn test_output_inside_root_is_not_recorded() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        write_tree(dir.path(), &[("main.py", b"print('hi')\n")])?;
        let output = dir.path().join("bundle.txt");
        let extractor = Extractor::new(Config::default());

        extractor.extract(dir.path(), &output, None)?;

        let mut descriptions = Vec::new();
        let mut record = |_: u64, d: &str| descriptions.push(d.to_string());
        let result = extractor.extract(dir.path(), &output, Some(&mut record))?;

        assert_eq!(result.processed_paths, vec!["main.py"]);
        assert_eq!(result.skipped_files(), 0);
        assert_eq!(descriptions, vec!["Skipping bundle.txt", "main.py"]);
        Ok(())
    }

    #[test]
    fn test_panicking_callback_is_suppressed() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        write_tree(
            dir.path(),
            &[("a.txt", b"a"), ("b.txt", b"b"), ("c.txt", b"c")],
        )?;
        let out = tempfile::tempdir()?;

        let mut calls = 0;
        let mut explode = |_: u64, _: &str| {
            calls += 1;
            panic!("progress sink went away");
        };
        let result = Extractor::new(Config::default()).extract(
            dir.path(),
            out.path().join("out.txt"),
            Some(&mut explode),
        )?;

        assert_eq!(calls, 1);
        assert_eq!(result.processed_paths, vec!["a.txt", "b.txt", "c.txt"]);
        Ok(())
    }

    #[test]
    fn test_injected_matcher_is_used() -> io::Result<()> {
        struct IgnoreLogs;
        impl IgnoreMatcher for IgnoreLogs {
            fn is_ignored(&self, relative: &str) -> bool {
                relative.ends_with(".log")
            }
            fn is_active(&self) -> bool {
                true
            }
        }

        let dir = tempfile::tempdir()?;
        write_tree(dir.path(), &[("app.log", b"line"), ("app.py", b"pass")])?;
        let out = tempfile::tempdir()?;

        let result = Extractor::new(Config::default())
            .with_ignore_matcher(Box::new(IgnoreLogs))
            .extract(dir.path(), out.path().join("out.txt"), None)?;

        assert_eq!(result.processed_paths, vec!["app.py"]);
        assert_eq!(result.skipped_for(SkipReason::Gitignore), ["app.log"]);
        Ok(())
    }

    #[test]
    fn test_stat_failure_is_skipped_as_other() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        write_tree(dir.path(), &[("a.txt", b"alpha")])?;
        let root = fs::canonicalize(dir.path())?;
        let output = root.join("out.txt");

        let vanished = ScanEntry {
            path: root.join("vanished.txt"),
            relative: "vanished.txt".to_string(),
            size: Err(io::Error::new(io::ErrorKind::NotFound, "gone")),
        };
        let scanner = Scanner::new(&root);
        let entries = scanner.entries().chain(std::iter::once(Ok(vanished)));

        let extractor = Extractor::new(Config::default());
        let mut buffer = Vec::new();
        let mut writer = BundleWriter::new(&mut buffer, extractor.config.format);
        let mut descriptions = Vec::new();
        let mut record = |_: u64, d: &str| descriptions.push(d.to_string());
        let stats = extractor.run(
            &root,
            &output,
            &root.join("out.txt.tmp"),
            entries,
            &mut writer,
            Some(&mut record),
        )?;
        drop(writer);
        let result = stats.finish(root.clone(), output);

        assert_eq!(result.processed_paths, vec!["a.txt"]);
        assert_eq!(result.skipped_for(SkipReason::Other), ["vanished.txt"]);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("vanished.txt"));
        assert_eq!(descriptions, vec!["a.txt", "Skipping vanished.txt"]);

        let bundle = String::from_utf8_lossy(&buffer);
        assert!(bundle.contains("\n--- a.txt ---\nalpha\n"));
        assert!(!bundle.contains("--- vanished.txt ---"));
        Ok(())
    }
}
