/*!
 * Configuration handling for extractfs
 */

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::ensure;
use crate::error::Result;
use crate::filter::build_globset;
use crate::utils::{
    normalize_extension, DEFAULT_SKIP_EXTENSIONS, DEFAULT_SKIP_FILES, DEFAULT_SKIP_PATTERNS,
};

/// Default maximum file size in KiB
pub const DEFAULT_MAX_SIZE_KB: u64 = 500;

/// Layout of each file block in the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `--- path ---` separators
    #[default]
    Compact,
    /// Bordered `FILE: path` blocks
    Standard,
}

/// Command-line arguments for extractfs
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    name = "extractfs",
    version = env!("CARGO_PKG_VERSION"),
    about = "Bundle the text files of a directory tree into a single document",
    long_about = "Walks a directory tree, filters out build artifacts, binaries, oversized files and user-specified patterns, and writes every remaining text file into one annotated document."
)]
pub struct Args {
    /// Root directory to extract
    #[clap(default_value = ".")]
    pub path: String,

    /// Output file path
    #[clap(short, long)]
    pub output: Option<String>,

    /// Maximum file size in KB
    #[clap(long, value_name = "KB")]
    pub max_size: Option<u64>,

    /// Use compact `--- path ---` separators
    #[clap(long, conflicts_with = "no_compact")]
    pub compact: bool,

    /// Use bordered `FILE:` blocks
    #[clap(long)]
    pub no_compact: bool,

    /// Skip empty files
    #[clap(long, conflicts_with = "no_skip_empty")]
    pub skip_empty: bool,

    /// Keep empty files
    #[clap(long)]
    pub no_skip_empty: bool,

    /// Respect the root .gitignore
    #[clap(long, conflicts_with = "no_gitignore")]
    pub gitignore: bool,

    /// Ignore the root .gitignore
    #[clap(long)]
    pub no_gitignore: bool,

    /// Include glob pattern (repeatable or comma-separated)
    #[clap(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Exclude glob pattern (repeatable or comma-separated)
    #[clap(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Let include patterns rescue files from exclude and gitignore rules
    #[clap(long)]
    pub force_include: bool,

    /// Tokenizer model used for token counting
    #[clap(long, value_name = "ID")]
    pub tokenizer_model: Option<String>,

    /// Disable token counting
    #[clap(long)]
    pub no_token_count: bool,

    /// Print the extraction result as JSON
    #[clap(long)]
    pub json: bool,

    /// Persist the effective settings
    #[clap(long)]
    pub save_config: bool,

    /// Generate shell completions
    #[clap(long = "generate", value_enum)]
    pub generate: Option<Shell>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable logging
    #[clap(short, long)]
    pub quiet: bool,
}

/// Filter configuration, fixed for the duration of a run
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum file size in bytes; larger files are skipped
    pub max_file_size: u64,

    /// Skip zero-byte files
    pub skip_empty: bool,

    /// Layout of file blocks
    pub format: OutputFormat,

    /// Match relative paths against the root .gitignore
    pub use_gitignore: bool,

    /// Patterns to include (if empty, include all)
    pub include_patterns: Vec<String>,

    /// Patterns to exclude
    pub exclude_patterns: Vec<String>,

    /// Let include matches bypass exclude patterns and .gitignore
    pub force_include: bool,

    /// Extensions to skip, lowercase with leading dot
    pub skip_extensions: BTreeSet<String>,

    /// File names to skip
    pub skip_files: BTreeSet<String>,

    /// Path patterns and directory names to skip
    pub skip_patterns: BTreeSet<String>,

    /// Tokenizer model; `gpt-4` when counting without one
    pub tokenizer_model: Option<String>,

    /// Count tokens of the emitted content
    pub count_tokens: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_SIZE_KB * 1024,
            skip_empty: true,
            format: OutputFormat::Compact,
            use_gitignore: false,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            force_include: false,
            skip_extensions: DEFAULT_SKIP_EXTENSIONS.clone(),
            skip_files: DEFAULT_SKIP_FILES.clone(),
            skip_patterns: DEFAULT_SKIP_PATTERNS.clone(),
            tokenizer_model: None,
            count_tokens: false,
        }
    }
}

impl Config {
    /// Replace the extension skip-set, normalizing each entry
    pub fn with_skip_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.skip_extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_file_size > 0,
            Config,
            "maximum file size must be greater than zero"
        );

        build_globset(&self.include_patterns)?;
        build_globset(&self.exclude_patterns)?;
        build_globset(&self.skip_patterns)?;

        Ok(())
    }

    /// Maximum file size in whole KiB, as printed in the artifact header
    pub fn max_file_size_kb(&self) -> u64 {
        self.max_file_size / 1024
    }
}

/// Where the artifact goes when neither settings nor flags say otherwise
pub fn default_output_path() -> PathBuf {
    PathBuf::from("extracted.txt")
}
