/*!
 * Persisted user settings
 *
 * Settings live in `<config_dir>/extractfs/settings.toml`. They sit between
 * the built-in defaults and the command line: flags override the file, the
 * file overrides the defaults.
 */

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{default_output_path, Args, Config, OutputFormat, DEFAULT_MAX_SIZE_KB};
use crate::error::{ExtractError, Result};
use crate::tokenizer::DEFAULT_MODEL;
use crate::writer::AtomicOutput;

/// Location of the settings file, if the platform has a config directory
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("extractfs").join("settings.toml"))
}

/// User settings as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_path: String,
    pub max_size_kb: u64,
    pub compact_mode: bool,
    pub skip_empty: bool,
    pub use_gitignore: bool,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub force_include: bool,
    /// `None` keeps the built-in extension skip-set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_extensions: Option<Vec<String>>,
    /// `None` keeps the built-in path skip-set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_patterns: Option<Vec<String>>,
    /// `None` keeps the built-in name skip-set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_files: Option<Vec<String>>,
    pub tokenizer_model: String,
    pub enable_token_count: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_path: default_output_path().to_string_lossy().to_string(),
            max_size_kb: DEFAULT_MAX_SIZE_KB,
            compact_mode: true,
            skip_empty: true,
            use_gitignore: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            force_include: false,
            skip_extensions: None,
            skip_patterns: None,
            skip_files: None,
            tokenizer_model: DEFAULT_MODEL.to_string(),
            enable_token_count: true,
        }
    }
}

impl Settings {
    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`.
    ///
    /// A missing file gives the defaults. A file that cannot be read or
    /// parsed is reported and also gives the defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring settings file: {}", e);
                Self::default()
            }
        }
    }

    /// Parse `path`, failing on any read or syntax error
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ExtractError::Settings(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ExtractError::Settings(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Save to the default location and return where it went
    pub fn save(&self) -> Result<PathBuf> {
        let path = settings_path().ok_or_else(|| {
            ExtractError::Settings("No configuration directory on this platform".to_string())
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write atomically to `path`, creating its directory if needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ExtractError::Settings(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut output = AtomicOutput::create(path)?;
        output.write_all(content.as_bytes())?;
        output.commit()
    }

    /// Overlay the flags that were given on the command line
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(output) = &args.output {
            self.output_path = output.clone();
        }
        if let Some(max_size) = args.max_size {
            self.max_size_kb = max_size;
        }
        if args.compact {
            self.compact_mode = true;
        }
        if args.no_compact {
            self.compact_mode = false;
        }
        if args.skip_empty {
            self.skip_empty = true;
        }
        if args.no_skip_empty {
            self.skip_empty = false;
        }
        if args.gitignore {
            self.use_gitignore = true;
        }
        if args.no_gitignore {
            self.use_gitignore = false;
        }
        if !args.include.is_empty() {
            self.include_patterns = args.include.clone();
        }
        if !args.exclude.is_empty() {
            self.exclude_patterns = args.exclude.clone();
        }
        if args.force_include {
            self.force_include = true;
        }
        if let Some(model) = &args.tokenizer_model {
            self.tokenizer_model = model.clone();
        }
        if args.no_token_count {
            self.enable_token_count = false;
        }
    }

    /// Where the artifact should be written
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_path)
    }

    /// Build the filter configuration for a run
    pub fn to_config(&self) -> Config {
        let mut config = Config {
            max_file_size: self.max_size_kb.saturating_mul(1024),
            skip_empty: self.skip_empty,
            format: if self.compact_mode {
                OutputFormat::Compact
            } else {
                OutputFormat::Standard
            },
            use_gitignore: self.use_gitignore,
            include_patterns: self.include_patterns.clone(),
            exclude_patterns: self.exclude_patterns.clone(),
            force_include: self.force_include,
            tokenizer_model: Some(self.tokenizer_model.clone()),
            count_tokens: self.enable_token_count,
            ..Config::default()
        };

        if let Some(extensions) = &self.skip_extensions {
            config = config.with_skip_extensions(extensions);
        }
        if let Some(patterns) = &self.skip_patterns {
            config.skip_patterns = patterns.iter().cloned().collect();
        }
        if let Some(files) = &self.skip_files {
            config.skip_files = files.iter().cloned().collect();
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.toml"));
        assert_eq!(settings, Settings::default());
        assert!(settings.use_gitignore);
        assert_eq!(settings.tokenizer_model, "gpt-4");
    }

    #[test]
    fn test_broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "max_size_kb = \"lots\"\n[[[").unwrap();

        assert!(Settings::from_file(&path).is_err());
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_and_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "max_size_kb = 64\ncompact_mode = false\nfavourite_colour = \"teal\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.max_size_kb, 64);
        assert!(!settings.compact_mode);
        assert!(settings.skip_empty);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.toml");
        let settings = Settings {
            include_patterns: vec!["src/**".to_string()],
            skip_extensions: Some(vec![".pdf".to_string()]),
            enable_token_count: false,
            ..Settings::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_args_override_settings() {
        let mut settings = Settings {
            max_size_kb: 64,
            include_patterns: vec!["docs/*".to_string()],
            ..Settings::default()
        };
        let args = Args::parse_from([
            "extractfs",
            "--max-size",
            "10",
            "--no-compact",
            "--no-gitignore",
            "--include",
            "src/*",
            "--no-token-count",
        ]);

        settings.apply_args(&args);
        assert_eq!(settings.max_size_kb, 10);
        assert!(!settings.compact_mode);
        assert!(!settings.use_gitignore);
        assert_eq!(settings.include_patterns, vec!["src/*"]);
        assert!(!settings.enable_token_count);
        // Untouched by the flags
        assert!(settings.skip_empty);
        assert_eq!(settings.output_path, "extracted.txt");
    }

    #[test]
    fn test_to_config() {
        let settings = Settings {
            max_size_kb: 2,
            compact_mode: false,
            skip_extensions: Some(vec!["LOG".to_string()]),
            skip_files: Some(Vec::new()),
            ..Settings::default()
        };

        let config = settings.to_config();
        assert_eq!(config.max_file_size, 2048);
        assert_eq!(config.format, OutputFormat::Standard);
        assert_eq!(config.skip_extensions.len(), 1);
        assert!(config.skip_extensions.contains(".log"));
        assert!(config.skip_files.is_empty());
        assert!(config.skip_patterns.contains("node_modules"));
        assert_eq!(config.tokenizer_model.as_deref(), Some("gpt-4"));
        assert!(config.count_tokens);
    }
}
