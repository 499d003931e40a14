/*!
 * Statistics accounting for one extraction run
 */

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::SkipReason;

/// Everything a run learned, returned once the artifact is committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Canonical scan root
    pub root: PathBuf,
    /// Path of the committed artifact
    pub output: PathBuf,
    /// Relative paths written to the artifact, in output order
    pub processed_paths: Vec<String>,
    /// Bytes of decoded content written
    pub total_bytes: u64,
    /// Relative paths left out, grouped by reason
    #[serde(deserialize_with = "deserialize_skipped")]
    pub skipped_paths: BTreeMap<SkipReason, Vec<String>>,
    /// Non-fatal problems met along the way
    pub warnings: Vec<String>,
    /// Tokens in the written content, when counting was active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
    /// Model the tokens were counted with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_model: Option<String>,
}

impl ExtractionResult {
    /// Number of files written to the artifact
    pub fn processed_files(&self) -> usize {
        self.processed_paths.len()
    }

    /// Non-zero skip counts per reason
    pub fn skipped(&self) -> BTreeMap<SkipReason, usize> {
        let mut counts = BTreeMap::new();
        for (reason, paths) in &self.skipped_paths {
            if !paths.is_empty() {
                *counts.entry(*reason).or_insert(0) += paths.len();
            }
        }
        counts
    }

    /// Total number of skipped files
    pub fn skipped_files(&self) -> usize {
        self.skipped_paths.values().map(Vec::len).sum()
    }

    /// Paths skipped for `reason`, empty when there are none
    pub fn skipped_for(&self, reason: SkipReason) -> &[String] {
        self.skipped_paths
            .get(&reason)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// Unknown reason tags are folded into `other` instead of overwriting each other
fn deserialize_skipped<'de, D>(deserializer: D) -> Result<BTreeMap<SkipReason, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
    let mut skipped: BTreeMap<SkipReason, Vec<String>> = BTreeMap::new();
    for (tag, paths) in raw {
        skipped
            .entry(SkipReason::canonical(&tag))
            .or_default()
            .extend(paths);
    }
    Ok(skipped)
}

/// Accumulates decisions while a run is in flight
#[derive(Debug, Default)]
pub struct StatsCollector {
    processed_paths: Vec<String>,
    total_bytes: u64,
    skipped_paths: BTreeMap<SkipReason, Vec<String>>,
    warnings: Vec<String>,
    token_count: Option<usize>,
    token_model: Option<String>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting tokens for `model`
    pub fn enable_tokens(&mut self, model: impl Into<String>) {
        self.token_count = Some(0);
        self.token_model = Some(model.into());
    }

    pub fn record_processed(&mut self, relative: impl Into<String>, bytes: u64) {
        self.processed_paths.push(relative.into());
        self.total_bytes += bytes;
    }

    pub fn record_skip(&mut self, reason: SkipReason, relative: impl Into<String>) {
        self.skipped_paths
            .entry(reason)
            .or_default()
            .push(relative.into());
    }

    pub fn add_tokens(&mut self, tokens: usize) {
        if let Some(count) = self.token_count.as_mut() {
            *count += tokens;
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn processed_files(&self) -> usize {
        self.processed_paths.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn token_count(&self) -> Option<usize> {
        self.token_count
    }

    /// Seal the statistics into the run's result
    pub fn finish(self, root: PathBuf, output: PathBuf) -> ExtractionResult {
        ExtractionResult {
            root,
            output,
            processed_paths: self.processed_paths,
            total_bytes: self.total_bytes,
            skipped_paths: self.skipped_paths,
            warnings: self.warnings,
            token_count: self.token_count,
            token_model: self.token_model,
        }
    }
}
