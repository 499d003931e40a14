/*!
 * Reporting functionality for extractfs
 *
 * Renders an [`ExtractionResult`] either as console tables, using the tabled
 * library for consistent rendering, or as JSON.
 */

use std::time::Duration;

use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::error::Result;
use crate::stats::ExtractionResult;
use crate::utils::format_file_size;

/// Format of the report output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Console table output
    ConsoleTable,
    /// The extraction result serialized as pretty JSON
    Json,
}

/// Report generator for extraction results
pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    /// Create a new reporter
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Format a number with human-readable units
    fn format_number(&self, num: usize) -> String {
        if num >= 1_000_000 {
            format!("{:.1}M", num as f64 / 1_000_000.0)
        } else if num >= 1_000 {
            format!("{:.1}K", num as f64 / 1_000.0)
        } else {
            num.to_string()
        }
    }

    /// Generate a report string for a finished run
    pub fn generate_report(&self, result: &ExtractionResult, duration: Duration) -> Result<String> {
        match self.format {
            ReportFormat::ConsoleTable => Ok(self.generate_console_report(result, duration)),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        }
    }

    /// Print the report to stdout
    pub fn print_report(&self, result: &ExtractionResult, duration: Duration) -> Result<()> {
        let report = self.generate_report(result, duration)?;
        match self.format {
            ReportFormat::ConsoleTable => println!("\n{}", report),
            ReportFormat::Json => println!("{}", report),
        }
        Ok(())
    }

    fn styled(mut table: Table) -> String {
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));
        table.to_string()
    }

    // Create a summary table using the tabled crate
    fn create_summary_table(&self, result: &ExtractionResult, duration: Duration) -> String {
        #[derive(Tabled)]
        struct SummaryRow {
            #[tabled(rename = "Metric")]
            key: String,

            #[tabled(rename = "Value")]
            value: String,
        }

        let mut rows = vec![
            SummaryRow {
                key: "📂 Output File".to_string(),
                value: result.output.display().to_string(),
            },
            SummaryRow {
                key: "⏱️ Process Time".to_string(),
                value: format!("{:.4?}", duration),
            },
            SummaryRow {
                key: "📄 Files Processed".to_string(),
                value: self.format_number(result.processed_files()),
            },
            SummaryRow {
                key: "🚫 Files Skipped".to_string(),
                value: self.format_number(result.skipped_files()),
            },
            SummaryRow {
                key: "💾 Total Size".to_string(),
                value: format_file_size(result.total_bytes),
            },
        ];

        if let Some(tokens) = result.token_count {
            let model = result.token_model.as_deref().unwrap_or("unknown");
            rows.push(SummaryRow {
                key: "📦 LLM Tokens".to_string(),
                value: format!("{} ({})", self.format_number(tokens), model),
            });
        }

        Self::styled(Table::new(rows))
    }

    // One row per skip reason that actually occurred
    fn create_skipped_table(&self, result: &ExtractionResult) -> Option<String> {
        #[derive(Tabled)]
        struct SkipRow {
            #[tabled(rename = "Reason")]
            reason: String,

            #[tabled(rename = "Files")]
            count: String,
        }

        let rows: Vec<SkipRow> = result
            .skipped()
            .into_iter()
            .map(|(reason, count)| SkipRow {
                reason: reason.to_string(),
                count: self.format_number(count),
            })
            .collect();

        if rows.is_empty() {
            None
        } else {
            Some(Self::styled(Table::new(rows)))
        }
    }

    // Generate a console table report
    fn generate_console_report(&self, result: &ExtractionResult, duration: Duration) -> String {
        let mut sections = Vec::new();

        if let Some(skipped) = self.create_skipped_table(result) {
            sections.push(format!("🚫  SKIPPED FILES\n{}", skipped));
        }

        if !result.warnings.is_empty() {
            let warnings: Vec<String> = result
                .warnings
                .iter()
                .map(|warning| format!("  - {}", warning))
                .collect();
            sections.push(format!("⚠️  WARNINGS\n{}", warnings.join("\n")));
        }

        sections.push(format!(
            "✅  EXTRACTION COMPLETE\n{}",
            self.create_summary_table(result, duration)
        ));

        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsCollector;
    use crate::types::SkipReason;
    use std::path::PathBuf;

    fn result() -> ExtractionResult {
        let mut stats = StatsCollector::new();
        stats.enable_tokens("gpt-4");
        stats.record_processed("src/main.rs", 2048);
        stats.add_tokens(1500);
        stats.record_skip(SkipReason::Binary, "logo.dat");
        stats.record_skip(SkipReason::TooLarge, "dump.sql");
        stats.record_skip(SkipReason::TooLarge, "huge.json");
        stats.warn("Failed to load .gitignore: bad glob");
        stats.finish(PathBuf::from("/work"), PathBuf::from("/work/out.txt"))
    }

    #[test]
    fn test_format_number() {
        let reporter = Reporter::new(ReportFormat::ConsoleTable);
        assert_eq!(reporter.format_number(999), "999");
        assert_eq!(reporter.format_number(1_500), "1.5K");
        assert_eq!(reporter.format_number(2_000_000), "2.0M");
    }

    #[test]
    fn test_console_report() {
        let reporter = Reporter::new(ReportFormat::ConsoleTable);
        let report = reporter
            .generate_report(&result(), Duration::from_millis(12))
            .unwrap();

        assert!(report.contains("SKIPPED FILES"));
        assert!(report.contains("too_large"));
        assert!(report.contains("binary"));
        assert!(report.contains("Failed to load .gitignore"));
        assert!(report.contains("/work/out.txt"));
        assert!(report.contains("1.5K (gpt-4)"));
        assert!(report.contains("2.00 KB"));
    }

    #[test]
    fn test_clean_run_has_no_skip_section() {
        let mut stats = StatsCollector::new();
        stats.record_processed("a.txt", 1);
        let result = stats.finish(PathBuf::from("/w"), PathBuf::from("/w/o.txt"));

        let report = Reporter::new(ReportFormat::ConsoleTable)
            .generate_report(&result, Duration::ZERO)
            .unwrap();
        assert!(!report.contains("SKIPPED FILES"));
        assert!(!report.contains("WARNINGS"));
        assert!(!report.contains("LLM Tokens"));
    }

    #[test]
    fn test_json_report() {
        let report = Reporter::new(ReportFormat::Json)
            .generate_report(&result(), Duration::ZERO)
            .unwrap();
        let parsed: ExtractionResult = serde_json::from_str(&report).unwrap();
        assert_eq!(parsed, result());
    }
}
