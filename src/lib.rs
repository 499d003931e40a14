/*!
 * extractfs - Bundle the text files of a directory tree into one document
 *
 * The engine walks a directory in sorted order, filters every file through
 * an ordered set of rules, drops binary content, decodes what remains and
 * writes it into a single artifact that is committed atomically.
 */

pub mod classifier;
pub mod config;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod gitignore;
pub mod reader;
pub mod report;
pub mod scanner;
pub mod settings;
pub mod stats;
pub mod tokenizer;
pub mod types;
pub mod utils;
pub mod writer;


// Re-export main components for easier access
pub use config::{Config, OutputFormat};
pub use error::{ExtractError, Result};
pub use extractor::Extractor;
pub use gitignore::{GitignoreMatcher, IgnoreMatcher, NoopMatcher};
pub use report::{ReportFormat, Reporter};
pub use settings::Settings;
pub use stats::ExtractionResult;
pub use tokenizer::{create_tokenizer, Tokenizer};
pub use types::SkipReason;
pub use utils::{count_files, format_file_size};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
