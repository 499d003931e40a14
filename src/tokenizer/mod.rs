//! Tokenizer module for token counting with different LLM models
//!
//! The engine only needs "count the tokens of this text"; [`Tokenizer`] is
//! that capability. Providers for tiktoken encodings and HuggingFace hub
//! tokenizers implement it, and [`create_tokenizer`] picks one from a model
//! identifier.

mod error;
mod model;
mod provider;

// Re-exports for public API
pub use error::{TokenizerError, TokenizerResult};
pub use model::{ModelProvider, DEFAULT_MODEL, FALLBACK_ENCODING};

use provider::Provider;

/// Trait defining the interface for tokenizers
pub trait Tokenizer: Send + Sync {
    /// Count tokens in the given text
    fn count_tokens(&self, text: &str) -> TokenizerResult<usize>;

    /// Identifier of the model this tokenizer encodes for
    fn model_id(&self) -> &str;
}

/// Create a tokenizer for the specified model identifier
pub fn create_tokenizer(model_id: &str) -> TokenizerResult<Box<dyn Tokenizer>> {
    let trimmed = model_id.trim();
    if trimmed.is_empty() {
        return Err(TokenizerError::UnsupportedModel(
            "empty model identifier".to_string(),
        ));
    }

    let (kind, name) = ModelProvider::resolve(trimmed);
    let provider: Box<dyn Provider> = match kind {
        ModelProvider::OpenAI => Box::new(provider::openai::OpenAIProvider::new(name)?),
        ModelProvider::HuggingFace => {
            Box::new(provider::huggingface::HuggingFaceProvider::new(name)?)
        }
    };

    Ok(Box::new(ProviderTokenizer {
        provider,
        model_id: trimmed.to_string(),
    }))
}

/// Binds a provider to the model identifier it was created for
struct ProviderTokenizer {
    provider: Box<dyn Provider>,
    model_id: String,
}

impl Tokenizer for ProviderTokenizer {
    fn count_tokens(&self, text: &str) -> TokenizerResult<usize> {
        self.provider.count_tokens(text)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Simple mock tokenizer that doesn't rely on external dependencies
    struct MockTokenizer;

    impl Tokenizer for MockTokenizer {
        fn count_tokens(&self, text: &str) -> TokenizerResult<usize> {
            Ok(text.split_whitespace().count())
        }

        fn model_id(&self) -> &str {
            "mock"
        }
    }

    #[test]
    fn test_mock_tokenizer() {
        let tokenizer: Box<dyn Tokenizer> = Box::new(MockTokenizer);
        assert_eq!(tokenizer.count_tokens("Hello, world!").unwrap(), 2);
        assert_eq!(tokenizer.model_id(), "mock");
    }

    #[test]
    fn test_tiktoken_counts_tokens() {
        let tokenizer = create_tokenizer("gpt-4").unwrap();
        assert_eq!(tokenizer.model_id(), "gpt-4");

        let count = tokenizer.count_tokens("Hello, world!").unwrap();
        assert!(count > 0);
        assert!(count < 10);
        assert_eq!(tokenizer.count_tokens("").unwrap(), 0);
    }

    #[test]
    fn test_unknown_openai_model_falls_back() {
        let tokenizer = create_tokenizer("not-a-real-model").unwrap();
        assert!(tokenizer.count_tokens("fn main() {}").unwrap() > 0);
    }

    #[test]
    fn test_empty_model_is_rejected() {
        assert!(matches!(
            create_tokenizer("  "),
            Err(TokenizerError::UnsupportedModel(_))
        ));
    }

    #[test]
    #[ignore] // Downloads a tokenizer from the HuggingFace hub
    fn test_huggingface_tokenizer() {
        let tokenizer = create_tokenizer("huggingface:bert-base-uncased").unwrap();
        assert!(tokenizer.count_tokens("Hello, world!").unwrap() > 0);
    }
}
