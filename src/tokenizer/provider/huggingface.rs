//! HuggingFace tokenizer implementation

use std::sync::Mutex;

use tokenizers::Tokenizer as HfTokenizer;

use super::Provider;
use crate::tokenizer::error::{TokenizerError, TokenizerResult};

/// HuggingFace tokenizer implementation
pub struct HuggingFaceProvider {
    tokenizer: Mutex<HfTokenizer>,
}

impl HuggingFaceProvider {
    /// Fetch the tokenizer for a hub repository such as `meta-llama/Llama-2-7b-hf`
    pub fn new(repo_id: &str) -> TokenizerResult<Self> {
        let tokenizer = HfTokenizer::from_pretrained(repo_id, None).map_err(|e| {
            TokenizerError::TokenizerError(format!("Failed to load '{}': {}", repo_id, e))
        })?;

        Ok(Self {
            tokenizer: Mutex::new(tokenizer),
        })
    }
}

impl Provider for HuggingFaceProvider {
    fn count_tokens(&self, text: &str) -> TokenizerResult<usize> {
        let tokenizer = self
            .tokenizer
            .lock()
            .map_err(|_| TokenizerError::LockError)?;

        let encoding = tokenizer
            .encode(text, false)
            .map_err(|e| TokenizerError::TokenizerError(format!("Failed to encode text: {}", e)))?;

        Ok(encoding.get_ids().len())
    }
}
