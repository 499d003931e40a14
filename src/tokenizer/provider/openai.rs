//! OpenAI tokenizer implementation using tiktoken

use tiktoken_rs::CoreBPE;

use super::Provider;
use crate::tokenizer::error::{TokenizerError, TokenizerResult};
use crate::tokenizer::model::FALLBACK_ENCODING;

/// OpenAI tokenizer implementation
pub struct OpenAIProvider {
    encoding: CoreBPE,
}

impl OpenAIProvider {
    /// Load the encoding for `model_id`.
    ///
    /// The identifier may name a model (`gpt-4o`) or an encoding
    /// (`o200k_base`); anything else falls back to `cl100k_base`.
    pub fn new(model_id: &str) -> TokenizerResult<Self> {
        let encoding = match tiktoken_rs::get_bpe_from_model(model_id) {
            Ok(encoding) => encoding,
            Err(_) => match encoding_by_name(model_id) {
                Some(encoding) => encoding?,
                None => {
                    tracing::debug!(
                        "Unknown model '{}', falling back to {}",
                        model_id,
                        FALLBACK_ENCODING
                    );
                    tiktoken_rs::cl100k_base()
                        .map_err(|e| TokenizerError::TokenizerError(e.to_string()))?
                }
            },
        };

        Ok(Self { encoding })
    }
}

fn encoding_by_name(name: &str) -> Option<TokenizerResult<CoreBPE>> {
    let loaded = match name {
        "o200k_base" => tiktoken_rs::o200k_base(),
        "cl100k_base" => tiktoken_rs::cl100k_base(),
        "p50k_base" => tiktoken_rs::p50k_base(),
        "r50k_base" => tiktoken_rs::r50k_base(),
        _ => return None,
    };
    Some(loaded.map_err(|e| TokenizerError::TokenizerError(e.to_string())))
}

impl Provider for OpenAIProvider {
    fn count_tokens(&self, text: &str) -> TokenizerResult<usize> {
        let tokens = self.encoding.encode_ordinary(text);
        Ok(tokens.len())
    }
}
