//! Model identifier resolution

use std::str::FromStr;

use strum::{Display, EnumString};

/// Model used when token counting is enabled without an explicit model
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Encoding used for model names tiktoken does not know
pub const FALLBACK_ENCODING: &str = "cl100k_base";

/// Model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ModelProvider {
    /// OpenAI models and tiktoken encodings
    OpenAI,
    /// HuggingFace hub repositories (`org/name`)
    HuggingFace,
}

impl ModelProvider {
    /// Pick the provider for a model identifier.
    ///
    /// An explicit `provider:` prefix wins; otherwise hub-style `org/name`
    /// identifiers go to HuggingFace and everything else to tiktoken.
    pub fn resolve(model_id: &str) -> (Self, &str) {
        if let Some((prefix, rest)) = model_id.split_once(':') {
            if let Ok(provider) = ModelProvider::from_str(&prefix.to_lowercase()) {
                return (provider, rest);
            }
        }

        if model_id.contains('/') {
            (ModelProvider::HuggingFace, model_id)
        } else {
            (ModelProvider::OpenAI, model_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_provider() {
        assert_eq!(
            ModelProvider::resolve("gpt-4"),
            (ModelProvider::OpenAI, "gpt-4")
        );
        assert_eq!(
            ModelProvider::resolve("meta-llama/Llama-2-7b-hf"),
            (ModelProvider::HuggingFace, "meta-llama/Llama-2-7b-hf")
        );
        assert_eq!(
            ModelProvider::resolve("openai:o200k_base"),
            (ModelProvider::OpenAI, "o200k_base")
        );
        assert_eq!(
            ModelProvider::resolve("HuggingFace:bert-base-uncased"),
            (ModelProvider::HuggingFace, "bert-base-uncased")
        );
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(ModelProvider::OpenAI.to_string(), "openai");
        assert_eq!(ModelProvider::HuggingFace.to_string(), "huggingface");
    }
}
