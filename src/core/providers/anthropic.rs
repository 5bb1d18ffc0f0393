//! Anthropic models from a curated list shipped with the binary (source = manual).

use async_trait::async_trait;

use crate::core::models::{MetadataValue, ModelSource, ProviderName};

use super::{ProviderError, ProviderGateway, RawModel};

/// (id, display name, context window)
const KNOWN_MODELS: &[(&str, &str, i64)] = &[
    ("claude-opus-4-1", "Claude Opus 4.1", 200_000),
    ("claude-opus-4-0", "Claude Opus 4", 200_000),
    ("claude-sonnet-4-5", "Claude Sonnet 4.5", 200_000),
    ("claude-sonnet-4-0", "Claude Sonnet 4", 200_000),
    ("claude-3-7-sonnet-latest", "Claude Sonnet 3.7", 200_000),
    ("claude-haiku-4-5", "Claude Haiku 4.5", 200_000),
    ("claude-3-5-haiku-latest", "Claude Haiku 3.5", 200_000),
    ("claude-3-haiku-20240307", "Claude Haiku 3", 200_000),
];

pub struct AnthropicGateway;

#[async_trait]
impl ProviderGateway for AnthropicGateway {
    fn name(&self) -> ProviderName {
        ProviderName::Anthropic
    }

    fn source(&self) -> ModelSource {
        ModelSource::Manual
    }

    async fn fetch(&self) -> Result<Vec<RawModel>, ProviderError> {
        Ok(KNOWN_MODELS
            .iter()
            .map(|(id, name, context)| {
                let mut raw = RawModel::new(*id, *name);
                raw.metadata
                    .insert("context_window".into(), MetadataValue::Integer(*context));
                raw
            })
            .collect())
    }
}
