//! Model record, provider names, and metadata values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Providers the tool knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    OpenAI,
    Google,
    Anthropic,
    OpenRouter,
}

impl ProviderName {
    pub const ALL: [ProviderName; 4] = [
        ProviderName::OpenAI,
        ProviderName::Google,
        ProviderName::Anthropic,
        ProviderName::OpenRouter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::OpenAI => "openai",
            ProviderName::Google => "google",
            ProviderName::Anthropic => "anthropic",
            ProviderName::OpenRouter => "openrouter",
        }
    }

    /// Human-facing label (e.g. "OpenAI").
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderName::OpenAI => "OpenAI",
            ProviderName::Google => "Google",
            ProviderName::Anthropic => "Anthropic",
            ProviderName::OpenRouter => "OpenRouter",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider '{0}' (expected one of: openai, google, anthropic, openrouter)")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderName {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ProviderName::ALL
            .into_iter()
            .find(|p| p.as_str() == needle)
            .ok_or_else(|| UnknownProvider(s.trim().to_string()))
    }
}

/// Where a model record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Api,
    Manual,
}

impl ModelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSource::Api => "api",
            ModelSource::Manual => "manual",
        }
    }
}

/// Scalar metadata value attached to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Integer(i) => write!(f, "{}", i),
            MetadataValue::Float(x) => write!(f, "{}", x),
            MetadataValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Integer(i)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("model_id cannot be empty")]
    EmptyId,
    #[error("model_name cannot be empty (model_id: {0})")]
    EmptyName(String),
}

/// One model exposed by a provider. Immutable once built; use [`Model::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelRecord")]
pub struct Model {
    model_id: String,
    model_name: String,
    provider_name: ProviderName,
    source: ModelSource,
    fetched_at: DateTime<Utc>,
    metadata: Metadata,
}

/// Wire shape; deserialization goes through the same validation as [`Model::new`].
#[derive(Deserialize)]
struct ModelRecord {
    model_id: String,
    model_name: String,
    provider_name: ProviderName,
    source: ModelSource,
    fetched_at: DateTime<Utc>,
    #[serde(default)]
    metadata: Metadata,
}

impl TryFrom<ModelRecord> for Model {
    type Error = ModelError;

    fn try_from(r: ModelRecord) -> Result<Self, Self::Error> {
        Model::new(
            r.model_id,
            r.model_name,
            r.provider_name,
            r.source,
            r.fetched_at,
            r.metadata,
        )
    }
}

impl Model {
    /// Build a model. Id and name are trimmed and must be non-empty.
    pub fn new(
        model_id: impl Into<String>,
        model_name: impl Into<String>,
        provider_name: ProviderName,
        source: ModelSource,
        fetched_at: DateTime<Utc>,
        metadata: Metadata,
    ) -> Result<Self, ModelError> {
        let model_id = model_id.into().trim().to_string();
        if model_id.is_empty() {
            return Err(ModelError::EmptyId);
        }
        let model_name = model_name.into().trim().to_string();
        if model_name.is_empty() {
            return Err(ModelError::EmptyName(model_id));
        }
        Ok(Self {
            model_id,
            model_name,
            provider_name,
            source,
            fetched_at,
            metadata,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn provider_name(&self) -> ProviderName {
        self.provider_name
    }

    pub fn source(&self) -> ModelSource {
        self.source
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(id: &str, name: &str) -> Result<Model, ModelError> {
        Model::new(
            id,
            name,
            ProviderName::OpenAI,
            ModelSource::Api,
            Utc::now(),
            Metadata::new(),
        )
    }

    #[test]
    fn new_trims_id_and_name() {
        let m = build("  gpt-4 ", "\tGPT-4\n").unwrap();
        assert_eq!(m.model_id(), "gpt-4");
        assert_eq!(m.model_name(), "GPT-4");
    }

    #[test]
    fn new_rejects_blank_id() {
        assert_eq!(build("   ", "GPT-4").unwrap_err(), ModelError::EmptyId);
    }

    #[test]
    fn new_rejects_blank_name() {
        assert_eq!(
            build("gpt-4", "  ").unwrap_err(),
            ModelError::EmptyName("gpt-4".to_string())
        );
    }

    #[test]
    fn deserialize_runs_validation() {
        let json = r#"{
            "model_id": " ",
            "model_name": "x",
            "provider_name": "openai",
            "source": "api",
            "fetched_at": "2025-01-01T00:00:00Z"
        }"#;
        assert!(serde_json::from_str::<Model>(json).is_err());
    }

    #[test]
    fn metadata_scalars_keep_their_type() {
        let mut metadata = Metadata::new();
        metadata.insert("owned_by".into(), "openai".into());
        metadata.insert("created".into(), 1_700_000_000i64.into());
        metadata.insert("preview".into(), true.into());
        let m = Model::new(
            "gpt-4",
            "GPT-4",
            ProviderName::OpenAI,
            ModelSource::Api,
            Utc::now(),
            metadata.clone(),
        )
        .unwrap();
        let json = serde_json::to_string(&m).unwrap();
        let back: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(back.metadata(), &metadata);
    }

    #[test]
    fn provider_name_parses_case_insensitively() {
        assert_eq!(" OpenAI ".parse::<ProviderName>(), Ok(ProviderName::OpenAI));
        assert_eq!("openrouter".parse::<ProviderName>(), Ok(ProviderName::OpenRouter));
        assert!("mistral".parse::<ProviderName>().is_err());
    }
}
