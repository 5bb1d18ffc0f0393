//! Render cached models as JSON, CSV, YAML, Markdown, or TOML.

mod csv;
mod json;
mod markdown;
mod toml_doc;
mod yaml;

use std::fmt;
use std::str::FromStr;

use chrono::SecondsFormat;
use serde::Serialize;

use crate::core::models::{Metadata, Model, ProviderName};

/// Version tag written into every export.
pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
    Yaml,
    Markdown,
    Toml,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Json,
        ExportFormat::Csv,
        ExportFormat::Yaml,
        ExportFormat::Markdown,
        ExportFormat::Toml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Toml => "toml",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ExportFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == needle)
            .ok_or_else(|| ExportError::UnsupportedFormat(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No models to export")]
    Empty,
    #[error("Unsupported format '{0}' (available: json, csv, yaml, markdown, toml)")]
    UnsupportedFormat(String),
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML export failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("TOML export failed: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Render `models` in `format`. Fails on an empty list.
pub fn render_models(format: ExportFormat, models: &[Model]) -> Result<String, ExportError> {
    if models.is_empty() {
        return Err(ExportError::Empty);
    }
    match format {
        ExportFormat::Json => json::render(models),
        ExportFormat::Csv => Ok(csv::render(models)),
        ExportFormat::Yaml => yaml::render(models),
        ExportFormat::Markdown => Ok(markdown::render(models)),
        ExportFormat::Toml => toml_doc::render(models),
    }
}

/// Per-model entry shared by the structured formats.
#[derive(Debug, Serialize)]
struct ModelEntry<'a> {
    id: &'a str,
    name: &'a str,
    source: &'static str,
    fetched_at: String,
    metadata: &'a Metadata,
}

impl<'a> From<&'a Model> for ModelEntry<'a> {
    fn from(m: &'a Model) -> Self {
        Self {
            id: m.model_id(),
            name: m.model_name(),
            source: m.source().as_str(),
            fetched_at: timestamp(m),
            metadata: m.metadata(),
        }
    }
}

fn timestamp(m: &Model) -> String {
    m.fetched_at().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Models grouped by provider, providers in first-seen order.
fn group_by_provider(models: &[Model]) -> Vec<(ProviderName, Vec<&Model>)> {
    let mut groups: Vec<(ProviderName, Vec<&Model>)> = Vec::new();
    for model in models {
        match groups.iter_mut().find(|(p, _)| *p == model.provider_name()) {
            Some((_, list)) => list.push(model),
            None => groups.push((model.provider_name(), vec![model])),
        }
    }
    groups
}
