//! TOML export: `[metadata]` followed by one `[[models]]` table per model.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::core::models::{Metadata, Model};

use super::{EXPORT_VERSION, ExportError, timestamp};

#[derive(Serialize)]
struct Document<'a> {
    metadata: Header,
    models: Vec<Entry<'a>>,
}

#[derive(Serialize)]
struct Header {
    version: &'static str,
    generated_at: String,
    total_models: usize,
}

#[derive(Serialize)]
struct Entry<'a> {
    provider: &'static str,
    model_id: &'a str,
    model_name: &'a str,
    source: &'static str,
    fetched_at: String,
    metadata: &'a Metadata,
}

pub(super) fn render(models: &[Model]) -> Result<String, ExportError> {
    let doc = Document {
        metadata: Header {
            version: EXPORT_VERSION,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            total_models: models.len(),
        },
        models: models
            .iter()
            .map(|m| Entry {
                provider: m.provider_name().as_str(),
                model_id: m.model_id(),
                model_name: m.model_name(),
                source: m.source().as_str(),
                fetched_at: timestamp(m),
                metadata: m.metadata(),
            })
            .collect(),
    };
    Ok(toml::to_string_pretty(&doc)?)
}
