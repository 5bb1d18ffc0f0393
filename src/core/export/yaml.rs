//! YAML export under a single `llm_models` key.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::core::models::Model;

use super::{EXPORT_VERSION, ExportError, ModelEntry, group_by_provider};

#[derive(Serialize)]
struct Document<'a> {
    llm_models: Body<'a>,
}

#[derive(Serialize)]
struct Body<'a> {
    version: &'static str,
    generated_at: String,
    total_models: usize,
    providers: BTreeMap<&'static str, Vec<ModelEntry<'a>>>,
}

pub(super) fn render(models: &[Model]) -> Result<String, ExportError> {
    let providers = group_by_provider(models)
        .into_iter()
        .map(|(p, list)| (p.as_str(), list.into_iter().map(ModelEntry::from).collect()))
        .collect();
    let doc = Document {
        llm_models: Body {
            version: EXPORT_VERSION,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            total_models: models.len(),
            providers,
        },
    };
    Ok(serde_yaml::to_string(&doc)?)
}
