//! JSON export grouped by provider, for CI pipelines.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use crate::core::models::Model;

use super::{EXPORT_VERSION, ExportError, ModelEntry, group_by_provider};

pub(super) fn render(models: &[Model]) -> Result<String, ExportError> {
    let groups = group_by_provider(models);

    let mut by_provider = Map::new();
    for (provider, list) in &groups {
        let entries: Vec<ModelEntry> = list.iter().map(|m| ModelEntry::from(*m)).collect();
        by_provider.insert(provider.to_string(), serde_json::to_value(entries)?);
    }

    let output = json!({
        "metadata": {
            "version": EXPORT_VERSION,
            "generated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "total_models": models.len(),
            "providers": groups.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>(),
        },
        "models": Value::Object(by_provider),
    });
    Ok(serde_json::to_string_pretty(&output)?)
}
