//! Shared builders for unit tests.

use chrono::{DateTime, Utc};

use crate::core::models::{Metadata, Model, ModelSource, ProviderName, ProviderResult, Snapshot};

pub fn model(provider: ProviderName, id: &str) -> Model {
    Model::new(id, id, provider, ModelSource::Api, Utc::now(), Metadata::new()).unwrap()
}

pub fn ok(provider: ProviderName, ids: &[&str]) -> ProviderResult {
    ProviderResult::success(provider, ids.iter().map(|id| model(provider, id)).collect())
}

pub fn failed(provider: ProviderName) -> ProviderResult {
    ProviderResult::failure(provider, "fetch failed")
}

pub fn snapshot(results: Vec<ProviderResult>) -> Snapshot {
    Snapshot::new(results).unwrap()
}

pub fn snapshot_at(results: Vec<ProviderResult>, created_at: DateTime<Utc>) -> Snapshot {
    Snapshot::new_at(results, created_at).unwrap()
}
