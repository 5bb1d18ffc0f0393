//! Per-provider fetch outcomes and the point-in-time snapshot that aggregates them.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{Model, ProviderName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Success,
    Failure,
}

/// Outcome of one provider fetch attempt. Failures carry no models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    provider_name: ProviderName,
    status: FetchStatus,
    models: Vec<Model>,
    error_detail: Option<String>,
}

impl ProviderResult {
    pub fn success(provider_name: ProviderName, models: Vec<Model>) -> Self {
        Self {
            provider_name,
            status: FetchStatus::Success,
            models,
            error_detail: None,
        }
    }

    pub fn failure(provider_name: ProviderName, error_detail: impl Into<String>) -> Self {
        Self {
            provider_name,
            status: FetchStatus::Failure,
            models: Vec::new(),
            error_detail: Some(error_detail.into()),
        }
    }

    pub fn provider_name(&self) -> ProviderName {
        self.provider_name
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    /// Model ids of this result; empty when the fetch failed.
    pub fn model_ids(&self) -> BTreeSet<&str> {
        self.models.iter().map(|m| m.model_id()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Success,
    PartialFailure,
    Failure,
}

impl OverallStatus {
    /// Tri-state status from the joined provider outcomes.
    pub fn from_results(results: &[ProviderResult]) -> Self {
        let ok = results.iter().filter(|r| r.is_success()).count();
        if ok == results.len() {
            OverallStatus::Success
        } else if ok == 0 {
            OverallStatus::Failure
        } else {
            OverallStatus::PartialFailure
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Success => "success",
            OverallStatus::PartialFailure => "partial_failure",
            OverallStatus::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot must contain at least one provider result")]
    NoProviders,
    #[error("provider {0} appears more than once")]
    DuplicateProvider(ProviderName),
    #[error("failed result for {0} carries models")]
    FailureWithModels(ProviderName),
    #[error("model {model_id} stored under {expected} but belongs to {actual}")]
    ProviderMismatch {
        model_id: String,
        expected: ProviderName,
        actual: ProviderName,
    },
    #[error("stored overall_status {stored} does not match provider results ({computed})")]
    StatusMismatch { stored: String, computed: String },
}

/// Immutable record of one coordinated multi-provider fetch.
///
/// `provider_results` keeps configuration order; each provider appears once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord")]
pub struct Snapshot {
    snapshot_id: Uuid,
    created_at: DateTime<Utc>,
    provider_results: Vec<ProviderResult>,
    overall_status: OverallStatus,
}

#[derive(Deserialize)]
struct SnapshotRecord {
    snapshot_id: Uuid,
    created_at: DateTime<Utc>,
    provider_results: Vec<ProviderResult>,
    overall_status: OverallStatus,
}

impl TryFrom<SnapshotRecord> for Snapshot {
    type Error = SnapshotError;

    fn try_from(r: SnapshotRecord) -> Result<Self, Self::Error> {
        let snapshot = Snapshot::build(r.snapshot_id, r.created_at, r.provider_results)?;
        if snapshot.overall_status != r.overall_status {
            return Err(SnapshotError::StatusMismatch {
                stored: r.overall_status.as_str().to_string(),
                computed: snapshot.overall_status.as_str().to_string(),
            });
        }
        Ok(snapshot)
    }
}

impl Snapshot {
    /// New snapshot stamped with a fresh id and the current time.
    pub fn new(provider_results: Vec<ProviderResult>) -> Result<Self, SnapshotError> {
        Self::new_at(provider_results, Utc::now())
    }

    /// New snapshot with an explicit creation time.
    pub fn new_at(
        provider_results: Vec<ProviderResult>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SnapshotError> {
        Self::build(Uuid::new_v4(), created_at, provider_results)
    }

    fn build(
        snapshot_id: Uuid,
        created_at: DateTime<Utc>,
        provider_results: Vec<ProviderResult>,
    ) -> Result<Self, SnapshotError> {
        if provider_results.is_empty() {
            return Err(SnapshotError::NoProviders);
        }
        let mut seen = BTreeSet::new();
        for result in &provider_results {
            let provider = result.provider_name();
            if !seen.insert(provider) {
                return Err(SnapshotError::DuplicateProvider(provider));
            }
            if !result.is_success() && !result.models().is_empty() {
                return Err(SnapshotError::FailureWithModels(provider));
            }
            if let Some(m) = result.models().iter().find(|m| m.provider_name() != provider) {
                return Err(SnapshotError::ProviderMismatch {
                    model_id: m.model_id().to_string(),
                    expected: provider,
                    actual: m.provider_name(),
                });
            }
        }
        let overall_status = OverallStatus::from_results(&provider_results);
        Ok(Self {
            snapshot_id,
            created_at,
            provider_results,
            overall_status,
        })
    }

    pub fn snapshot_id(&self) -> Uuid {
        self.snapshot_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn provider_results(&self) -> &[ProviderResult] {
        &self.provider_results
    }

    pub fn overall_status(&self) -> OverallStatus {
        self.overall_status
    }

    pub fn is_success(&self) -> bool {
        self.overall_status == OverallStatus::Success
    }

    pub fn result_for(&self, provider: ProviderName) -> Option<&ProviderResult> {
        self.provider_results
            .iter()
            .find(|r| r.provider_name() == provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = ProviderName> + '_ {
        self.provider_results.iter().map(|r| r.provider_name())
    }

    pub fn failed_results(&self) -> impl Iterator<Item = &ProviderResult> {
        self.provider_results.iter().filter(|r| !r.is_success())
    }

    pub fn total_models(&self) -> usize {
        self.provider_results.iter().map(|r| r.models().len()).sum()
    }
}
