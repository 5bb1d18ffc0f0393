//! Change ledger entries: one model appearing or disappearing between two snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::ProviderName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
}

impl ChangeType {
    pub fn inverted(self) -> Self {
        match self {
            ChangeType::Added => ChangeType::Removed,
            ChangeType::Removed => ChangeType::Added,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    change_id: Uuid,
    change_type: ChangeType,
    model_id: String,
    provider_name: ProviderName,
    detected_at: DateTime<Utc>,
    previous_snapshot_id: Uuid,
    current_snapshot_id: Uuid,
}

impl Change {
    /// Build a change. The id is derived from the snapshot pair and the event
    /// itself, so diffing the same pair twice yields the same ids.
    pub fn new(
        change_type: ChangeType,
        model_id: impl Into<String>,
        provider_name: ProviderName,
        previous_snapshot_id: Uuid,
        current_snapshot_id: Uuid,
        detected_at: DateTime<Utc>,
    ) -> Self {
        let model_id = model_id.into();
        let key = format!(
            "{}|{}|{}|{}|{}",
            previous_snapshot_id, current_snapshot_id, provider_name, change_type, model_id
        );
        Self {
            change_id: Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()),
            change_type,
            model_id,
            provider_name,
            detected_at,
            previous_snapshot_id,
            current_snapshot_id,
        }
    }

    pub fn change_id(&self) -> Uuid {
        self.change_id
    }

    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn provider_name(&self) -> ProviderName {
        self.provider_name
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    pub fn previous_snapshot_id(&self) -> Uuid {
        self.previous_snapshot_id
    }

    pub fn current_snapshot_id(&self) -> Uuid {
        self.current_snapshot_id
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.change_type {
            ChangeType::Added => '+',
            ChangeType::Removed => '-',
        };
        write!(f, "{} {}/{}", sign, self.provider_name, self.model_id)
    }
}
