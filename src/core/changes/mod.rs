//! Set-difference of model ids per provider between two snapshots.
//!
//! A provider whose fetch failed contributes an empty id set on that side,
//! so a provider outage shows up as a burst of `removed` entries. Consumers
//! tell a real withdrawal from a failed fetch via the snapshot's
//! `overall_status` and the provider's error detail.

use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::models::{Change, ChangeType, ProviderName, Snapshot};

/// Outcome of comparing a snapshot against its predecessor.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// No previous snapshot: `snapshot_id` is now the baseline and nothing is emitted.
    Baseline { snapshot_id: Uuid },
    Changes(Vec<Change>),
}

impl Detection {
    pub fn changes(&self) -> &[Change] {
        match self {
            Detection::Baseline { .. } => &[],
            Detection::Changes(changes) => changes,
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, Detection::Baseline { .. })
    }
}

pub fn detect(previous: Option<&Snapshot>, current: &Snapshot) -> Detection {
    detect_at(previous, current, Utc::now())
}

/// Emission order: providers in configuration order (current snapshot first,
/// then providers only the previous one had), `added` before `removed`, ids ascending.
pub fn detect_at(
    previous: Option<&Snapshot>,
    current: &Snapshot,
    detected_at: DateTime<Utc>,
) -> Detection {
    let Some(previous) = previous else {
        return Detection::Baseline {
            snapshot_id: current.snapshot_id(),
        };
    };

    let mut changes = Vec::new();
    for provider in provider_union(previous, current) {
        let prev_ids = ids_for(previous, provider);
        let curr_ids = ids_for(current, provider);

        let added = curr_ids.difference(&prev_ids).map(|id| (ChangeType::Added, *id));
        let removed = prev_ids.difference(&curr_ids).map(|id| (ChangeType::Removed, *id));
        changes.extend(added.chain(removed).map(|(change_type, id)| {
            Change::new(
                change_type,
                id,
                provider,
                previous.snapshot_id(),
                current.snapshot_id(),
                detected_at,
            )
        }));
    }
    Detection::Changes(changes)
}

fn provider_union(previous: &Snapshot, current: &Snapshot) -> Vec<ProviderName> {
    let mut order: Vec<ProviderName> = current.providers().collect();
    for provider in previous.providers() {
        if !order.contains(&provider) {
            order.push(provider);
        }
    }
    order
}

/// Ids for `provider`; empty when the provider is absent or its fetch failed.
fn ids_for(snapshot: &Snapshot, provider: ProviderName) -> BTreeSet<&str> {
    snapshot
        .result_for(provider)
        .map(|r| r.model_ids())
        .unwrap_or_default()
}

/// Human-readable summary: one line per provider with changes, then a total.
pub fn summarize(detection: &Detection) -> String {
    let changes = match detection {
        Detection::Baseline { snapshot_id } => {
            return format!("Baseline recorded: {}", snapshot_id);
        }
        Detection::Changes(changes) if changes.is_empty() => return "No changes".to_string(),
        Detection::Changes(changes) => changes,
    };

    let mut providers: Vec<ProviderName> = Vec::new();
    for change in changes {
        if !providers.contains(&change.provider_name()) {
            providers.push(change.provider_name());
        }
    }

    let count = |provider: Option<ProviderName>, kind: ChangeType| {
        changes
            .iter()
            .filter(|c| c.change_type() == kind)
            .filter(|c| provider.is_none_or(|p| c.provider_name() == p))
            .count()
    };

    let mut out = String::new();
    for provider in providers {
        let _ = writeln!(
            out,
            "{}: +{} -{}",
            provider,
            count(Some(provider), ChangeType::Added),
            count(Some(provider), ChangeType::Removed)
        );
    }
    let _ = write!(
        out,
        "Total: {} added, {} removed",
        count(None, ChangeType::Added),
        count(None, ChangeType::Removed)
    );
    out
}
