//! Domain records: models, provider results, snapshots, and changes.

mod change;
mod model;
mod snapshot;

pub use change::{Change, ChangeType};
pub use model::{Metadata, MetadataValue, Model, ModelSource, ProviderName, UnknownProvider};
pub use snapshot::{OverallStatus, ProviderResult, Snapshot, SnapshotError};
