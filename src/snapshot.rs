//! Snapshot loader: seed bound fields from one listing of the namespace.

use std::collections::HashMap;

use arc_swap::ArcSwap;

use crate::binding::{BindingId, BindingTable};
use crate::config::schema::SnapshotPolicy;
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::pipeline;
use crate::store::KvStore;

/// What one snapshot pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Values written to bound fields.
    pub applied: usize,
    /// Entries with no binding, or without a value.
    pub ignored: usize,
    /// Bound entries whose value was rejected (only under `SkipInvalid`).
    pub rejected: usize,
}

/// Report plus the store index each bound key was listed at.
#[derive(Debug, Default)]
pub(crate) struct Snapshot {
    pub report: SnapshotReport,
    indexes: HashMap<BindingId, u64>,
}

impl Snapshot {
    /// Index of the entry the snapshot saw for `id`, if any.
    pub fn index_of(&self, id: BindingId) -> Option<u64> {
        self.indexes.get(&id).copied()
    }
}

/// List every key under `namespace` and apply the bound ones in listing order.
///
/// Watchers use the recorded indexes to skip re-delivery of these entries.
///
/// Under [`SnapshotPolicy::FailFast`] the first rejected value aborts the
/// pass with [`Error::Snapshot`].
pub(crate) async fn load<T>(
    store: &dyn KvStore,
    table: &BindingTable<T>,
    namespace: Option<&str>,
    state: &ArcSwap<T>,
    policy: SnapshotPolicy,
) -> Result<Snapshot> {
    let pairs = store.list(namespace.unwrap_or_default()).await?;
    let mut snapshot = Snapshot::default();

    for pair in pairs {
        let Some((id, binding)) = table.id_of(&pair.key).zip(table.lookup(&pair.key)) else {
            tracing::debug!(key = %pair.key, "Ignoring unbound key");
            snapshot.report.ignored += 1;
            continue;
        };
        if pair.index != 0 {
            snapshot.indexes.insert(id, pair.index);
        }
        let Some(value) = pair.value.as_deref().filter(|v| !v.is_empty()) else {
            tracing::debug!(key = %pair.key, "Ignoring key without a value");
            snapshot.report.ignored += 1;
            continue;
        };

        match pipeline::apply(binding, state, value) {
            Ok(_) => snapshot.report.applied += 1,
            Err(source) => match policy {
                SnapshotPolicy::FailFast => {
                    return Err(Error::Snapshot {
                        key: pair.key,
                        source,
                    });
                }
                SnapshotPolicy::SkipInvalid => snapshot.report.rejected += 1,
            },
        }
    }

    let report = snapshot.report;
    metrics::record_snapshot_keys(report.applied);
    tracing::info!(
        namespace = namespace.unwrap_or_default(),
        applied = report.applied,
        ignored = report.ignored,
        rejected = report.rejected,
        "Snapshot loaded"
    );

    Ok(snapshot)
}
