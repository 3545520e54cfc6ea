//! Holder of the latest published snapshot.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::models::Snapshot;

/// Latest-snapshot cell shared by the refresh pipeline and every reader.
///
/// Readers get an `Arc` to an immutable snapshot, so a publish never changes
/// data a reader is already holding. Both critical sections only swap or
/// clone an `Arc`.
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Create a store holding the empty generation-0 snapshot.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// Replace the current snapshot as a whole.
    ///
    /// The generation is assigned here, under the write lock, so generations
    /// are strictly increasing in publish order.
    pub fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let mut current = self.current.write();
        snapshot.generation = current.generation + 1;
        let published = Arc::new(snapshot);
        *current = Arc::clone(&published);
        published
    }

    pub fn read(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
