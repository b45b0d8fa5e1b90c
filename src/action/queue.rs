//! Islands waiting for their resources.

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::Arc;

use crate::resource::{ReadyResources, ResourceKey};
use crate::view::{Fragment, Island};

/// An island paired with the fragment that renders it.
#[derive(Clone)]
pub struct QueuedIsland {
    pub island: Arc<Island>,
    pub fragment: Arc<dyn Fragment>,
}

impl QueuedIsland {
    pub fn new(island: Arc<Island>, fragment: Arc<dyn Fragment>) -> Self {
        Self { island, fragment }
    }

    pub fn id(&self) -> &str {
        &self.island.id
    }

    /// Every key the fragment declares is resolved.
    pub fn can_render(&self, ready: &ReadyResources) -> bool {
        ready.contains_all(self.fragment.resource_keys().iter())
    }

    /// Keys still missing from `ready`.
    pub fn remaining<'a>(&'a self, ready: &ReadyResources) -> Vec<&'a ResourceKey> {
        self.fragment
            .resource_keys()
            .iter()
            .filter(|key| !ready.contains(key))
            .collect()
    }
}

impl std::fmt::Debug for QueuedIsland {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedIsland")
            .field("island", &self.island.id)
            .field("fragment", &self.fragment.id())
            .finish()
    }
}

/// Pending islands of one request.
///
/// Resolver tasks call [`drain_renderable`](Self::drain_renderable) after
/// each insertion; the lock guarantees an island is handed out once.
#[derive(Debug, Default)]
pub struct IslandQueue {
    pending: Mutex<Vec<QueuedIsland>>,
}

impl IslandQueue {
    /// Queue islands, keeping the first occurrence of each id.
    pub fn new(islands: impl IntoIterator<Item = QueuedIsland>) -> Self {
        let mut seen = FxHashSet::default();
        let pending = islands
            .into_iter()
            .filter(|queued| seen.insert(queued.island.id.clone()))
            .collect();
        Self {
            pending: Mutex::new(pending),
        }
    }

    /// Union of the keys needed by pending islands, first-seen order.
    pub fn required_keys(&self) -> Vec<ResourceKey> {
        let pending = self.pending.lock();
        let mut seen = FxHashSet::default();
        pending
            .iter()
            .flat_map(|queued| queued.fragment.resource_keys())
            .filter(|key| seen.insert(key.as_str()))
            .cloned()
            .collect()
    }

    /// Remove and return every island whose keys are all resolved.
    pub fn drain_renderable(&self, ready: &ReadyResources) -> Vec<QueuedIsland> {
        let mut pending = self.pending.lock();
        let (renderable, waiting): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|queued| queued.can_render(ready));
        *pending = waiting;
        renderable
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
