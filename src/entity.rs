use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
}

/// Single source of truth for one entity type, keyed by id. Screens keep
/// lists of ids and read projections from here.
pub struct Entities<T: Entity> {
    items: Arc<Mutex<HashMap<String, T>>>,
    version: Arc<watch::Sender<u64>>,
}

impl<T: Entity> Clone for Entities<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            version: self.version.clone(),
        }
    }
}

impl<T: Entity> Default for Entities<T> {
    fn default() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            version: Arc::new(tx),
        }
    }
}

impl<T: Entity> Entities<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.lock().get(id).cloned()
    }

    pub fn upsert(&self, item: T) {
        self.lock().insert(item.id().to_string(), item);
        self.bump();
    }

    pub fn upsert_all(&self, items: impl IntoIterator<Item = T>) {
        {
            let mut map = self.lock();
            for item in items {
                map.insert(item.id().to_string(), item);
            }
        }
        self.bump();
    }

    pub fn remove(&self, id: &str) -> Option<T> {
        let removed = self.lock().remove(id);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Drops every id in `ids`, ticking once if anything was removed.
    pub fn evict(&self, ids: &[String]) {
        let removed = {
            let mut map = self.lock();
            ids.iter().filter(|id| map.remove(id.as_str()).is_some()).count()
        };
        if removed > 0 {
            self.bump();
        }
    }

    /// Entities for `ids` in that order; unknown ids are skipped.
    pub fn project(&self, ids: &[String]) -> Vec<T> {
        let map = self.lock();
        ids.iter().filter_map(|id| map.get(id).cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ticks on every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, T>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
