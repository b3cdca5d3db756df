//! Queue state store
//!
//! Keyed registry of [`QueueStateHandle`] entities. A single coarse lock
//! serializes creation, deletion and enumeration; it is held only for the
//! map operation itself, never across an await. Entity-level work happens
//! under each entity's own lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::domain::{GuildId, MemberId};

use super::entry::{QueueStateHandle, StateKey};

/// Concurrent registry of per-member queue states
#[derive(Default)]
pub struct QueueStore {
    entries: Mutex<HashMap<StateKey, Arc<QueueStateHandle>>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StateKey, Arc<QueueStateHandle>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up an existing entity without creating one
    pub fn get(&self, guild: GuildId, member: MemberId) -> Option<Arc<QueueStateHandle>> {
        self.lock().get(&(guild, member)).cloned()
    }

    /// Return the entity for the key, creating it if absent
    ///
    /// The bool is true when this call created the entity; exactly one
    /// concurrent first-touch caller observes it, so the caller can
    /// schedule the entity's single GC watcher.
    pub fn get_or_create(&self, guild: GuildId, member: MemberId) -> (Arc<QueueStateHandle>, bool) {
        let mut entries = self.lock();
        match entries.get(&(guild, member)) {
            Some(existing) => (Arc::clone(existing), false),
            None => {
                debug!(%guild, %member, "QueueStore::get_or_create: creating entity");
                let handle = Arc::new(QueueStateHandle::new(guild, member));
                entries.insert((guild, member), Arc::clone(&handle));
                (handle, true)
            }
        }
    }

    /// Remove the entity for the key, but only if it is this exact entity
    ///
    /// Identity comparison (not key comparison) protects against removing
    /// a replacement created after the caller last looked.
    pub fn remove_entry(&self, entry: &Arc<QueueStateHandle>) -> bool {
        let mut entries = self.lock();
        match entries.get(&entry.key()) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                debug!(guild = %entry.guild(), member = %entry.member(), "QueueStore::remove_entry: removing");
                entries.remove(&entry.key());
                true
            }
            _ => false,
        }
    }

    /// Snapshot of all keys (GC sweep and startup reconciliation)
    pub fn keys(&self) -> Vec<StateKey> {
        self.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_same_entity() {
        let store = QueueStore::new();
        let (first, created) = store.get_or_create(GuildId(1), MemberId(2));
        assert!(created);

        let (second, created) = store.get_or_create(GuildId(1), MemberId(2));
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_distinct_keys_get_distinct_entities() {
        let store = QueueStore::new();
        let (a, _) = store.get_or_create(GuildId(1), MemberId(2));
        let (b, _) = store.get_or_create(GuildId(1), MemberId(3));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_entry_compares_identity() {
        let store = QueueStore::new();
        let (original, _) = store.get_or_create(GuildId(1), MemberId(2));

        assert!(store.remove_entry(&original));
        assert!(store.is_empty());

        // A replacement with the same key is not removed by the stale handle
        let (_replacement, created) = store.get_or_create(GuildId(1), MemberId(2));
        assert!(created);
        assert!(!store.remove_entry(&original));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_does_not_create() {
        let store = QueueStore::new();
        assert!(store.get(GuildId(1), MemberId(2)).is_none());
        assert!(store.is_empty());
    }
}
