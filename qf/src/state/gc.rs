//! Garbage collection of abandoned queue state
//!
//! One watcher task per entity, scheduled at creation. The watcher sleeps
//! until `mtime + expiry`, re-checks `mtime` on wake (activity in between
//! postpones expiry), and on true expiry removes the entity from the store
//! and vandalizes its still-tracked messages: each gets the duplicate
//! marker forced onto it, telling the author their slot went stale and
//! they should resubmit. The watcher terminates after one expiry and never
//! reschedules itself.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::Marker;
use crate::platform::Platform;
use crate::sync;

use super::entry::QueueStateHandle;
use super::store::QueueStore;

/// Schedule the expiry watcher for a freshly created entity
pub fn spawn_watcher(
    platform: &Arc<dyn Platform>,
    store: &Arc<QueueStore>,
    expiry: Duration,
    entry: Arc<QueueStateHandle>,
) -> JoinHandle<()> {
    debug!(guild = %entry.guild(), member = %entry.member(), ?expiry, "gc::spawn_watcher: called");
    let platform = Arc::downgrade(platform);
    let store = Arc::downgrade(store);
    tokio::spawn(watch(platform, store, expiry, entry))
}

async fn watch(
    platform: Weak<dyn Platform>,
    store: Weak<QueueStore>,
    expiry: Duration,
    entry: Arc<QueueStateHandle>,
) {
    loop {
        let deadline = { entry.lock().await.mtime() + expiry };
        tokio::time::sleep_until(deadline).await;

        // Activity while we slept postpones expiry; re-sleep rather than
        // expire early.
        let mtime = { entry.lock().await.mtime() };
        if tokio::time::Instant::now() < mtime + expiry {
            debug!(guild = %entry.guild(), member = %entry.member(), "gc::watch: activity seen, re-sleeping");
            continue;
        }
        break;
    }

    let (Some(platform), Some(store)) = (platform.upgrade(), store.upgrade()) else {
        debug!("gc::watch: engine gone, watcher exiting");
        return;
    };

    // Remove only if no entity replaced ours in the interim; a stale handle
    // must never evict its successor, and a superseded entity is not ours
    // to vandalize.
    if !store.remove_entry(&entry) {
        debug!(guild = %entry.guild(), member = %entry.member(), "gc::watch: entity superseded, skipping vandalism");
        return;
    }

    info!(guild = %entry.guild(), member = %entry.member(), "gc::watch: entity expired, vandalizing");
    vandalize(&*platform, &entry).await;
}

/// Force the duplicate marker onto every still-tracked message and wipe
/// the entity's contents. Tolerates already-deleted messages.
async fn vandalize(platform: &dyn Platform, entry: &QueueStateHandle) {
    let mut state = entry.lock().await;
    for (channel, message) in state.entries() {
        let snapshot = match platform.fetch_message(channel, message).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_gone() => {
                debug!(%channel, %message, "gc::vandalize: message already gone, skipping");
                continue;
            }
            Err(e) => {
                warn!(%channel, %message, error = %e, "gc::vandalize: fetch failed");
                continue;
            }
        };
        if let Err(e) = sync::apply(platform, &snapshot, Some(Marker::Duplicate)).await {
            warn!(%channel, %message, error = %e, "gc::vandalize: could not mark message");
        }
    }
    state.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelId, GuildId, MemberId, MessageId};
    use crate::platform::InMemoryPlatform;

    const BOT: MemberId = MemberId(1);
    const GUILD: GuildId = GuildId(10);
    const CHANNEL: ChannelId = ChannelId(100);
    const STUDENT: MemberId = MemberId(2);

    const EXPIRY: Duration = Duration::from_secs(48 * 3600);

    fn engine_parts() -> (Arc<dyn Platform>, Arc<QueueStore>, Arc<InMemoryPlatform>) {
        let memory = Arc::new(InMemoryPlatform::new(BOT));
        memory.add_queue_channel(GUILD, CHANNEL);
        let platform: Arc<dyn Platform> = memory.clone();
        (platform, Arc::new(QueueStore::new()), memory)
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_entity_is_expired_and_vandalized() {
        let (platform, store, memory) = engine_parts();
        memory.post_message(GUILD, CHANNEL, STUDENT, MessageId(1));

        let (entry, created) = store.get_or_create(GUILD, STUDENT);
        assert!(created);
        entry.lock().await.track(CHANNEL, MessageId(1));

        let handle = spawn_watcher(&platform, &store, EXPIRY, entry.clone());

        tokio::time::advance(EXPIRY + Duration::from_secs(1)).await;
        handle.await.unwrap();

        assert!(store.is_empty());
        assert_eq!(memory.own_markers(CHANNEL, MessageId(1)), vec![Marker::Duplicate]);
        assert!(entry.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_postpones_expiry() {
        let (platform, store, _memory) = engine_parts();
        let (entry, _) = store.get_or_create(GUILD, STUDENT);

        let handle = spawn_watcher(&platform, &store, EXPIRY, entry.clone());

        // Touch halfway through; the watcher must re-sleep.
        tokio::time::advance(EXPIRY / 2).await;
        entry.lock().await.touch();
        tokio::time::advance(EXPIRY / 2 + Duration::from_secs(1)).await;

        assert!(!handle.is_finished());
        assert_eq!(store.len(), 1);

        // After another full idle period it expires for real.
        tokio::time::advance(EXPIRY).await;
        handle.await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vandalism_tolerates_deleted_messages() {
        let (platform, store, memory) = engine_parts();
        let (entry, _) = store.get_or_create(GUILD, STUDENT);
        entry.lock().await.track(CHANNEL, MessageId(1)); // never posted

        let handle = spawn_watcher(&platform, &store, EXPIRY, entry.clone());
        tokio::time::advance(EXPIRY + Duration::from_secs(1)).await;
        handle.await.unwrap();

        assert!(store.is_empty());
        assert!(memory.take_actions().is_empty());
        assert!(entry.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_entity_is_not_vandalized() {
        let (platform, store, memory) = engine_parts();
        memory.post_message(GUILD, CHANNEL, STUDENT, MessageId(1));

        let (entry, _) = store.get_or_create(GUILD, STUDENT);
        entry.lock().await.track(CHANNEL, MessageId(1));

        let handle = spawn_watcher(&platform, &store, EXPIRY, entry.clone());

        // Replace the entity behind the watcher's back.
        assert!(store.remove_entry(&entry));
        let (_replacement, created) = store.get_or_create(GUILD, STUDENT);
        assert!(created);

        tokio::time::advance(EXPIRY + Duration::from_secs(1)).await;
        handle.await.unwrap();

        // The replacement survives and no message was touched.
        assert_eq!(store.len(), 1);
        assert!(memory.take_actions().is_empty());
    }
}
