//! Per-member queue state entity
//!
//! One `QueueState` exists per (guild, member) pair. All reconciliation
//! work for the member runs under the entity's own async lock, held across
//! any platform awaits, so concurrent events about the same member are
//! strictly ordered.

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{ChannelId, GuildId, MemberId, MessageId};

/// Key of a queue state entity in the store
pub type StateKey = (GuildId, MemberId);

/// Lockable handle to a member's queue state
pub struct QueueStateHandle {
    guild: GuildId,
    member: MemberId,
    state: Mutex<QueueState>,
}

impl QueueStateHandle {
    pub fn new(guild: GuildId, member: MemberId) -> Self {
        debug!(%guild, %member, "QueueStateHandle::new: called");
        Self {
            guild,
            member,
            state: Mutex::new(QueueState::new()),
        }
    }

    pub fn guild(&self) -> GuildId {
        self.guild
    }

    pub fn member(&self) -> MemberId {
        self.member
    }

    pub fn key(&self) -> StateKey {
        (self.guild, self.member)
    }

    /// Acquire the entity lock
    ///
    /// Held for the full duration of a reconciliation operation, including
    /// suspending platform calls. The consider_message -> consider_member
    /// chain acquires it once at the entry point and passes the guard down.
    pub async fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().await
    }
}

/// The tracked-message and finished bookkeeping for one member
///
/// Invariants: at most one tracked message per channel; `finished` is a
/// subset of the tracked message ids.
pub struct QueueState {
    messages: BTreeMap<ChannelId, MessageId>,
    finished: BTreeSet<MessageId>,
    mtime: Instant,
}

impl QueueState {
    fn new() -> Self {
        Self {
            messages: BTreeMap::new(),
            finished: BTreeSet::new(),
            mtime: Instant::now(),
        }
    }

    /// The tracked message for a channel, if any
    pub fn tracked(&self, channel: ChannelId) -> Option<MessageId> {
        self.messages.get(&channel).copied()
    }

    /// Track a message for a channel, replacing any previous entry
    pub fn track(&mut self, channel: ChannelId, message: MessageId) {
        if let Some(old) = self.messages.insert(channel, message)
            && old != message
        {
            self.finished.remove(&old);
        }
    }

    /// Drop a channel's tracked entry (and its finished membership)
    pub fn untrack(&mut self, channel: ChannelId) -> Option<MessageId> {
        let removed = self.messages.remove(&channel);
        if let Some(message) = removed {
            self.finished.remove(&message);
        }
        removed
    }

    pub fn is_finished(&self, message: MessageId) -> bool {
        self.finished.contains(&message)
    }

    pub fn mark_finished(&mut self, message: MessageId) {
        self.finished.insert(message);
    }

    pub fn unmark_finished(&mut self, message: MessageId) {
        self.finished.remove(&message);
    }

    /// True if any tracked message is marked finished
    pub fn any_finished(&self) -> bool {
        !self.finished.is_empty()
    }

    /// All tracked (channel, message) pairs
    pub fn entries(&self) -> Vec<(ChannelId, MessageId)> {
        self.messages.iter().map(|(c, m)| (*c, *m)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Wipe all tracked and finished contents (vandalism)
    pub fn clear(&mut self) {
        self.messages.clear();
        self.finished.clear();
    }

    /// Last-modification instant, used only for expiry
    pub fn mtime(&self) -> Instant {
        self.mtime
    }

    /// Record activity, postponing expiry
    pub fn touch(&mut self) {
        self.mtime = Instant::now();
    }
}
