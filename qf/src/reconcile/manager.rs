//! The queue manager: entry points and event dispatch
//!
//! `QueueManager` owns the store and the platform handle and exposes the
//! reconciliation entry points. Each entry point checks its preconditions
//! before touching any lock, then acquires the member's entity lock exactly
//! once and holds it across the whole chain (message-level then
//! member-level reconciliation), so concurrent events about the same
//! member are strictly ordered.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::domain::{ChannelId, GuildId, MemberId, MessageId};
use crate::events::Event;
use crate::platform::{MessageSnapshot, Platform, PlatformError};
use crate::state::{spawn_watcher, QueueStateHandle, QueueStore};

use super::advance::advance;
use super::member::{consider_member, voice_status};
use super::message::consider_message;

pub(crate) struct ManagerInner {
    pub(crate) platform: Arc<dyn Platform>,
    pub(crate) store: Arc<QueueStore>,
    pub(crate) expiry: Duration,
}

/// Reconciliation engine facade
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<ManagerInner>,
}

impl QueueManager {
    pub fn new(platform: Arc<dyn Platform>, expiry: Duration) -> Self {
        debug!(?expiry, "QueueManager::new: called");
        Self {
            inner: Arc::new(ManagerInner {
                platform,
                store: Arc::new(QueueStore::new()),
                expiry,
            }),
        }
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.inner.store
    }

    /// The entity for a (guild, member) pair, creating it (and scheduling
    /// its GC watcher) on first touch
    pub fn queue_state_for(&self, guild: GuildId, member: MemberId) -> Arc<QueueStateHandle> {
        let (entry, created) = self.inner.store.get_or_create(guild, member);
        if created {
            spawn_watcher(
                &self.inner.platform,
                &self.inner.store,
                self.inner.expiry,
                Arc::clone(&entry),
            );
        }
        entry
    }

    /// True if the author/channel combination is queue-relevant at all
    fn message_relevant(&self, message: &MessageSnapshot) -> bool {
        let platform = &self.inner.platform;
        !platform.is_self(message.author)
            && !platform.is_teacher(message.guild, message.author)
            && platform.is_queue_channel(message.channel)
    }

    /// A message appeared or changed: fold it in, then re-derive the
    /// author's markers if anything moved
    pub async fn handle_message(&self, message: &MessageSnapshot) -> Result<(), PlatformError> {
        debug!(message = %message.id, channel = %message.channel, "QueueManager::handle_message: called");
        if !self.message_relevant(message) {
            debug!(message = %message.id, "QueueManager::handle_message: not queue-relevant, skipping");
            return Ok(());
        }

        let entry = self.queue_state_for(message.guild, message.author);
        let mut state = entry.lock().await;
        let changed = consider_message(&self.inner, &mut state, message).await?;
        if changed {
            let voice = self.inner.platform.voice_channel(message.guild, message.author);
            let status = voice_status(&*self.inner.platform, voice);
            consider_member(&self.inner, &mut state, message.guild, message.author, status, false)
                .await?;
        }
        Ok(())
    }

    /// A message was deleted: drop it from tracking and re-derive markers
    /// for whatever the author still has queued
    pub async fn handle_message_deleted(
        &self,
        guild: GuildId,
        channel: ChannelId,
        message: MessageId,
        author: MemberId,
    ) -> Result<(), PlatformError> {
        debug!(%guild, %channel, %message, %author, "QueueManager::handle_message_deleted: called");
        let platform = &self.inner.platform;
        if platform.is_self(author) || platform.is_teacher(guild, author) || !platform.is_queue_channel(channel) {
            return Ok(());
        }
        let Some(entry) = self.inner.store.get(guild, author) else {
            return Ok(());
        };

        let mut state = entry.lock().await;
        if state.tracked(channel) == Some(message) {
            state.untrack(channel);
        }
        let status = voice_status(&**platform, platform.voice_channel(guild, author));
        consider_member(&self.inner, &mut state, guild, author, status, false).await
    }

    /// A reaction changed under a message: re-read the message and
    /// reconcile from the fresh snapshot
    ///
    /// `actor` is whoever touched the reaction; the bot's own marker
    /// mutations echo back as reaction events and must not trigger another
    /// round. A vanished message is fine: the delete event handles it.
    pub async fn handle_reaction_change(
        &self,
        guild: GuildId,
        channel: ChannelId,
        message: MessageId,
        actor: Option<MemberId>,
    ) -> Result<(), PlatformError> {
        debug!(%guild, %channel, %message, ?actor, "QueueManager::handle_reaction_change: called");
        let platform = &self.inner.platform;
        if let Some(actor) = actor
            && platform.is_self(actor)
        {
            debug!(%message, "QueueManager::handle_reaction_change: own echo, skipping");
            return Ok(());
        }
        if !platform.is_queue_channel(channel) {
            return Ok(());
        }

        let snapshot = match platform.fetch_message(channel, message).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_gone() => {
                debug!(%channel, %message, "QueueManager::handle_reaction_change: message gone");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        self.handle_message(&snapshot).await
    }

    /// A member's voice presence changed
    ///
    /// Re-derives markers only: the member reads as active while in a
    /// non-queue voice channel and falls back to astray/unmarked on
    /// leaving. Minting a finished message is the advance operation's
    /// privilege — a teacher dragging a member in by hand looks identical
    /// to the member wandering in, so manual pulls never finish a slot.
    pub async fn handle_voice_update(
        &self,
        guild: GuildId,
        member: MemberId,
        channel: Option<ChannelId>,
    ) -> Result<(), PlatformError> {
        debug!(%guild, %member, ?channel, "QueueManager::handle_voice_update: called");
        let platform = &self.inner.platform;
        if platform.is_self(member) || platform.is_teacher(guild, member) {
            return Ok(());
        }

        let entry = self.queue_state_for(guild, member);
        let mut state = entry.lock().await;
        let status = voice_status(&**platform, channel);
        consider_member(&self.inner, &mut state, guild, member, status, false).await
    }

    /// Pull the next eligible queued member into the reviewer's voice
    /// channel; teachers only
    pub async fn advance(
        &self,
        guild: GuildId,
        reviewer: MemberId,
    ) -> Result<Option<MemberId>, PlatformError> {
        if !self.inner.platform.is_teacher(guild, reviewer) {
            debug!(%guild, %reviewer, "QueueManager::advance: reviewer is not a teacher, ignoring");
            return Ok(None);
        }
        advance(&self.inner, guild, reviewer).await
    }

    /// Rebuild state for one guild from a full channel-history replay
    ///
    /// Cold pass: no finished message is minted, existing finished markers
    /// are adopted from the reaction snapshots.
    pub async fn reconcile_guild(&self, guild: GuildId) -> Result<(), PlatformError> {
        info!(%guild, "QueueManager::reconcile_guild: called");
        for channel in self.inner.platform.queue_channels(guild) {
            for message in self.inner.platform.channel_history(channel).await? {
                if !self.message_relevant(&message) {
                    continue;
                }
                let entry = self.queue_state_for(guild, message.author);
                let mut state = entry.lock().await;
                consider_message(&self.inner, &mut state, &message).await?;
            }
        }

        // Second pass: derive markers from each member's current presence.
        for (key_guild, member) in self.inner.store.keys() {
            if key_guild != guild {
                continue;
            }
            let Some(entry) = self.inner.store.get(guild, member) else {
                continue;
            };
            let mut state = entry.lock().await;
            let voice = self.inner.platform.voice_channel(guild, member);
            let status = voice_status(&*self.inner.platform, voice);
            consider_member(&self.inner, &mut state, guild, member, status, false).await?;
        }
        Ok(())
    }

    /// Startup reconciliation across every guild
    ///
    /// A failing guild is logged and skipped; the others still converge.
    pub async fn reconcile_all(&self) {
        for guild in self.inner.platform.guilds() {
            if let Err(e) = self.reconcile_guild(guild).await {
                error!(%guild, error = %e, "QueueManager::reconcile_all: guild reconciliation failed");
            }
        }
    }

    /// Route one inbound event to its handler
    pub async fn dispatch(&self, event: Event) -> Result<(), PlatformError> {
        debug!(event = event.event_type(), "QueueManager::dispatch: called");
        match event {
            Event::MessageCreated { message } | Event::MessageEdited { message } => {
                self.handle_message(&message).await
            }
            Event::MessageDeleted { guild, channel, message, author } => {
                self.handle_message_deleted(guild, channel, message, author).await
            }
            Event::ReactionAdded { guild, channel, message, member, .. }
            | Event::ReactionRemoved { guild, channel, message, member, .. } => {
                self.handle_reaction_change(guild, channel, message, Some(member)).await
            }
            Event::ReactionsCleared { guild, channel, message } => {
                self.handle_reaction_change(guild, channel, message, None).await
            }
            Event::VoiceStateChanged { guild, member, channel } => {
                self.handle_voice_update(guild, member, channel).await
            }
            Event::Advance { guild, reviewer } => {
                self.advance(guild, reviewer).await.map(|_| ())
            }
        }
    }
}
