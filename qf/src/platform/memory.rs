//! In-memory platform implementation
//!
//! Backs the replay harness and the test suite. Holds guild layout,
//! messages, reactions and voice presence in plain maps, and records every
//! mutating call in an action log so callers can assert exactly which
//! platform operations the engine performed.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{ChannelId, GuildId, Marker, MemberId, MessageId};

use super::{MessageSnapshot, Platform, PlatformError, ReactionSnapshot};

/// A mutating platform call, as recorded by [`InMemoryPlatform`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddMarker {
        channel: ChannelId,
        message: MessageId,
        marker: Marker,
    },
    ClearMarker {
        channel: ChannelId,
        message: MessageId,
        marker: Marker,
    },
    MoveToVoice {
        guild: GuildId,
        member: MemberId,
        channel: ChannelId,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AddMarker { channel, message, marker } => {
                write!(f, "add {} to message {} in channel {}", marker, message, channel)
            }
            Action::ClearMarker { channel, message, marker } => {
                write!(f, "clear {} from message {} in channel {}", marker, message, channel)
            }
            Action::MoveToVoice { guild, member, channel } => {
                write!(f, "move member {} to voice channel {} in guild {}", member, channel, guild)
            }
        }
    }
}

#[derive(Default)]
struct State {
    teachers: HashSet<(GuildId, MemberId)>,
    /// Queue text channels per guild, canonical order
    queue_text: HashMap<GuildId, Vec<ChannelId>>,
    /// Voice channels designated for the queue
    queue_voice: HashSet<ChannelId>,
    voice: HashMap<(GuildId, MemberId), ChannelId>,
    messages: HashMap<(ChannelId, MessageId), MessageSnapshot>,
    /// Per-channel posting order, oldest first
    order: HashMap<ChannelId, Vec<MessageId>>,
    /// Messages that exist but cannot be fetched
    forbidden: HashSet<(ChannelId, MessageId)>,
}

/// Fully in-memory [`Platform`]
pub struct InMemoryPlatform {
    bot: MemberId,
    state: Mutex<State>,
    actions: Mutex<Vec<Action>>,
}

impl InMemoryPlatform {
    pub fn new(bot: MemberId) -> Self {
        debug!(%bot, "InMemoryPlatform::new: called");
        Self {
            bot,
            state: Mutex::new(State::default()),
            actions: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, action: Action) {
        debug!(%action, "InMemoryPlatform::record");
        let mut actions = self.actions.lock().unwrap_or_else(|e| e.into_inner());
        actions.push(action);
    }

    // === layout ===

    /// Register a queue text channel; call order defines canonical order
    pub fn add_queue_channel(&self, guild: GuildId, channel: ChannelId) {
        debug!(%guild, %channel, "InMemoryPlatform::add_queue_channel: called");
        self.lock().queue_text.entry(guild).or_default().push(channel);
    }

    /// Register a queue voice channel
    pub fn add_queue_voice_channel(&self, channel: ChannelId) {
        debug!(%channel, "InMemoryPlatform::add_queue_voice_channel: called");
        self.lock().queue_voice.insert(channel);
    }

    /// Grant a member the teacher role
    pub fn set_teacher(&self, guild: GuildId, member: MemberId) {
        debug!(%guild, %member, "InMemoryPlatform::set_teacher: called");
        self.lock().teachers.insert((guild, member));
    }

    // === messages ===

    /// Post a message and return its snapshot
    pub fn post_message(
        &self,
        guild: GuildId,
        channel: ChannelId,
        author: MemberId,
        id: MessageId,
    ) -> MessageSnapshot {
        debug!(%guild, %channel, %author, %id, "InMemoryPlatform::post_message: called");
        let snapshot = MessageSnapshot {
            id,
            guild,
            channel,
            author,
            reactions: Vec::new(),
        };
        let mut state = self.lock();
        state.messages.insert((channel, id), snapshot.clone());
        state.order.entry(channel).or_default().push(id);
        snapshot
    }

    /// Delete a message (subsequent fetches return NotFound)
    pub fn delete_message(&self, channel: ChannelId, message: MessageId) {
        debug!(%channel, %message, "InMemoryPlatform::delete_message: called");
        let mut state = self.lock();
        state.messages.remove(&(channel, message));
        if let Some(order) = state.order.get_mut(&channel) {
            order.retain(|id| *id != message);
        }
    }

    /// Make a message unfetchable without deleting it
    pub fn set_forbidden(&self, channel: ChannelId, message: MessageId) {
        debug!(%channel, %message, "InMemoryPlatform::set_forbidden: called");
        self.lock().forbidden.insert((channel, message));
    }

    /// Add a reaction on behalf of an ordinary user (never the bot)
    pub fn add_user_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str) {
        debug!(%channel, %message, emoji, "InMemoryPlatform::add_user_reaction: called");
        let mut state = self.lock();
        if let Some(snapshot) = state.messages.get_mut(&(channel, message))
            && !snapshot.reactions.iter().any(|r| r.emoji == emoji)
        {
            snapshot.reactions.push(ReactionSnapshot {
                emoji: emoji.to_string(),
                me: false,
            });
        }
    }

    /// Wipe every reaction from a message (a teacher's reset gesture)
    pub fn clear_reactions(&self, channel: ChannelId, message: MessageId) {
        debug!(%channel, %message, "InMemoryPlatform::clear_reactions: called");
        let mut state = self.lock();
        if let Some(snapshot) = state.messages.get_mut(&(channel, message)) {
            snapshot.reactions.clear();
        }
    }

    /// Current snapshot of a message, if it exists
    pub fn message(&self, channel: ChannelId, message: MessageId) -> Option<MessageSnapshot> {
        self.lock().messages.get(&(channel, message)).cloned()
    }

    /// Markers currently applied by the bot to a message
    pub fn own_markers(&self, channel: ChannelId, message: MessageId) -> Vec<Marker> {
        self.message(channel, message)
            .map(|s| s.own_markers().collect())
            .unwrap_or_default()
    }

    // === presence ===

    /// Set (or clear) a member's voice channel
    pub fn set_voice(&self, guild: GuildId, member: MemberId, channel: Option<ChannelId>) {
        debug!(%guild, %member, ?channel, "InMemoryPlatform::set_voice: called");
        let mut state = self.lock();
        match channel {
            Some(channel) => {
                state.voice.insert((guild, member), channel);
            }
            None => {
                state.voice.remove(&(guild, member));
            }
        }
    }

    /// Mirror an inbound event into the platform state
    ///
    /// The replay harness applies each event here before dispatching it to
    /// the engine, so fetches during reconciliation see the world the event
    /// describes.
    pub fn apply_event(&self, event: &crate::events::Event) {
        use crate::events::Event;
        match event {
            Event::MessageCreated { message } | Event::MessageEdited { message } => {
                let mut state = self.lock();
                let key = (message.channel, message.id);
                if !state.messages.contains_key(&key) {
                    state.order.entry(message.channel).or_default().push(message.id);
                }
                state.messages.insert(key, message.clone());
            }
            Event::MessageDeleted { channel, message, .. } => {
                self.delete_message(*channel, *message);
            }
            Event::ReactionAdded { channel, message, member, emoji, .. } => {
                let me = *member == self.bot;
                let mut state = self.lock();
                if let Some(snapshot) = state.messages.get_mut(&(*channel, *message)) {
                    match snapshot.reactions.iter_mut().find(|r| r.emoji == *emoji) {
                        Some(reaction) => reaction.me |= me,
                        None => snapshot.reactions.push(ReactionSnapshot {
                            emoji: emoji.clone(),
                            me,
                        }),
                    }
                }
            }
            Event::ReactionRemoved { channel, message, member, emoji, .. } => {
                if *member == self.bot {
                    let mut state = self.lock();
                    if let Some(snapshot) = state.messages.get_mut(&(*channel, *message)) {
                        for reaction in snapshot.reactions.iter_mut().filter(|r| r.emoji == *emoji) {
                            reaction.me = false;
                        }
                    }
                }
            }
            Event::ReactionsCleared { channel, message, .. } => {
                self.clear_reactions(*channel, *message);
            }
            Event::VoiceStateChanged { guild, member, channel } => {
                self.set_voice(*guild, *member, *channel);
            }
            Event::Advance { .. } => {}
        }
    }

    // === action log ===

    /// Drain the recorded action log
    pub fn take_actions(&self) -> Vec<Action> {
        let mut actions = self.actions.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *actions)
    }
}

#[async_trait]
impl Platform for InMemoryPlatform {
    fn is_self(&self, member: MemberId) -> bool {
        member == self.bot
    }

    fn is_teacher(&self, guild: GuildId, member: MemberId) -> bool {
        self.lock().teachers.contains(&(guild, member))
    }

    fn is_queue_channel(&self, channel: ChannelId) -> bool {
        let state = self.lock();
        state.queue_voice.contains(&channel) || state.queue_text.values().any(|chs| chs.contains(&channel))
    }

    fn guilds(&self) -> Vec<GuildId> {
        let state = self.lock();
        let mut guilds: Vec<GuildId> = state.queue_text.keys().copied().collect();
        guilds.sort();
        guilds
    }

    fn queue_channels(&self, guild: GuildId) -> Vec<ChannelId> {
        self.lock().queue_text.get(&guild).cloned().unwrap_or_default()
    }

    fn voice_channel(&self, guild: GuildId, member: MemberId) -> Option<ChannelId> {
        self.lock().voice.get(&(guild, member)).copied()
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<MessageSnapshot, PlatformError> {
        debug!(%channel, %message, "InMemoryPlatform::fetch_message: called");
        let state = self.lock();
        if state.forbidden.contains(&(channel, message)) {
            return Err(PlatformError::Forbidden);
        }
        state
            .messages
            .get(&(channel, message))
            .cloned()
            .ok_or(PlatformError::NotFound)
    }

    async fn add_marker(&self, channel: ChannelId, message: MessageId, marker: Marker) -> Result<(), PlatformError> {
        debug!(%channel, %message, %marker, "InMemoryPlatform::add_marker: called");
        {
            let mut state = self.lock();
            let snapshot = state
                .messages
                .get_mut(&(channel, message))
                .ok_or(PlatformError::NotFound)?;
            match snapshot.reactions.iter_mut().find(|r| r.emoji == marker.emoji()) {
                Some(reaction) => reaction.me = true,
                None => snapshot.reactions.push(ReactionSnapshot {
                    emoji: marker.emoji().to_string(),
                    me: true,
                }),
            }
        }
        self.record(Action::AddMarker { channel, message, marker });
        Ok(())
    }

    async fn clear_marker(&self, channel: ChannelId, message: MessageId, marker: Marker) -> Result<(), PlatformError> {
        debug!(%channel, %message, %marker, "InMemoryPlatform::clear_marker: called");
        {
            let mut state = self.lock();
            let snapshot = state
                .messages
                .get_mut(&(channel, message))
                .ok_or(PlatformError::NotFound)?;
            snapshot.reactions.retain(|r| r.emoji != marker.emoji());
        }
        self.record(Action::ClearMarker { channel, message, marker });
        Ok(())
    }

    async fn move_to_voice(&self, guild: GuildId, member: MemberId, channel: ChannelId) -> Result<(), PlatformError> {
        debug!(%guild, %member, %channel, "InMemoryPlatform::move_to_voice: called");
        self.lock().voice.insert((guild, member), channel);
        self.record(Action::MoveToVoice { guild, member, channel });
        Ok(())
    }

    async fn channel_history(&self, channel: ChannelId) -> Result<Vec<MessageSnapshot>, PlatformError> {
        debug!(%channel, "InMemoryPlatform::channel_history: called");
        let state = self.lock();
        let order = state.order.get(&channel).cloned().unwrap_or_default();
        Ok(order
            .into_iter()
            .filter_map(|id| state.messages.get(&(channel, id)).cloned())
            .collect())
    }
}
