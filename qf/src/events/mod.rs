//! Inbound event surface
//!
//! Everything the engine reacts to arrives as one of these events, already
//! resolved to plain identifiers. The gateway-specific payloads stay on the
//! other side of the [`Platform`](crate::platform::Platform) boundary; the
//! replay harness deserializes events straight from JSON lines.

use serde::{Deserialize, Serialize};

use crate::domain::{ChannelId, GuildId, MemberId, MessageId};
use crate::platform::MessageSnapshot;

/// An inbound platform event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    MessageCreated {
        message: MessageSnapshot,
    },
    MessageEdited {
        message: MessageSnapshot,
    },
    MessageDeleted {
        guild: GuildId,
        channel: ChannelId,
        message: MessageId,
        author: MemberId,
    },
    ReactionAdded {
        guild: GuildId,
        channel: ChannelId,
        message: MessageId,
        member: MemberId,
        emoji: String,
    },
    ReactionRemoved {
        guild: GuildId,
        channel: ChannelId,
        message: MessageId,
        member: MemberId,
        emoji: String,
    },
    ReactionsCleared {
        guild: GuildId,
        channel: ChannelId,
        message: MessageId,
    },
    VoiceStateChanged {
        guild: GuildId,
        member: MemberId,
        #[serde(default)]
        channel: Option<ChannelId>,
    },
    Advance {
        guild: GuildId,
        reviewer: MemberId,
    },
}

impl Event {
    /// Stable name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::MessageCreated { .. } => "message-created",
            Event::MessageEdited { .. } => "message-edited",
            Event::MessageDeleted { .. } => "message-deleted",
            Event::ReactionAdded { .. } => "reaction-added",
            Event::ReactionRemoved { .. } => "reaction-removed",
            Event::ReactionsCleared { .. } => "reactions-cleared",
            Event::VoiceStateChanged { .. } => "voice-state-changed",
            Event::Advance { .. } => "advance",
        }
    }
}
