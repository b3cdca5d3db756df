//! Snapshot types carried across the platform boundary

use serde::{Deserialize, Serialize};

use crate::domain::{ChannelId, GuildId, Marker, MemberId, MessageId};

/// Point-in-time view of a queue message and its reactions
///
/// The engine only ever inspects a snapshot; the live message is owned by
/// the platform. Snapshots are cheap to clone and serialize (they ride on
/// the inbound event stream).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSnapshot {
    pub id: MessageId,
    pub guild: GuildId,
    pub channel: ChannelId,
    pub author: MemberId,
    /// Current reaction state, one entry per distinct emoji
    #[serde(default)]
    pub reactions: Vec<ReactionSnapshot>,
}

/// One reaction on a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionSnapshot {
    pub emoji: String,
    /// Whether the bot itself applied this reaction
    #[serde(default)]
    pub me: bool,
}

impl MessageSnapshot {
    /// True if the bot has applied the given marker to this message
    pub fn has_own_marker(&self, marker: Marker) -> bool {
        self.reactions.iter().any(|r| r.me && r.emoji == marker.emoji())
    }

    /// Markers from the known vocabulary the bot has applied
    pub fn own_markers(&self) -> impl Iterator<Item = Marker> + '_ {
        self.reactions
            .iter()
            .filter(|r| r.me)
            .filter_map(|r| Marker::from_emoji(&r.emoji))
    }
}
