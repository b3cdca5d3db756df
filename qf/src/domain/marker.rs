//! Marker vocabulary and voice status
//!
//! A marker is one of a small fixed set of reaction annotations the bot
//! attaches to queue messages to convey status. The emoji renderings are
//! fixed; everything outside this vocabulary is invisible to the engine.
//! Because `Marker` is a closed enum, an out-of-vocabulary marker cannot
//! even be requested.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status marker attached to a queue message
///
/// At most one of `Astray`/`Active`/`Finished` applies to a tracked message
/// at a time. `Duplicate` is exclusive of all others and applies only to
/// non-tracked messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    /// Member is not connected to any voice channel
    Astray,
    /// Member is in a non-queue voice channel (currently being reviewed)
    Active,
    /// Review completed, message awaiting cleanup by its author
    Finished,
    /// A second message from the same member in the same channel
    Duplicate,
}

impl Marker {
    /// Every marker in the vocabulary
    pub const ALL: [Marker; 4] = [Marker::Astray, Marker::Active, Marker::Finished, Marker::Duplicate];

    /// The emoji this marker renders as on the platform
    pub fn emoji(&self) -> &'static str {
        match self {
            // angry face
            Marker::Astray => "\u{1F620}",
            // eyes
            Marker::Active => "\u{1F440}",
            // woman shrugging (shrug + ZWJ + female sign + VS16)
            Marker::Finished => "\u{1F937}\u{200D}\u{2640}\u{FE0F}",
            // pouting face
            Marker::Duplicate => "\u{1F621}",
        }
    }

    /// Map an emoji back into the vocabulary, if it belongs to it
    pub fn from_emoji(emoji: &str) -> Option<Marker> {
        Marker::ALL.iter().copied().find(|m| m.emoji() == emoji)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Astray => write!(f, "astray"),
            Marker::Active => write!(f, "active"),
            Marker::Finished => write!(f, "finished"),
            Marker::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// A member's voice presence, resolved against the queue-channel predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStatus {
    /// Not connected to any voice channel
    Astray,
    /// Connected to a non-queue voice channel (pulled in for review)
    Active,
    /// Connected to a queue voice channel - properly waiting
    Normal,
}

impl VoiceStatus {
    /// The marker a tracked, non-finished message should carry for this status
    pub fn marker(&self) -> Option<Marker> {
        match self {
            VoiceStatus::Astray => Some(Marker::Astray),
            VoiceStatus::Active => Some(Marker::Active),
            VoiceStatus::Normal => None,
        }
    }
}

impl fmt::Display for VoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceStatus::Astray => write!(f, "astray"),
            VoiceStatus::Active => write!(f, "active"),
            VoiceStatus::Normal => write!(f, "normal"),
        }
    }
}
