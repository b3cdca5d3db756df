//! Platform boundary: the connection collaborator the engine talks through
//!
//! The chat-platform connection itself is out of scope; the engine only
//! sees this trait. Predicates (naming conventions, roles) live behind it
//! too, so the reconciler knows nothing about channel or role names.

use async_trait::async_trait;

use crate::domain::{ChannelId, GuildId, Marker, MemberId, MessageId};

mod error;
mod memory;
mod types;

pub use error::PlatformError;
pub use memory::{Action, InMemoryPlatform};
pub use types::{MessageSnapshot, ReactionSnapshot};

/// The four network primitives plus the identity/naming predicates
///
/// Every method that suspends may be interleaved with other tasks; the
/// engine serializes access to its own state explicitly and never relies
/// on the platform for ordering.
#[async_trait]
pub trait Platform: Send + Sync {
    /// True if the member is the bot's own identity
    fn is_self(&self, member: MemberId) -> bool;

    /// True if the member carries a teacher/staff role
    fn is_teacher(&self, guild: GuildId, member: MemberId) -> bool;

    /// True if the channel (text or voice) is designated for the queue
    fn is_queue_channel(&self, channel: ChannelId) -> bool;

    /// Every guild the connection is a member of
    fn guilds(&self) -> Vec<GuildId>;

    /// Queue text channels of a guild, in the guild's canonical order
    fn queue_channels(&self, guild: GuildId) -> Vec<ChannelId>;

    /// The voice channel a member is currently connected to, if any
    fn voice_channel(&self, guild: GuildId, member: MemberId) -> Option<ChannelId>;

    /// Fetch the current state of a message
    async fn fetch_message(&self, channel: ChannelId, message: MessageId)
    -> Result<MessageSnapshot, PlatformError>;

    /// Apply a marker reaction as the bot
    async fn add_marker(&self, channel: ChannelId, message: MessageId, marker: Marker) -> Result<(), PlatformError>;

    /// Remove a marker reaction entirely (everyone's copies)
    async fn clear_marker(&self, channel: ChannelId, message: MessageId, marker: Marker) -> Result<(), PlatformError>;

    /// Move a member into a voice channel
    async fn move_to_voice(&self, guild: GuildId, member: MemberId, channel: ChannelId) -> Result<(), PlatformError>;

    /// Full message history of a channel, oldest first
    async fn channel_history(&self, channel: ChannelId) -> Result<Vec<MessageSnapshot>, PlatformError>;
}
