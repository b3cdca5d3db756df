//! Domain types: identifiers and the marker vocabulary

mod id;
mod marker;

pub use id::{ChannelId, GuildId, MemberId, MessageId};
pub use marker::{Marker, VoiceStatus};
