//! The advance operation
//!
//! A reviewer asks for the next student: scan the queue channels in
//! canonical order, oldest messages first, and pull the first eligible
//! author into the reviewer's voice channel, marking their message
//! finished.

use tracing::{debug, info};

use crate::domain::{GuildId, MemberId};
use crate::platform::PlatformError;
use crate::reconcile::member::{consider_member, voice_status};
use crate::state::QueueState;

use super::manager::ManagerInner;

/// Move the next eligible queued member into the reviewer's voice channel
///
/// Eligible means: the message is the author's tracked message for its
/// channel, not finished, and the author is connected to voice (a member
/// with no voice connection cannot be moved). Returns the member who was
/// pulled, if any. A reviewer who is not in voice themselves gets a
/// silent no-op; there is nowhere to pull anyone to.
pub(crate) async fn advance(
    inner: &ManagerInner,
    guild: GuildId,
    reviewer: MemberId,
) -> Result<Option<MemberId>, PlatformError> {
    debug!(%guild, %reviewer, "advance: called");

    let Some(target) = inner.platform.voice_channel(guild, reviewer) else {
        debug!(%guild, %reviewer, "advance: reviewer not in voice, nothing to do");
        return Ok(None);
    };

    for channel in inner.platform.queue_channels(guild) {
        for message in inner.platform.channel_history(channel).await? {
            if inner.platform.is_self(message.author)
                || inner.platform.is_teacher(guild, message.author)
            {
                continue;
            }
            let Some(entry) = inner.store.get(guild, message.author) else {
                continue;
            };

            let mut state = entry.lock().await;
            if !eligible(inner, &state, &message) {
                continue;
            }

            info!(%guild, member = %message.author, %channel, message = %message.id, "advance: pulling member");
            inner.platform.move_to_voice(guild, message.author, target).await?;
            let status = voice_status(&*inner.platform, Some(target));
            consider_member(inner, &mut state, guild, message.author, status, true).await?;
            return Ok(Some(message.author));
        }
    }

    debug!(%guild, %reviewer, "advance: queue is empty");
    Ok(None)
}

fn eligible(
    inner: &ManagerInner,
    state: &QueueState,
    message: &crate::platform::MessageSnapshot,
) -> bool {
    if state.tracked(message.channel) != Some(message.id) {
        return false;
    }
    if state.is_finished(message.id) {
        return false;
    }
    // Only members connected to voice can be moved at all.
    inner.platform.voice_channel(message.guild, message.author).is_some()
}
