//! Member-driven reconciliation
//!
//! `consider_member` recomputes the member's voice-derived status and pushes
//! the resulting marker onto every tracked message, pruning messages that
//! turned out to be deleted along the way.

use tracing::debug;

use crate::domain::{ChannelId, GuildId, Marker, MemberId, VoiceStatus};
use crate::platform::{Platform, PlatformError};
use crate::state::QueueState;
use crate::sync;

use super::manager::ManagerInner;

/// Classify a member's voice presence
///
/// Waiting in a queue voice channel is the proper state and earns no
/// marker. Any other voice channel means a reviewer pulled the member in
/// (active). No voice connection at all means the member queued up but
/// never joined voice (astray).
pub(crate) fn voice_status(platform: &dyn Platform, channel: Option<ChannelId>) -> VoiceStatus {
    match channel {
        Some(channel) if platform.is_queue_channel(channel) => VoiceStatus::Normal,
        Some(_) => VoiceStatus::Active,
        None => VoiceStatus::Astray,
    }
}

/// Reconcile every tracked message of the (already locked) queue state
/// against the member's current status
///
/// `allow_finish` gates the active-to-finished promotion: only the
/// advance operation mints a new finished message. Everything that merely
/// re-derives state (voluntary voice moves, message edits, reaction
/// changes, startup replay) passes false, so a member wandering into a
/// voice channel reads as active and a teacher-reset message comes back
/// as active, not re-finished.
pub(crate) async fn consider_member(
    inner: &ManagerInner,
    state: &mut QueueState,
    guild: GuildId,
    member: MemberId,
    status: VoiceStatus,
    allow_finish: bool,
) -> Result<(), PlatformError> {
    debug!(%guild, %member, ?status, allow_finish, "consider_member: called");

    // Entering review with no message finished yet: the frontmost tracked
    // message (queue channels in canonical order) becomes the prospective
    // finish. It keeps the finished marker after the member leaves voice.
    if status == VoiceStatus::Active && allow_finish && !state.any_finished() {
        for channel in inner.platform.queue_channels(guild) {
            if let Some(message) = state.tracked(channel) {
                debug!(%guild, %member, %channel, %message, "consider_member: prospective finish");
                state.mark_finished(message);
                break;
            }
        }
    }

    let mut garbage = Vec::new();
    for (channel, message) in state.entries() {
        let snapshot = match inner.platform.fetch_message(channel, message).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_gone() => {
                debug!(%channel, %message, "consider_member: tracked message gone, pruning");
                garbage.push(channel);
                continue;
            }
            Err(e) => return Err(e),
        };

        let desired = if state.is_finished(message) {
            Some(Marker::Finished)
        } else {
            status.marker()
        };
        sync::apply(&*inner.platform, &snapshot, desired).await?;
    }

    for channel in garbage {
        state.untrack(channel);
    }

    state.touch();
    debug!(%guild, %member, "consider_member: done");
    Ok(())
}
