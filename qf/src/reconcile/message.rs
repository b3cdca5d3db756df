//! Message-driven reconciliation
//!
//! `consider_message` folds one message fact into a member's queue state.
//! It is idempotent: applying it twice with the same snapshot reports no
//! further change.

use tracing::debug;

use crate::domain::Marker;
use crate::platform::{MessageSnapshot, PlatformError};
use crate::state::QueueState;
use crate::sync;

use super::manager::ManagerInner;

/// Fold a message into the (already locked) queue state
///
/// Returns whether tracked/finished state changed, so the caller knows
/// whether to re-run member-level reconciliation.
pub(crate) async fn consider_message(
    inner: &ManagerInner,
    state: &mut QueueState,
    message: &MessageSnapshot,
) -> Result<bool, PlatformError> {
    debug!(message = %message.id, channel = %message.channel, author = %message.author, "consider_message: called");

    // A message we marked duplicate stays out of the queue. If it somehow
    // is the tracked message (edit after vandalism, replayed history), the
    // marker is authoritative: untrack it.
    if message.has_own_marker(Marker::Duplicate) {
        if state.tracked(message.channel) == Some(message.id) {
            debug!(message = %message.id, "consider_message: tracked message carries duplicate marker, untracking");
            state.untrack(message.channel);
            state.touch();
            return Ok(true);
        }
        debug!(message = %message.id, "consider_message: stale duplicate marker, no-op");
        return Ok(false);
    }

    // First message in a channel wins, permanently, while it is alive.
    if let Some(existing) = state.tracked(message.channel)
        && existing != message.id
    {
        match inner.platform.fetch_message(message.channel, existing).await {
            Ok(_) => {
                debug!(message = %message.id, %existing, "consider_message: channel already tracked, marking duplicate");
                sync::apply(&*inner.platform, message, Some(Marker::Duplicate)).await?;
                state.touch();
                return Ok(true);
            }
            Err(e) if e.is_gone() => {
                debug!(%existing, "consider_message: tracked message is garbage, dropping");
                state.untrack(message.channel);
            }
            Err(e) => return Err(e),
        }
    }

    let mut changed = state.tracked(message.channel) != Some(message.id);
    state.track(message.channel, message.id);

    // Finished membership follows the current reaction snapshot: a teacher
    // wiping the reactions resets the message to its queued state.
    let marked_finished = message.has_own_marker(Marker::Finished);
    if marked_finished && !state.is_finished(message.id) {
        state.mark_finished(message.id);
        changed = true;
    } else if !marked_finished && state.is_finished(message.id) {
        state.unmark_finished(message.id);
        changed = true;
    }

    if changed {
        state.touch();
    }
    debug!(message = %message.id, changed, "consider_message: done");
    Ok(changed)
}
