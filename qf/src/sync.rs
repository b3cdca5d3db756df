//! Reaction synchronizer
//!
//! Diffs a message's actual marker reactions against the desired marker and
//! issues the minimal add/clear calls. Reactions outside the marker
//! vocabulary are never touched, and a redundant invocation performs no
//! platform calls at all.

use tracing::debug;

use crate::domain::Marker;
use crate::platform::{MessageSnapshot, Platform, PlatformError};

/// Bring a message's markers in line with `desired`
///
/// `desired` is at most one marker: the status set computed by the
/// reconciler is always empty or a singleton. Adds the desired marker
/// unless the bot already applied it, then clears every other vocabulary
/// marker the bot applied.
pub async fn apply(
    platform: &dyn Platform,
    message: &MessageSnapshot,
    desired: Option<Marker>,
) -> Result<(), PlatformError> {
    debug!(message = %message.id, channel = %message.channel, ?desired, "sync::apply: called");

    let mut already_applied = false;
    let mut stale = Vec::new();
    for marker in message.own_markers() {
        if desired == Some(marker) {
            already_applied = true;
        } else if !stale.contains(&marker) {
            stale.push(marker);
        }
    }

    if let Some(marker) = desired
        && !already_applied
    {
        debug!(message = %message.id, %marker, "sync::apply: adding marker");
        platform.add_marker(message.channel, message.id, marker).await?;
    }

    for marker in stale {
        debug!(message = %message.id, %marker, "sync::apply: clearing stale marker");
        platform.clear_marker(message.channel, message.id, marker).await?;
    }

    Ok(())
}
