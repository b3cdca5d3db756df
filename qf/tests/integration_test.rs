//! Integration tests for queuefairy
//!
//! These tests drive the engine end-to-end through the event dispatch
//! surface, the way the replay harness does: each platform mutation is
//! mirrored into the in-memory platform, then the matching event is
//! dispatched to the manager.

use std::sync::Arc;
use std::time::Duration;

use queuefairy::domain::{ChannelId, GuildId, Marker, MemberId, MessageId};
use queuefairy::events::Event;
use queuefairy::platform::{InMemoryPlatform, Platform};
use queuefairy::reconcile::QueueManager;

const BOT: MemberId = MemberId(1);
const STUDENT: MemberId = MemberId(2);
const OTHER: MemberId = MemberId(3);
const TEACHER: MemberId = MemberId(9);

const GUILD: GuildId = GuildId(10);
const QUEUE: ChannelId = ChannelId(100);
const QUEUE_VOICE: ChannelId = ChannelId(200);
const REVIEW_VOICE: ChannelId = ChannelId(300);
const LOUNGE_VOICE: ChannelId = ChannelId(301);

const EXPIRY: Duration = Duration::from_secs(48 * 3600);

fn setup(expiry: Duration) -> (QueueManager, Arc<InMemoryPlatform>) {
    let platform = Arc::new(InMemoryPlatform::new(BOT));
    platform.add_queue_channel(GUILD, QUEUE);
    platform.add_queue_voice_channel(QUEUE_VOICE);
    platform.set_teacher(GUILD, TEACHER);
    let manager = QueueManager::new(platform.clone() as Arc<dyn Platform>, expiry);
    (manager, platform)
}

async fn post(
    manager: &QueueManager,
    platform: &InMemoryPlatform,
    author: MemberId,
    id: MessageId,
) {
    let message = platform.post_message(GUILD, QUEUE, author, id);
    manager
        .dispatch(Event::MessageCreated { message })
        .await
        .expect("message dispatch failed");
}

async fn voice(
    manager: &QueueManager,
    platform: &InMemoryPlatform,
    member: MemberId,
    channel: Option<ChannelId>,
) {
    platform.set_voice(GUILD, member, channel);
    manager
        .dispatch(Event::VoiceStateChanged { guild: GUILD, member, channel })
        .await
        .expect("voice dispatch failed");
}

// =============================================================================
// Full Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_post_wander_advance_delete_lifecycle() {
    let (manager, platform) = setup(EXPIRY);

    // Student signs up without joining voice: astray.
    post(&manager, &platform, STUDENT, MessageId(1)).await;
    assert_eq!(platform.own_markers(QUEUE, MessageId(1)), vec![Marker::Astray]);

    // Student wanders into some unrelated voice channel: active.
    voice(&manager, &platform, STUDENT, Some(LOUNGE_VOICE)).await;
    assert_eq!(platform.own_markers(QUEUE, MessageId(1)), vec![Marker::Active]);

    // A teacher advances the queue: the student is pulled into the
    // teacher's channel and the message reads finished.
    platform.set_voice(GUILD, TEACHER, Some(REVIEW_VOICE));
    manager
        .dispatch(Event::Advance { guild: GUILD, reviewer: TEACHER })
        .await
        .unwrap();
    assert_eq!(platform.voice_channel(GUILD, STUDENT), Some(REVIEW_VOICE));
    assert_eq!(platform.own_markers(QUEUE, MessageId(1)), vec![Marker::Finished]);

    // Student deletes the message: the slot is gone entirely.
    platform.delete_message(QUEUE, MessageId(1));
    manager
        .dispatch(Event::MessageDeleted {
            guild: GUILD,
            channel: QUEUE,
            message: MessageId(1),
            author: STUDENT,
        })
        .await
        .unwrap();

    let entry = manager.store().get(GUILD, STUDENT).expect("entity should persist");
    let state = entry.lock().await;
    assert!(state.is_empty());
    assert!(!state.any_finished());
}

#[tokio::test]
async fn test_duplicate_stays_duplicate_after_first_is_deleted() {
    let (manager, platform) = setup(EXPIRY);

    post(&manager, &platform, STUDENT, MessageId(1)).await;
    post(&manager, &platform, STUDENT, MessageId(2)).await;

    assert_eq!(platform.own_markers(QUEUE, MessageId(1)), vec![Marker::Astray]);
    assert_eq!(platform.own_markers(QUEUE, MessageId(2)), vec![Marker::Duplicate]);

    platform.delete_message(QUEUE, MessageId(1));
    manager
        .dispatch(Event::MessageDeleted {
            guild: GUILD,
            channel: QUEUE,
            message: MessageId(1),
            author: STUDENT,
        })
        .await
        .unwrap();

    // No auto-promotion: the second message keeps its duplicate marker.
    assert_eq!(platform.own_markers(QUEUE, MessageId(2)), vec![Marker::Duplicate]);
}

// =============================================================================
// Marker Exclusivity
// =============================================================================

#[tokio::test]
async fn test_at_most_one_marker_through_transitions() {
    let (manager, platform) = setup(EXPIRY);

    post(&manager, &platform, STUDENT, MessageId(1)).await;
    let transitions = [
        Some(QUEUE_VOICE),
        Some(LOUNGE_VOICE),
        None,
        Some(QUEUE_VOICE),
        None,
    ];
    for channel in transitions {
        voice(&manager, &platform, STUDENT, channel).await;
        let markers = platform.own_markers(QUEUE, MessageId(1));
        assert!(markers.len() <= 1, "expected at most one marker, got {markers:?}");
        assert!(!markers.contains(&Marker::Duplicate));
    }
}

// =============================================================================
// Startup Replay
// =============================================================================

#[tokio::test]
async fn test_startup_replay_converges() {
    let (manager, platform) = setup(EXPIRY);

    // A world that existed before the engine came up: markers from a
    // previous run included.
    platform.post_message(GUILD, QUEUE, STUDENT, MessageId(1));
    platform.add_marker(QUEUE, MessageId(1), Marker::Finished).await.unwrap();
    platform.post_message(GUILD, QUEUE, STUDENT, MessageId(2));
    platform.post_message(GUILD, QUEUE, OTHER, MessageId(3));
    platform.set_voice(GUILD, OTHER, Some(QUEUE_VOICE));
    platform.take_actions();

    manager.reconcile_all().await;

    // Finished survives a cold pass, the double post is flagged, the
    // properly waiting member is unmarked.
    assert_eq!(platform.own_markers(QUEUE, MessageId(1)), vec![Marker::Finished]);
    assert_eq!(platform.own_markers(QUEUE, MessageId(2)), vec![Marker::Duplicate]);
    assert!(platform.own_markers(QUEUE, MessageId(3)).is_empty());

    // A second pass changes nothing.
    platform.take_actions();
    manager.reconcile_all().await;
    assert!(platform.take_actions().is_empty());
}

// =============================================================================
// Garbage Collection
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_queue_state_expires_and_vandalizes() {
    let short = Duration::from_secs(3600);
    let (manager, platform) = setup(short);

    post(&manager, &platform, STUDENT, MessageId(1)).await;
    platform.take_actions();
    assert_eq!(manager.store().len(), 1);

    tokio::time::advance(short + Duration::from_secs(60)).await;
    // Let the watcher run.
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert!(manager.store().is_empty());
    assert_eq!(platform.own_markers(QUEUE, MessageId(1)), vec![Marker::Duplicate]);

    // A fresh message afterwards starts a clean entity, tracked normally.
    post(&manager, &platform, STUDENT, MessageId(2)).await;
    assert_eq!(platform.own_markers(QUEUE, MessageId(2)), vec![Marker::Astray]);
    assert_eq!(manager.store().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_activity_keeps_queue_state_alive() {
    let short = Duration::from_secs(3600);
    let (manager, platform) = setup(short);

    post(&manager, &platform, STUDENT, MessageId(1)).await;

    // Keep touching the entity before the deadline.
    for _ in 0..3 {
        tokio::time::advance(short / 2).await;
        voice(&manager, &platform, STUDENT, Some(QUEUE_VOICE)).await;
    }

    assert_eq!(manager.store().len(), 1);
    let markers = platform.own_markers(QUEUE, MessageId(1));
    assert_ne!(markers, vec![Marker::Duplicate]);
}
