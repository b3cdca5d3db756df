//! Queuefairy - review-queue state reconciliation engine
//!
//! Queuefairy keeps the review queue of a community chat server honest.
//! Students post one message per queue channel to sign up; the engine folds
//! platform events (messages, reactions, voice presence) into per-member
//! state and mirrors that state back as marker reactions. Teachers pull the
//! next student in with the advance operation.
//!
//! # Core Concepts
//!
//! - **Idempotent Reconciliation**: every event handler recomputes markers
//!   from current facts; replaying history converges instead of drifting
//! - **One Entity per Member**: all state for a (guild, member) pair lives
//!   behind a single async lock, so concurrent events are strictly ordered
//! - **Platform at Arm's Length**: the engine only sees the [`platform::Platform`]
//!   trait; naming conventions and role checks stay on the other side
//! - **Self-Cleaning**: a watcher per entity expires long-idle state and
//!   vandalizes the stale messages it still tracked
//!
//! # Modules
//!
//! - [`domain`] - identifiers, markers and voice status
//! - [`platform`] - the connection trait, errors and the in-memory double
//! - [`state`] - queue state entities, the store and garbage collection
//! - [`sync`] - the reaction synchronizer
//! - [`reconcile`] - the reconciliation algorithms and the manager facade
//! - [`events`] - the inbound event surface
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod platform;
pub mod reconcile;
pub mod state;
pub mod sync;

// Re-export commonly used types
pub use config::{Config, GcConfig, LoggingConfig};
pub use domain::{ChannelId, GuildId, Marker, MemberId, MessageId, VoiceStatus};
pub use events::Event;
pub use platform::{Action, InMemoryPlatform, MessageSnapshot, Platform, PlatformError, ReactionSnapshot};
pub use reconcile::QueueManager;
pub use state::{QueueState, QueueStateHandle, QueueStore, StateKey};
