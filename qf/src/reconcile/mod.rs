//! The reconciliation engine
//!
//! Inbound facts (messages, reactions, voice presence, the advance
//! command) are folded into per-member queue state, and the state is
//! pushed back out as marker reactions. All algorithms are idempotent;
//! replaying history converges to the same markers.

mod advance;
mod manager;
mod member;
mod message;

pub use manager::QueueManager;
