//! In-memory queue state: entities, the store, and garbage collection

mod entry;
mod gc;
mod store;

pub use entry::{QueueState, QueueStateHandle, StateKey};
pub use gc::spawn_watcher;
pub use store::QueueStore;
