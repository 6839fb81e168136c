//! Subscription system for sensor updates.
//!
//! This module turns one payload stream into many independent watches:
//! - Callback watches, invoked in place for every payload
//! - Channel watches, fed through bounded buffers with slow-subscriber dropping
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new();
//!
//! let id = manager.insert_callback(Box::new(|payload| {
//!     println!("pressure: {}", payload.pressure);
//! }));
//! let handle = manager.insert_channel();
//!
//! manager.broadcast(&payload);
//!
//! match handle.recv() {
//!     Ok(WatchEvent::Sample { payload }) => println!("got {:?}", payload),
//!     Ok(WatchEvent::Dropped { reason }) => println!("dropped: {:?}", reason),
//!     Err(_) => {}
//! }
//! ```

mod manager;
mod types;

pub use manager::{SubscriptionManager, DEFAULT_BUFFER_SIZE};
pub use types::{BroadcastOutcome, DropReason, WatchCallback, WatchEvent, WatchHandle};
