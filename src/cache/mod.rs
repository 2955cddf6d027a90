//! Client-side entity cache.
//!
//! - `store` holds one entry per [`CacheKey`] and never talks to the network
//! - `coordinator` fills entries, with at most one remote read per key
//! - `graph` says which keys a mutation invalidates and when a key may fetch

mod coordinator;
pub mod graph;
mod key;
mod store;

pub use coordinator::FetchCoordinator;
pub use key::CacheKey;
pub use store::{EntityCache, FetchResult, Snapshot};
