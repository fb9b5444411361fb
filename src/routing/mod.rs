//! Key Routing Module
//!
//! Decides, for every key, which cluster member is responsible for it.
//!
//! ## Mechanism
//! - **Ring**: `HashRing` maps keys to owner URLs via consistent hashing
//!   with virtual nodes. Immutable after construction, identical on every
//!   node given the same peer list.
//! - **Dispatch**: `Dispatcher` combines the ring with the cached peer
//!   health view to produce a `Route` (serve locally or call a peer),
//!   falling back to the least-loaded healthy peer when the primary owner
//!   is down.

pub mod dispatcher;
pub mod ring;
