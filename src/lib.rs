//! Sharded Cache Cluster Node Library
//!
//! This library crate defines the core modules of a single cache node.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The node is composed of four loosely coupled subsystems:
//!
//! - **`api`**: The HTTP ingress. Client-facing cache endpoints, the
//!   internal peer-to-peer endpoints, rate limiting and response shaping.
//! - **`peers`**: Everything about sibling nodes: per-peer statistics and
//!   health, the outbound client pool with its RPC operations, and the
//!   background health probe.
//! - **`routing`**: The consistent-hash ring mapping keys to owners, and
//!   the dispatcher that turns ownership plus peer health into a routing
//!   decision.
//! - **`store`**: The bounded local LRU map from string keys to JSON
//!   values.
//!
//! `config` carries every tunable in one explicit record threaded into the
//! components at construction.

pub mod api;
pub mod config;
pub mod peers;
pub mod routing;
pub mod store;
