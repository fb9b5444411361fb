//! Cache Wire Protocol
//!
//! Endpoint paths and response DTOs shared by the inbound handlers, the
//! outbound peer client and the health probe. The internal endpoints are
//! the peer-to-peer half of the contract: they operate strictly on the
//! receiving node's local store and never re-route.

use serde::{Deserialize, Serialize};

use crate::peers::stats::PeerStatsSnapshot;

// --- Endpoints ---

/// Liveness endpoint; also the target of the background health probe.
pub const ENDPOINT_HEALTH: &str = "/health";
/// Node statistics snapshot.
pub const ENDPOINT_STATS: &str = "/stats";
/// Internal endpoint for a single-key read from the local store.
pub const ENDPOINT_INTERNAL_GET: &str = "/internal/get";
/// Internal endpoint for applying a batch of writes to the local store.
pub const ENDPOINT_INTERNAL_SET: &str = "/internal/set";
/// Internal endpoint for a single-key delete from the local store.
pub const ENDPOINT_INTERNAL_DELETE: &str = "/internal/delete";

// --- DTOs ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node: String,
}

/// Point-in-time snapshot served by `/stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub node: String,
    pub timestamp_ms: u64,
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub rate_window_count: u32,
    pub peers: Vec<PeerStatsSnapshot>,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}
