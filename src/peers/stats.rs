//! Peer Stat Table
//!
//! One record per configured peer (self included), created at startup and
//! kept for the process lifetime. Records live in a sharded concurrent
//! map; holding a reference to one record pins its shard, so a health
//! check reads all of its criteria as one coherent snapshot instead of a
//! lattice of individually-atomic counters that could tear.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;

/// A peer whose error rate reaches this fraction is considered unhealthy.
const MAX_ERROR_RATE: f64 = 0.3;
/// A peer whose average latency reaches this is considered unhealthy.
const MAX_AVG_LATENCY_MS: f64 = 1000.0;
/// A peer not observed within this window is considered unhealthy.
const STALE_AFTER: Duration = Duration::from_secs(30);

pub struct PeerStatTable {
    records: DashMap<String, PeerRecord>,
}

#[derive(Debug, Clone)]
struct PeerRecord {
    requests: u64,
    successes: u64,
    errors: u64,
    total_latency_ms: u64,
    avg_latency_ms: f64,
    healthy: bool,
    last_seen: Instant,
    last_seen_unix_ms: u64,
}

impl PeerRecord {
    fn new() -> Self {
        // Peers start healthy with a fresh observation so the cluster
        // serves traffic before the first probe round completes.
        Self {
            requests: 0,
            successes: 0,
            errors: 0,
            total_latency_ms: 0,
            avg_latency_ms: 0.0,
            healthy: true,
            last_seen: Instant::now(),
            last_seen_unix_ms: now_ms(),
        }
    }

    fn error_rate(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.errors as f64 / self.requests as f64
    }

    fn is_healthy(&self) -> bool {
        self.healthy
            && self.error_rate() < MAX_ERROR_RATE
            && self.avg_latency_ms < MAX_AVG_LATENCY_MS
            && self.last_seen.elapsed() <= STALE_AFTER
    }

    /// Load score used to pick a fallback owner: lower is better.
    fn score(&self) -> f64 {
        self.avg_latency_ms + 1000.0 * self.error_rate() + 0.1 * self.requests as f64
    }
}

/// Serializable per-peer view for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PeerStatsSnapshot {
    pub addr: String,
    pub requests: u64,
    pub successes: u64,
    pub errors: u64,
    pub avg_latency_ms: f64,
    pub healthy: bool,
    pub last_seen_ms: u64,
}

impl PeerStatTable {
    pub fn new(peers: &[String]) -> Self {
        let records = DashMap::new();
        for peer in peers {
            records.insert(peer.clone(), PeerRecord::new());
        }
        Self { records }
    }

    /// Folds one observed RPC or probe outcome into the peer's record.
    pub fn record(&self, peer: &str, latency_ms: u64, success: bool) {
        let mut record = match self.records.get_mut(peer) {
            Some(record) => record,
            None => {
                tracing::debug!("Observation for unknown peer {}", peer);
                return;
            }
        };

        record.requests += 1;
        if success {
            record.successes += 1;
        } else {
            record.errors += 1;
        }
        record.total_latency_ms += latency_ms;
        record.avg_latency_ms = record.total_latency_ms as f64 / record.requests as f64;
        record.last_seen = Instant::now();
        record.last_seen_unix_ms = now_ms();
    }

    pub fn mark_healthy(&self, peer: &str, healthy: bool) {
        if let Some(mut record) = self.records.get_mut(peer) {
            record.healthy = healthy;
        }
    }

    /// True iff the peer's flag is set, its error rate and average latency
    /// are inside bounds, and it was observed recently. Reads one coherent
    /// record snapshot.
    pub fn is_healthy(&self, peer: &str) -> bool {
        self.records
            .get(peer)
            .map(|record| record.is_healthy())
            .unwrap_or(false)
    }

    /// The healthy peer with the lowest load score, or `None` if no peer
    /// is healthy. Ties keep the first candidate seen.
    pub fn pick_least_loaded(&self) -> Option<String> {
        let mut best: Option<(String, f64)> = None;

        for entry in self.records.iter() {
            if !entry.value().is_healthy() {
                continue;
            }
            let score = entry.value().score();
            let better = match &best {
                Some((_, best_score)) => score < *best_score,
                None => true,
            };
            if better {
                best = Some((entry.key().clone(), score));
            }
        }

        best.map(|(peer, _)| peer)
    }

    /// Point-in-time view of every record, sorted by address for stable
    /// output.
    pub fn snapshot(&self) -> Vec<PeerStatsSnapshot> {
        let mut peers: Vec<PeerStatsSnapshot> = self
            .records
            .iter()
            .map(|entry| PeerStatsSnapshot {
                addr: entry.key().clone(),
                requests: entry.value().requests,
                successes: entry.value().successes,
                errors: entry.value().errors,
                avg_latency_ms: entry.value().avg_latency_ms,
                healthy: entry.value().is_healthy(),
                last_seen_ms: entry.value().last_seen_unix_ms,
            })
            .collect();
        peers.sort_by(|a, b| a.addr.cmp(&b.addr));
        peers
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
