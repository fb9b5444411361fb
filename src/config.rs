//! Node Configuration
//!
//! One explicit record holding every tunable the node needs: identity,
//! peer set, cache bound, rate-limit budget and network timeouts. Built
//! once in `main` and threaded into each component at construction so
//! nothing reads configuration ambiently.

use std::time::Duration;

/// Port of the first node in the reference topology, minus one.
/// `http://cache-server-{port - PORT_BASE}:{port}` names the local node.
const PORT_BASE: u16 = 9526;

/// Virtual positions each peer contributes to the hash ring.
/// Part of the wire contract: every node in a cluster must use the same value.
const VIRTUAL_NODES: usize = 150;

/// Maximum number of entries held by the local LRU store.
const CACHE_CAPACITY: usize = 10_000;

/// Client-facing requests admitted per rate window.
const RATE_LIMIT_MAX: u32 = 1000;

/// Peer addresses of the reference three-node cluster.
const DEFAULT_PEERS: [&str; 3] = [
    "http://cache-server-1:9527",
    "http://cache-server-2:9528",
    "http://cache-server-3:9529",
];

/// Runtime configuration for a single cache node.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the HTTP server listens on.
    pub port: u16,
    /// Node identity reported by `/health` and `/stats`.
    pub node_id: String,
    /// Canonical URL of this node, compared against ring owners.
    pub self_url: String,
    /// All cluster members, self included. Order matters: the first entry
    /// is the fallback of last resort when no peer is healthy.
    pub peers: Vec<String>,
    pub virtual_nodes: usize,
    pub cache_capacity: usize,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub connect_timeout: Duration,
    pub rpc_timeout: Duration,
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
}

impl Config {
    /// Builds the configuration for a node listening on `port`.
    ///
    /// The peer set and self URL default to the reference Docker topology
    /// (`cache-server-{1,2,3}`) and can be overridden with the
    /// `CACHE_PEERS` (comma-separated URLs) and `CACHE_SELF_URL`
    /// environment variables.
    pub fn for_port(port: u16) -> Self {
        let peers = std::env::var("CACHE_PEERS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|addr| addr.trim().trim_end_matches('/').to_string())
                    .filter(|addr| !addr.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|peers| !peers.is_empty())
            .unwrap_or_else(|| DEFAULT_PEERS.iter().map(|addr| addr.to_string()).collect());

        let self_url = std::env::var("CACHE_SELF_URL").unwrap_or_else(|_| {
            format!(
                "http://cache-server-{}:{}",
                port as i32 - PORT_BASE as i32,
                port
            )
        });

        Self {
            port,
            node_id: format!("node{}", port),
            self_url,
            peers,
            virtual_nodes: VIRTUAL_NODES,
            cache_capacity: CACHE_CAPACITY,
            rate_limit_max: RATE_LIMIT_MAX,
            rate_limit_window: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(2),
            rpc_timeout: Duration::from_secs(5),
            probe_interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_identity_derived_from_port() {
        let config = Config::for_port(9527);
        assert_eq!(config.node_id, "node9527");
        assert_eq!(config.self_url, "http://cache-server-1:9527");
    }

    #[test]
    fn test_reference_cluster_defaults() {
        let config = Config::for_port(9528);
        assert_eq!(config.peers.len(), 3);
        assert!(config.peers.contains(&config.self_url));
        assert_eq!(config.cache_capacity, 10_000);
        assert_eq!(config.rate_limit_max, 1000);
        assert_eq!(config.virtual_nodes, 150);
    }
}
