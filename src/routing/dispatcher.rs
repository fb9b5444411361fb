//! Request Dispatcher
//!
//! Resolves every key to a destination: the local store or a peer URL.
//! Consults only the cached health view maintained by the background
//! probe; it never issues a probe inline, so request handling stays free
//! of extra round-trips.

use std::sync::Arc;

use anyhow::Result;

use super::ring::HashRing;
use crate::config::Config;
use crate::peers::stats::PeerStatTable;

/// Where a key's operation should execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The local node owns the key.
    Local,
    /// The key belongs to the peer at this URL.
    Remote(String),
}

pub struct Dispatcher {
    ring: HashRing,
    stats: Arc<PeerStatTable>,
    self_url: String,
    first_peer: Option<String>,
}

impl Dispatcher {
    pub fn new(config: &Config, stats: Arc<PeerStatTable>) -> Self {
        Self {
            ring: HashRing::new(&config.peers, config.virtual_nodes),
            stats,
            self_url: config.self_url.clone(),
            first_peer: config.peers.first().cloned(),
        }
    }

    /// Picks the destination for `key`.
    ///
    /// 1. The ring's primary owner, if it is this node, routes locally.
    /// 2. A healthy primary is used as-is.
    /// 3. Otherwise the least-loaded healthy peer takes over, with the
    ///    first configured peer as the fallback of last resort.
    ///
    /// A fallback that resolves to this node routes locally; serving from
    /// the local store beats issuing an RPC to ourselves.
    pub fn route(&self, key: &str) -> Result<Route> {
        let primary = self
            .ring
            .owner_of(key)
            .ok_or_else(|| anyhow::anyhow!("hash ring is empty"))?;

        if primary == self.self_url {
            return Ok(Route::Local);
        }

        if self.stats.is_healthy(primary) {
            return Ok(Route::Remote(primary.to_string()));
        }

        let fallback = self
            .stats
            .pick_least_loaded()
            .or_else(|| self.first_peer.clone())
            .ok_or_else(|| anyhow::anyhow!("no peers configured"))?;

        tracing::debug!(
            "Primary owner {} unhealthy for key {}, falling back to {}",
            primary,
            key,
            fallback
        );

        if fallback == self.self_url {
            return Ok(Route::Local);
        }

        Ok(Route::Remote(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEER_1: &str = "http://cache-server-1:9527";
    const PEER_2: &str = "http://cache-server-2:9528";
    const PEER_3: &str = "http://cache-server-3:9529";

    fn config_with_peers(self_url: &str, peers: &[&str]) -> Config {
        let mut config = Config::for_port(9527);
        config.self_url = self_url.to_string();
        config.peers = peers.iter().map(|p| p.to_string()).collect();
        config
    }

    // Ownership in the reference ring is deterministic, so tests can rely
    // on concrete keys: item-13 -> peer 1, item-10 -> peer 2, item-0 -> peer 3.

    #[test]
    fn test_local_key_routes_local() {
        let config = config_with_peers(PEER_1, &[PEER_1, PEER_2, PEER_3]);
        let stats = Arc::new(PeerStatTable::new(&config.peers));
        let dispatcher = Dispatcher::new(&config, stats);

        assert_eq!(dispatcher.route("item-13").unwrap(), Route::Local);
    }

    #[test]
    fn test_remote_key_routes_to_healthy_primary() {
        let config = config_with_peers(PEER_1, &[PEER_1, PEER_2, PEER_3]);
        let stats = Arc::new(PeerStatTable::new(&config.peers));
        let dispatcher = Dispatcher::new(&config, stats);

        assert_eq!(
            dispatcher.route("item-10").unwrap(),
            Route::Remote(PEER_2.to_string())
        );
    }

    #[test]
    fn test_unhealthy_primary_falls_back_to_least_loaded() {
        let config = config_with_peers(PEER_1, &[PEER_1, PEER_2, PEER_3]);
        let stats = Arc::new(PeerStatTable::new(&config.peers));
        stats.mark_healthy(PEER_2, false);
        // Load up self so the idle third peer wins the fallback.
        stats.record(PEER_1, 50, true);
        let dispatcher = Dispatcher::new(&config, stats);

        assert_eq!(
            dispatcher.route("item-10").unwrap(),
            Route::Remote(PEER_3.to_string())
        );
    }

    #[test]
    fn test_fallback_to_self_routes_local() {
        let config = config_with_peers(PEER_1, &[PEER_1, PEER_2]);
        let stats = Arc::new(PeerStatTable::new(&config.peers));
        stats.mark_healthy(PEER_2, false);
        let dispatcher = Dispatcher::new(&config, stats);

        // item-10 belongs to peer 2 in the two-node ring as well; with
        // peer 2 down the only healthy member left is this node.
        assert_eq!(dispatcher.route("item-10").unwrap(), Route::Local);
    }

    #[test]
    fn test_empty_ring_is_an_error() {
        let config = config_with_peers(PEER_1, &[]);
        let stats = Arc::new(PeerStatTable::new(&config.peers));
        let dispatcher = Dispatcher::new(&config, stats);

        assert!(dispatcher.route("anything").is_err());
    }
}
