//! Consistent Hash Ring
//!
//! Deterministically maps keys to owning node URLs. Each peer contributes
//! a fixed number of virtual positions so that keys spread evenly and all
//! nodes compute the exact same ownership independently.

use std::collections::BTreeMap;

/// Ordered ring of hash positions to node URLs.
///
/// Built once at startup from the configured peer list and never mutated
/// afterwards; lookups take a shared reference only.
pub struct HashRing {
    ring: BTreeMap<u32, String>,
}

impl HashRing {
    /// Inserts `virtual_nodes` positions per peer, hashing `"{peer}#{i}"`.
    /// Position collisions resolve last-writer-wins in insertion order.
    pub fn new(peers: &[String], virtual_nodes: usize) -> Self {
        let mut ring = BTreeMap::new();
        for peer in peers {
            for i in 0..virtual_nodes {
                let position = hash32(&format!("{}#{}", peer, i));
                ring.insert(position, peer.clone());
            }
        }
        Self { ring }
    }

    /// Returns the URL owning `key`: the smallest ring position at or
    /// after the key's hash, wrapping to the ring's first position.
    /// `None` only when the ring is empty.
    pub fn owner_of(&self, key: &str) -> Option<&str> {
        if self.ring.is_empty() {
            return None;
        }
        let position = hash32(key);
        self.ring
            .range(position..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, addr)| addr.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }
}

const FNV_OFFSET: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Stable 32-bit FNV-1a hash.
///
/// Part of the wire contract: all nodes must agree on this function, or
/// they disagree on key ownership. Not cryptographic; collisions between
/// virtual positions silently overwrite, which is acceptable for cache
/// sharding with a non-adversarial keyspace.
pub fn hash32(input: &str) -> u32 {
    input.bytes().fold(FNV_OFFSET, |h, b| {
        (h ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_peers() -> Vec<String> {
        vec![
            "http://cache-server-1:9527".to_string(),
            "http://cache-server-2:9528".to_string(),
            "http://cache-server-3:9529".to_string(),
        ]
    }

    #[test]
    fn test_hash32_is_stable() {
        assert_eq!(hash32("a"), 3_826_002_220);
        assert_eq!(hash32("ab"), 1_294_271_946);
        assert_eq!(hash32("user:42"), hash32("user:42"));
    }

    #[test]
    fn test_owner_is_deterministic_across_rings() {
        // Two rings built from the same peer list must agree on every key.
        let ring_a = HashRing::new(&three_peers(), 150);
        let ring_b = HashRing::new(&three_peers(), 150);

        for i in 0..500 {
            let key = format!("key_{}", i);
            assert_eq!(ring_a.owner_of(&key), ring_b.owner_of(&key));
        }
    }

    #[test]
    fn test_owner_is_a_configured_peer() {
        let peers = three_peers();
        let ring = HashRing::new(&peers, 150);

        for i in 0..200 {
            let key = format!("item-{}", i);
            let owner = ring.owner_of(&key).unwrap();
            assert!(peers.iter().any(|p| p == owner));
        }
    }

    #[test]
    fn test_keys_spread_over_all_peers() {
        let peers = three_peers();
        let ring = HashRing::new(&peers, 150);

        let mut counts = std::collections::HashMap::new();
        for i in 0..3000 {
            let key = format!("doc_{}", i);
            *counts.entry(ring.owner_of(&key).unwrap().to_string()).or_insert(0usize) += 1;
        }

        assert_eq!(counts.len(), peers.len(), "every peer should own some keys");
        for (peer, count) in counts {
            assert!(count > 300, "peer {} owns too few keys: {}", peer, count);
        }
    }

    #[test]
    fn test_empty_ring_has_no_owner() {
        let ring = HashRing::new(&[], 150);
        assert!(ring.is_empty());
        assert_eq!(ring.owner_of("anything"), None);
    }

    #[test]
    fn test_single_peer_owns_everything() {
        let peers = vec!["http://cache-server-1:9527".to_string()];
        let ring = HashRing::new(&peers, 150);
        assert_eq!(ring.len(), 150);

        for i in 0..100 {
            assert_eq!(ring.owner_of(&format!("k{}", i)), Some(peers[0].as_str()));
        }
    }
}
