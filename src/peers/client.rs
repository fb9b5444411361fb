//! Outbound Peer Clients
//!
//! `PeerClientPool` keeps one reusable HTTP client per peer so that
//! connections are pooled across calls. `PeerClient` layers the internal
//! RPC operations on top and records every observed latency and outcome
//! into the stat table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use dashmap::DashMap;
use serde_json::{Map, Value};

use super::stats::PeerStatTable;
use crate::api::protocol::{ENDPOINT_INTERNAL_DELETE, ENDPOINT_INTERNAL_GET, ENDPOINT_INTERNAL_SET};

pub struct PeerClientPool {
    clients: DashMap<String, reqwest::Client>,
    connect_timeout: Duration,
    rpc_timeout: Duration,
}

impl PeerClientPool {
    pub fn new(connect_timeout: Duration, rpc_timeout: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            connect_timeout,
            rpc_timeout,
        }
    }

    /// Returns the cached client for `peer`, building it on first use.
    /// A transport failure invalidates the connection inside the client's
    /// pool, never the pool entry itself.
    pub fn client_for(&self, peer: &str) -> Result<reqwest::Client> {
        if let Some(client) = self.clients.get(peer) {
            return Ok(client.clone());
        }

        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.rpc_timeout)
            .build()?;

        // Two tasks may race to build; the entry API keeps exactly one.
        Ok(self
            .clients
            .entry(peer.to_string())
            .or_insert(client)
            .clone())
    }
}

pub struct PeerClient {
    pool: Arc<PeerClientPool>,
    stats: Arc<PeerStatTable>,
}

impl PeerClient {
    pub fn new(pool: Arc<PeerClientPool>, stats: Arc<PeerStatTable>) -> Self {
        Self { pool, stats }
    }

    /// Fetches a single value from `peer`'s local store.
    ///
    /// Any transport error, unexpected status or unparsable body degrades
    /// to `None`; the caller reports a plain miss. A 404 answer counts as
    /// a successful observation of the peer.
    pub async fn get(&self, peer: &str, key: &str) -> Option<Value> {
        let started = Instant::now();
        let result = self.try_get(peer, key).await;
        let elapsed = started.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                self.stats.record(peer, elapsed, true);
                value
            }
            Err(e) => {
                tracing::warn!("Remote get of {} from {} failed: {}", key, peer, e);
                self.stats.record(peer, elapsed, false);
                None
            }
        }
    }

    async fn try_get(&self, peer: &str, key: &str) -> Result<Option<Value>> {
        let client = self.pool.client_for(peer)?;
        let url = format!("{}{}/{}", peer, ENDPOINT_INTERNAL_GET, key);
        let response = client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("remote get failed: {}", response.status()));
        }

        match response.json::<Value>().await {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Unparsable peer body is treated as a miss, trading
                // visibility of peer bugs for availability.
                tracing::warn!("Unparsable value for {} from {}: {}", key, peer, e);
                Ok(None)
            }
        }
    }

    /// Pushes a whole owner-bucket of writes to `peer` in one call.
    /// Success iff the peer answered 2xx.
    pub async fn set_batch(&self, peer: &str, entries: &Map<String, Value>) -> Result<()> {
        let started = Instant::now();
        let result = self.try_set_batch(peer, entries).await;
        let elapsed = started.elapsed().as_millis() as u64;

        self.stats.record(peer, elapsed, result.is_ok());
        result
    }

    async fn try_set_batch(&self, peer: &str, entries: &Map<String, Value>) -> Result<()> {
        let client = self.pool.client_for(peer)?;
        let url = format!("{}{}", peer, ENDPOINT_INTERNAL_SET);
        let response = client.post(url).json(entries).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("remote set failed: {}", response.status()));
        }
        Ok(())
    }

    /// Deletes a key on `peer`, returning how many entries were removed.
    /// Failures degrade to 0 removals.
    pub async fn delete(&self, peer: &str, key: &str) -> u64 {
        let started = Instant::now();
        let result = self.try_delete(peer, key).await;
        let elapsed = started.elapsed().as_millis() as u64;

        match result {
            Ok(count) => {
                self.stats.record(peer, elapsed, true);
                count
            }
            Err(e) => {
                tracing::warn!("Remote delete of {} on {} failed: {}", key, peer, e);
                self.stats.record(peer, elapsed, false);
                0
            }
        }
    }

    async fn try_delete(&self, peer: &str, key: &str) -> Result<u64> {
        let client = self.pool.client_for(peer)?;
        let url = format!("{}{}/{}", peer, ENDPOINT_INTERNAL_DELETE, key);
        let response = client.delete(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "remote delete failed: {}",
                response.status()
            ));
        }

        let body = response.text().await?;
        Ok(body.trim().parse::<u64>().unwrap_or(0))
    }
}
