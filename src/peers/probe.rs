//! Background Health Probe
//!
//! Every probe interval, each configured peer (self excluded) gets a GET
//! `/health` with a short budget. Outcomes flow into the stat table and
//! set the peer's healthy flag; probe failures never surface to request
//! handling, which reads only the cached view.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use super::client::PeerClientPool;
use super::stats::PeerStatTable;
use crate::api::protocol::ENDPOINT_HEALTH;
use crate::config::Config;

/// Spawns the probe loop. Runs for the lifetime of the process; probes to
/// different peers within a round proceed concurrently.
pub fn spawn(config: Arc<Config>, pool: Arc<PeerClientPool>, stats: Arc<PeerStatTable>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.probe_interval);

        loop {
            interval.tick().await;

            for peer in &config.peers {
                if *peer == config.self_url {
                    continue;
                }
                tokio::spawn(probe_peer(
                    peer.clone(),
                    config.clone(),
                    pool.clone(),
                    stats.clone(),
                ));
            }
        }
    });
}

async fn probe_peer(
    peer: String,
    config: Arc<Config>,
    pool: Arc<PeerClientPool>,
    stats: Arc<PeerStatTable>,
) {
    let started = Instant::now();
    let ok = match check_health(&peer, &config, &pool).await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::debug!("Health probe to {} failed: {}", peer, e);
            false
        }
    };
    let elapsed = started.elapsed().as_millis() as u64;

    stats.record(&peer, elapsed, ok);
    stats.mark_healthy(&peer, ok);

    if !ok {
        tracing::warn!("Peer {} marked unhealthy", peer);
    }
}

async fn check_health(peer: &str, config: &Config, pool: &PeerClientPool) -> Result<bool> {
    let client = pool.client_for(peer)?;
    let response = client
        .get(format!("{}{}", peer, ENDPOINT_HEALTH))
        .timeout(config.probe_timeout)
        .send()
        .await?;

    Ok(response.status().is_success())
}
