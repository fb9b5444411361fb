use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::{middleware, Extension, Router};
use cache_cluster::api;
use cache_cluster::api::handlers::{
    handle_delete, handle_delete_internal, handle_get, handle_get_internal, handle_health,
    handle_set_batch, handle_set_internal, handle_stats,
};
use cache_cluster::api::protocol::{
    ENDPOINT_HEALTH, ENDPOINT_INTERNAL_DELETE, ENDPOINT_INTERNAL_GET, ENDPOINT_INTERNAL_SET,
    ENDPOINT_STATS,
};
use cache_cluster::api::rate_limit::RateLimiter;
use cache_cluster::config::Config;
use cache_cluster::peers::client::{PeerClient, PeerClientPool};
use cache_cluster::peers::probe;
use cache_cluster::peers::stats::PeerStatTable;
use cache_cluster::routing::dispatcher::Dispatcher;
use cache_cluster::store::lru::LruStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <port>", args[0]);
        eprintln!("Example: {} 9527", args[0]);
        std::process::exit(1);
    }

    let port: u16 = args[1].parse()?;
    let config = Arc::new(Config::for_port(port));

    tracing::info!(
        "Starting cache node {} on port {}",
        config.node_id,
        config.port
    );
    tracing::info!("Self URL: {}", config.self_url);
    tracing::info!("Cluster peers: {:?}", config.peers);

    // 1. Core components:
    let store = Arc::new(LruStore::new(config.cache_capacity));
    let stats = Arc::new(PeerStatTable::new(&config.peers));
    let dispatcher = Arc::new(Dispatcher::new(&config, stats.clone()));
    let pool = Arc::new(PeerClientPool::new(
        config.connect_timeout,
        config.rpc_timeout,
    ));
    let peer_client = Arc::new(PeerClient::new(pool.clone(), stats.clone()));
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max,
        config.rate_limit_window,
    ));

    // 2. HTTP router. Static paths take precedence over the `/:key`
    //    capture, so /health, /stats and /internal/* stay reachable.
    let app = Router::new()
        .route(ENDPOINT_HEALTH, get(handle_health))
        .route(ENDPOINT_STATS, get(handle_stats))
        .route(
            &format!("{}/:key", ENDPOINT_INTERNAL_GET),
            get(handle_get_internal),
        )
        .route(ENDPOINT_INTERNAL_SET, post(handle_set_internal))
        .route(
            &format!("{}/:key", ENDPOINT_INTERNAL_DELETE),
            delete(handle_delete_internal),
        )
        .route("/", post(handle_set_batch))
        .route("/:key", get(handle_get).delete(handle_delete))
        .layer(middleware::from_fn(api::cors))
        .layer(Extension(config.clone()))
        .layer(Extension(store.clone()))
        .layer(Extension(stats.clone()))
        .layer(Extension(dispatcher))
        .layer(Extension(peer_client))
        .layer(Extension(limiter));

    // 3. Background health probe:
    probe::spawn(config.clone(), pool, stats.clone());

    // 4. Periodic one-line summary:
    {
        let config = config.clone();
        let store = store.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            loop {
                interval.tick().await;
                let healthy = config
                    .peers
                    .iter()
                    .filter(|peer| stats.is_healthy(peer))
                    .count();
                tracing::info!(
                    "Node stats: {} cached entries, {}/{} healthy peers",
                    store.len(),
                    healthy,
                    config.peers.len()
                );
            }
        });
    }

    // 5. Serve:
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
