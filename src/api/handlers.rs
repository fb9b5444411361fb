//! Ingress API Handlers
//!
//! Translate HTTP requests into store operations and peer RPCs. The
//! client-facing handlers pass the rate gate, ask the dispatcher where
//! each key lives and either touch the local store or call the owning
//! peer. The internal handlers are what those peer calls land on: they
//! operate strictly on the local store and never re-route.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use axum::body::Bytes;
use axum::extract::{Extension, Path};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use regex::Regex;
use serde_json::{Map, Value};
use sysinfo::System;

use super::error::ApiError;
use super::protocol::{HealthResponse, StatsResponse};
use super::rate_limit::RateLimiter;
use crate::config::Config;
use crate::peers::client::PeerClient;
use crate::peers::stats::{now_ms, PeerStatTable};
use crate::routing::dispatcher::{Dispatcher, Route};
use crate::store::lru::LruStore;

static KEY_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Keys are non-empty, URL-safe and contain no `/`.
fn valid_key(key: &str) -> bool {
    let pattern = KEY_PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9._~!$&'()*+,;=:@-]+$").unwrap());
    pattern.is_match(key)
}

fn ok_body() -> Response {
    ([(header::CONTENT_TYPE, "application/json")], "OK").into_response()
}

/// POST `/` — batched client write.
///
/// Entries are bucketed by owner: the local subset is applied in one
/// critical section, then each remote owner receives a single batched
/// RPC. The first remote failure aborts with 500; already-applied
/// entries stay (cross-owner batches are not transactional).
pub async fn handle_set_batch(
    Extension(limiter): Extension<Arc<RateLimiter>>,
    Extension(store): Extension<Arc<LruStore>>,
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Extension(peers): Extension<Arc<PeerClient>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if !limiter.try_acquire() {
        return Err(ApiError::RateLimited);
    }
    if body.is_empty() {
        return Err(ApiError::invalid("Empty request body"));
    }

    let entries: Map<String, Value> = serde_json::from_slice(&body)
        .map_err(|e| ApiError::invalid(format!("Bad request: {}", e)))?;

    let mut local: Vec<(String, Value)> = Vec::new();
    let mut remote: HashMap<String, Map<String, Value>> = HashMap::new();

    for (key, value) in entries {
        if !valid_key(&key) {
            return Err(ApiError::invalid(format!("Invalid key: {}", key)));
        }
        match dispatcher
            .route(&key)
            .map_err(|e| ApiError::internal(e.to_string()))?
        {
            Route::Local => local.push((key, value)),
            Route::Remote(owner) => {
                remote.entry(owner).or_default().insert(key, value);
            }
        }
    }

    if !local.is_empty() {
        store.set_many(local);
    }

    for (owner, batch) in &remote {
        peers.set_batch(owner, batch).await.map_err(|e| {
            ApiError::Upstream {
                message: format!("batched set to {} failed: {}", owner, e),
            }
        })?;
    }

    Ok(ok_body())
}

/// GET `/{key}` — single read, served locally or fetched from the owner.
pub async fn handle_get(
    Extension(limiter): Extension<Arc<RateLimiter>>,
    Extension(store): Extension<Arc<LruStore>>,
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Extension(peers): Extension<Arc<PeerClient>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    if !limiter.try_acquire() {
        return Err(ApiError::RateLimited);
    }
    if !valid_key(&key) {
        return Err(ApiError::invalid("Invalid request"));
    }

    let route = dispatcher
        .route(&key)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let value = match route {
        Route::Local => store.get(&key),
        Route::Remote(owner) => peers.get(&owner, &key).await,
    };

    match value {
        Some(value) => {
            let mut body = Map::new();
            body.insert(key, value);
            Ok(Json(Value::Object(body)).into_response())
        }
        None => Err(ApiError::NotFound),
    }
}

/// DELETE `/{key}` — single delete. The body is the literal number of
/// removed entries, `0` or `1`; remote failures degrade to `0`.
pub async fn handle_delete(
    Extension(limiter): Extension<Arc<RateLimiter>>,
    Extension(store): Extension<Arc<LruStore>>,
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Extension(peers): Extension<Arc<PeerClient>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    if !limiter.try_acquire() {
        return Err(ApiError::RateLimited);
    }
    if !valid_key(&key) {
        return Err(ApiError::invalid("Invalid request"));
    }

    let route = dispatcher
        .route(&key)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let deleted: u64 = match route {
        Route::Local => u64::from(store.delete(&key)),
        Route::Remote(owner) => peers.delete(&owner, &key).await,
    };

    Ok(Json(deleted).into_response())
}

/// GET `/health` — always 200; never rate limited.
pub async fn handle_health(Extension(config): Extension<Arc<Config>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        node: config.node_id.clone(),
    })
}

/// GET `/stats` — node snapshot; never rate limited.
pub async fn handle_stats(
    Extension(config): Extension<Arc<Config>>,
    Extension(store): Extension<Arc<LruStore>>,
    Extension(limiter): Extension<Arc<RateLimiter>>,
    Extension(stats): Extension<Arc<PeerStatTable>>,
) -> Json<StatsResponse> {
    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo reports memory in bytes.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(StatsResponse {
        node: config.node_id.clone(),
        timestamp_ms: now_ms(),
        cache_entries: store.len(),
        cache_capacity: store.capacity(),
        rate_window_count: limiter.current_count(),
        peers: stats.snapshot(),
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}

/// GET `/internal/get/{key}` — local-store read for sibling nodes.
pub async fn handle_get_internal(
    Extension(store): Extension<Arc<LruStore>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    match store.get(&key) {
        Some(value) => Ok(Json(value).into_response()),
        None => Err(ApiError::NotFound),
    }
}

/// POST `/internal/set` — applies a forwarded batch to the local store.
pub async fn handle_set_internal(
    Extension(store): Extension<Arc<LruStore>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let entries: Map<String, Value> = serde_json::from_slice(&body)
        .map_err(|e| ApiError::invalid(format!("Bad request: {}", e)))?;

    store.set_many(entries);
    Ok(ok_body())
}

/// DELETE `/internal/delete/{key}` — local-store delete for sibling nodes.
pub async fn handle_delete_internal(
    Extension(store): Extension<Arc<LruStore>>,
    Path(key): Path<String>,
) -> Response {
    let deleted = u8::from(store.delete(&key));
    Json(deleted).into_response()
}
