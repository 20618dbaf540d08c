use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

use crate::config;
use crate::error::ApiError;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Per-client token buckets. Each client may burst `capacity` requests and
/// regains the full budget over one window.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(requests: u32, window: Duration) -> Self {
        let capacity = f64::from(requests.max(1));
        let window = window.max(Duration::from_millis(1));
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity,
            refill_per_sec: capacity / window.as_secs_f64(),
            window,
        }
    }

    /// `None` when rate limiting is switched off.
    pub fn from_config() -> Option<Arc<Self>> {
        let api = &config::config().api;
        if !api.enable_rate_limiting {
            return None;
        }
        Some(Arc::new(Self::new(api.rate_limit_requests, Duration::from_secs(api.rate_limit_window_secs))))
    }

    pub async fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now()).await
    }

    async fn allow_at(&self, client: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().await;

        // A bucket idle for a whole window is full again; forgetting it is lossless.
        let window = self.window;
        buckets.retain(|_, b| now.saturating_duration_since(b.last_refill) < window);

        let bucket = buckets
            .entry(client.to_string())
            .or_insert_with(|| Bucket { tokens: self.capacity, last_refill: now });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub async fn tracked_clients(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

/// Rejects a client that has spent its budget with 429 before any routing.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0);
    let client = client_key(request.headers(), peer);

    if !limiter.allow(&client).await {
        tracing::warn!(client = %client, "rate limit exceeded");
        return ApiError::too_many_requests("Rate limit exceeded. Too many requests.").into_response();
    }

    next.run(request).await
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`, then the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    forwarded_ip(headers, "x-forwarded-for")
        .or_else(|| forwarded_ip(headers, "x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_ip(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() || first.len() > 64 {
        return None;
    }
    if first.bytes().all(|b| b.is_ascii_hexdigit() || b == b'.' || b == b':') {
        Some(first.to_string())
    } else {
        None
    }
}
