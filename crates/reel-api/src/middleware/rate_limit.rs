//! # Per-Client Rate Limiting
//!
//! Token-bucket admission control keyed by client address. Each client gets
//! a bucket with a configurable sustained rate and burst capacity; a
//! background sweeper evicts clients idle beyond a staleness window so the
//! table cannot grow without bound.
//!
//! State is process-local and lost on restart by design — this is a soft
//! admission-control heuristic, not a durable ledger.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::error::ApiError;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Master switch. Disabled means every request is admitted, for trusted
    /// internal deployments.
    pub enabled: bool,
    /// Sustained refill rate, tokens per second.
    pub rps: f64,
    /// Bucket capacity; new clients start full.
    pub burst: u32,
    /// Clients idle longer than this are evicted by the sweeper.
    pub idle_after: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rps: 2.0,
            burst: 5,
            idle_after: Duration::from_secs(180),
        }
    }
}

#[derive(Debug)]
struct ClientBucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

/// Shared per-client limiter table. Cheap to clone; all clones share the
/// same table.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: Arc<Mutex<HashMap<String, ClientBucket>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Admit or deny one request from `key`.
    pub fn admit(&self, key: &str) -> bool {
        self.admit_at(key, Instant::now())
    }

    // The whole check-or-create-and-consume sequence runs under the one
    // mutex so the sweeper can never observe a partial update.
    fn admit_at(&self, key: &str, now: Instant) -> bool {
        if !self.config.enabled {
            return true;
        }
        let burst = f64::from(self.config.burst);
        let mut clients = self.clients.lock();
        let bucket = clients.entry(key.to_string()).or_insert(ClientBucket {
            tokens: burst,
            last_refill: now,
            last_seen: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.config.rps).min(burst);
        bucket.last_refill = now;
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Evict clients idle beyond the staleness window.
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    fn sweep_at(&self, now: Instant) {
        let idle_after = self.config.idle_after;
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) <= idle_after);
        let evicted = before - clients.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = clients.len(), "rate limiter sweep");
        }
    }

    /// Start the background sweeper, ticking every `interval`. The handle is
    /// returned so callers can abort it in tests; in the binary it lives for
    /// the life of the process.
    pub fn start_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a sweep only ever
            // happens a full interval after startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        })
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}

/// Middleware enforcing the limiter. Denial short-circuits with 429.
pub async fn enforce(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let key = client_key(&request);
        if !limiter.admit(&key) {
            return ApiError::RateLimited.into_response();
        }
    }
    next.run(request).await
}

/// The client key for admission control: the first `X-Forwarded-For` entry
/// when present, else the peer socket address, else `"unknown"`.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    use super::*;

    fn limiter(rps: f64, burst: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            enabled: true,
            rps,
            burst,
            idle_after: Duration::from_secs(180),
        })
    }

    #[test]
    fn burst_then_deny_then_refill() {
        // Rate 2/sec, burst 5: five immediate admits, the sixth denied.
        let limiter = limiter(2.0, 5);
        let start = Instant::now();

        for _ in 0..5 {
            assert!(limiter.admit_at("10.0.0.5", start));
        }
        assert!(!limiter.admit_at("10.0.0.5", start), "6th must be denied");

        // One second later two tokens have refilled: exactly two admits.
        let later = start + Duration::from_secs(1);
        assert!(limiter.admit_at("10.0.0.5", later));
        assert!(limiter.admit_at("10.0.0.5", later));
        assert!(!limiter.admit_at("10.0.0.5", later));
    }

    #[test]
    fn one_token_refills_after_one_interval() {
        let limiter = limiter(1.0, 2);
        let start = Instant::now();
        assert!(limiter.admit_at("c", start));
        assert!(limiter.admit_at("c", start));
        assert!(!limiter.admit_at("c", start));

        let later = start + Duration::from_secs(1);
        assert!(limiter.admit_at("c", later));
        assert!(!limiter.admit_at("c", later));
    }

    #[test]
    fn clients_are_independent() {
        let limiter = limiter(2.0, 1);
        let now = Instant::now();
        assert!(limiter.admit_at("a", now));
        assert!(!limiter.admit_at("a", now));
        assert!(limiter.admit_at("b", now));
    }

    #[test]
    fn tokens_never_exceed_burst() {
        let limiter = limiter(10.0, 3);
        let start = Instant::now();
        assert!(limiter.admit_at("c", start));

        // A long idle period must not accumulate more than `burst` tokens.
        let much_later = start + Duration::from_secs(3600);
        for _ in 0..3 {
            assert!(limiter.admit_at("c", much_later));
        }
        assert!(!limiter.admit_at("c", much_later));
    }

    #[test]
    fn disabled_limiter_always_admits() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            rps: 1.0,
            burst: 1,
            idle_after: Duration::from_secs(180),
        });
        let now = Instant::now();
        for _ in 0..100 {
            assert!(limiter.admit_at("c", now));
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn sweeper_evicts_idle_clients_and_resets_first_contact() {
        let limiter = limiter(2.0, 1);
        let start = Instant::now();
        assert!(limiter.admit_at("10.0.0.5", start));
        assert!(!limiter.admit_at("10.0.0.5", start));
        assert_eq!(limiter.tracked_clients(), 1);

        // Idle past the 3-minute staleness window.
        let later = start + Duration::from_secs(240);
        limiter.sweep_at(later);
        assert_eq!(limiter.tracked_clients(), 0);

        // Next request is first contact again: fresh bucket at full burst.
        assert!(limiter.admit_at("10.0.0.5", later));
    }

    #[test]
    fn sweeper_keeps_recently_seen_clients() {
        let limiter = limiter(2.0, 5);
        let start = Instant::now();
        assert!(limiter.admit_at("fresh", start + Duration::from_secs(100)));
        assert!(limiter.admit_at("stale", start));

        limiter.sweep_at(start + Duration::from_secs(240));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    // ── Middleware ────────────────────────────────────────────────

    fn test_app(limiter: RateLimiter) -> Router {
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(from_fn(enforce))
            .layer(Extension(limiter))
    }

    #[tokio::test]
    async fn denial_short_circuits_with_429() {
        let app = test_app(limiter(1.0, 1));

        let first = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri("/test")
                    .header("X-Forwarded-For", "10.0.0.5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/test")
                    .header("X-Forwarded-For", "10.0.0.5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn forwarded_header_takes_first_entry() {
        let request = HttpRequest::builder()
            .uri("/test")
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "203.0.113.7");
    }

    #[tokio::test]
    async fn missing_client_information_falls_back_to_unknown() {
        let request = HttpRequest::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "unknown");
    }
}
