//! Request-level counters surfaced by the `/debug/vars` endpoint.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use serde::Serialize;

/// Process-wide request counters. Cheap to clone; all clones share the same
/// counters.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    requests_received: AtomicU64,
    responses_sent: AtomicU64,
    processing_time_us: AtomicU64,
    responses_by_status: Mutex<BTreeMap<u16, u64>>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub requests_received: u64,
    pub responses_sent: u64,
    pub total_processing_time_us: u64,
    pub responses_sent_by_status: BTreeMap<u16, u64>,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn request_received(&self) {
        self.inner.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    fn response_sent(&self, status: u16, elapsed_us: u64) {
        self.inner.responses_sent.fetch_add(1, Ordering::Relaxed);
        self.inner
            .processing_time_us
            .fetch_add(elapsed_us, Ordering::Relaxed);
        *self.inner.responses_by_status.lock().entry(status).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_received: self.inner.requests_received.load(Ordering::Relaxed),
            responses_sent: self.inner.responses_sent.load(Ordering::Relaxed),
            total_processing_time_us: self.inner.processing_time_us.load(Ordering::Relaxed),
            responses_sent_by_status: self.inner.responses_by_status.lock().clone(),
        }
    }
}

/// Middleware recording one request/response pair. Processing time covers
/// everything inward of this layer.
pub async fn record(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let Some(metrics) = metrics else {
        return next.run(request).await;
    };

    metrics.request_received();
    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    metrics.response_sent(response.status().as_u16(), elapsed_us);
    response
}
