//! Per-route request counters and latency.
//!
//! Every request is timed, answered with an `x-response-time` header, and
//! counted under `"{METHOD} {route}"`, where the route is the matched
//! template (`/customer/deleteCustomer/{id}`), never the raw path. Requests
//! no route matched share one bucket.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Response header carrying the handling time, e.g. `1.234ms`.
pub const RESPONSE_TIME_HEADER: HeaderName = HeaderName::from_static("x-response-time");

/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

#[derive(Debug, Default)]
struct Tally {
    count: u64,
    total: Duration,
    max: Duration,
    status_codes: BTreeMap<u16, u64>,
}

impl Tally {
    fn record(&mut self, status: u16, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
        *self.status_codes.entry(status).or_default() += 1;
    }

    fn snapshot(&self) -> TallySnapshot {
        let total_ms = millis(self.total);
        #[allow(clippy::cast_precision_loss)]
        let average_ms = if self.count == 0 {
            0.0
        } else {
            total_ms / self.count as f64
        };
        TallySnapshot {
            count: self.count,
            total_time_ms: total_ms,
            average_time_ms: average_ms,
            max_time_ms: millis(self.max),
            status_codes: self.status_codes.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    overall: Tally,
    endpoints: BTreeMap<String, Tally>,
}

/// Shared request statistics. Cloning shares the same counters.
#[derive(Debug, Clone)]
pub struct RequestStats {
    inner: Arc<RwLock<Counters>>,
    started_at: DateTime<Utc>,
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Counters::default())),
            started_at: Utc::now(),
        }
    }

    /// Count one finished request.
    pub fn record(&self, endpoint: String, status: u16, elapsed: Duration) {
        let Ok(mut counters) = self.inner.write() else {
            tracing::error!("Request stats lock poisoned");
            return;
        };
        counters.overall.record(status, elapsed);
        counters
            .endpoints
            .entry(endpoint)
            .or_default()
            .record(status, elapsed);
    }

    /// Point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let uptime_secs = u64::try_from((Utc::now() - self.started_at).num_seconds()).unwrap_or(0);
        let Ok(counters) = self.inner.read() else {
            tracing::error!("Request stats lock poisoned");
            return StatsSnapshot {
                started_at: self.started_at,
                uptime_secs,
                overall: Tally::default().snapshot(),
                endpoints: BTreeMap::new(),
            };
        };
        StatsSnapshot {
            started_at: self.started_at,
            uptime_secs,
            overall: counters.overall.snapshot(),
            endpoints: counters
                .endpoints
                .iter()
                .map(|(endpoint, tally)| (endpoint.clone(), tally.snapshot()))
                .collect(),
        }
    }
}

/// Counters for one endpoint, or for all of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallySnapshot {
    pub count: u64,
    pub total_time_ms: f64,
    pub average_time_ms: f64,
    pub max_time_ms: f64,
    pub status_codes: BTreeMap<u16, u64>,
}

/// Body of `GET /stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    #[serde(flatten)]
    pub overall: TallySnapshot,
    pub endpoints: BTreeMap<String, TallySnapshot>,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Format a duration the way `x-response-time` carries it.
#[must_use]
pub fn format_response_time(elapsed: Duration) -> String {
    format!("{:.3}ms", millis(elapsed))
}

/// Time the request, stamp `x-response-time`, and count it.
pub async fn record_stats(
    State(stats): State<RequestStats>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str);
    let endpoint = format!("{} {route}", request.method());

    let started = Instant::now();
    let mut response = next.run(request).await;
    let elapsed = started.elapsed();

    if let Ok(value) = HeaderValue::from_str(&format_response_time(elapsed)) {
        response.headers_mut().insert(RESPONSE_TIME_HEADER, value);
    }
    stats.record(endpoint, response.status().as_u16(), elapsed);
    response
}
