//! Request counters and the Prometheus scrape surface.
//!
//! The registry is an owned value handed to the handlers, not a process-wide
//! singleton, so every test can build its own isolated instance.
//!
//! # Metrics
//! - `http_requests_total{location}` (counter): requests served per route.
//!   Incremented for `/`, `/healthz` and `/readiness`. Scrapes of `/metrics`
//!   are not counted.

use std::sync::Arc;

use http::StatusCode;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

use crate::app::AppState;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

const REQUESTS_TOTAL: &str = "http_requests_total";
const LOCATION: &str = "location";

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

pub struct MetricsRegistry {
    registry: Registry,
    requests: IntCounterVec,
}

impl MetricsRegistry {
    /// Creates a fresh registry with every counter registered.
    pub fn new() -> Result<Self, Error> {
        Self::with_registry(Registry::new())
    }

    /// Registers the counters on an existing registry.
    ///
    /// Fails if the counters are already registered there.
    pub fn with_registry(registry: Registry) -> Result<Self, Error> {
        let requests = IntCounterVec::new(
            Opts::new(REQUESTS_TOTAL, "Requests count per location"),
            &[LOCATION],
        )?;
        registry.register(Box::new(requests.clone()))?;
        Ok(Self { registry, requests })
    }

    /// Counts one request against `location`.
    pub fn record_request(&self, location: &str) {
        self.requests.with_label_values(&[location]).inc();
    }

    /// Current count for `location`; zero if it was never recorded.
    ///
    /// Reads the gathered samples, so asking about a location never creates
    /// its series.
    pub fn request_count(&self, location: &str) -> u64 {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == REQUESTS_TOTAL)
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == LOCATION && label.get_value() == location)
            })
            .map_or(0, |metric| metric.get_counter().get_value() as u64)
    }

    /// Renders every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::Metrics(prometheus::Error::Msg(e.to_string())))
    }
}

/// `/metrics` handler: the current counters in the text exposition format.
pub async fn scrape(state: Arc<AppState>, _req: Request) -> Response {
    match state.metrics.encode() {
        Ok(body) => Response::builder().bytes(CONTENT_TYPE, body),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .text(format!("failed to encode metrics: {e}"))
        }
    }
}
