//! Shared process state and the route table.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::Error;
use crate::handler::Handler;
use crate::identity::Identity;
use crate::metrics::MetricsRegistry;
use crate::probe::Thresholds;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::uptime::Uptime;
use crate::{echo, health, metrics};

/// Route paths, which double as the `location` metric label.
pub mod routes {
    pub const ECHO: &str = "/";
    pub const LIVENESS: &str = "/healthz";
    pub const READINESS: &str = "/readiness";
    pub const METRICS: &str = "/metrics";
}

/// Everything a handler can read. Built once at startup; only the counters
/// inside `metrics` change afterwards.
pub struct AppState {
    pub thresholds: Thresholds,
    pub identity: Identity,
    pub uptime: Uptime,
    pub metrics: MetricsRegistry,
}

impl AppState {
    pub fn new(
        thresholds: Thresholds,
        identity: Identity,
        uptime: Uptime,
        metrics: MetricsRegistry,
    ) -> Self {
        Self { thresholds, identity, uptime, metrics }
    }

    /// Production state: system clock started now, identity from the
    /// environment, a fresh metrics registry.
    pub fn from_config(config: &ServerConfig, uptime: Uptime) -> Result<Self, Error> {
        Ok(Self::new(config.thresholds(), Identity::from_env(), uptime, MetricsRegistry::new()?))
    }
}

/// Builds the route table. Every route accepts any method.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .any(routes::ECHO, with_state(Arc::clone(&state), echo::handle))
        .any(routes::LIVENESS, with_state(Arc::clone(&state), health::liveness))
        .any(routes::READINESS, with_state(Arc::clone(&state), health::readiness))
        .any(routes::METRICS, with_state(state, metrics::scrape))
}

/// Adapts a `(state, request)` handler to the single-argument [`Handler`] shape.
fn with_state<F, Fut>(state: Arc<AppState>, f: F) -> impl Handler
where
    F: Fn(Arc<AppState>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    move |req: Request| f(Arc::clone(&state), req)
}
