//! Kubernetes probe handlers.
//!
//! | Probe | Path | Passes while |
//! |---|---|---|
//! | **Liveness** | `/healthz` | uptime ≤ liveness window |
//! | **Readiness** | `/readiness` | readiness delay ≤ uptime ≤ liveness window |
//!
//! A passing probe answers `200 ok`. A failing one answers `500` with the
//! current uptime in seconds, e.g. `error: 121.004`, so the orchestrator's
//! event log shows how old the instance was.

use std::sync::Arc;

use http::StatusCode;
use tracing::debug;

use crate::app::{AppState, routes};
use crate::probe::Verdict;
use crate::request::Request;
use crate::response::Response;

/// Liveness: fails once the instance has outlived its window, telling the
/// orchestrator to recycle it.
pub async fn liveness(state: Arc<AppState>, _req: Request) -> Response {
    state.metrics.record_request(routes::LIVENESS);
    let elapsed = state.uptime.elapsed();
    let verdict = state.thresholds.liveness(elapsed);
    debug!(probe = "liveness", state = %state.thresholds.evaluate(elapsed), ?elapsed, "probe evaluated");
    into_response(verdict)
}

/// Readiness: passes only between the warm-up delay and the end of the
/// liveness window.
pub async fn readiness(state: Arc<AppState>, _req: Request) -> Response {
    state.metrics.record_request(routes::READINESS);
    let elapsed = state.uptime.elapsed();
    let verdict = state.thresholds.readiness(elapsed);
    debug!(probe = "readiness", state = %state.thresholds.evaluate(elapsed), ?elapsed, "probe evaluated");
    into_response(verdict)
}

fn into_response(verdict: Verdict) -> Response {
    let status = if verdict.is_pass() { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
    Response::builder().status(status).text(verdict.body())
}
