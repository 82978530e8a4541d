//! The echo handler: reflects the request back with the worker's identity.

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::{AppState, routes};
use crate::request::Request;
use crate::response::Response;

const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Answers `200` with the request dump followed by the identity trailer.
///
/// If the request cannot be dumped (its body was lost) the failure is logged
/// and the response carries the trailer alone.
pub async fn handle(state: Arc<AppState>, req: Request) -> Response {
    state.metrics.record_request(routes::ECHO);

    let mut payload = match req.dump() {
        Ok(dump) => dump,
        Err(e) => {
            warn!(error = %e, "failed to dump request");
            Vec::new()
        }
    };
    payload.extend_from_slice(state.identity.trailer().as_bytes());

    let remote_addr = req.remote_addr().map_or_else(|| "-".to_owned(), |a| a.to_string());
    info!(
        remote_addr = %remote_addr,
        host = %req.host(),
        method = %req.method(),
        url = %req.uri(),
        "echo"
    );

    Response::builder().bytes(CONTENT_TYPE, payload)
}
