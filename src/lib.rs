//! # echoprobe
//!
//! A diagnostic HTTP server. It echoes every request back to the caller,
//! answers Kubernetes liveness and readiness probes gated on its own uptime,
//! and publishes request counters for Prometheus.
//!
//! | Route | Answer |
//! |---|---|
//! | `/` | `200`, the request as received plus the worker's identity |
//! | `/healthz` | `200 ok` until the liveness window passes, then `500 error: <uptime>` |
//! | `/readiness` | `200 ok` between the readiness delay and the liveness window |
//! | `/metrics` | Prometheus text exposition of `http_requests_total{location}` |
//!
//! ## The probe lifecycle
//!
//! ```text
//!   0s          delay (5s)                     window (120s)
//!   |-- NotReady --|------------ Ready -------------|-- Expired -->
//!   liveness  ok                                     liveness  500
//!   readiness 500   readiness ok                     readiness 500
//! ```
//!
//! The state is recomputed from the uptime on every probe, never stored.
//! An instance that outlives its window asks to be recycled.
//!
//! ## Embedding
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use echoprobe::{AppState, ServerConfig, Server, Uptime, app, shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), echoprobe::Error> {
//!     let uptime = Uptime::start();
//!     let config = ServerConfig::default();
//!     let state = Arc::new(AppState::from_config(&config, uptime)?);
//!
//!     let (controller, signal) = shutdown::shutdown_channel();
//!     let server = Server::bind(&config.bind_address()).await?;
//!     let serving = tokio::spawn(server.serve(app::router(state), signal.recv()));
//!
//!     shutdown::wait_for_signal().await;
//!     controller.shutdown();
//!     serving.await.ok();
//!     Ok(())
//! }
//! ```

mod conn;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod app;
pub mod clock;
pub mod config;
pub mod echo;
pub mod health;
pub mod identity;
pub mod metrics;
pub mod probe;
pub mod shutdown;
pub mod uptime;

pub use app::AppState;
pub use config::ServerConfig;
pub use error::Error;
pub use handler::Handler;
pub use request::Request;
pub use response::{Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use uptime::Uptime;
