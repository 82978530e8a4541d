//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! Once the shutdown future passed to [`Server::serve`] resolves, the server:
//! 1. Stops `listener.accept()` and closes the socket — no new connections.
//! 2. Tells every open connection to finish its in-flight request and close.
//! 3. Waits for them, up to the shutdown timeout (10 s by default).
//! 4. Aborts whatever is still running and returns.
//!
//! # Slow and idle clients
//!
//! The read timeout bounds the header block (hyper's `header_read_timeout`),
//! the body, and the quiet time between keep-alive requests. The write
//! timeout bounds the handler and any response write that stops moving.
//!
//! The shutdown timeout must stay below `terminationGracePeriodSeconds`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::conn::{DeadlineStream, InFlight};
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The HTTP server.
///
/// Binding happens up front in [`Server::bind`] so an unusable address fails
/// startup before anything else runs.
pub struct Server {
    listener: TcpListener,
    read_timeout: Duration,
    write_timeout: Duration,
    shutdown_timeout: Duration,
}

impl Server {
    /// Binds the listening socket.
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), echoprobe::Error> {
    /// let server = echoprobe::Server::bind("0.0.0.0:8888").await?;
    /// # Ok(()) }
    /// ```
    pub async fn bind(addr: &str) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr: addr.to_owned(), source })?;
        Ok(Self::from_listener(listener))
    }

    /// Wraps an already bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self {
            listener,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            shutdown_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Bound on reading a request's header block and body, and on how long
    /// an idle connection may stay open between requests.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Bound on a handler producing its response, and on a response write
    /// that makes no progress. A slow handler yields
    /// `503 Service Unavailable`; a stalled write closes the connection.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Deadline for draining connections once shutdown starts.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Accepts connections and dispatches them through `router` until
    /// `shutdown` resolves, then drains.
    ///
    /// Returns `Ok(())` after the drain finished or the deadline passed.
    pub async fn serve<F>(self, router: Router, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let Self { listener, read_timeout, write_timeout, shutdown_timeout } = self;
        let addr = listener.local_addr()?;

        let dispatcher = Arc::new(Dispatcher { router, read_timeout, write_timeout });
        let mut builder = ConnBuilder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(read_timeout);
        let graceful = GracefulShutdown::new();
        let mut tasks = JoinSet::new();

        info!(addr = %addr, "echoprobe listening");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting even if
                // more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!(error = %e, "accept error");
                            continue;
                        }
                    };

                    let in_flight = InFlight::default();
                    let io = DeadlineStream::new(stream, in_flight.clone(), read_timeout, write_timeout);

                    let dispatcher = Arc::clone(&dispatcher);
                    let svc = service_fn(move |req| {
                        let dispatcher = Arc::clone(&dispatcher);
                        let guard = in_flight.enter();
                        async move {
                            let _guard = guard;
                            dispatcher.dispatch(req, remote_addr).await
                        }
                    });

                    let conn = builder.serve_connection_with_upgrades(TokioIo::new(io), svc);
                    let conn = graceful.watch(conn.into_owned());

                    tasks.spawn(async move {
                        if let Err(e) = conn.await {
                            debug!(peer = %remote_addr, error = %e, "connection error");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);

        let drained = tokio::time::timeout(shutdown_timeout, async {
            graceful.shutdown().await;
            while tasks.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => info!("all connections drained"),
            Err(_) => {
                warn!(
                    remaining = tasks.len(),
                    timeout_secs = shutdown_timeout.as_secs(),
                    "drain deadline reached, aborting remaining connections"
                );
                tasks.shutdown().await;
            }
        }

        info!("echoprobe stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

struct Dispatcher {
    router: Router,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl Dispatcher {
    /// Routes one request and produces one response.
    ///
    /// Infallible: every failure becomes a status code, so hyper never sees
    /// an error.
    async fn dispatch(
        &self,
        req: hyper::Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<http::Response<Full<Bytes>>, Infallible> {
        let started = Instant::now();
        let (parts, body) = req.into_parts();
        let method = parts.method.clone();
        let path = parts.uri.path().to_owned();

        let response = match self.router.lookup(&path) {
            Some(handler) => {
                let body = read_body(body, self.read_timeout).await;
                if let Err(e) = &body {
                    warn!(peer = %remote_addr, error = %e, "failed to read request body");
                }
                let req = Request::new(parts, body, Some(remote_addr));

                match tokio::time::timeout(self.write_timeout, handler.call(req)).await {
                    Ok(res) => res,
                    Err(_) => {
                        warn!(peer = %remote_addr, method = %method, path = %path, "handler timed out");
                        Response::status(StatusCode::SERVICE_UNAVAILABLE)
                    }
                }
            }
            None => Response::status(StatusCode::NOT_FOUND),
        };

        debug!(
            method = %method,
            path = %path,
            status = response.status.as_u16(),
            latency_us = started.elapsed().as_micros() as u64,
            "request served"
        );

        Ok(response.into_inner())
    }
}

async fn read_body(body: Incoming, timeout: Duration) -> Result<Bytes, Error> {
    match tokio::time::timeout(timeout, body.collect()).await {
        Ok(Ok(collected)) => Ok(collected.to_bytes()),
        Ok(Err(e)) => Err(Error::Body(e.to_string())),
        Err(_) => Err(Error::Body(format!("read timed out after {:?}", timeout))),
    }
}
