//! Radix-tree request router.
//!
//! One tree, keyed by path. Every route accepts any method. O(path-length)
//! lookup. You register a path, you get a handler.

use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
pub struct Router {
    routes: MatchitRouter<BoxedHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: MatchitRouter::new() }
    }

    /// Register a handler for every method on `path`.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or already registered.
    pub fn any(mut self, path: &str, handler: impl Handler) -> Self {
        self.routes
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(&self, path: &str) -> Option<BoxedHandler> {
        self.routes.at(path).ok().map(|matched| Arc::clone(matched.value))
    }

    /// Routes one request that was built outside the server. Unmatched
    /// requests get `404 Not Found`.
    pub async fn dispatch(&self, req: Request) -> Response {
        match self.lookup(req.path()) {
            Some(handler) => handler.call(req).await,
            None => Response::status(http::StatusCode::NOT_FOUND),
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
