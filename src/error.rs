//! Unified error type.

/// The error type returned by echoprobe's fallible operations.
///
/// HTTP-level outcomes (404, a failing probe, a handler timeout) are expressed
/// as [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding the listener, registering metrics, reading
/// a request body.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind `{addr}`: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("request body unavailable: {0}")]
    Body(String),
}
