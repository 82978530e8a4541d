//! Incoming HTTP request type.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};

use crate::error::Error;

/// An incoming HTTP request with its body already read.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) body_error: Option<String>,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl Request {
    pub(crate) fn new(
        parts: http::request::Parts,
        body: Result<Bytes, Error>,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        let (body, body_error) = match body {
            Ok(bytes) => (bytes, None),
            Err(e) => (Bytes::new(), Some(e.to_string())),
        };
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            body_error,
            remote_addr,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Peer address of the connection, when known.
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Case-insensitive header lookup. Returns `None` for non-UTF-8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The target host: the `Host` header, else the URI authority.
    pub fn host(&self) -> &str {
        self.header("host")
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
            .unwrap_or("")
    }

    /// Serialises the request as it arrived on the wire.
    ///
    /// ```text
    /// GET /path?q=1 HTTP/1.1\r\n
    /// Host: example.com\r\n
    /// Accept: */*\r\n
    /// \r\n
    /// <body>
    /// ```
    ///
    /// Header names are written in canonical form and sorted; `Host`,
    /// `Transfer-Encoding` and `Trailer` are left out of the header block.
    /// The `Host` line itself is omitted when the request names no host.
    /// Fails if the body could not be read.
    pub fn dump(&self) -> Result<Vec<u8>, Error> {
        if let Some(reason) = &self.body_error {
            return Err(Error::Body(reason.clone()));
        }

        let target = self
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut out = Vec::with_capacity(256 + self.body.len());
        out.extend_from_slice(
            format!("{} {} {:?}\r\n", self.method, target, self.version).as_bytes(),
        );
        let host = self.host();
        if !host.is_empty() {
            out.extend_from_slice(format!("Host: {host}\r\n").as_bytes());
        }

        let mut names: Vec<&http::HeaderName> = self
            .headers
            .keys()
            .filter(|name| !DUMP_EXCLUDED.contains(&name.as_str()))
            .collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        for name in names {
            let canonical = canonical_header_name(name.as_str());
            for value in self.headers.get_all(name) {
                out.extend_from_slice(canonical.as_bytes());
                out.extend_from_slice(b": ");
                out.extend_from_slice(value.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
        }

        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        Ok(out)
    }
}

/// Builds a request outside the server, e.g. to drive a [`Router`](crate::Router)
/// directly. No peer address.
impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, Ok(body), None)
    }
}

// `HeaderMap` keys are always lowercase.
const DUMP_EXCLUDED: [&str; 3] = ["host", "transfer-encoding", "trailer"];

/// `x-forwarded-for` → `X-Forwarded-For`.
fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper = c == '-';
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> http::request::Builder {
        http::Request::builder().method("GET").uri(uri)
    }

    #[test]
    fn canonicalises_header_names() {
        assert_eq!(canonical_header_name("x-forwarded-for"), "X-Forwarded-For");
        assert_eq!(canonical_header_name("accept"), "Accept");
        assert_eq!(canonical_header_name("x-b3-traceid"), "X-B3-Traceid");
    }

    #[test]
    fn dump_starts_with_the_request_line() {
        let req: Request = get("/some/path?x=1&y=two")
            .header("host", "example.com")
            .body(Bytes::new())
            .unwrap()
            .into();

        let dump = String::from_utf8(req.dump().unwrap()).unwrap();
        assert!(dump.starts_with("GET /some/path?x=1&y=two HTTP/1.1\r\nHost: example.com\r\n"));
        assert!(dump.ends_with("\r\n\r\n"));
    }

    #[test]
    fn dump_sorts_headers_and_keeps_repeated_values() {
        let req: Request = get("/")
            .header("host", "h")
            .header("x-trace", "b")
            .header("accept", "*/*")
            .header("x-trace", "a")
            .header("transfer-encoding", "chunked")
            .body(Bytes::new())
            .unwrap()
            .into();

        let dump = String::from_utf8(req.dump().unwrap()).unwrap();
        assert_eq!(
            dump,
            "GET / HTTP/1.1\r\nHost: h\r\nAccept: */*\r\nX-Trace: b\r\nX-Trace: a\r\n\r\n"
        );
    }

    #[test]
    fn dump_appends_the_body() {
        let req: Request = http::Request::builder()
            .method("POST")
            .uri("/submit")
            .header("host", "h")
            .header("content-type", "text/plain")
            .body(Bytes::from_static(b"hello body"))
            .unwrap()
            .into();

        let dump = String::from_utf8(req.dump().unwrap()).unwrap();
        assert!(dump.starts_with("POST /submit HTTP/1.1\r\n"));
        assert!(dump.contains("Content-Type: text/plain\r\n"));
        assert!(dump.ends_with("\r\n\r\nhello body"));
    }

    #[test]
    fn host_falls_back_to_the_uri_authority() {
        let req: Request = get("http://upstream.local:8080/x").body(Bytes::new()).unwrap().into();
        assert_eq!(req.host(), "upstream.local:8080");
        assert_eq!(req.path(), "/x");
    }

    #[test]
    fn dump_leaves_out_the_host_line_when_there_is_no_host() {
        let req: Request = get("/")
            .version(Version::HTTP_10)
            .header("accept", "*/*")
            .body(Bytes::new())
            .unwrap()
            .into();

        assert_eq!(req.host(), "");
        let dump = String::from_utf8(req.dump().unwrap()).unwrap();
        assert_eq!(dump, "GET / HTTP/1.0\r\nAccept: */*\r\n\r\n");
        assert!(!dump.contains("Host:"));
    }

    #[test]
    fn dump_fails_when_the_body_was_lost() {
        let (parts, _) = get("/").body(()).unwrap().into_parts();
        let req = Request::new(parts, Err(Error::Body("read timed out".into())), None);
        assert!(req.body().is_empty());
        assert!(matches!(req.dump(), Err(Error::Body(_))));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req: Request = get("/").header("X-Request-Id", "abc").body(Bytes::new()).unwrap().into();
        assert_eq!(req.header("x-request-id"), Some("abc"));
        assert_eq!(req.header("X-REQUEST-ID"), Some("abc"));
        assert_eq!(req.header("missing"), None);
    }
}
