//! Inbound request capture.
//!
//! # Responsibilities
//! - Collapse the header multi-map to one value per name, reporting duplicates
//! - Read the body once, only when `Content-Length` is declared
//! - Keep the path with its query string for logging and forwarding
//!
//! # Design Decisions
//! - Header order is the order names first appeared on the wire
//! - Original header bytes are kept; lossy text is only produced for display

use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use hyper::{HeaderMap, Method, Request};

/// Boxed error used for request bodies of any type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Ordered header set holding a single value per name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderSet {
    entries: Vec<(HeaderName, HeaderValue)>,
}

/// A request header that arrived with more than one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateHeader {
    pub name: HeaderName,
    pub value_count: usize,
}

impl HeaderSet {
    /// Keep the first value of every header, returning the names that had more.
    pub fn collapse(headers: &HeaderMap) -> (Self, Vec<DuplicateHeader>) {
        let mut entries = Vec::with_capacity(headers.keys_len());
        let mut duplicates = Vec::new();

        for name in headers.keys() {
            let mut values = headers.get_all(name).iter();
            let Some(first) = values.next() else {
                continue;
            };
            let extra = values.count();
            if extra > 0 {
                duplicates.push(DuplicateHeader {
                    name: name.clone(),
                    value_count: extra + 1,
                });
            }
            entries.push((name.clone(), first.clone()));
        }

        (Self { entries }, duplicates)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    /// Rebuild a `HeaderMap` for forwarding.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            map.insert(name.clone(), value.clone());
        }
        map
    }
}

/// A request as seen by the handler and the transcript.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path including the query string.
    pub path: String,
    pub headers: HeaderSet,
    /// Present only when the request declared `Content-Length`.
    pub body: Option<Bytes>,
}

impl InboundRequest {
    /// Consume a request, reading its body if a length was declared.
    ///
    /// Duplicate headers are logged as warnings and returned to the caller.
    pub async fn capture<B>(req: Request<B>) -> Result<(Self, Vec<DuplicateHeader>), BoxError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();

        let (headers, duplicates) = HeaderSet::collapse(&parts.headers);
        for duplicate in &duplicates {
            tracing::warn!(
                header = %duplicate.name,
                values = duplicate.value_count,
                "Only one value per header is supported; keeping the first"
            );
        }

        let body = if parts.headers.contains_key(CONTENT_LENGTH) {
            let collected = body.collect().await.map_err(Into::<BoxError>::into)?;
            Some(collected.to_bytes())
        } else {
            None
        };

        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok((
            Self {
                method: parts.method,
                path,
                headers,
                body,
            },
            duplicates,
        ))
    }
}
