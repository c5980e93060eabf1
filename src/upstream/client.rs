//! Outbound HTTP client for proxy mode.

use std::time::Duration;

use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCEPT_ENCODING, HOST};
use hyper::{HeaderMap, StatusCode};
use url::Url;

use crate::http::request::InboundRequest;
use crate::upstream::decode::{decode_body, DecodeError, ACCEPTED_ENCODINGS};
use crate::upstream::join::join;

/// Failure of a single upstream call.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid proxy target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("upstream {url} is unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream {url} did not answer in time")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream {url} failed: {source}")]
    Protocol {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream {url} sent an undecodable body: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },
}

impl UpstreamError {
    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_string();
        if source.is_timeout() {
            UpstreamError::Timeout { url, source }
        } else if source.is_connect() {
            UpstreamError::Unreachable { url, source }
        } else if source.is_builder() {
            UpstreamError::InvalidTarget {
                target: url,
                reason: source.to_string(),
            }
        } else {
            UpstreamError::Protocol { url, source }
        }
    }
}

/// What the upstream answered, fully buffered.
#[derive(Debug, Clone)]
pub struct ProxyResponseRecord {
    /// URL that produced the response (after redirects).
    pub source_url: String,
    pub status: StatusCode,
    /// Headers exactly as the upstream sent them, `Content-Encoding` included.
    pub headers: HeaderMap,
    /// Body with its content codings undone.
    pub body: Bytes,
}

/// Client used to relay requests upstream.
///
/// Idle connections are not kept, so every request opens its own connection.
/// Automatic decompression is off; see [`crate::upstream::decode`].
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    /// Build the client. `timeout` bounds the whole call, from connect to last body byte.
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .no_gzip()
            .no_deflate()
            .no_brotli();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Forward `request` to `target`, joining the inbound path onto the target URL.
    ///
    /// The inbound headers are sent as captured (one value per name) with `Host`
    /// replaced by the target's hostname. The captured body, if any, is sent as-is.
    /// Without a client `Accept-Encoding`, the codings this client can decode are offered.
    pub async fn forward(
        &self,
        target: &str,
        request: &InboundRequest,
    ) -> Result<ProxyResponseRecord, UpstreamError> {
        let host = target_host(target)?;
        let url = join(target, &request.path);

        let mut headers = request.headers.to_header_map();
        headers.insert(HOST, host);
        if !headers.contains_key(ACCEPT_ENCODING) {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(ACCEPTED_ENCODINGS));
        }

        tracing::debug!(url = %url, method = %request.method, "Forwarding upstream");

        let mut outbound = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &request.body {
            outbound = outbound.body(body.clone());
        }

        let response = outbound
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, e))?;

        let status = response.status();
        let source_url = response.url().to_string();
        let headers = response.headers().clone();
        let raw = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, e))?;
        let body = decode_body(&headers, raw)
            .await
            .map_err(|source| UpstreamError::Decode {
                url: url.clone(),
                source,
            })?;

        tracing::debug!(
            url = %source_url,
            status = status.as_u16(),
            body_bytes = body.len(),
            "Upstream responded"
        );

        Ok(ProxyResponseRecord {
            source_url,
            status,
            headers,
            body,
        })
    }
}

/// Hostname of the proxy target, as sent in the `Host` header.
fn target_host(target: &str) -> Result<HeaderValue, UpstreamError> {
    let invalid = |reason: String| UpstreamError::InvalidTarget {
        target: target.to_string(),
        reason,
    };

    let url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| invalid("URL has no host".to_string()))?;
    HeaderValue::from_str(host).map_err(|e| invalid(e.to_string()))
}
