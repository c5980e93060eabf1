//! Per-request handling.
//!
//! # States
//! ```text
//! Received
//!     → HEAD / OPTIONS / unsupported method: fixed reply, no transcript
//!     → ModeDecision (from the immutable config)
//!         → StaticReply: configured status and body
//!         → ProxyRelay: forward upstream, relay status, headers and body
//!     → Logged: transcript attached to the body, released by the connection
//!       once the response has been flushed
//! ```
//!
//! # Design Decisions
//! - The config is injected once and only read
//! - The request body is read at most once and shared by the transcript and the relay
//! - Upstream failures are returned as errors; the connection closes without a reply

use std::sync::Arc;

use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};

use crate::config::{MirrorConfig, ResponseMode};
use crate::http::request::{BoxError, DuplicateHeader, InboundRequest};
use crate::http::response::{
    head_response, options_response, relayed_response, static_response,
    unsupported_method_response, MirrorBody,
};
use crate::observability::Transcript;
use crate::upstream::{UpstreamClient, UpstreamError};

/// Errors that abort a single request.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to read request body: {0}")]
    RequestBody(#[source] BoxError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Request handler holding the startup configuration.
#[derive(Debug, Clone)]
pub struct MirrorHandler {
    config: Arc<MirrorConfig>,
    upstream: UpstreamClient,
}

impl MirrorHandler {
    pub fn new(config: Arc<MirrorConfig>, upstream: UpstreamClient) -> Self {
        Self { config, upstream }
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Produce the response for one request.
    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<MirrorBody>, RelayError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let method = req.method().clone();
        if method == Method::HEAD {
            return Ok(head_response());
        }
        if method == Method::OPTIONS {
            return Ok(options_response());
        }
        if !is_mirrored(&method) {
            tracing::warn!(method = %method, "Unsupported method");
            return Ok(unsupported_method_response(&method));
        }

        let (request, duplicates) = InboundRequest::capture(req)
            .await
            .map_err(RelayError::RequestBody)?;
        self.respond(request, duplicates).await
    }

    async fn respond(
        &self,
        request: InboundRequest,
        duplicates: Vec<DuplicateHeader>,
    ) -> Result<Response<MirrorBody>, RelayError> {
        match self.config.response_mode() {
            ResponseMode::Static { status, body } => {
                let response = static_response(status, body)
                    .map(|body| body.with_transcript(Transcript::new(request, None)));
                Ok(response)
            }
            ResponseMode::Proxy { target } => {
                if !duplicates.is_empty() {
                    tracing::debug!(
                        dropped = duplicates.len(),
                        "Forwarding first value of repeated headers"
                    );
                }

                let record = self.upstream.forward(target, &request).await?;
                let response = relayed_response(&record)
                    .map(|body| body.with_transcript(Transcript::new(request, Some(record))));
                Ok(response)
            }
        }
    }
}

/// Methods that go through the static/proxy logic.
fn is_mirrored(method: &Method) -> bool {
    matches!(method.as_str(), "GET" | "POST" | "PUT" | "DELETE")
}
