//! Response construction.
//!
//! # Responsibilities
//! - Build the fixed HEAD, OPTIONS and unsupported-method replies
//! - Build static-mode replies from the configured body
//! - Turn an upstream record into a client response, dropping encoding headers
//! - Carry the transcript inside the body until the connection takes it over
//!
//! # Design Decisions
//! - Bodies are always a single buffer with a known length; never chunked
//! - `Transfer-Encoding` and `Content-Encoding` are stripped from relayed headers
//! - A relayed `Content-Length` describes the decoded body, not the upstream's bytes

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use http_body_util::Full;
use hyper::body::{Body, Bytes, Frame, SizeHint};
use hyper::header::{
    HeaderName, HeaderValue, ALLOW, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE,
    TRANSFER_ENCODING,
};
use hyper::{Method, Response, StatusCode};

use crate::config::StaticBody;
use crate::http::delivery::Outbox;
use crate::observability::Transcript;
use crate::upstream::ProxyResponseRecord;

/// Value of the `Allow` header sent for OPTIONS. HEAD is intentionally not listed.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Upstream headers never relayed to the client.
pub const STRIPPED_RELAY_HEADERS: [HeaderName; 2] = [TRANSFER_ENCODING, CONTENT_ENCODING];

/// Buffered response body carrying the transcript of its exchange.
///
/// When dropped, the body parks its transcript in the connection's [`Outbox`];
/// the connection releases it once the response has been flushed.
#[derive(Debug)]
pub struct MirrorBody {
    inner: Full<Bytes>,
    transcript: Option<Transcript>,
    outbox: Option<Outbox>,
}

impl MirrorBody {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: Full::new(bytes.into()),
            transcript: None,
            outbox: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Bytes::new())
    }

    /// Attach the transcript of the exchange this body answers.
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Detach the transcript so it is never delivered.
    pub fn take_transcript(&mut self) -> Option<Transcript> {
        self.transcript.take()
    }

    /// Route the transcript through `outbox` once the body is released.
    pub fn deliver_through(&mut self, outbox: Outbox) {
        self.outbox = Some(outbox);
    }
}

impl Body for MirrorBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for MirrorBody {
    fn drop(&mut self) {
        if let (Some(transcript), Some(outbox)) = (self.transcript.take(), self.outbox.take()) {
            outbox.park(transcript);
        }
    }
}

fn with_status(status: StatusCode, body: MirrorBody) -> Response<MirrorBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}

/// HEAD: always 200 with an HTML content type and no body.
pub fn head_response() -> Response<MirrorBody> {
    let mut response = with_status(StatusCode::OK, MirrorBody::empty());
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
    response
}

/// OPTIONS: always 204 advertising the allowed methods.
pub fn options_response() -> Response<MirrorBody> {
    let mut response = with_status(StatusCode::NO_CONTENT, MirrorBody::empty());
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

/// Any method without a handler.
pub fn unsupported_method_response(method: &Method) -> Response<MirrorBody> {
    let body = MirrorBody::new(format!("Unsupported method ({method})\n"));
    let mut response = with_status(StatusCode::NOT_IMPLEMENTED, body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

/// Static mode reply.
pub fn static_response(status: StatusCode, body: StaticBody<'_>) -> Response<MirrorBody> {
    let mut response = with_status(status, MirrorBody::new(body.as_str().to_owned()));
    if let Some(content_type) = body.content_type() {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

/// Relay an upstream record: same status, same headers minus encoding ones, decoded body.
pub fn relayed_response(record: &ProxyResponseRecord) -> Response<MirrorBody> {
    let mut response = with_status(record.status, MirrorBody::new(record.body.clone()));
    let headers = response.headers_mut();
    for (name, value) in record.headers.iter() {
        if STRIPPED_RELAY_HEADERS.contains(name) || name == CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    if record.headers.contains_key(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(record.body.len()));
    }
    response
}
