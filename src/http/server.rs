//! HTTP server setup and the accept loop.
//!
//! # Responsibilities
//! - Build the request handler (config + upstream client)
//! - Accept connections and serve each one on its own task (HTTP/1.1)
//! - Wrap every request in a span with a generated request ID
//! - Release each transcript only after its response has been flushed
//! - Stop accepting on shutdown and drain open connections with a deadline

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{MirrorConfig, ResponseMode};
use crate::http::delivery::{DeliveryStream, Outbox};
use crate::http::handler::MirrorHandler;
use crate::lifecycle::ShutdownSignal;
use crate::observability::TranscriptSink;
use crate::upstream::UpstreamClient;

/// How long open connections may keep running after shutdown starts.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the stdout writer gets to finish queued transcripts after the drain.
const TRANSCRIPT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Error raised while building the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The diagnostic HTTP server.
pub struct MirrorServer {
    handler: MirrorHandler,
}

impl MirrorServer {
    /// Create a new server with the given configuration.
    pub fn new(config: MirrorConfig) -> Result<Self, ServerError> {
        let upstream = UpstreamClient::new(config.upstream_timeout)?;
        Ok(Self {
            handler: MirrorHandler::new(Arc::new(config), upstream),
        })
    }

    /// Serve connections from `listener` until `shutdown` fires, writing transcripts to stdout.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let (sink, writer) = TranscriptSink::stdout();
        self.run_with_transcripts(listener, shutdown, sink).await?;

        if tokio::time::timeout(TRANSCRIPT_FLUSH_TIMEOUT, writer)
            .await
            .is_err()
        {
            tracing::debug!("Transcript writer still busy at exit");
        }
        Ok(())
    }

    /// Serve connections from `listener` until `shutdown` fires, queuing transcripts on `sink`.
    pub async fn run_with_transcripts(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
        sink: TranscriptSink,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let mode = match self.handler.config().response_mode() {
            ResponseMode::Static { .. } => "static",
            ResponseMode::Proxy { .. } => "proxy",
        };
        tracing::info!(address = %addr, mode, "HTTP server starting");

        let graceful = GracefulShutdown::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    tracing::debug!(peer_addr = %peer_addr, "Connection accepted");

                    let conn = connection(self.handler.clone(), stream, sink.clone(), &graceful);
                    tokio::spawn(async move {
                        if let Err(err) = conn.await {
                            tracing::debug!(peer_addr = %peer_addr, error = %err, "Connection ended with error");
                        }
                    });
                }
                _ = shutdown.wait() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        drop(listener);

        if tokio::time::timeout(DRAIN_TIMEOUT, graceful.shutdown())
            .await
            .is_err()
        {
            tracing::warn!(
                timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "Connections still open after drain deadline"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Serve one HTTP/1.1 connection over `stream`, watched by `graceful`.
fn connection<S>(
    handler: MirrorHandler,
    stream: S,
    sink: TranscriptSink,
    graceful: &GracefulShutdown,
) -> impl Future<Output = Result<(), hyper::Error>> + Send + 'static
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let outbox = Outbox::default();
    let io = TokioIo::new(DeliveryStream::new(stream, outbox.clone(), sink));

    let service = service_fn(move |req: Request<Incoming>| {
        let handler = handler.clone();
        let outbox = outbox.clone();
        let span = tracing::info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path()
        );
        async move {
            let result = handler.handle(req).await;
            match &result {
                Ok(response) => tracing::debug!(
                    status = response.status().as_u16(),
                    "Response ready"
                ),
                Err(e) => tracing::error!(
                    error = %e,
                    "Request aborted; closing connection"
                ),
            }
            result.map(|mut response| {
                response.body_mut().deliver_through(outbox);
                response
            })
        }
        .instrument(span)
    });

    let conn = http1::Builder::new()
        .title_case_headers(true)
        .serve_connection(io, service);
    graceful.watch(conn)
}
