//! TCP listener setup.
//!
//! # Responsibilities
//! - Translate the bind scope into an address (127.0.0.1 or 0.0.0.0)
//! - Bind the configured port
//! - Report the actual bound address (port 0 resolves here)

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::MirrorConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
        }
    }
}

/// Bind the listener described by `config`.
pub async fn bind(config: &MirrorConfig) -> Result<TcpListener, ListenerError> {
    let addr = config.bind_address();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(
            address = %local_addr,
            scope = ?config.bind_scope,
            "Listener bound"
        );
    }

    Ok(listener)
}
