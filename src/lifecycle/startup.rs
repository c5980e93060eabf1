//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration before anything else happens
//! - Install logging, bind the listener, print the banner
//! - Serve until SIGINT/SIGTERM
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and no socket stays bound
//! - The banner goes to stdout with the transcripts; diagnostics go to stderr

use std::net::SocketAddr;

use colored::Colorize;

use crate::config::validation::lint_static_json;
use crate::config::{ConfigError, Flags, MirrorConfig};
use crate::http::{MirrorServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::net::{self, ListenerError};
use crate::observability::{init_logging, LoggingError, Style};

/// Anything that stops the server from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("server failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The line printed once the listener is bound.
pub fn banner(addr: SocketAddr) -> String {
    format!("Serving on http://{}:{}", addr.ip(), addr.port())
}

/// Validate `flags`, then serve until the process is asked to stop.
pub async fn run(flags: Flags) -> Result<(), StartupError> {
    let config = flags.into_config()?;
    init_logging(&config.log_level)?;
    serve(config).await
}

/// Serve an already validated configuration until SIGINT/SIGTERM.
pub async fn serve(config: MirrorConfig) -> Result<(), StartupError> {
    if let Some(e) = lint_static_json(&config) {
        tracing::warn!(error = %e, "--json body is not valid JSON; serving it verbatim");
    }

    tracing::info!(
        port = config.port,
        scope = ?config.bind_scope,
        status_code = config.status_code.as_u16(),
        proxy = config.proxy_target.as_deref().unwrap_or("-"),
        "Configuration loaded"
    );

    let server = MirrorServer::new(config.clone())?;
    let listener = net::bind(&config).await?;
    let local_addr = listener.local_addr()?;

    let line = banner(local_addr);
    match Style::for_stdout() {
        Style::Ansi => println!("{}", line.cyan()),
        Style::Plain => println!("{line}"),
    }

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::termination().await;
        trigger.trigger();
    });

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
