//! Command-line flags.

use std::time::Duration;

use clap::Parser;
use hyper::StatusCode;

use crate::config::schema::{BindScope, MirrorConfig, DEFAULT_PORT};
use crate::config::validation::{validate_config, ConfigError};

#[derive(Parser, Debug, Clone)]
#[command(name = "echomirror")]
#[command(
    about = "Echo every HTTP request to the console and reply with a fixed or proxied response",
    long_about = None
)]
pub struct Flags {
    /// The port that echomirror will listen to
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The HTTP status code we will return
    #[arg(short, long, default_value_t = 200)]
    pub status_code: u16,

    /// Respond to requests with this text using the text/plain content-type
    #[arg(long)]
    pub text: Option<String>,

    /// Respond to requests with this JSON using the application/json content-type
    #[arg(long)]
    pub json: Option<String>,

    /// Listen on all interfaces (0.0.0.0)
    #[arg(long, overrides_with = "localhost_only")]
    pub expose: bool,

    /// Only accept connections from localhost [default]
    #[arg(long = "localhost-only", overrides_with = "expose")]
    pub localhost_only: bool,

    /// Forward every request to this base URL and relay its response
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Give up on the upstream after this many seconds
    #[arg(long = "proxy-timeout", value_name = "SECS")]
    pub proxy_timeout: Option<u64>,

    /// Diagnostic log filter (trace, debug, info, warn, error)
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,
}

impl Flags {
    /// Build and validate the startup configuration.
    pub fn into_config(self) -> Result<MirrorConfig, ConfigError> {
        let status_code = StatusCode::from_u16(self.status_code)
            .map_err(|_| ConfigError::InvalidStatusCode(self.status_code))?;

        let bind_scope = if self.expose {
            BindScope::AllInterfaces
        } else {
            BindScope::LoopbackOnly
        };

        let config = MirrorConfig {
            port: self.port,
            bind_scope,
            status_code,
            static_text: self.text,
            static_json: self.json,
            proxy_target: self.proxy,
            upstream_timeout: self.proxy_timeout.map(Duration::from_secs),
            log_level: self.log_level,
        };

        validate_config(&config)?;
        Ok(config)
    }
}
