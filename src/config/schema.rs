//! Configuration schema definitions.
//!
//! This module defines the complete startup configuration of the server.
//! Values come from the command line (see `flags.rs`) and never change afterwards.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use hyper::StatusCode;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Which interfaces the listener binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindScope {
    /// Only accept connections from this machine (127.0.0.1).
    #[default]
    LoopbackOnly,
    /// Accept connections on every interface (0.0.0.0).
    AllInterfaces,
}

impl BindScope {
    /// The IP address a listener with this scope binds to.
    pub fn ip(self) -> IpAddr {
        match self {
            BindScope::LoopbackOnly => IpAddr::V4(Ipv4Addr::LOCALHOST),
            BindScope::AllInterfaces => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

/// Root configuration for the server.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Listening port.
    pub port: u16,

    /// Interfaces to bind.
    pub bind_scope: BindScope,

    /// Status code returned in static mode.
    pub status_code: StatusCode,

    /// Static `text/plain` body. Mutually exclusive with `static_json`.
    pub static_text: Option<String>,

    /// Static `application/json` body. Mutually exclusive with `static_text`.
    pub static_json: Option<String>,

    /// Upstream base URL. When set, every request is relayed there.
    pub proxy_target: Option<String>,

    /// Bound on the whole upstream call. `None` waits as long as the transport does.
    pub upstream_timeout: Option<Duration>,

    /// Diagnostic log filter (trace, debug, info, warn, error or an EnvFilter directive).
    pub log_level: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_scope: BindScope::default(),
            status_code: StatusCode::OK,
            static_text: None,
            static_json: None,
            proxy_target: None,
            upstream_timeout: None,
            log_level: "info".to_string(),
        }
    }
}

/// Body served in static mode, with its content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticBody<'a> {
    Text(&'a str),
    Json(&'a str),
    Empty,
}

impl StaticBody<'_> {
    /// Content-Type header value, if the body has one.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            StaticBody::Text(_) => Some("text/plain"),
            StaticBody::Json(_) => Some("application/json"),
            StaticBody::Empty => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StaticBody::Text(s) | StaticBody::Json(s) => s,
            StaticBody::Empty => "",
        }
    }
}

/// How responses are produced for GET/POST/PUT/DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode<'a> {
    Static {
        status: StatusCode,
        body: StaticBody<'a>,
    },
    Proxy {
        target: &'a str,
    },
}

impl MirrorConfig {
    /// Address the listener binds to.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.bind_scope.ip(), self.port)
    }

    /// Decide the response mode. A proxy target always wins over static bodies.
    pub fn response_mode(&self) -> ResponseMode<'_> {
        if let Some(target) = self.proxy_target.as_deref() {
            return ResponseMode::Proxy { target };
        }

        let body = match (self.static_text.as_deref(), self.static_json.as_deref()) {
            (Some(text), _) => StaticBody::Text(text),
            (None, Some(json)) => StaticBody::Json(json),
            (None, None) => StaticBody::Empty,
        };

        ResponseMode::Static {
            status: self.status_code,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_target_takes_precedence() {
        let config = MirrorConfig {
            static_text: Some("hello".into()),
            proxy_target: Some("http://upstream.test".into()),
            ..MirrorConfig::default()
        };

        assert_eq!(
            config.response_mode(),
            ResponseMode::Proxy { target: "http://upstream.test" }
        );
    }

    #[test]
    fn static_body_content_types() {
        let mut config = MirrorConfig::default();
        assert_eq!(
            config.response_mode(),
            ResponseMode::Static { status: StatusCode::OK, body: StaticBody::Empty }
        );

        config.static_json = Some("{}".into());
        match config.response_mode() {
            ResponseMode::Static { body, .. } => {
                assert_eq!(body.content_type(), Some("application/json"));
                assert_eq!(body.as_str(), "{}");
            }
            other => panic!("unexpected mode {other:?}"),
        }
    }

    #[test]
    fn bind_scope_addresses() {
        let mut config = MirrorConfig::default();
        assert_eq!(config.bind_address().to_string(), "127.0.0.1:8080");

        config.bind_scope = BindScope::AllInterfaces;
        config.port = 9000;
        assert_eq!(config.bind_address().to_string(), "0.0.0.0:9000");
    }
}
