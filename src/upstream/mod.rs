//! Upstream subsystem (proxy mode).
//!
//! # Data Flow
//! ```text
//! inbound path
//!     → join.rs (base URL + path)
//!     → client.rs (single outbound call, body buffered as received)
//!     → decode.rs (content codings undone, headers kept)
//!     → ProxyResponseRecord (status, headers, body, source URL)
//!     → relayed to the client, then logged
//! ```
//!
//! # Design Decisions
//! - One attempt per request; no retries, no idle connection reuse
//! - No timeout unless one is configured
//! - Failures propagate to the connection instead of being turned into 5xx replies
//! - The record keeps the upstream's own headers; only the body is decoded

pub mod client;
pub mod decode;
pub mod join;

pub use client::{ProxyResponseRecord, UpstreamClient, UpstreamError};
pub use decode::DecodeError;
pub use join::join;
