//! echomirror: a local diagnostic HTTP server.
//!
//! Every GET/POST/PUT/DELETE request is written to the console (method, path,
//! headers, body) and answered either with a fixed response or by relaying it to
//! an upstream URL, in which case the upstream's reply is logged too.
//!
//! ```text
//!     Client ──▶ net::listener ──▶ http::server ──▶ http::handler ──┬─▶ static reply
//!                                                                   └─▶ upstream::client ──▶ Upstream
//!     Client ◀── http::response ◀───────────────────────────────────┘
//!                     │
//!                     └─▶ http::delivery (after the flush) ──▶ observability::transcript
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod upstream;

pub use config::MirrorConfig;
pub use http::MirrorServer;
pub use lifecycle::Shutdown;
pub use observability::{Transcript, TranscriptSink};
