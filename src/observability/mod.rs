//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! handler, server, upstream client
//!     → logging.rs (structured tracing events on stderr)
//!
//! connection write side, after the response has been flushed
//!     → transcript.rs (queued, written to stdout by one writer task)
//! ```
//!
//! # Design Decisions
//! - Diagnostics and transcripts never share a stream
//! - Each request runs inside a span carrying a generated request ID
//! - Transcript output can never fail a request

pub mod logging;
pub mod transcript;

pub use logging::{init_logging, LoggingError};
pub use transcript::{Style, Transcript, TranscriptSink};
