//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, hyper HTTP/1.1 connection, request span)
//!     → handler.rs (method dispatch, response mode)
//!     → request.rs (header collapse, single body read)
//!     → [upstream client, proxy mode only]
//!     → response.rs (static or relayed response, transcript attached)
//!     → Send to client
//!     → delivery.rs (transcript released after the flush, then to console)
//! ```

pub mod delivery;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{MirrorHandler, RelayError};
pub use request::{DuplicateHeader, HeaderSet, InboundRequest};
pub use response::{MirrorBody, ALLOWED_METHODS};
pub use server::{MirrorServer, ServerError};
