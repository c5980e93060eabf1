//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! MirrorConfig (port, bind scope)
//!     → listener.rs (resolve address, bind)
//!     → Hand off to the HTTP server's accept loop
//! ```

pub mod listener;

pub use listener::{bind, ListenerError};
