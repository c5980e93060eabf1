//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line
//!     → flags.rs (clap parsing, defaults)
//!     → validation.rs (semantic checks)
//!     → MirrorConfig (validated, immutable)
//!     → shared via Arc with the request handler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once built; there is no reload
//! - Every field has a default so tests can start from `MirrorConfig::default()`
//! - Proxy target well-formedness is not checked here; a bad URL fails per request

pub mod flags;
pub mod schema;
pub mod validation;

pub use flags::Flags;
pub use schema::{BindScope, MirrorConfig, ResponseMode, StaticBody};
pub use validation::{validate_config, ConfigError};
