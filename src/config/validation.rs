//! Configuration validation.
//!
//! # Responsibilities
//! - Reject conflicting response modes (static text and static JSON together)
//! - Reject status codes that cannot be written on the wire
//! - Flag, without failing, a static JSON body that does not parse
//!
//! # Design Decisions
//! - Validation is a pure function: `&MirrorConfig → Result<(), ConfigError>`
//! - Runs before a socket is bound; any error is fatal at startup
//! - The proxy target is deliberately left unchecked

use crate::config::schema::MirrorConfig;

/// Fatal configuration problems.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--text and --json cannot be used at the same time")]
    ConflictingResponseMode,

    #[error("{0} is not a valid HTTP status code (expected 100-999)")]
    InvalidStatusCode(u16),
}

/// Check the semantic invariants of a configuration.
pub fn validate_config(config: &MirrorConfig) -> Result<(), ConfigError> {
    if config.static_text.is_some() && config.static_json.is_some() {
        return Err(ConfigError::ConflictingResponseMode);
    }
    Ok(())
}

/// Parse the static JSON body, returning the parse error if it is malformed.
///
/// A malformed body is still served verbatim; the caller only warns about it.
pub fn lint_static_json(config: &MirrorConfig) -> Option<serde_json::Error> {
    let json = config.static_json.as_deref()?;
    serde_json::from_str::<serde_json::Value>(json).err()
}
