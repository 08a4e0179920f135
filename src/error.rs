//! Error types for ESP3 telegram processing.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context for debugging and recovery guidance.
//!
//! ## Error Categories
//!
//! - **Frame Errors**: checksum mismatches and malformed wire frames
//! - **Construction Errors**: packets that cannot be serialized (oversized sections)
//! - **Catalog Errors**: problems loading or validating the profile catalog
//! - **Codec Errors**: field lookups and value conversions during encode
//! - **Transport Errors**: I/O failures reported by the transport collaborator
//! - **Timeouts**: request/response waits that expired
//!
//! Parse-level conditions that are *expected* during normal operation (an
//! incomplete buffer, a corrupt candidate frame, a profile that is not in the
//! catalog) are not represented here. They surface as [`ParseResult`]
//! variants, `Option`s, or encode statuses, because the protocol core must
//! keep running through all of them (see the crate docs).
//!
//! [`ParseResult`]: crate::framer::ParseResult
//!
//! ## Recovery
//!
//! Errors classify themselves as recoverable or not:
//!
//! ```rust
//! use esp3::Esp3Error;
//! use std::time::Duration;
//!
//! let error = Esp3Error::Timeout { duration: Duration::from_secs(1) };
//! if error.is_recoverable() {
//!     // retry the request
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for ESP3 operations.
pub type Result<T, E = Esp3Error> = std::result::Result<T, E>;

/// Main error type for ESP3 operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Esp3Error {
    #[error("Cannot build frame: {section} section is {len} bytes, limit is 255")]
    SectionTooLong { section: &'static str, len: usize },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Catalog error: {reason}")]
    Catalog {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Field '{shortcut}' not found in profile")]
    FieldNotFound { shortcut: String },

    #[error("Value conversion error: {details}")]
    ValueConversion { details: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed")]
    ConnectionClosed,
}

impl Esp3Error {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Esp3Error::Timeout { .. } => true,
            Esp3Error::Transport { .. } => true,
            Esp3Error::SectionTooLong { .. } => false,
            Esp3Error::Parse { .. } => false,
            Esp3Error::Catalog { .. } => false,
            Esp3Error::FieldNotFound { .. } => false,
            Esp3Error::ValueConversion { .. } => false,
            Esp3Error::ConnectionClosed => false,
        }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        Esp3Error::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for catalog errors without a source.
    pub fn catalog_error(reason: impl Into<String>) -> Self {
        Esp3Error::Catalog { reason: reason.into(), source: None }
    }

    /// Helper constructor for catalog errors with a source.
    pub fn catalog_error_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Esp3Error::Catalog { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for transport errors with I/O context.
    pub fn transport_error(context: impl Into<String>, source: std::io::Error) -> Self {
        Esp3Error::Transport { context: context.into(), source }
    }
}

impl From<std::io::Error> for Esp3Error {
    fn from(err: std::io::Error) -> Self {
        Esp3Error::Transport { context: "I/O".to_string(), source: err }
    }
}
