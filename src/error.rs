//! Library error types
//!
//! Only construction and configuration can fail. Reads degrade to the
//! default value and writes report a `bool`, so neither appears here.

use thiserror::Error;

/// Errors returned by the reactive preference layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefsError {
    /// A preference was requested with an empty key
    #[error("preference key cannot be empty")]
    EmptyKey,

    /// Invalid configuration provided
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, PrefsError>;
