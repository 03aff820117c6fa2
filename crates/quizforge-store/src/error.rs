//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration or building a backend from it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A backend variant is missing a required setting.
    #[error("{backend} backend requires {field}")]
    MissingField {
        backend: &'static str,
        field: &'static str,
    },
}
