//! quizforge-store: Backend implementations.
//!
//! Implements the `Backend` trait for an in-memory store, a local JSON data
//! file and a PostgREST-style HTTP API, plus the configuration that picks
//! one of them.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod rest;

pub use config::{create_backend, load_config, load_config_from, BackendConfig, QuizforgeConfig};
pub use error::ConfigError;
pub use file::JsonFileBackend;
pub use memory::InMemoryBackend;
pub use rest::RestBackend;
