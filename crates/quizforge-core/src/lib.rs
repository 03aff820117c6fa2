//! quizforge-core: Sessions, scoring, statistics and import parsing.
//!
//! This crate defines the data model, the backend traits and the pure
//! test-taking logic that the rest of quizforge builds on. The
//! `QuizEngine` ties them together against any `Backend` implementation.

pub mod auth;
pub mod engine;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod report;
pub mod scorer;
pub mod session;
pub mod statistics;
pub mod traits;
