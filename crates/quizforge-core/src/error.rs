//! Error types for quizforge.
//!
//! `StoreError` is defined here rather than in `quizforge-store` so the
//! engine can downcast backend failures without string matching.

use thiserror::Error;

/// Errors raised by the test-taking session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A test cannot be started without questions.
    #[error("test has no questions")]
    EmptyQuestionSet,

    /// The test exists but is not accepting attempts.
    #[error("test is not active: {0}")]
    InactiveTest(String),
}

/// Errors raised while parsing an import payload.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file extension does not name a supported format.
    #[error("unsupported import format: {0}")]
    UnsupportedFormat(String),

    /// The JSON payload could not be parsed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A JSON element violated the record shape; the whole import is rejected.
    #[error("invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// The payload could not be read.
    #[error("failed to read import file: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation failures on user input, raised before any write.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("a question needs exactly 4 non-empty options")]
    IncompleteOptions,

    #[error("correct option index out of range: {0}")]
    CorrectOutOfRange(usize),

    #[error("not signed in")]
    NotSignedIn,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the given id exists in the collection.
    #[error("{collection} record not found: {id}")]
    NotFound { collection: String, id: String },

    /// The backend rejected the credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend returned an error response.
    #[error("backend error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Local persistence failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend is unreachable by configuration (test fakes).
    #[error("backend is offline")]
    Offline,
}

impl StoreError {
    /// Returns `true` if the error is a missing-record error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
