//! Error types for the data-access layer.
//!
//! The application layer (CLI, config loading) works with `anyhow`; everything
//! that talks to the backend returns [`Error`] so callers can tell a remote
//! failure from a transport problem or a bad row shape.

use serde::Deserialize;
use thiserror::Error;

/// PostgREST code returned when a single-row request matched no rows.
pub const NOT_FOUND_CODE: &str = "PGRST116";

/// Postgres unique violation.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

pub type Result<T> = std::result::Result<T, Error>;

/// Error body as returned by the backend.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RemoteError {
    #[serde(skip)]
    pub status: u16,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        self.code.as_deref() == Some(NOT_FOUND_CODE)
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(UNIQUE_VIOLATION_CODE)
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Remote(RemoteError),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode rows from {relation}: {source}")]
    Decode {
        relation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to {action}: {source}")]
    Operation {
        action: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported timeframe: {0}")]
    UnsupportedTimeframe(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl Error {
    /// Returns the remote error if this is (or wraps) one.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Error::Remote(remote) => Some(remote),
            Error::Operation { source, .. } => source.remote(),
            _ => None,
        }
    }

    /// Transport failures and server-side errors are worth another attempt;
    /// client errors will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Remote(remote) => remote.status >= 500,
            Error::Operation { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<fjall::Error> for Error {
    fn from(e: fjall::Error) -> Self {
        Error::Cache(e.to_string())
    }
}

/// Attaches the failing action to an error, e.g. "Failed to fetch top holdings: ...".
pub trait ResultExt<T> {
    fn during(self, action: &'static str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn during(self, action: &'static str) -> Result<T> {
        self.map_err(|e| Error::Operation {
            action,
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(status: u16, code: &str, message: &str) -> Error {
        Error::Remote(RemoteError {
            status,
            code: Some(code.to_string()),
            message: message.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_operation_prefixes_remote_message() {
        let err: Result<()> = Err(remote(400, "42P01", "relation does not exist"));
        let err = err.during("fetch top holdings").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to fetch top holdings: relation does not exist"
        );
        assert_eq!(err.remote().and_then(|r| r.code.as_deref()), Some("42P01"));
    }

    #[test]
    fn test_retryable_only_for_server_errors() {
        assert!(remote(503, "", "unavailable").is_retryable());
        assert!(!remote(400, "22P02", "invalid input syntax").is_retryable());
        assert!(!Error::InvalidInput("id".into()).is_retryable());
    }

    #[test]
    fn test_remote_error_body_parsing() {
        let body = r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#;
        let parsed: RemoteError = serde_json::from_str(body).unwrap();
        assert!(parsed.is_not_found());
        assert_eq!(
            parsed.details.as_deref(),
            Some("The result contains 0 rows")
        );
    }
}
