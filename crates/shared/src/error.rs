//! Shared error types: transport failures, the client error taxonomy and the
//! normalized descriptor handed to error callbacks.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::GraphqlResponse;

/// Fallback text when a failure carries no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong!";

/// Per-field validation messages, aggregated across all failing rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages recorded for one field (empty if the field is valid).
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of messages across all fields.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Transport-level failure of a single HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Network(String),
    Http { status: u16, body: String },
    Deserialize(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
            ApiError::Deserialize(msg) => write!(f, "Deserialization error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Attempt to pull a user-facing message out of an HTTP error body.
///
/// GraphQL servers reject bad requests with a regular `{"errors": [...]}`
/// envelope; plain `{"message": "..."}` bodies are accepted too.
pub fn try_error_message(body: &str) -> Option<(String, Option<String>)> {
    if let Ok(resp) = serde_json::from_str::<GraphqlResponse>(body) {
        if let Some(err) = resp.errors.first() {
            if !err.message.trim().is_empty() {
                return Some((err.message.clone(), err.code()));
            }
        }
    }
    #[derive(Deserialize)]
    struct Plain {
        message: String,
    }
    let plain = serde_json::from_str::<Plain>(body).ok()?;
    if plain.message.trim().is_empty() {
        None
    } else {
        Some((plain.message, None))
    }
}

/// Everything that can go wrong between a UI trigger and a settled result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Local input rejected before any network call.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    /// Transport or handshake failure, or a response that does not match the
    /// operation's declared shape.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The endpoint answered with a structured failure (e.g. duplicate email).
    #[error("{message}")]
    Application {
        message: String,
        code: Option<String>,
    },
    /// Binary transfer failed or returned no URL.
    #[error("upload failed: {0}")]
    Upload(String),
}

impl ClientError {
    pub fn descriptor(&self) -> ErrorDescriptor {
        match self {
            ClientError::Validation(errors) => ErrorDescriptor {
                kind: ErrorKind::Validation,
                message: errors.to_string(),
                code: None,
            },
            ClientError::Protocol(message) => ErrorDescriptor {
                kind: ErrorKind::Protocol,
                message: message.clone(),
                code: None,
            },
            ClientError::Application { message, code } => ErrorDescriptor {
                kind: ErrorKind::Application,
                message: message.clone(),
                code: code.clone(),
            },
            ClientError::Upload(message) => ErrorDescriptor {
                kind: ErrorKind::Upload,
                message: message.clone(),
                code: None,
            },
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http { status, ref body } => match try_error_message(body) {
                Some((message, code)) => ClientError::Application { message, code },
                None => ClientError::Protocol(format!("HTTP {status}")),
            },
            other => ClientError::Protocol(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Protocol,
    Application,
    Upload,
}

/// Normalized failure delivered to `on_error` callbacks and stored in query cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
    pub code: Option<String>,
}

impl ErrorDescriptor {
    /// Text suitable for a toast.
    pub fn display_text(&self) -> &str {
        if self.message.trim().is_empty() {
            GENERIC_ERROR_MESSAGE
        } else {
            &self.message
        }
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}
