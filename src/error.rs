//! Unified error report for the JSON surfaces
//!
//! Engine failures are `eip712::Eip712Error`; this module turns them (and
//! process-boundary failures such as unreadable files) into a serialisable
//! report with a stable error code.

use crate::eip712::Eip712Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error report returned by the CLI and other JSON consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AuthError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for AuthError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Undefined type, missing/unexpected field, value variant mismatch
    Schema,
    /// Malformed type string, out-of-range value, unparseable input
    Encoding,
    /// Malformed private-key material
    Key,
    /// Wrong signature length or recovery byte
    SignatureFormat,
    /// Cryptographic public-key recovery failed
    Recovery,
    /// Recovered address differs from the expected one
    AddressMismatch,

    // Process boundary
    InvalidInput,
    Internal,
}

/// Result type alias for reported operations
pub type AuthResult<T> = Result<T, AuthError>;

impl From<Eip712Error> for AuthError {
    fn from(e: Eip712Error) -> Self {
        AuthError::new(e.code(), e.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::new(ErrorCode::InvalidInput, format!("JSON error: {}", e))
    }
}

impl From<std::io::Error> for AuthError {
    fn from(e: std::io::Error) -> Self {
        AuthError::new(ErrorCode::Internal, e.to_string())
    }
}
