//! Error types for the PAPI client
//!
//! This module defines all error types used throughout the crate, including
//! the problem document the API returns on a failed request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Result type alias for PAPI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the PAPI client
#[derive(Error, Debug)]
pub enum Error {
    /// Request failed local validation; nothing was sent
    #[error("struct validation:\n{0}")]
    Validation(#[from] ValidationErrors),

    /// A rule tree could not be decoded
    #[error("malformed rule tree: {0}")]
    MalformedTree(String),

    /// The requested resource was absent from a list response
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The API answered with an unexpected status
    #[error("{0}")]
    Remote(ApiError),

    /// A resource link returned by the API could not be parsed
    #[error("invalid response link: {0}")]
    InvalidResponseLink(String),

    /// The transport failed before a response was available
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a malformed tree error
    pub fn malformed_tree(msg: impl Into<String>) -> Self {
        Self::MalformedTree(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid response link error
    pub fn invalid_link(msg: impl Into<String>) -> Self {
        Self::InvalidResponseLink(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for local not-found conditions and for remote 404 answers
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Remote(api) => api.is_not_found(),
            _ => false,
        }
    }

    /// The remote problem document, if this error came from the API
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Remote(api) => Some(api),
            _ => None,
        }
    }

    /// The validation report, if this error came from local validation
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errs) => Some(errs),
            _ => None,
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Self::Remote(err)
    }
}

/// Problem document returned by the API on a failed request
///
/// Bodies that are not valid problem documents are still turned into an
/// `ApiError`: the title says so and the raw body is kept in `detail`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Problem type URI
    #[serde(rename = "type", default)]
    pub error_type: String,

    /// Short human-readable summary
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Human-readable explanation
    #[serde(default)]
    pub detail: String,

    /// Identifier of this occurrence
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance: String,

    /// Behavior the problem relates to, for rule-tree errors
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub behavior_name: String,

    /// JSON pointer into the submitted rule tree
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_location: String,

    /// HTTP status of the response
    #[serde(default, skip_serializing_if = "is_zero")]
    pub status_code: u16,

    /// Nested errors, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,

    /// Nested warnings, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<serde_json::Value>,

    /// Name of the exhausted limit, for 429 answers
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub limit_key: String,

    /// Limit value, for 429 answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    /// Remaining quota, for 429 answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i64>,
}

fn is_zero(value: &u16) -> bool {
    *value == 0
}

impl ApiError {
    /// Build an error from a non-success response
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let mut err = match serde_json::from_slice::<ApiError>(body) {
            Ok(err) => err,
            Err(e) => {
                tracing::error!("could not unmarshal API error: {}", e);
                ApiError {
                    title: "Failed to unmarshal error body. PAPI API failed. Check details for more information."
                        .to_string(),
                    detail: String::from_utf8_lossy(body).into_owned(),
                    ..Default::default()
                }
            }
        };
        err.status_code = status;
        err
    }

    /// True when the API reported that the resource does not exist
    pub fn is_not_found(&self) -> bool {
        self.status_code == 404
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(msg) => write!(f, "API error: \n{}", msg),
            Err(e) => write!(f, "error marshaling API error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}
