//! Core error types for the element graph
//!
//! Missing entities are never errors in this crate: lookups return `None`
//! and mutations become no-ops. The variants here cover caller-contract
//! violations, malformed patches and boundary failures.

use thiserror::Error;

/// Core error types for model operations
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Selection required: no element selected or the selected element does not exist")]
    SelectionRequired,

    #[error("Invalid patch: {message}")]
    InvalidPatch { message: String },

    #[error("Invalid attribute '{key}': {reason}")]
    InvalidAttribute { key: String, reason: String },

    #[error("Topic '{topic}' already has a request handler")]
    DuplicateSubscriber { topic: String },

    #[error("Codec error: {message}")]
    Codec { message: String },

    #[error("Timed out waiting for {what}")]
    Timeout { what: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl ModelError {
    /// Create a new invalid patch error
    pub fn invalid_patch(message: impl Into<String>) -> Self {
        Self::InvalidPatch {
            message: message.into(),
        }
    }

    /// Create a new invalid attribute error
    pub fn invalid_attribute(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new codec error
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_required() {
        let error_msg = format!("{}", ModelError::SelectionRequired);
        assert!(error_msg.contains("Selection required"));
    }

    #[test]
    fn test_invalid_patch() {
        let error = ModelError::invalid_patch("extension is missing a name");
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Invalid patch"));
        assert!(error_msg.contains("missing a name"));
    }

    #[test]
    fn test_invalid_attribute() {
        let error = ModelError::invalid_attribute("id", "immutable");
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("'id'"));
        assert!(error_msg.contains("immutable"));
    }

    #[test]
    fn test_codec_error() {
        let error = ModelError::codec("unexpected end of input");
        assert!(format!("{}", error).contains("Codec error"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: ModelError = json_err.into();
        assert!(format!("{}", error).contains("JSON error"));
    }
}
