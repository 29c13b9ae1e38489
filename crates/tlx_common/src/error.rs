//! Error types for tinyllamax.

use crate::intent::IntentKind;
use thiserror::Error;

/// Intent payload could not be turned into a typed `Intent`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntentError {
    #[error("Intent payload must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("Missing 'intent' field")]
    MissingTag,

    #[error("Unknown intent '{name}' (allowed: {})", allowed.join(", "))]
    UnknownIntent { name: String, allowed: Vec<String> },

    #[error("Validation failed for intent '{intent}': {reason}")]
    Invalid { intent: String, reason: String },

    #[error("Model returned empty output")]
    EmptyOutput,

    #[error("Invalid JSON from model: {raw}")]
    InvalidJson { raw: String },
}

/// Planning failed before any command was built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Unsupported package manager: {0}")]
    UnsupportedPackageManager(String),

    #[error("Unsupported intent type: {0}")]
    UnsupportedIntent(IntentKind),

    #[error(transparent)]
    Intent(#[from] IntentError),
}

/// Raised by `CancellationToken::check_cancelled` once a task was cancelled.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Operation was cancelled")]
pub struct Cancelled;

/// Model backend errors
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_intent_lists_allowed() {
        let err = IntentError::UnknownIntent {
            name: "Reboot".to_string(),
            allowed: vec!["DetectDistro".to_string(), "UpdateSystem".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Reboot"));
        assert!(msg.contains("DetectDistro, UpdateSystem"));
    }

    #[test]
    fn test_plan_error_wraps_intent_error() {
        let err: PlanError = IntentError::MissingTag.into();
        assert_eq!(err.to_string(), "Missing 'intent' field");
    }
}
