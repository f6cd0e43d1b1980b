//! Sync error handling
//!
//! Typed errors for the sync protocol client. Callers branch on the variant
//! to decide between a transient "try again" notification and a
//! per-operation failure message.

use thiserror::Error;

/// Errors that can occur while building commands or talking to the sync endpoint
#[derive(Error, Debug)]
pub enum SyncError {
    /// Malformed input caught before any network call
    #[error("Invalid command: {message}")]
    Validation { message: String },

    /// Network or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("Sync endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Response body is not the expected JSON shape
    #[error("Failed to decode sync response: {message}")]
    Decode { message: String },

    /// A single command in the batch was rejected by the server
    #[error("{command_type} failed ({uuid}): {message} (code {code})")]
    Command {
        command_type: String,
        uuid: String,
        code: i64,
        message: String,
    },

    /// A temp ID in the response mapping has no matching entity
    #[error("Temporary id '{temp_id}' was not resolved to an entity in the response")]
    TempIdUnresolved { temp_id: String },

    /// An operation addressed an entity that the merged snapshot does not contain
    #[error("{kind} '{id}' not found in snapshot")]
    EntityNotFound { kind: &'static str, id: String },

    /// The caller cancelled the in-flight call
    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Shorthand for a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        SyncError::Decode {
            message: message.into(),
        }
    }

    /// Check if retrying the same call (with the same commands) may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport(_) | SyncError::Decode { .. } | SyncError::Cancelled => true,
            SyncError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Message suitable for showing next to the operation that failed
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Command {
                command_type,
                message,
                ..
            } => format!("{} failed: {}", describe_command(command_type), message),
            SyncError::Validation { message } => message.clone(),
            e if e.is_retryable() => format!("Could not reach the server, try again ({})", e),
            e => e.to_string(),
        }
    }
}

fn describe_command(command_type: &str) -> &str {
    match command_type {
        "item_add" => "task create",
        "item_update" => "task update",
        "item_delete" => "task delete",
        "item_close" => "task complete",
        "item_uncomplete" => "task reopen",
        "project_add" => "project create",
        "project_update" => "project update",
        "project_archive" => "project archive",
        "label_add" => "label create",
        other => other,
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SyncError::Cancelled.is_retryable());
        assert!(SyncError::decode("eof").is_retryable());
        assert!(SyncError::HttpStatus {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(SyncError::HttpStatus {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(!SyncError::HttpStatus {
            status: 403,
            body: "Forbidden".into()
        }
        .is_retryable());
        assert!(!SyncError::validation("empty").is_retryable());
    }

    #[test]
    fn test_command_user_message() {
        let err = SyncError::Command {
            command_type: "item_update".into(),
            uuid: "u".into(),
            code: 15,
            message: "Invalid temporary id".into(),
        };
        assert_eq!(err.user_message(), "task update failed: Invalid temporary id");
        assert!(err.to_string().contains("Invalid temporary id"));
    }

    #[test]
    fn test_http_status_display_keeps_body() {
        let err = SyncError::HttpStatus {
            status: 400,
            body: r#"{"error": "bad token"}"#.into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("bad token"));
    }

    #[test]
    fn test_temp_id_unresolved_display() {
        let err = SyncError::TempIdUnresolved {
            temp_id: "tmp-1".into(),
        };
        assert!(err.to_string().contains("tmp-1"));
    }
}
