//! Error types for the Warroom domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Warroom operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Conversation lifecycle errors ---
    #[error("State error: {0}")]
    State(#[from] StateError),

    // --- Draft lifecycle errors ---
    #[error("Draft error: {0}")]
    Draft(#[from] DraftError),

    // --- Decision log errors ---
    #[error("Log error: {0}")]
    Log(#[from] LogError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool input: {tool_name} — {reason}")]
    InvalidInput { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name} — {message}")]
    ExecutionFailed {
        tool_name: String,
        message: String,
        retryable: bool,
    },
}

impl ToolError {
    /// Whether the orchestrator may feed this error back for a retry attempt.
    /// Schema mismatches are always retryable: the backend can adjust the input.
    pub fn retryable(&self) -> bool {
        match self {
            Self::NotFound(_) => false,
            Self::InvalidInput { .. } => true,
            Self::ExecutionFailed { retryable, .. } => *retryable,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum StateError {
    #[error("Invalid transition: {from} → {to}")]
    InvalidTransition { from: String, to: String },
}

#[derive(Debug, Clone, Error)]
pub enum DraftError {
    #[error("Draft {0} is published and cannot be modified")]
    AlreadyPublished(String),

    #[error("Invalid status change for draft {draft_id}: {from} → {to}")]
    InvalidStatus {
        draft_id: String,
        from: String,
        to: String,
    },
}

#[derive(Debug, Clone, Error)]
pub enum LogError {
    #[error("Duplicate log key: {0}")]
    DuplicateKey(String),

    #[error("Log sink failed: {0}")]
    SinkFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::ExecutionFailed {
            tool_name: "publish_campaign".into(),
            message: "platform rejected the creative".into(),
            retryable: false,
        });
        assert!(err.to_string().contains("publish_campaign"));
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn invalid_input_is_retryable() {
        let err = ToolError::InvalidInput {
            tool_name: "adjust_budget".into(),
            reason: "missing field `new_budget`".into(),
        };
        assert!(err.retryable());
        assert!(!ToolError::NotFound("nope".into()).retryable());
    }

    #[test]
    fn state_error_names_both_ends() {
        let err = StateError::InvalidTransition {
            from: "idle".into(),
            to: "published".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("idle"));
        assert!(msg.contains("published"));
    }
}
