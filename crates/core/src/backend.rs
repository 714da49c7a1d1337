//! Completion backend trait — the abstraction over the reasoning model.
//!
//! The orchestrator gives the backend the scoped memory block, the recent
//! history window, and the tool catalog; the backend replies with either a
//! final user-facing message or a set of proposed tool calls. The backend
//! never dispatches anything itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::error::BackendError;
use crate::tool::ToolDefinition;

/// A tool call proposed by the backend. Dispatch is the orchestrator's
/// decision, subject to guardrails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedCall {
    /// Unique call ID (assigned by the backend or synthesized)
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Input payload, to be validated against the tool's schema
    pub input: serde_json::Value,
}

/// What the backend decided to do with this reasoning step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendReply {
    /// A final natural-language reply; the turn ends.
    Final { text: String },

    /// Proposed tool calls, with optional visible reasoning.
    Act {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
        calls: Vec<ProposedCall>,
    },
}

/// Everything the backend sees for one reasoning step.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Persona / identity prompt.
    pub system_prompt: String,

    /// Rendered scoped memory plus accumulated observations for this turn.
    pub context_block: String,

    /// Recent conversation window, oldest first.
    pub history: Vec<Message>,

    /// The user message being processed.
    pub user_message: String,

    /// Tools the backend may propose.
    pub tools: Vec<ToolDefinition>,
}

/// The completion backend contract.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Run one reasoning step.
    async fn complete(
        &self,
        request: TurnRequest,
    ) -> std::result::Result<BackendReply, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_serialization_tags() {
        let final_reply = BackendReply::Final {
            text: "All set.".into(),
        };
        let json = serde_json::to_string(&final_reply).unwrap();
        assert!(json.contains(r#""kind":"final""#));

        let act = BackendReply::Act {
            thought: Some("need performance data".into()),
            calls: vec![ProposedCall {
                id: "c1".into(),
                name: "get_top_performers".into(),
                input: serde_json::json!({"limit": 3}),
            }],
        };
        let json = serde_json::to_string(&act).unwrap();
        assert!(json.contains(r#""kind":"act""#));
        assert!(json.contains("get_top_performers"));
    }

    #[test]
    fn reply_deserialization() {
        let json = r#"{"kind":"act","calls":[{"id":"c1","name":"get_account_stats","input":{}}]}"#;
        let reply: BackendReply = serde_json::from_str(json).unwrap();
        match reply {
            BackendReply::Act { thought, calls } => {
                assert!(thought.is_none());
                assert_eq!(calls.len(), 1);
            }
            _ => panic!("wrong variant"),
        }
    }
}
