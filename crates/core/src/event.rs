//! Turn-level streaming events.
//!
//! `TurnEvent` is the explicit channel between the orchestrator and
//! whatever transport delivers the conversation to the user. Consumers
//! treat the stream as append-only and terminal at `Done`.

use serde::{Deserialize, Serialize};

/// Events emitted by the orchestrator while processing one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Optional narration of a reasoning step.
    Thinking { content: String },

    /// A tool is being dispatched.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// Partial text of the final reply.
    MessageDelta { content: String },

    /// The complete final reply for this turn.
    MessageFinal { text: String },

    /// The turn is complete. Terminal.
    Done { conversation_id: String },
}

impl TurnEvent {
    /// Transport-level event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Thinking { .. } => "thinking",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::MessageDelta { .. } => "message_delta",
            Self::MessageFinal { .. } => "message_final",
            Self::Done { .. } => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_tool_call() {
        let event = TurnEvent::ToolCall {
            id: "call_1".into(),
            name: "get_account_stats".into(),
            input: serde_json::json!({"time_range": "last_7_days"}),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"tool_call""#));
        assert!(json.contains("get_account_stats"));
    }

    #[test]
    fn event_serialization_done() {
        let event = TurnEvent::Done {
            conversation_id: "abc".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"done""#));
        assert!(event.is_terminal());
    }

    #[test]
    fn event_type_names() {
        assert_eq!(
            TurnEvent::Thinking {
                content: "x".into()
            }
            .event_type(),
            "thinking"
        );
        assert_eq!(
            TurnEvent::MessageFinal { text: "x".into() }.event_type(),
            "message_final"
        );
        assert_eq!(
            TurnEvent::ToolResult {
                id: "a".into(),
                name: "b".into(),
                output: "c".into(),
                success: true
            }
            .event_type(),
            "tool_result"
        );
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"message_delta","content":"hi"}"#;
        let event: TurnEvent = serde_json::from_str(json).unwrap();
        match event {
            TurnEvent::MessageDelta { content } => assert_eq!(content, "hi"),
            _ => panic!("Wrong variant"),
        }
    }
}
