//! Confirmation gate lifecycle — summary rendering and reply interpretation.
//!
//! When the guardrail validator returns `confirm`, the orchestrator renders
//! a summary of exactly what would happen, stashes the gated call on the
//! conversation, and ends the turn. The next user message is interpreted
//! against that gate: an explicit affirmative dispatches it, an explicit
//! refusal drops it, anything else drops the gate and is handled normally.

use warroom_core::backend::ProposedCall;
use warroom_core::conversation::{is_affirmative, is_negative};

/// How a user reply relates to a pending confirmation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationVerdict {
    Affirmed,
    Denied,
    Unrelated,
}

pub fn interpret(reply: &str) -> ConfirmationVerdict {
    if is_affirmative(reply) {
        ConfirmationVerdict::Affirmed
    } else if is_negative(reply) {
        ConfirmationVerdict::Denied
    } else {
        ConfirmationVerdict::Unrelated
    }
}

/// Phrases that explicitly reset the conversation to idle.
pub fn is_reset(reply: &str) -> bool {
    const RESETS: &[&str] = &["reset", "start over", "start fresh", "new topic", "clear this"];
    let normalized = reply.trim().trim_end_matches(['.', '!']).to_lowercase();
    RESETS.contains(&normalized.as_str())
}

/// Render the confirmation summary the user must answer before a gated
/// call is dispatched. Shows the tool, the key fields, the reason the gate
/// fired, and any sensitive terms worth a second look.
pub fn render_summary(call: &ProposedCall, reason: &str, sensitive: &[&str]) -> String {
    let mut out = String::from("Before I proceed, please confirm:\n\n");
    out.push_str(&format!("**Action:** {}\n", call.name));

    let mut fields: Vec<(&str, String)> = Vec::new();
    if let Some(obj) = call.input.as_object() {
        for (key, value) in obj {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            fields.push((key.as_str(), rendered));
        }
    }
    for (key, value) in fields {
        out.push_str(&format!("- {key}: {value}\n"));
    }

    out.push_str(&format!("\n**Why I'm asking:** {reason}\n"));

    if !sensitive.is_empty() {
        out.push_str(&format!(
            "**Worth a look:** copy mentions {} — may need additional review.\n",
            sensitive.join(", ")
        ));
    }

    out.push_str("\nReply **\"yes\"** to proceed, or tell me what to change.");
    out
}
