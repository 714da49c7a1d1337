//! Activity log entry types — the durable audit record.
//!
//! Every tool invocation and notable user action produces an entry keyed
//! for idempotent replay. Entries are never updated or deleted; corrections
//! are new entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::guardrail::GuardrailDecision;

/// Who performed the logged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    User,
    Agent,
}

/// What kind of action was logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    DraftCreated,
    DraftUpdated,
    CampaignPublished,
    BudgetChanged,
    CampaignPaused,
    RecommendationMade,
    CopyGenerated,
    BriefGenerated,
    GuardrailFired,
    TurnFailed,
    /// Generic record for read-only tool invocations.
    ToolInvoked,
}

/// A single append-only activity entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Idempotency key — duplicate appends are rejected, not doubled.
    pub key: String,

    pub conversation_id: ConversationId,
    pub timestamp: DateTime<Utc>,
    pub actor: Actor,
    pub kind: ActivityKind,

    /// Rationale text suitable for direct display in an activity timeline.
    pub rationale: String,

    /// The triggering tool invocation, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,

    /// The guardrail decision attached to the invocation, when gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<GuardrailDecision>,
}

impl ActivityEntry {
    pub fn new(
        key: impl Into<String>,
        conversation_id: ConversationId,
        actor: Actor,
        kind: ActivityKind,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            conversation_id,
            timestamp: Utc::now(),
            actor,
            kind,
            rationale: rationale.into(),
            invocation_id: None,
            decision: None,
        }
    }

    pub fn with_invocation(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = Some(invocation_id.into());
        self
    }

    pub fn with_decision(mut self, decision: GuardrailDecision) -> Self {
        self.decision = Some(decision);
        self
    }
}
