//! Conversation domain types — scope, lifecycle stage, and message log.
//!
//! A conversation is owned by exactly one scope (the whole workspace, or a
//! single page) and is created once per scope. Its stage tracks where a
//! drafting workflow currently stands; transitions are validated against an
//! explicit edge list, never inferred.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::ProposedCall;
use crate::error::StateError;
use crate::tool::ToolInvocation;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The memory/identity boundary a conversation is bound to.
///
/// One account-wide conversation exists per workspace; one page-scoped
/// conversation exists per included page. Archived legacy conversations are
/// read-only inputs to the pinned-summary migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    AccountWide { workspace_id: String },
    PageScoped { workspace_id: String, page_id: String },
    LegacyArchived { workspace_id: String },
}

impl Scope {
    pub fn workspace_id(&self) -> &str {
        match self {
            Self::AccountWide { workspace_id }
            | Self::PageScoped { workspace_id, .. }
            | Self::LegacyArchived { workspace_id } => workspace_id,
        }
    }

    pub fn page_id(&self) -> Option<&str> {
        match self {
            Self::PageScoped { page_id, .. } => Some(page_id),
            _ => None,
        }
    }

    pub fn is_page_scoped(&self) -> bool {
        matches!(self, Self::PageScoped { .. })
    }
}

/// Lifecycle stage of the drafting workflow within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Discovery,
    Ideation,
    Drafting,
    Review,
    ReadyToPublish,
    Published,
}

impl Stage {
    /// Whether `self → to` is a listed edge. A reset to `Idle` is always
    /// permitted; everything else follows the drafting workflow strictly.
    pub fn can_transition(self, to: Stage) -> bool {
        use Stage::*;
        if to == Idle {
            return true;
        }
        matches!(
            (self, to),
            (Idle, Discovery)
                | (Discovery, Ideation)
                | (Ideation, Drafting)
                | (Drafting, Review)
                | (Review, Drafting)
                | (Review, ReadyToPublish)
                | (ReadyToPublish, Published)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovery => "discovery",
            Self::Ideation => "ideation",
            Self::Drafting => "drafting",
            Self::Review => "review",
            Self::ReadyToPublish => "ready_to_publish",
            Self::Published => "published",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The agent
    Agent,
    /// System annotations (resets, migrations)
    System,
}

/// A single message in a conversation. Immutable once pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Monotonically increasing position within the conversation
    pub seq: u64,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool invocations made to produce this message (agent messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_trace: Vec<ToolInvocation>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            seq: 0,
            role,
            content: content.into(),
            tool_trace: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_trace(mut self, trace: Vec<ToolInvocation>) -> Self {
        self.tool_trace = trace;
        self
    }
}

/// A gated action waiting for the user's explicit go-ahead.
///
/// Stored in the conversation context when the guardrail validator returns
/// `confirm`; the next user message is interpreted against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// The rendered confirmation summary shown to the user.
    pub summary: String,
    /// The gated call, re-validated and dispatched on an affirmative reply.
    pub call: ProposedCall,
    /// Why the gate fired.
    pub reason: String,
    pub requested_at: DateTime<Utc>,
}

/// Small mutable context carried on the conversation between turns.
///
/// Replaces any notion of a global "current draft": the active references
/// are carried here explicitly and passed through each orchestration step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_product_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_draft_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_confirmation: Option<PendingConfirmation>,
}

/// A conversation: ordered messages plus workflow stage, bound to a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub scope: Scope,
    pub stage: Stage,
    pub context: TurnContext,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation in `Idle` for the given scope.
    pub fn new(scope: Scope) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            scope,
            stage: Stage::Idle,
            context: TurnContext::default(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message, assigning the next sequence number.
    pub fn push(&mut self, mut message: Message) {
        message.seq = self.messages.last().map(|m| m.seq + 1).unwrap_or(0);
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Advance the workflow stage along a listed edge.
    pub fn advance(&mut self, to: Stage) -> std::result::Result<(), StateError> {
        if !self.stage.can_transition(to) {
            return Err(StateError::InvalidTransition {
                from: self.stage.as_str().into(),
                to: to.as_str().into(),
            });
        }
        tracing::debug!(conversation_id = %self.id, from = %self.stage, to = %to, "Stage transition");
        self.stage = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Explicit reset: back to `Idle`, clearing any pending gate.
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.context.pending_confirmation = None;
        self.updated_at = Utc::now();
    }

    /// Recent messages, oldest first, capped at `window`.
    pub fn recent_window(&self, window: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(window);
        &self.messages[start..]
    }
}

/// Whether a user reply is an explicit affirmative.
///
/// The word list mirrors the confirm phrases the product has always
/// accepted ("yes", "go ahead", "approved", ...). Matching is on the whole
/// trimmed reply so that "yes, but change the headline" does not count as
/// an unqualified go-ahead.
pub fn is_affirmative(text: &str) -> bool {
    const AFFIRMATIVES: &[&str] = &[
        "yes",
        "y",
        "yes please",
        "confirm",
        "confirmed",
        "approved",
        "approve",
        "go ahead",
        "publish",
        "publish it",
        "launch",
        "launch it",
        "do it",
        "ship it",
        "ok",
        "okay",
    ];
    let normalized = text.trim().trim_end_matches(['.', '!']).to_lowercase();
    AFFIRMATIVES.contains(&normalized.as_str())
}

/// Whether a user reply is an explicit refusal of a pending gate.
pub fn is_negative(text: &str) -> bool {
    const NEGATIVES: &[&str] = &[
        "no",
        "n",
        "no thanks",
        "cancel",
        "don't",
        "dont",
        "stop",
        "not yet",
        "hold off",
        "abort",
    ];
    let normalized = text.trim().trim_end_matches(['.', '!']).to_lowercase();
    NEGATIVES.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_scope() -> Scope {
        Scope::PageScoped {
            workspace_id: "ws_1".into(),
            page_id: "page_1".into(),
        }
    }

    #[test]
    fn messages_get_monotonic_sequence() {
        let mut conv = Conversation::new(page_scope());
        conv.push(Message::user("hello"));
        conv.push(Message::agent("hi there"));
        conv.push(Message::user("show my stats"));

        let seqs: Vec<u64> = conv.messages.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn workflow_edges_allowed() {
        let mut conv = Conversation::new(page_scope());
        for to in [
            Stage::Discovery,
            Stage::Ideation,
            Stage::Drafting,
            Stage::Review,
            Stage::ReadyToPublish,
            Stage::Published,
        ] {
            conv.advance(to).unwrap();
        }
        assert_eq!(conv.stage, Stage::Published);
    }

    #[test]
    fn no_implicit_jumps() {
        let mut conv = Conversation::new(page_scope());
        // idle → published is not an edge
        let err = conv.advance(Stage::Published).unwrap_err();
        assert!(matches!(err, StateError::InvalidTransition { .. }));
        assert_eq!(conv.stage, Stage::Idle);

        conv.advance(Stage::Discovery).unwrap();
        assert!(conv.advance(Stage::Review).is_err());
    }

    #[test]
    fn review_loops_back_to_drafting() {
        let mut conv = Conversation::new(page_scope());
        conv.advance(Stage::Discovery).unwrap();
        conv.advance(Stage::Ideation).unwrap();
        conv.advance(Stage::Drafting).unwrap();
        conv.advance(Stage::Review).unwrap();
        // user requests changes
        conv.advance(Stage::Drafting).unwrap();
        assert_eq!(conv.stage, Stage::Drafting);
    }

    #[test]
    fn any_stage_resets_to_idle() {
        let mut conv = Conversation::new(page_scope());
        conv.advance(Stage::Discovery).unwrap();
        conv.advance(Stage::Ideation).unwrap();
        conv.reset();
        assert_eq!(conv.stage, Stage::Idle);
        assert!(conv.context.pending_confirmation.is_none());
    }

    #[test]
    fn published_only_via_ready_to_publish() {
        for from in [
            Stage::Idle,
            Stage::Discovery,
            Stage::Ideation,
            Stage::Drafting,
            Stage::Review,
        ] {
            assert!(
                !from.can_transition(Stage::Published),
                "{from} must not reach published directly"
            );
        }
        assert!(Stage::ReadyToPublish.can_transition(Stage::Published));
    }

    #[test]
    fn recent_window_returns_tail() {
        let mut conv = Conversation::new(page_scope());
        for i in 0..10 {
            conv.push(Message::user(format!("msg {i}")));
        }
        let window = conv.recent_window(3);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].content, "msg 7");
        assert_eq!(window[2].content, "msg 9");
    }

    #[test]
    fn affirmative_detection() {
        assert!(is_affirmative("Yes"));
        assert!(is_affirmative("go ahead"));
        assert!(is_affirmative("  Approved.  "));
        assert!(is_affirmative("Publish it!"));
        assert!(!is_affirmative("yes, but change the headline"));
        assert!(!is_affirmative("what about the budget?"));
    }

    #[test]
    fn negative_detection() {
        assert!(is_negative("no"));
        assert!(is_negative("Hold off"));
        assert!(!is_negative("no idea what I want yet, show me options"));
    }

    #[test]
    fn scope_accessors() {
        let scope = page_scope();
        assert_eq!(scope.workspace_id(), "ws_1");
        assert_eq!(scope.page_id(), Some("page_1"));
        assert!(scope.is_page_scoped());

        let account = Scope::AccountWide {
            workspace_id: "ws_1".into(),
        };
        assert_eq!(account.page_id(), None);
    }

    #[test]
    fn conversation_serialization_roundtrip() {
        let mut conv = Conversation::new(page_scope());
        conv.push(Message::user("hello"));
        let json = serde_json::to_string(&conv).unwrap();
        let back: Conversation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.messages.len(), 1);
        assert_eq!(back.stage, Stage::Idle);
        assert_eq!(back.scope, conv.scope);
    }
}
