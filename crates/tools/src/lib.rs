//! Built-in tool implementations for Warroom.
//!
//! Tools give the agent the ability to act on the advertising workspace:
//! read performance, generate creative briefs and ad copy, save drafts,
//! adjust budgets, pause campaigns, and publish. Each tool declares its
//! side-effect class; the orchestrator gates mutating and irreversible
//! calls through the guardrail validator before dispatch.
//!
//! The advertising-platform specifics live behind the store traits — a
//! tool here is the thin, schema-declared façade the agent loop can call.

pub mod creative;
pub mod execution;
pub mod performance;
pub mod personas;

use std::sync::Arc;

use warroom_core::conversation::ConversationId;
use warroom_core::error::{StoreError, ToolError};
use warroom_core::store::{DraftStore, PerformanceStore, SettingsStore};
use warroom_core::tool::ToolRegistry;

pub use personas::Persona;

/// Map a store error into a tool execution failure. Storage/query errors
/// are transient and worth one retry; missing rows are not.
pub(crate) fn store_failure(tool_name: &str, err: StoreError) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool_name.into(),
        message: err.to_string(),
        retryable: matches!(err, StoreError::Storage(_) | StoreError::QueryFailed(_)),
    }
}

/// Everything a tool needs to be bound to one conversation's scope.
#[derive(Clone)]
pub struct ToolContext {
    pub settings: Arc<dyn SettingsStore>,
    pub performance: Arc<dyn PerformanceStore>,
    pub drafts: Arc<dyn DraftStore>,
    pub workspace_id: String,
    pub page_id: Option<String>,
    pub conversation_id: ConversationId,
}

/// Create a registry with every built-in tool bound to the given scope.
pub fn default_registry(ctx: &ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(performance::AccountStatsTool::new(ctx)));
    registry.register(Arc::new(performance::TopPerformersTool::new(ctx)));
    registry.register(Arc::new(performance::UnderperformersTool::new(ctx)));
    registry.register(Arc::new(performance::SummarizePerformanceTool::new(ctx)));

    registry.register(Arc::new(creative::CreativeBriefsTool::new(ctx)));
    registry.register(Arc::new(creative::GenerateAdCopyTool::new(ctx)));
    registry.register(Arc::new(creative::SuggestAudiencesTool::new(ctx)));

    registry.register(Arc::new(execution::GetCurrentDraftTool::new(ctx)));
    registry.register(Arc::new(execution::SaveDraftTool::new(ctx)));
    registry.register(Arc::new(execution::AdjustBudgetTool::new(ctx)));
    registry.register(Arc::new(execution::PauseCampaignsTool::new(ctx)));
    registry.register(Arc::new(execution::PublishCampaignTool::new(ctx)));

    registry
}
