//! Execution and management tools — drafts, budgets, pauses, publish.
//!
//! `publish_campaign` is the only irreversible tool. Its gating
//! (confirmation summary, explicit user go-ahead, allow decision, audit
//! entry) is the orchestrator's job; by the time this tool runs, the gate
//! has already been passed.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use warroom_core::conversation::ConversationId;
use warroom_core::draft::{AdDraft, CallToAction, DraftStatus};
use warroom_core::error::ToolError;
use warroom_core::store::DraftStore;
use warroom_core::tool::{SideEffect, Tool, ToolDefinition, ToolOutput};

use crate::{ToolContext, store_failure};

fn parse_cta(value: Option<&str>) -> CallToAction {
    match value {
        Some("shop_now") => CallToAction::ShopNow,
        Some("sign_up") => CallToAction::SignUp,
        Some("contact_us") => CallToAction::ContactUs,
        Some("book_now") => CallToAction::BookNow,
        Some("download") => CallToAction::Download,
        Some("get_offer") => CallToAction::GetOffer,
        _ => CallToAction::LearnMore,
    }
}

// ── get_current_draft ─────────────────────────────────────────────────────

pub struct GetCurrentDraftTool {
    drafts: Arc<dyn DraftStore>,
    conversation_id: ConversationId,
}

impl GetCurrentDraftTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            drafts: ctx.drafts.clone(),
            conversation_id: ctx.conversation_id.clone(),
        }
    }
}

#[async_trait]
impl Tool for GetCurrentDraftTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_current_draft".into(),
            description: "Get the draft currently being worked on in this conversation (or a specific draft by id).".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "draft_id": { "type": "string", "description": "Specific draft id; defaults to the latest" }
                }
            }),
            side_effect: SideEffect::ReadOnly,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let name = "get_current_draft";
        let draft = match input["draft_id"].as_str() {
            Some(id) => self.drafts.get(id).await,
            None => self.drafts.latest_for(&self.conversation_id).await,
        }
        .map_err(|e| store_failure(name, e))?;

        match draft {
            Some(draft) => Ok(ToolOutput::with_data(
                format!(
                    "Draft \"{}\" v{} ({}): {} / {}",
                    draft.ad_name,
                    draft.variant_number,
                    draft.status.as_str(),
                    draft.headline,
                    draft.primary_text
                ),
                json!({ "draft": draft }),
            )),
            None => Ok(ToolOutput::text("No draft found for this conversation.")),
        }
    }
}

// ── save_draft ────────────────────────────────────────────────────────────

pub struct SaveDraftTool {
    drafts: Arc<dyn DraftStore>,
    conversation_id: ConversationId,
}

impl SaveDraftTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            drafts: ctx.drafts.clone(),
            conversation_id: ctx.conversation_id.clone(),
        }
    }
}

#[async_trait]
impl Tool for SaveDraftTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "save_draft".into(),
            description: "Save explicit ad fields as a draft (new lineage, or the next variant when one exists). Use after manual edits.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "campaign_name": { "type": "string" },
                    "ad_name": { "type": "string" },
                    "primary_text": { "type": "string" },
                    "headline": { "type": "string" },
                    "description": { "type": "string" },
                    "cta": { "type": "string", "description": "learn_more, shop_now, sign_up, contact_us, book_now, download, get_offer" },
                    "daily_budget": { "type": "number" }
                },
                "required": ["campaign_name", "ad_name", "primary_text", "headline"]
            }),
            side_effect: SideEffect::Mutating,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let name = "save_draft";

        let mut draft = match self
            .drafts
            .latest_for(&self.conversation_id)
            .await
            .map_err(|e| store_failure(name, e))?
        {
            Some(existing) => existing.new_variant(),
            None => AdDraft::new(self.conversation_id.clone(), "", ""),
        };

        draft.campaign_name = input["campaign_name"].as_str().unwrap_or_default().into();
        draft.ad_name = input["ad_name"].as_str().unwrap_or_default().into();
        draft.primary_text = input["primary_text"].as_str().unwrap_or_default().into();
        draft.headline = input["headline"].as_str().unwrap_or_default().into();
        if let Some(description) = input["description"].as_str() {
            draft.description = description.into();
        }
        draft.cta = parse_cta(input["cta"].as_str());
        if let Some(budget) = input["daily_budget"].as_f64() {
            draft.daily_budget = budget;
        }

        let violations = draft.limit_violations();
        if !violations.is_empty() {
            return Err(ToolError::ExecutionFailed {
                tool_name: name.into(),
                message: violations.join("; "),
                retryable: true,
            });
        }

        self.drafts
            .put(&draft)
            .await
            .map_err(|e| store_failure(name, e))?;

        Ok(ToolOutput::with_data(
            format!("Draft \"{}\" v{} saved", draft.ad_name, draft.variant_number),
            json!({ "draft_id": draft.id, "variant_number": draft.variant_number }),
        ))
    }
}

// ── adjust_budget ─────────────────────────────────────────────────────────

pub struct AdjustBudgetTool {
    drafts: Arc<dyn DraftStore>,
    conversation_id: ConversationId,
}

impl AdjustBudgetTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            drafts: ctx.drafts.clone(),
            conversation_id: ctx.conversation_id.clone(),
        }
    }
}

#[async_trait]
impl Tool for AdjustBudgetTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "adjust_budget".into(),
            description: "Adjust the daily budget for the active draft or a live campaign.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "draft_id": { "type": "string", "description": "Draft to adjust; defaults to the latest" },
                    "campaign_id": { "type": "string", "description": "Live campaign to adjust instead of a draft" },
                    "new_budget": { "type": "number", "description": "New daily budget amount" }
                },
                "required": ["new_budget"]
            }),
            side_effect: SideEffect::Mutating,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let name = "adjust_budget";
        let new_budget = input["new_budget"].as_f64().ok_or_else(|| ToolError::InvalidInput {
            tool_name: name.into(),
            reason: "missing required field `new_budget`".into(),
        })?;

        if let Some(campaign_id) = input["campaign_id"].as_str() {
            // Live campaign: the platform call is behind an external
            // collaborator; acknowledge the requested change.
            return Ok(ToolOutput::with_data(
                format!("Daily budget for campaign {campaign_id} set to {new_budget:.2}"),
                json!({ "campaign_id": campaign_id, "new_budget": new_budget }),
            ));
        }

        let draft = match input["draft_id"].as_str() {
            Some(id) => self.drafts.get(id).await,
            None => self.drafts.latest_for(&self.conversation_id).await,
        }
        .map_err(|e| store_failure(name, e))?
        .ok_or_else(|| ToolError::ExecutionFailed {
            tool_name: name.into(),
            message: "no draft to adjust — generate or save one first".into(),
            retryable: false,
        })?;

        if draft.status == DraftStatus::Published {
            return Err(ToolError::ExecutionFailed {
                tool_name: name.into(),
                message: format!(
                    "draft {} is published; budget changes need a new variant",
                    draft.id
                ),
                retryable: false,
            });
        }

        let mut updated = draft;
        updated.daily_budget = new_budget;
        self.drafts
            .put(&updated)
            .await
            .map_err(|e| store_failure(name, e))?;

        Ok(ToolOutput::with_data(
            format!(
                "Daily budget for draft \"{}\" v{} set to {new_budget:.2}",
                updated.ad_name, updated.variant_number
            ),
            json!({ "draft_id": updated.id, "new_budget": new_budget }),
        ))
    }
}

// ── pause_campaigns ───────────────────────────────────────────────────────

pub struct PauseCampaignsTool;

impl PauseCampaignsTool {
    pub fn new(_ctx: &ToolContext) -> Self {
        Self
    }
}

#[async_trait]
impl Tool for PauseCampaignsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "pause_campaigns".into(),
            description: "Pause one or more live campaigns. Use for underperformers or when the user wants to stop spend.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "campaign_ids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Campaign ids to pause"
                    }
                },
                "required": ["campaign_ids"]
            }),
            side_effect: SideEffect::Mutating,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let ids: Vec<String> = input["campaign_ids"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        if ids.is_empty() {
            return Err(ToolError::InvalidInput {
                tool_name: "pause_campaigns".into(),
                reason: "campaign_ids must contain at least one id".into(),
            });
        }

        Ok(ToolOutput::with_data(
            format!("Paused {} campaign(s): {}", ids.len(), ids.join(", ")),
            json!({ "paused": ids }),
        ))
    }
}

// ── publish_campaign ──────────────────────────────────────────────────────

pub struct PublishCampaignTool {
    drafts: Arc<dyn DraftStore>,
    conversation_id: ConversationId,
}

impl PublishCampaignTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            drafts: ctx.drafts.clone(),
            conversation_id: ctx.conversation_id.clone(),
        }
    }
}

#[async_trait]
impl Tool for PublishCampaignTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "publish_campaign".into(),
            description: "Publish a draft as a live campaign. Irreversible — always confirmed with the user first. Returns the campaign id and manager link.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "draft_id": { "type": "string", "description": "The draft to publish; defaults to the conversation's latest" },
                    "daily_budget": { "type": "number", "description": "Daily budget at publish time" },
                    "primary_text": { "type": "string", "description": "Final primary text, for the pre-publish policy scan" }
                }
            }),
            side_effect: SideEffect::Irreversible,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let name = "publish_campaign";

        let mut draft = match input["draft_id"].as_str() {
            Some(id) => self.drafts.get(id).await,
            None => self.drafts.latest_for(&self.conversation_id).await,
        }
        .map_err(|e| store_failure(name, e))?
        .ok_or_else(|| ToolError::ExecutionFailed {
            tool_name: name.into(),
            message: "no draft to publish — generate or save one first".into(),
            retryable: false,
        })?;
        let draft_id = draft.id.clone();

        if draft.status == DraftStatus::Published {
            return Err(ToolError::ExecutionFailed {
                tool_name: name.into(),
                message: format!("draft {draft_id} is already published"),
                retryable: false,
            });
        }

        if let Some(budget) = input["daily_budget"].as_f64() {
            draft.daily_budget = budget;
        }

        if draft.status == DraftStatus::Draft {
            draft.approve().map_err(|e| ToolError::ExecutionFailed {
                tool_name: name.into(),
                message: e.to_string(),
                retryable: false,
            })?;
        }
        draft.mark_published().map_err(|e| ToolError::ExecutionFailed {
            tool_name: name.into(),
            message: e.to_string(),
            retryable: false,
        })?;

        self.drafts
            .put(&draft)
            .await
            .map_err(|e| store_failure(name, e))?;

        let campaign_id = format!("camp_{}", Uuid::new_v4().simple());
        let ads_manager_url = format!("https://ads.example.com/manager/{campaign_id}");
        tracing::info!(%draft_id, %campaign_id, "Campaign published");

        Ok(ToolOutput::with_data(
            format!(
                "Campaign \"{}\" is live (id {campaign_id}). Draft v{} is now published.",
                draft.campaign_name, draft.variant_number
            ),
            json!({
                "campaign_id": campaign_id,
                "draft_id": draft.id,
                "ads_manager_url": ads_manager_url,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warroom_memory::InMemoryStores;

    fn context() -> (ToolContext, Arc<InMemoryStores>) {
        let stores = Arc::new(InMemoryStores::new());
        let ctx = ToolContext {
            settings: stores.clone(),
            performance: stores.clone(),
            drafts: stores.clone(),
            workspace_id: "ws_1".into(),
            page_id: None,
            conversation_id: ConversationId::new(),
        };
        (ctx, stores)
    }

    fn seeded_draft(conversation_id: &ConversationId) -> AdDraft {
        let mut draft = AdDraft::new(conversation_id.clone(), "Winter Sale", "Red Hoodie");
        draft.primary_text = "Stay warm this winter.".into();
        draft.headline = "Red Hoodie".into();
        draft.daily_budget = 50.0;
        draft
    }

    #[tokio::test]
    async fn save_draft_then_fetch_current() {
        let (ctx, _stores) = context();
        let save = SaveDraftTool::new(&ctx);
        let output = save
            .execute(json!({
                "campaign_name": "Winter Sale",
                "ad_name": "Red Hoodie",
                "primary_text": "Stay warm this winter.",
                "headline": "Red Hoodie",
                "cta": "shop_now",
                "daily_budget": 60.0
            }))
            .await
            .unwrap();
        assert!(output.summary.contains("saved"));

        let get = GetCurrentDraftTool::new(&ctx);
        let fetched = get.execute(json!({})).await.unwrap();
        assert!(fetched.summary.contains("Red Hoodie"));
        assert!(fetched.summary.contains("v1"));
    }

    #[tokio::test]
    async fn save_draft_enforces_limits() {
        let (ctx, _stores) = context();
        let save = SaveDraftTool::new(&ctx);
        let err = save
            .execute(json!({
                "campaign_name": "C",
                "ad_name": "A",
                "primary_text": "ok",
                "headline": "h".repeat(100),
            }))
            .await
            .unwrap_err();
        match err {
            ToolError::ExecutionFailed { message, retryable, .. } => {
                assert!(message.contains("headline"));
                assert!(retryable);
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn adjust_budget_updates_latest_draft() {
        let (ctx, stores) = context();
        stores.insert_draft(seeded_draft(&ctx.conversation_id));

        let tool = AdjustBudgetTool::new(&ctx);
        let output = tool.execute(json!({"new_budget": 120.0})).await.unwrap();
        assert!(output.summary.contains("120.00"));

        let draft = stores.latest_for(&ctx.conversation_id).await.unwrap().unwrap();
        assert!((draft.daily_budget - 120.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn adjust_budget_refuses_published_draft() {
        let (ctx, stores) = context();
        let mut draft = seeded_draft(&ctx.conversation_id);
        draft.approve().unwrap();
        draft.mark_published().unwrap();
        stores.insert_draft(draft);

        let tool = AdjustBudgetTool::new(&ctx);
        let err = tool.execute(json!({"new_budget": 120.0})).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { retryable: false, .. }));
    }

    #[tokio::test]
    async fn pause_requires_ids() {
        let (ctx, _stores) = context();
        let tool = PauseCampaignsTool::new(&ctx);
        let err = tool.execute(json!({"campaign_ids": []})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { .. }));

        let output = tool
            .execute(json!({"campaign_ids": ["camp_1", "camp_2"]}))
            .await
            .unwrap();
        assert!(output.summary.contains("2 campaign(s)"));
    }

    #[tokio::test]
    async fn publish_flips_draft_terminal() {
        let (ctx, stores) = context();
        let draft = seeded_draft(&ctx.conversation_id);
        let draft_id = draft.id.clone();
        stores.insert_draft(draft);

        let tool = PublishCampaignTool::new(&ctx);
        let output = tool
            .execute(json!({"draft_id": draft_id, "daily_budget": 80.0}))
            .await
            .unwrap();
        assert!(output.summary.contains("is live"));
        let data = output.data.unwrap();
        assert!(data["campaign_id"].as_str().unwrap().starts_with("camp_"));

        let published = stores.get(&draft_id).await.unwrap().unwrap();
        assert_eq!(published.status, DraftStatus::Published);
        assert!((published.daily_budget - 80.0).abs() < f64::EPSILON);

        // a second publish of the same draft is refused
        let err = tool.execute(json!({"draft_id": draft_id})).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { retryable: false, .. }));
    }
}
