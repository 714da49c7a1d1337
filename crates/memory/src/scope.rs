//! Memory scoping — per-turn context assembly.
//!
//! `MemoryScope::assemble` resolves, for a given conversation, the ordered
//! context documents to inject into the next orchestration step. Assembly
//! is request-scoped: rebuilt on every turn so that settings and
//! performance changes between turns are always visible. Caching within a
//! single turn (across reasoning steps) is the orchestrator's business.
//!
//! Retrieval priority is strict, not merged arbitrarily:
//! - page-scoped: page history → page settings → active product + page
//!   products → page performance + past winners. Account-wide signals are
//!   never injected here.
//! - account-wide: workspace aggregate → per-page breakdown → cross-page
//!   recommendations → pinned legacy summary (injected once, flagged so the
//!   backend does not re-summarize it).

use std::sync::Arc;

use warroom_core::conversation::{Conversation, ConversationId, Message, Scope};
use warroom_core::draft::AdDraft;
use warroom_core::error::StoreError;
use warroom_core::store::{
    DraftStore, PageSettings, PastWinner, PerformanceStore, PerformanceSummary, PinnedSummary,
    PinnedSummaryStore, Product, SettingsStore, WorkspaceSettings,
};

/// The assembled, request-scoped context for one turn. Never persisted,
/// never cached across turns.
#[derive(Debug, Clone)]
pub struct MemoryContext {
    pub conversation_id: ConversationId,
    pub scope: Scope,

    /// Recent message window, oldest first.
    pub history: Vec<Message>,

    /// Workspace settings snapshot (budget defaults, credential status).
    pub workspace: WorkspaceSettings,

    /// Page settings — page-scoped conversations only.
    pub page_settings: Option<PageSettings>,

    /// The selected product, if the conversation has one active.
    pub active_product: Option<Product>,

    /// Products tagged to this page — page-scoped only.
    pub page_products: Vec<Product>,

    /// Scope-appropriate performance summary.
    pub performance: Option<PerformanceSummary>,

    /// Identified past winners — page-scoped only.
    pub past_winners: Vec<PastWinner>,

    /// Per-page breakdown — account-wide only.
    pub per_page: Vec<(PageSettings, PerformanceSummary)>,

    /// Pinned legacy summary — account-wide only, injected once.
    pub pinned_summary: Option<PinnedSummary>,

    /// The draft currently being worked on, if any.
    pub active_draft: Option<AdDraft>,
}

impl MemoryContext {
    /// Render the context into the deterministic prompt block fed to the
    /// completion backend. Section order mirrors the retrieval priority.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(1024);

        if let Some(page) = &self.page_settings {
            out.push_str("[Page Settings]\n");
            out.push_str(&format!(
                "- Page: {} (tone: {}, CTA style: {})\n",
                page.page_name, page.default_tone, page.cta_style
            ));
            if !page.target_markets.is_empty() {
                out.push_str(&format!(
                    "- Target markets: {}\n",
                    page.target_markets.join(", ")
                ));
            }
        } else {
            out.push_str("[Workspace]\n");
            out.push_str(&format!(
                "- {} (default daily budget: {} {}, credential connected: {})\n",
                self.workspace.name,
                self.workspace.currency,
                self.workspace.default_daily_budget,
                self.workspace.credential_connected,
            ));
        }

        if let Some(product) = &self.active_product {
            out.push_str("\n[Active Product]\n");
            out.push_str(&format!(
                "- {}: {} (USP: {})\n",
                product.name, product.short_description, product.usp
            ));
        }

        if !self.page_products.is_empty() {
            out.push_str("\n[Page Products]\n");
            for p in &self.page_products {
                out.push_str(&format!("- {}: {}\n", p.name, p.short_description));
            }
        }

        if let Some(perf) = &self.performance {
            out.push_str(&format!("\n[Performance — last {} days]\n", perf.period_days));
            out.push_str(&format!(
                "- Spend {:.2}, impressions {}, clicks {}, CTR {:.2}%, conversions {}, ROAS {:.1}x\n",
                perf.spend, perf.impressions, perf.clicks, perf.ctr, perf.conversions, perf.roas
            ));
        }

        if !self.past_winners.is_empty() {
            out.push_str("\n[Past Winners]\n");
            for w in &self.past_winners {
                out.push_str(&format!(
                    "- \"{}\" ({:.1}x ROAS): {}\n",
                    w.campaign_name, w.roas, w.winning_factors
                ));
            }
        }

        if !self.per_page.is_empty() {
            out.push_str("\n[Per-Page Performance]\n");
            for (page, perf) in &self.per_page {
                out.push_str(&format!(
                    "- {}: spend {:.2}, ROAS {:.1}x, conversions {}\n",
                    page.page_name, perf.spend, perf.roas, perf.conversions
                ));
            }
        }

        if let Some(pinned) = &self.pinned_summary {
            out.push_str("\n[Archived Conversations — already summarized, do not re-summarize]\n");
            out.push_str(&pinned.body);
            out.push('\n');
        }

        if let Some(draft) = &self.active_draft {
            out.push_str("\n[Active Draft]\n");
            out.push_str(&format!(
                "- \"{}\" v{} ({}): {} / {}\n",
                draft.ad_name,
                draft.variant_number,
                draft.status.as_str(),
                draft.headline,
                draft.primary_text
            ));
        }

        out
    }
}

/// The memory scoping service. Holds the store collaborators; stateless
/// between turns.
pub struct MemoryScope {
    settings: Arc<dyn SettingsStore>,
    performance: Arc<dyn PerformanceStore>,
    drafts: Arc<dyn DraftStore>,
    pinned: Arc<dyn PinnedSummaryStore>,
    history_window: usize,
    performance_days: u32,
}

impl MemoryScope {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        performance: Arc<dyn PerformanceStore>,
        drafts: Arc<dyn DraftStore>,
        pinned: Arc<dyn PinnedSummaryStore>,
    ) -> Self {
        Self {
            settings,
            performance,
            drafts,
            pinned,
            history_window: 20,
            performance_days: 7,
        }
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_performance_days(mut self, days: u32) -> Self {
        self.performance_days = days;
        self
    }

    /// Assemble the context for one turn of the given conversation.
    pub async fn assemble(&self, conversation: &Conversation) -> Result<MemoryContext, StoreError> {
        let workspace_id = conversation.scope.workspace_id().to_string();
        let workspace = self.settings.workspace(&workspace_id).await?;

        let active_product = match &conversation.context.active_product_id {
            Some(id) => self.settings.product(id).await?,
            None => None,
        };

        let active_draft = match &conversation.context.active_draft_id {
            Some(id) => self.drafts.get(id).await?,
            None => self.drafts.latest_for(&conversation.id).await?,
        };

        let history = conversation.recent_window(self.history_window).to_vec();

        let mut ctx = MemoryContext {
            conversation_id: conversation.id.clone(),
            scope: conversation.scope.clone(),
            history,
            workspace,
            page_settings: None,
            active_product,
            page_products: Vec::new(),
            performance: None,
            past_winners: Vec::new(),
            per_page: Vec::new(),
            pinned_summary: None,
            active_draft,
        };

        match &conversation.scope {
            Scope::PageScoped { page_id, .. } => {
                self.assemble_page(&mut ctx, page_id).await?;
            }
            Scope::AccountWide { workspace_id } => {
                self.assemble_account(&mut ctx, workspace_id).await?;
            }
            Scope::LegacyArchived { .. } => {
                // archived conversations get no live context
            }
        }

        tracing::debug!(
            conversation_id = %ctx.conversation_id,
            scope = ?ctx.scope,
            history_len = ctx.history.len(),
            "Assembled memory context"
        );

        Ok(ctx)
    }

    async fn assemble_page(
        &self,
        ctx: &mut MemoryContext,
        page_id: &str,
    ) -> Result<(), StoreError> {
        ctx.page_settings = Some(self.settings.page(page_id).await?);
        ctx.page_products = self.settings.products_for_page(page_id).await?;
        ctx.performance = Some(
            self.performance
                .page_summary(page_id, self.performance_days)
                .await?,
        );
        ctx.past_winners = self.performance.past_winners(page_id, 3).await?;
        Ok(())
    }

    async fn assemble_account(
        &self,
        ctx: &mut MemoryContext,
        workspace_id: &str,
    ) -> Result<(), StoreError> {
        ctx.performance = Some(
            self.performance
                .account_summary(workspace_id, self.performance_days)
                .await?,
        );

        let pages = self.settings.pages(workspace_id).await?;
        for page in pages {
            let perf = self
                .performance
                .page_summary(&page.page_id, self.performance_days)
                .await?;
            ctx.per_page.push((page, perf));
        }

        ctx.pinned_summary = self.pinned.pinned_for(workspace_id).await?;
        Ok(())
    }
}
