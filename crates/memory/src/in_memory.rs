//! In-memory store implementations — useful for testing and ephemeral
//! sessions. Every store trait is implemented on one struct so a single
//! seeded instance can back the whole engine.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use warroom_core::conversation::{Conversation, ConversationId, Scope};
use warroom_core::draft::AdDraft;
use warroom_core::error::StoreError;
use warroom_core::store::{
    CampaignMetric, ConversationStore, DraftStore, PageSettings, PastWinner, PerformanceStore,
    PerformanceSummary, PinnedSummary, PinnedSummaryStore, Product, SettingsStore,
    WorkspaceSettings,
};

#[derive(Default)]
struct Inner {
    workspaces: HashMap<String, WorkspaceSettings>,
    pages: HashMap<String, PageSettings>,
    pages_by_workspace: HashMap<String, Vec<String>>,
    products: HashMap<String, Product>,
    products_by_page: HashMap<String, Vec<String>>,
    page_performance: HashMap<String, PerformanceSummary>,
    account_performance: HashMap<String, PerformanceSummary>,
    top: HashMap<String, Vec<CampaignMetric>>,
    under: HashMap<String, Vec<CampaignMetric>>,
    winners: HashMap<String, Vec<PastWinner>>,
    pinned: HashMap<String, PinnedSummary>,
    conversations: HashMap<String, Conversation>,
    drafts: HashMap<String, AdDraft>,
}

/// One struct implementing every store trait, guarded by a single mutex.
pub struct InMemoryStores {
    inner: Mutex<Inner>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn zero_summary(days: u32) -> PerformanceSummary {
        PerformanceSummary {
            spend: 0.0,
            impressions: 0,
            clicks: 0,
            ctr: 0.0,
            conversions: 0,
            roas: 0.0,
            period_days: days,
        }
    }

    // ── Seeding helpers (chainable) ───────────────────────────────────────

    pub fn seed_workspace(
        &self,
        workspace_id: &str,
        name: &str,
        default_daily_budget: f64,
        currency: &str,
        credential_connected: bool,
    ) -> &Self {
        self.inner.lock().unwrap().workspaces.insert(
            workspace_id.into(),
            WorkspaceSettings {
                workspace_id: workspace_id.into(),
                name: name.into(),
                default_daily_budget,
                currency: currency.into(),
                default_tone: "friendly".into(),
                default_objective: "CONVERSIONS".into(),
                timezone: "UTC".into(),
                credential_connected,
            },
        );
        self
    }

    pub fn seed_page(
        &self,
        workspace_id: &str,
        page_id: &str,
        page_name: &str,
        tone: &str,
        cta_style: &str,
    ) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.insert(
            page_id.into(),
            PageSettings {
                page_id: page_id.into(),
                page_name: page_name.into(),
                default_tone: tone.into(),
                cta_style: cta_style.into(),
                target_markets: Vec::new(),
                is_primary: false,
            },
        );
        inner
            .pages_by_workspace
            .entry(workspace_id.into())
            .or_default()
            .push(page_id.into());
        self
    }

    pub fn seed_product(
        &self,
        page_id: &str,
        product_id: &str,
        name: &str,
        short_description: &str,
        usp: &str,
    ) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        inner.products.insert(
            product_id.into(),
            Product {
                id: product_id.into(),
                name: name.into(),
                short_description: short_description.into(),
                price: None,
                currency: "USD".into(),
                usp: usp.into(),
                target_audience: String::new(),
                seasonality: None,
                tags: Vec::new(),
            },
        );
        inner
            .products_by_page
            .entry(page_id.into())
            .or_default()
            .push(product_id.into());
        self
    }

    pub fn seed_page_performance(&self, page_id: &str, spend: f64, roas: f64) -> &Self {
        self.inner.lock().unwrap().page_performance.insert(
            page_id.into(),
            PerformanceSummary {
                spend,
                impressions: (spend * 30.0) as u64,
                clicks: (spend * 0.8) as u64,
                ctr: 2.5,
                conversions: (spend * roas / 40.0) as u64,
                roas,
                period_days: 7,
            },
        );
        self
    }

    pub fn seed_account_performance(&self, workspace_id: &str, spend: f64, roas: f64) -> &Self {
        self.inner.lock().unwrap().account_performance.insert(
            workspace_id.into(),
            PerformanceSummary {
                spend,
                impressions: (spend * 30.0) as u64,
                clicks: (spend * 0.8) as u64,
                ctr: 2.5,
                conversions: (spend * roas / 40.0) as u64,
                roas,
                period_days: 7,
            },
        );
        self
    }

    pub fn seed_top_performer(&self, workspace_id: &str, name: &str, roas: f64) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        let metrics = inner.top.entry(workspace_id.into()).or_default();
        metrics.push(CampaignMetric {
            campaign_id: format!("camp_{}", metrics.len() + 1),
            name: name.into(),
            spend: 500.0,
            roas,
            ctr: 3.0,
            conversions: 25,
        });
        self
    }

    pub fn seed_underperformer(&self, workspace_id: &str, name: &str, roas: f64) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        let metrics = inner.under.entry(workspace_id.into()).or_default();
        metrics.push(CampaignMetric {
            campaign_id: format!("camp_u{}", metrics.len() + 1),
            name: name.into(),
            spend: 200.0,
            roas,
            ctr: 0.5,
            conversions: 2,
        });
        self
    }

    pub fn seed_past_winner(
        &self,
        page_id: &str,
        campaign_name: &str,
        winning_factors: &str,
        roas: f64,
    ) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .winners
            .entry(page_id.into())
            .or_default()
            .push(PastWinner {
                campaign_name: campaign_name.into(),
                headline: campaign_name.into(),
                winning_factors: winning_factors.into(),
                roas,
            });
        self
    }

    pub fn seed_pinned_summary(&self, workspace_id: &str, body: &str) -> &Self {
        self.inner.lock().unwrap().pinned.insert(
            workspace_id.into(),
            PinnedSummary {
                workspace_id: workspace_id.into(),
                migrated_at: chrono::Utc::now(),
                conversation_count: 0,
                body: body.into(),
            },
        );
        self
    }

    pub fn insert_conversation(&self, conversation: Conversation) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .conversations
            .insert(conversation.id.0.clone(), conversation);
        self
    }

    pub fn insert_draft(&self, draft: AdDraft) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .drafts
            .insert(draft.id.clone(), draft);
        self
    }

    pub fn draft_count(&self) -> usize {
        self.inner.lock().unwrap().drafts.len()
    }
}

impl Default for InMemoryStores {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for InMemoryStores {
    async fn workspace(&self, workspace_id: &str) -> Result<WorkspaceSettings, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .workspaces
            .get(workspace_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("workspace {workspace_id}")))
    }

    async fn page(&self, page_id: &str) -> Result<PageSettings, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .pages
            .get(page_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("page {page_id}")))
    }

    async fn pages(&self, workspace_id: &str) -> Result<Vec<PageSettings>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let ids = inner
            .pages_by_workspace
            .get(workspace_id)
            .cloned()
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| inner.pages.get(id).cloned())
            .collect())
    }

    async fn product(&self, product_id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.inner.lock().unwrap().products.get(product_id).cloned())
    }

    async fn products_for_page(&self, page_id: &str) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let ids = inner
            .products_by_page
            .get(page_id)
            .cloned()
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl PerformanceStore for InMemoryStores {
    async fn account_summary(
        &self,
        workspace_id: &str,
        days: u32,
    ) -> Result<PerformanceSummary, StoreError> {
        let inner = self.inner.lock().unwrap();
        if let Some(summary) = inner.account_performance.get(workspace_id) {
            return Ok(summary.clone());
        }

        // No explicit seed: aggregate the workspace's page summaries.
        let page_ids = inner
            .pages_by_workspace
            .get(workspace_id)
            .cloned()
            .unwrap_or_default();
        let mut total = Self::zero_summary(days);
        let mut roas_sum = 0.0;
        let mut counted = 0u32;
        for id in &page_ids {
            if let Some(p) = inner.page_performance.get(id) {
                total.spend += p.spend;
                total.impressions += p.impressions;
                total.clicks += p.clicks;
                total.conversions += p.conversions;
                roas_sum += p.roas;
                counted += 1;
            }
        }
        if counted > 0 {
            total.roas = roas_sum / counted as f64;
            total.ctr = 2.5;
        }
        Ok(total)
    }

    async fn page_summary(
        &self,
        page_id: &str,
        days: u32,
    ) -> Result<PerformanceSummary, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .page_performance
            .get(page_id)
            .cloned()
            .unwrap_or_else(|| Self::zero_summary(days)))
    }

    async fn top_performers(
        &self,
        workspace_id: &str,
        _page_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CampaignMetric>, StoreError> {
        let mut metrics = self
            .inner
            .lock()
            .unwrap()
            .top
            .get(workspace_id)
            .cloned()
            .unwrap_or_default();
        metrics.truncate(limit);
        Ok(metrics)
    }

    async fn underperformers(
        &self,
        workspace_id: &str,
        _page_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CampaignMetric>, StoreError> {
        let mut metrics = self
            .inner
            .lock()
            .unwrap()
            .under
            .get(workspace_id)
            .cloned()
            .unwrap_or_default();
        metrics.truncate(limit);
        Ok(metrics)
    }

    async fn past_winners(
        &self,
        page_id: &str,
        limit: usize,
    ) -> Result<Vec<PastWinner>, StoreError> {
        let mut winners = self
            .inner
            .lock()
            .unwrap()
            .winners
            .get(page_id)
            .cloned()
            .unwrap_or_default();
        winners.truncate(limit);
        Ok(winners)
    }
}

#[async_trait]
impl PinnedSummaryStore for InMemoryStores {
    async fn pinned_for(&self, workspace_id: &str) -> Result<Option<PinnedSummary>, StoreError> {
        Ok(self.inner.lock().unwrap().pinned.get(workspace_id).cloned())
    }

    async fn pin(&self, summary: &PinnedSummary) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .pinned
            .insert(summary.workspace_id.clone(), summary.clone());
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for InMemoryStores {
    async fn load(&self, id: &ConversationId) -> Result<Conversation, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .conversations
            .get(&id.0)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("conversation {id}")))
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .conversations
            .insert(conversation.id.0.clone(), conversation.clone());
        Ok(())
    }

    async fn find_by_scope(&self, scope: &Scope) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .conversations
            .values()
            .find(|c| &c.scope == scope)
            .cloned())
    }
}

#[async_trait]
impl DraftStore for InMemoryStores {
    async fn get(&self, id: &str) -> Result<Option<AdDraft>, StoreError> {
        Ok(self.inner.lock().unwrap().drafts.get(id).cloned())
    }

    async fn put(&self, draft: &AdDraft) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .drafts
            .insert(draft.id.clone(), draft.clone());
        Ok(())
    }

    async fn latest_for(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<AdDraft>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .drafts
            .values()
            .filter(|d| &d.conversation_id == conversation_id)
            .max_by_key(|d| d.updated_at)
            .cloned())
    }

    async fn lineage(&self, draft_id: &str) -> Result<Vec<AdDraft>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut chain = Vec::new();
        let mut current = inner.drafts.get(draft_id).cloned();
        while let Some(draft) = current {
            current = draft
                .parent_draft_id
                .as_ref()
                .and_then(|id| inner.drafts.get(id).cloned());
            chain.push(draft);
        }
        chain.reverse();
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warroom_core::conversation::Message;

    #[tokio::test]
    async fn workspace_lookup_and_missing() {
        let stores = InMemoryStores::new();
        stores.seed_workspace("ws_1", "Acme", 50.0, "USD", true);

        let ws = stores.workspace("ws_1").await.unwrap();
        assert_eq!(ws.name, "Acme");
        assert!(ws.credential_connected);

        let err = stores.workspace("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn account_summary_aggregates_pages() {
        let stores = InMemoryStores::new();
        stores.seed_workspace("ws_1", "Acme", 50.0, "USD", true);
        stores
            .seed_page("ws_1", "p1", "One", "bold", "urgent")
            .seed_page("ws_1", "p2", "Two", "calm", "soft");
        stores.seed_page_performance("p1", 100.0, 4.0);
        stores.seed_page_performance("p2", 300.0, 2.0);

        let summary = stores.account_summary("ws_1", 7).await.unwrap();
        assert!((summary.spend - 400.0).abs() < f64::EPSILON);
        assert!((summary.roas - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn conversation_roundtrip_and_scope_lookup() {
        let stores = InMemoryStores::new();
        let scope = Scope::AccountWide {
            workspace_id: "ws_1".into(),
        };
        let mut conv = Conversation::new(scope.clone());
        conv.push(Message::user("hello"));
        stores.save(&conv).await.unwrap();

        let loaded = stores.load(&conv.id).await.unwrap();
        assert_eq!(loaded.messages.len(), 1);

        let found = stores.find_by_scope(&scope).await.unwrap();
        assert_eq!(found.unwrap().id, conv.id);
    }

    #[tokio::test]
    async fn draft_lineage_walks_chain() {
        let stores = InMemoryStores::new();
        let conv_id = ConversationId::new();
        let first = AdDraft::new(conv_id.clone(), "Camp", "Ad");
        let second = first.new_variant();
        let third = second.new_variant();
        stores.put(&first).await.unwrap();
        stores.put(&second).await.unwrap();
        stores.put(&third).await.unwrap();

        let chain = stores.lineage(&third.id).await.unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].variant_number, 1);
        assert_eq!(chain[2].variant_number, 3);

        let latest = stores.latest_for(&conv_id).await.unwrap().unwrap();
        assert_eq!(latest.variant_number, 3);
    }
}
