//! Persistence collaborator traits.
//!
//! The engine only requires CRUD-by-id and ordered-append semantics from
//! storage; the traits here are the seam. Implementations live elsewhere
//! (the in-memory stores in `warroom-memory`, or a real database adapter
//! outside this workspace).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::{Conversation, ConversationId, Scope};
use crate::draft::AdDraft;
use crate::error::StoreError;

// ── Snapshot types ────────────────────────────────────────────────────────

/// Workspace-level settings consumed as read-only configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    pub workspace_id: String,
    pub name: String,
    pub default_daily_budget: f64,
    pub currency: String,
    pub default_tone: String,
    pub default_objective: String,
    pub timezone: String,
    /// Whether an advertising-platform credential is connected.
    pub credential_connected: bool,
}

/// Per-page settings (tone, CTA style, target markets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSettings {
    pub page_id: String,
    pub page_name: String,
    pub default_tone: String,
    pub cta_style: String,
    #[serde(default)]
    pub target_markets: Vec<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// A product that ads are written for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub short_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub currency: String,
    /// Unique selling proposition.
    pub usp: String,
    pub target_audience: String,
    #[serde(default)]
    pub seasonality: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Aggregate performance over a period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub conversions: u64,
    pub roas: f64,
    pub period_days: u32,
}

/// One campaign's headline metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignMetric {
    pub campaign_id: String,
    pub name: String,
    pub spend: f64,
    pub roas: f64,
    pub ctr: f64,
    pub conversions: u64,
}

/// A past winning ad, kept for creative grounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastWinner {
    pub campaign_name: String,
    pub headline: String,
    pub winning_factors: String,
    pub roas: f64,
}

/// The immutable pinned summary produced by the legacy migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinnedSummary {
    pub workspace_id: String,
    pub migrated_at: DateTime<Utc>,
    pub conversation_count: usize,
    pub body: String,
}

// ── Store traits ──────────────────────────────────────────────────────────

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, id: &ConversationId) -> Result<Conversation, StoreError>;
    async fn save(&self, conversation: &Conversation) -> Result<(), StoreError>;
    async fn find_by_scope(&self, scope: &Scope) -> Result<Option<Conversation>, StoreError>;
}

#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<AdDraft>, StoreError>;
    async fn put(&self, draft: &AdDraft) -> Result<(), StoreError>;
    /// Most recently updated draft for the conversation, if any.
    async fn latest_for(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<AdDraft>, StoreError>;
    /// Full revision chain for a draft, oldest first.
    async fn lineage(&self, draft_id: &str) -> Result<Vec<AdDraft>, StoreError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn workspace(&self, workspace_id: &str) -> Result<WorkspaceSettings, StoreError>;
    async fn page(&self, page_id: &str) -> Result<PageSettings, StoreError>;
    async fn pages(&self, workspace_id: &str) -> Result<Vec<PageSettings>, StoreError>;
    async fn product(&self, product_id: &str) -> Result<Option<Product>, StoreError>;
    async fn products_for_page(&self, page_id: &str) -> Result<Vec<Product>, StoreError>;
}

#[async_trait]
pub trait PerformanceStore: Send + Sync {
    async fn account_summary(
        &self,
        workspace_id: &str,
        days: u32,
    ) -> Result<PerformanceSummary, StoreError>;
    async fn page_summary(&self, page_id: &str, days: u32)
        -> Result<PerformanceSummary, StoreError>;
    async fn top_performers(
        &self,
        workspace_id: &str,
        page_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CampaignMetric>, StoreError>;
    async fn underperformers(
        &self,
        workspace_id: &str,
        page_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CampaignMetric>, StoreError>;
    async fn past_winners(
        &self,
        page_id: &str,
        limit: usize,
    ) -> Result<Vec<PastWinner>, StoreError>;
}

#[async_trait]
pub trait PinnedSummaryStore: Send + Sync {
    async fn pinned_for(&self, workspace_id: &str) -> Result<Option<PinnedSummary>, StoreError>;
    async fn pin(&self, summary: &PinnedSummary) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_summary_serialization() {
        let summary = PerformanceSummary {
            spend: 1500.0,
            impressions: 45_000,
            clicks: 1200,
            ctr: 2.67,
            conversions: 45,
            roas: 3.2,
            period_days: 7,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: PerformanceSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.impressions, 45_000);
        assert!((back.roas - 3.2).abs() < f64::EPSILON);
    }

    #[test]
    fn product_optional_fields_default() {
        let json = r#"{
            "id": "p1",
            "name": "Red Hoodie",
            "short_description": "Warm winter hoodie",
            "currency": "USD",
            "usp": "Organic cotton",
            "target_audience": "18-34 urban"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.price.is_none());
        assert!(product.tags.is_empty());
        assert!(product.seasonality.is_none());
    }
}
