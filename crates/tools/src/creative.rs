//! Creative generation tools — briefs, ad copy, audience suggestions.
//!
//! Copy generation here is deterministic templating over the product and
//! page settings. A real deployment swaps the templating for a creative
//! model behind the same tool contract; the drafts it writes and the
//! limits it enforces are identical either way.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use warroom_core::conversation::ConversationId;
use warroom_core::draft::{
    AdDraft, CallToAction, DESCRIPTION_LIMIT, HEADLINE_LIMIT, PRIMARY_TEXT_LIMIT,
};
use warroom_core::error::{StoreError, ToolError};
use warroom_core::store::{DraftStore, PerformanceStore, Product, SettingsStore};
use warroom_core::tool::{SideEffect, Tool, ToolDefinition, ToolOutput};

use crate::{ToolContext, store_failure};

fn truncate_to(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        text.chars().take(limit).collect()
    }
}

/// The creative angles briefs are built from.
const ANGLES: &[(&str, &str)] = &[
    ("benefit-led", "Lead with the single strongest customer benefit"),
    ("social proof", "Anchor on reviews, popularity, or past winners"),
    ("urgency", "Limited-time framing around season or stock"),
    ("problem-solution", "Name the pain, present the product as the fix"),
    ("value", "Price, bundle, or shipping advantage up front"),
];

// ── generate_creative_briefs ──────────────────────────────────────────────

pub struct CreativeBriefsTool {
    settings: Arc<dyn SettingsStore>,
    performance: Arc<dyn PerformanceStore>,
    page_id: Option<String>,
}

impl CreativeBriefsTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            settings: ctx.settings.clone(),
            performance: ctx.performance.clone(),
            page_id: ctx.page_id.clone(),
        }
    }

    async fn resolve_product(&self, product_id: Option<&str>) -> Result<Option<Product>, StoreError> {
        if let Some(id) = product_id {
            return self.settings.product(id).await;
        }
        if let Some(page) = &self.page_id {
            let mut products = self.settings.products_for_page(page).await?;
            return Ok(if products.is_empty() {
                None
            } else {
                Some(products.remove(0))
            });
        }
        Ok(None)
    }
}

#[async_trait]
impl Tool for CreativeBriefsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "generate_creative_briefs".into(),
            description: "Generate creative briefs (angles) for a product, grounded in past winners where available.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "product_id": { "type": "string", "description": "Product to write briefs for; defaults to the page's first product" },
                    "num_briefs": { "type": "integer", "description": "How many briefs (default 3)" }
                }
            }),
            side_effect: SideEffect::ReadOnly,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let name = "generate_creative_briefs";
        let num = (input["num_briefs"].as_u64().unwrap_or(3) as usize).clamp(1, ANGLES.len());

        let product = self
            .resolve_product(input["product_id"].as_str())
            .await
            .map_err(|e| store_failure(name, e))?
            .ok_or_else(|| ToolError::ExecutionFailed {
                tool_name: name.into(),
                message: "no product available — add a product or pass product_id".into(),
                retryable: false,
            })?;

        let winners = match &self.page_id {
            Some(page) => self
                .performance
                .past_winners(page, 2)
                .await
                .map_err(|e| store_failure(name, e))?,
            None => Vec::new(),
        };

        let briefs: Vec<serde_json::Value> = ANGLES
            .iter()
            .take(num)
            .map(|(angle, direction)| {
                json!({
                    "angle": angle,
                    "direction": direction,
                    "product": product.name.clone(),
                    "hook": format!("{} — {}", product.usp, direction),
                })
            })
            .collect();

        let mut summary = format!("Creative briefs for \"{}\":\n", product.name);
        for (i, brief) in briefs.iter().enumerate() {
            summary.push_str(&format!(
                "{}. [{}] {}\n",
                i + 1,
                brief["angle"].as_str().unwrap_or(""),
                brief["hook"].as_str().unwrap_or("")
            ));
        }
        if !winners.is_empty() {
            summary.push_str("Grounded in past winners: ");
            summary.push_str(
                &winners
                    .iter()
                    .map(|w| w.campaign_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            );
            summary.push('\n');
        }

        Ok(ToolOutput::with_data(summary, json!({ "briefs": briefs })))
    }
}

// ── generate_ad_copy ──────────────────────────────────────────────────────

pub struct GenerateAdCopyTool {
    settings: Arc<dyn SettingsStore>,
    drafts: Arc<dyn DraftStore>,
    conversation_id: ConversationId,
    page_id: Option<String>,
}

impl GenerateAdCopyTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            settings: ctx.settings.clone(),
            drafts: ctx.drafts.clone(),
            conversation_id: ctx.conversation_id.clone(),
            page_id: ctx.page_id.clone(),
        }
    }
}

#[async_trait]
impl Tool for GenerateAdCopyTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "generate_ad_copy".into(),
            description: "Write ad copy (primary text, headline, description, CTA) for a product and save it as a new draft or draft variant. Returns the draft for review.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "product_id": { "type": "string", "description": "Product the ad is for" },
                    "angle": { "type": "string", "description": "Creative angle from a brief" },
                    "campaign_name": { "type": "string", "description": "Campaign name (defaults to product + angle)" },
                    "daily_budget": { "type": "number", "description": "Daily budget for the campaign" }
                },
                "required": ["product_id"]
            }),
            side_effect: SideEffect::Mutating,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let name = "generate_ad_copy";
        let product_id = input["product_id"].as_str().ok_or_else(|| {
            ToolError::InvalidInput {
                tool_name: name.into(),
                reason: "missing required field `product_id`".into(),
            }
        })?;

        let product = self
            .settings
            .product(product_id)
            .await
            .map_err(|e| store_failure(name, e))?
            .ok_or_else(|| ToolError::ExecutionFailed {
                tool_name: name.into(),
                message: format!("product {product_id} not found"),
                retryable: false,
            })?;

        let tone = match &self.page_id {
            Some(page) => self
                .settings
                .page(page)
                .await
                .map(|p| p.default_tone)
                .unwrap_or_else(|_| "friendly".into()),
            None => "friendly".into(),
        };

        let angle = input["angle"].as_str().unwrap_or("benefit-led");
        let campaign_name = input["campaign_name"]
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| format!("{} — {}", product.name, angle));

        // Template copy, clamped to platform limits by construction.
        let primary_text = truncate_to(
            &format!(
                "{}. {} Made for {} — in a {tone} voice your audience already knows.",
                product.short_description, product.usp, product.target_audience
            ),
            PRIMARY_TEXT_LIMIT,
        );
        let headline = truncate_to(&product.name, HEADLINE_LIMIT);
        let description = truncate_to(&format!("{} — see why.", product.usp), DESCRIPTION_LIMIT);

        // New lineage, or the next variant of the one being worked on.
        let mut draft = match self
            .drafts
            .latest_for(&self.conversation_id)
            .await
            .map_err(|e| store_failure(name, e))?
        {
            Some(existing) => existing.new_variant(),
            None => AdDraft::new(
                self.conversation_id.clone(),
                campaign_name.clone(),
                format!("{} — {}", product.name, angle),
            ),
        };
        draft.campaign_name = campaign_name;
        draft.primary_text = primary_text;
        draft.headline = headline;
        draft.description = description;
        draft.cta = CallToAction::ShopNow;
        if let Some(budget) = input["daily_budget"].as_f64() {
            draft.daily_budget = budget;
        }

        debug_assert!(draft.limit_violations().is_empty());

        self.drafts
            .put(&draft)
            .await
            .map_err(|e| store_failure(name, e))?;

        tracing::debug!(draft_id = %draft.id, variant = draft.variant_number, "Ad copy drafted");

        let summary = format!(
            "Draft v{} ready for review:\nHeadline: {}\nPrimary text: {}\nDescription: {}\nCTA: {}",
            draft.variant_number,
            draft.headline,
            draft.primary_text,
            draft.description,
            draft.cta.as_str()
        );

        Ok(ToolOutput::with_data(
            summary,
            json!({ "draft_id": draft.id.clone(), "variant_number": draft.variant_number, "draft": draft }),
        ))
    }
}

// ── suggest_audiences ─────────────────────────────────────────────────────

pub struct SuggestAudiencesTool {
    settings: Arc<dyn SettingsStore>,
    page_id: Option<String>,
}

impl SuggestAudiencesTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            settings: ctx.settings.clone(),
            page_id: ctx.page_id.clone(),
        }
    }
}

#[async_trait]
impl Tool for SuggestAudiencesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "suggest_audiences".into(),
            description: "Suggest target audiences for a product based on its positioning and the page's target markets.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "product_id": { "type": "string", "description": "Product to target" },
                    "region": { "type": "string", "description": "Region code (default US)" }
                },
                "required": ["product_id"]
            }),
            side_effect: SideEffect::ReadOnly,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let name = "suggest_audiences";
        let product_id = input["product_id"].as_str().unwrap_or_default();
        let region = input["region"].as_str().unwrap_or("US");

        let product = self
            .settings
            .product(product_id)
            .await
            .map_err(|e| store_failure(name, e))?
            .ok_or_else(|| ToolError::ExecutionFailed {
                tool_name: name.into(),
                message: format!("product {product_id} not found"),
                retryable: false,
            })?;

        let mut markets = vec![region.to_string()];
        if let Some(page) = &self.page_id
            && let Ok(settings) = self.settings.page(page).await
        {
            markets.extend(settings.target_markets);
        }
        markets.dedup();

        let audiences = json!([
            {
                "name": format!("{} — core", product.name),
                "countries": markets,
                "age_min": 18,
                "age_max": 44,
                "interests": product.tags,
            },
            {
                "name": format!("{} — broad", product.name),
                "countries": [region],
                "age_min": 18,
                "age_max": 65,
                "interests": [],
            }
        ]);

        Ok(ToolOutput::with_data(
            format!(
                "Two audiences for \"{}\": a core interest-targeted set and a broad fallback in {region}.",
                product.name
            ),
            json!({ "audiences": audiences }),
        ))
    }
}
