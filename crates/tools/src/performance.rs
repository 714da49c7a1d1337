//! Performance analysis tools — read-only views over the performance store.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use warroom_core::error::ToolError;
use warroom_core::store::PerformanceStore;
use warroom_core::tool::{SideEffect, Tool, ToolDefinition, ToolOutput};

use crate::{ToolContext, store_failure};

fn parse_days(time_range: Option<&str>) -> u32 {
    match time_range {
        Some("last_30_days") => 30,
        Some("last_14_days") => 14,
        _ => 7,
    }
}

const TIME_RANGE_SCHEMA: &str = "One of last_7_days, last_14_days, last_30_days";

// ── get_account_stats ─────────────────────────────────────────────────────

pub struct AccountStatsTool {
    performance: Arc<dyn PerformanceStore>,
    workspace_id: String,
    page_id: Option<String>,
}

impl AccountStatsTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            performance: ctx.performance.clone(),
            workspace_id: ctx.workspace_id.clone(),
            page_id: ctx.page_id.clone(),
        }
    }
}

#[async_trait]
impl Tool for AccountStatsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_account_stats".into(),
            description: "Get aggregate ad performance (spend, impressions, clicks, CTR, conversions, ROAS) for the current scope.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "time_range": { "type": "string", "description": TIME_RANGE_SCHEMA }
                }
            }),
            side_effect: SideEffect::ReadOnly,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let days = parse_days(input["time_range"].as_str());

        let summary = match &self.page_id {
            Some(page) => self.performance.page_summary(page, days).await,
            None => self.performance.account_summary(&self.workspace_id, days).await,
        }
        .map_err(|e| store_failure("get_account_stats", e))?;

        Ok(ToolOutput::with_data(
            format!(
                "Last {} days: spend {:.2}, {} impressions, {} clicks (CTR {:.2}%), {} conversions, ROAS {:.1}x",
                summary.period_days,
                summary.spend,
                summary.impressions,
                summary.clicks,
                summary.ctr,
                summary.conversions,
                summary.roas
            ),
            serde_json::to_value(&summary).unwrap_or_default(),
        ))
    }
}

// ── get_top_performers ────────────────────────────────────────────────────

pub struct TopPerformersTool {
    performance: Arc<dyn PerformanceStore>,
    workspace_id: String,
    page_id: Option<String>,
}

impl TopPerformersTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            performance: ctx.performance.clone(),
            workspace_id: ctx.workspace_id.clone(),
            page_id: ctx.page_id.clone(),
        }
    }
}

#[async_trait]
impl Tool for TopPerformersTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_top_performers".into(),
            description: "List the best-performing campaigns by ROAS for the current scope.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "description": "Max campaigns to return (default 3)" }
                }
            }),
            side_effect: SideEffect::ReadOnly,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let limit = input["limit"].as_u64().unwrap_or(3) as usize;
        let metrics = self
            .performance
            .top_performers(&self.workspace_id, self.page_id.as_deref(), limit)
            .await
            .map_err(|e| store_failure("get_top_performers", e))?;

        let summary = if metrics.is_empty() {
            "No campaign data available yet.".to_string()
        } else {
            let lines: Vec<String> = metrics
                .iter()
                .map(|m| format!("\"{}\" — ROAS {:.1}x, spend {:.2}, {} conversions", m.name, m.roas, m.spend, m.conversions))
                .collect();
            format!("Top performers:\n{}", lines.join("\n"))
        };

        Ok(ToolOutput::with_data(
            summary,
            serde_json::to_value(&metrics).unwrap_or_default(),
        ))
    }
}

// ── get_underperformers ───────────────────────────────────────────────────

pub struct UnderperformersTool {
    performance: Arc<dyn PerformanceStore>,
    workspace_id: String,
    page_id: Option<String>,
}

impl UnderperformersTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            performance: ctx.performance.clone(),
            workspace_id: ctx.workspace_id.clone(),
            page_id: ctx.page_id.clone(),
        }
    }
}

#[async_trait]
impl Tool for UnderperformersTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_underperformers".into(),
            description: "List campaigns performing below breakeven for the current scope — candidates for pausing.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "description": "Max campaigns to return (default 3)" }
                }
            }),
            side_effect: SideEffect::ReadOnly,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let limit = input["limit"].as_u64().unwrap_or(3) as usize;
        let metrics = self
            .performance
            .underperformers(&self.workspace_id, self.page_id.as_deref(), limit)
            .await
            .map_err(|e| store_failure("get_underperformers", e))?;

        let summary = if metrics.is_empty() {
            "No underperforming campaigns found.".to_string()
        } else {
            let lines: Vec<String> = metrics
                .iter()
                .map(|m| format!("\"{}\" — ROAS {:.1}x, spend {:.2}", m.name, m.roas, m.spend))
                .collect();
            format!("Underperformers:\n{}", lines.join("\n"))
        };

        Ok(ToolOutput::with_data(
            summary,
            serde_json::to_value(&metrics).unwrap_or_default(),
        ))
    }
}

// ── summarize_performance ─────────────────────────────────────────────────

pub struct SummarizePerformanceTool {
    performance: Arc<dyn PerformanceStore>,
    workspace_id: String,
    page_id: Option<String>,
}

impl SummarizePerformanceTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            performance: ctx.performance.clone(),
            workspace_id: ctx.workspace_id.clone(),
            page_id: ctx.page_id.clone(),
        }
    }
}

#[async_trait]
impl Tool for SummarizePerformanceTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "summarize_performance".into(),
            description: "Produce a formatted performance summary with top/bottom campaigns and recommendations, ready to show the user.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "time_range": { "type": "string", "description": TIME_RANGE_SCHEMA }
                }
            }),
            side_effect: SideEffect::ReadOnly,
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let days = parse_days(input["time_range"].as_str());
        let name = "summarize_performance";

        let summary = match &self.page_id {
            Some(page) => self.performance.page_summary(page, days).await,
            None => self.performance.account_summary(&self.workspace_id, days).await,
        }
        .map_err(|e| store_failure(name, e))?;

        let top = self
            .performance
            .top_performers(&self.workspace_id, self.page_id.as_deref(), 1)
            .await
            .map_err(|e| store_failure(name, e))?;
        let under = self
            .performance
            .underperformers(&self.workspace_id, self.page_id.as_deref(), 1)
            .await
            .map_err(|e| store_failure(name, e))?;

        let mut out = format!(
            "**Performance Summary — last {} days**\n\n\
             | Metric | Value |\n|--------|-------|\n\
             | Total Spend | {:.2} |\n| Impressions | {} |\n| Clicks | {} |\n\
             | CTR | {:.2}% |\n| Conversions | {} |\n| ROAS | {:.1}x |\n",
            summary.period_days,
            summary.spend,
            summary.impressions,
            summary.clicks,
            summary.ctr,
            summary.conversions,
            summary.roas
        );

        let mut recommendations = Vec::new();
        if let Some(best) = top.first() {
            out.push_str(&format!(
                "\n**Top Performer:** \"{}\" (ROAS {:.1}x)\n",
                best.name, best.roas
            ));
            recommendations.push(format!("Increase \"{}\" budget by 30%", best.name));
        }
        if let Some(worst) = under.first() {
            out.push_str(&format!(
                "**Underperformer:** \"{}\" (ROAS {:.1}x)\n",
                worst.name, worst.roas
            ));
            recommendations.push(format!("Pause \"{}\"", worst.name));
        }
        if !recommendations.is_empty() {
            out.push_str("\n**Recommendations:**\n");
            for (i, rec) in recommendations.iter().enumerate() {
                out.push_str(&format!("{}. {rec}\n", i + 1));
            }
        }

        Ok(ToolOutput::with_data(
            out,
            json!({ "summary": summary, "recommendations": recommendations }),
        ))
    }
}
