//! Personas — named tool bundles with prompt templates.
//!
//! A persona is composition over the flat registry: a name, a prompt, and
//! the subset of tools it may propose. No object hierarchy — the same
//! orchestrator loop dispatches every persona.

use warroom_core::tool::ToolRegistry;

/// A named bundle of tools plus the system prompt that frames them.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: &'static str,
    pub prompt: &'static str,
    pub tools: &'static [&'static str],
}

impl Persona {
    /// The orchestrating media buyer: full tool surface.
    pub fn media_buyer() -> Self {
        Self {
            name: "media_buyer",
            prompt: "You are a senior media buyer and ads strategist. \
                     Understand the user's goal, gather performance context before recommending, \
                     present a plan before acting, and never publish without explicit confirmation. \
                     Explain your reasoning in plain language.",
            tools: &[
                "get_account_stats",
                "get_top_performers",
                "get_underperformers",
                "summarize_performance",
                "generate_creative_briefs",
                "generate_ad_copy",
                "suggest_audiences",
                "get_current_draft",
                "save_draft",
                "adjust_budget",
                "pause_campaigns",
                "publish_campaign",
            ],
        }
    }

    /// Reads performance data and recommends; never writes anything.
    pub fn performance_analyst() -> Self {
        Self {
            name: "performance_analyst",
            prompt: "You are a performance analyst. Ground every statement in the metrics you \
                     retrieve; identify top performers and underperformers and recommend \
                     concrete next actions with expected impact.",
            tools: &[
                "get_account_stats",
                "get_top_performers",
                "get_underperformers",
                "summarize_performance",
            ],
        }
    }

    /// Shapes angles and audiences before any copy is written.
    pub fn creative_strategist() -> Self {
        Self {
            name: "creative_strategist",
            prompt: "You are a creative strategist. Propose distinct angles grounded in the \
                     product's positioning and past winners, and suggest audiences to match.",
            tools: &[
                "generate_creative_briefs",
                "suggest_audiences",
                "get_top_performers",
            ],
        }
    }

    /// Writes and revises ad copy within platform limits.
    pub fn copywriter() -> Self {
        Self {
            name: "copywriter",
            prompt: "You are an ad copywriter. Write tight, on-tone copy within platform \
                     character limits, and revise drafts as new variants rather than rewriting \
                     in place.",
            tools: &["generate_ad_copy", "save_draft", "get_current_draft"],
        }
    }

    /// Executes campaign changes; everything it does is gated.
    pub fn execution_agent() -> Self {
        Self {
            name: "execution_agent",
            prompt: "You execute campaign changes: budgets, pauses, publishing. State exactly \
                     what will change before acting, and treat publishing as irreversible.",
            tools: &[
                "get_current_draft",
                "adjust_budget",
                "pause_campaigns",
                "publish_campaign",
            ],
        }
    }

    /// Build this persona's registry from the full registry.
    pub fn registry(&self, full: &ToolRegistry) -> ToolRegistry {
        full.subset(self.tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ToolContext, default_registry};
    use std::sync::Arc;
    use warroom_core::conversation::ConversationId;
    use warroom_core::tool::SideEffect;
    use warroom_memory::InMemoryStores;

    fn full_registry() -> ToolRegistry {
        let stores = Arc::new(InMemoryStores::new());
        let ctx = ToolContext {
            settings: stores.clone(),
            performance: stores.clone(),
            drafts: stores,
            workspace_id: "ws_1".into(),
            page_id: None,
            conversation_id: ConversationId::new(),
        };
        default_registry(&ctx)
    }

    #[test]
    fn media_buyer_covers_full_surface() {
        let full = full_registry();
        let bundle = Persona::media_buyer().registry(&full);
        assert_eq!(bundle.names().len(), full.names().len());
    }

    #[test]
    fn analyst_bundle_is_read_only() {
        let full = full_registry();
        let bundle = Persona::performance_analyst().registry(&full);
        for def in bundle.definitions() {
            assert_eq!(
                def.side_effect,
                SideEffect::ReadOnly,
                "{} must be read-only",
                def.name
            );
        }
    }

    #[test]
    fn copywriter_cannot_publish() {
        let full = full_registry();
        let bundle = Persona::copywriter().registry(&full);
        assert!(bundle.get("publish_campaign").is_none());
        assert!(bundle.get("generate_ad_copy").is_some());
    }

    #[test]
    fn every_persona_tool_exists_in_full_registry() {
        let full = full_registry();
        for persona in [
            Persona::media_buyer(),
            Persona::performance_analyst(),
            Persona::creative_strategist(),
            Persona::copywriter(),
            Persona::execution_agent(),
        ] {
            for tool in persona.tools {
                assert!(
                    full.get(tool).is_some(),
                    "persona {} names unknown tool {tool}",
                    persona.name
                );
            }
        }
    }
}
