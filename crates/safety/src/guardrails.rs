//! Guardrail validation — pure policy gating for mutating tool calls.
//!
//! Rule order (first match wins): blocks are evaluated before confirms so
//! that a publish with no connected credential blocks regardless of budget
//! size, and policy-violating copy blocks regardless of everything else.
//!
//! 1. Missing identity: publish with no connected platform credential → block.
//! 2. Content policy: copy matching a prohibited term → block; the
//!    orchestrator offers a rephrase path, never a bypass.
//! 3. Budget: publish/budget-adjustment above default × multiple → confirm.
//! 4. Explicit approval: irreversible calls passing 1–3 still require the
//!    immediately preceding user message to be an explicit affirmative in
//!    response to a rendered confirmation summary → otherwise confirm.
//! 5. Default: mutating, non-irreversible calls → allow.

use warroom_config::GuardrailConfig;
use warroom_core::backend::ProposedCall;
use warroom_core::guardrail::{ConfirmThreshold, GuardrailDecision};
use warroom_core::tool::SideEffect;

/// Conversation-level inputs to validation. Assembled by the orchestrator
/// from read-only settings; the validator owns none of it.
#[derive(Debug, Clone)]
pub struct GuardrailContext {
    /// Workspace/page default daily budget.
    pub default_daily_budget: f64,

    /// Whether an advertising-platform credential is connected for the
    /// target scope.
    pub credential_connected: bool,

    /// Whether the immediately preceding user message is an explicit
    /// affirmative in response to a rendered confirmation summary.
    pub confirmation_affirmed: bool,

    /// Policy configuration (budget multiple, term lists).
    pub policy: GuardrailConfig,
}

/// A proposed call classified into the action vocabulary the rules speak.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposedAction {
    Publish {
        requested_budget: Option<f64>,
        copy: String,
    },
    AdjustBudget {
        requested_budget: f64,
    },
    WriteCreative {
        copy: String,
    },
    Pause,
    OtherMutating,
}

/// Extract the action class from a proposed call and its side-effect class.
///
/// Budget and creative fields are pulled from the conventional input keys;
/// a tool with none of them falls through to `OtherMutating`.
pub fn classify(call: &ProposedCall, side_effect: SideEffect) -> ProposedAction {
    let budget = ["new_budget", "daily_budget", "budget"]
        .iter()
        .find_map(|key| call.input.get(*key).and_then(|v| v.as_f64()));

    let copy = {
        let mut parts = Vec::new();
        for key in ["primary_text", "headline", "description"] {
            if let Some(text) = call.input.get(key).and_then(|v| v.as_str()) {
                parts.push(text);
            }
        }
        parts.join(" ")
    };

    match side_effect {
        SideEffect::Irreversible => ProposedAction::Publish {
            requested_budget: budget,
            copy,
        },
        SideEffect::Mutating if call.name.contains("budget") => ProposedAction::AdjustBudget {
            requested_budget: budget.unwrap_or(0.0),
        },
        SideEffect::Mutating if call.name.contains("pause") => ProposedAction::Pause,
        SideEffect::Mutating if !copy.is_empty() => ProposedAction::WriteCreative { copy },
        _ => ProposedAction::OtherMutating,
    }
}

/// Validate one proposed action. Pure and side-effect-free.
pub fn validate(action: &ProposedAction, ctx: &GuardrailContext) -> GuardrailDecision {
    // Rule: publishing requires a connected account, independent of
    // budget and content.
    if let ProposedAction::Publish { .. } = action {
        if !ctx.credential_connected {
            return GuardrailDecision::Block {
                reason: "publishing requires a connected account".into(),
            };
        }
    }

    // Rule: content policy.
    if let ProposedAction::Publish { copy, .. } | ProposedAction::WriteCreative { copy } = action {
        if let Some(term) = match_prohibited(copy, &ctx.policy.prohibited_terms) {
            return GuardrailDecision::Block {
                reason: format!("policy violation: \"{term}\" is not allowed in ad copy"),
            };
        }
    }

    // Rule: budget threshold.
    let requested = match action {
        ProposedAction::Publish {
            requested_budget: Some(b),
            ..
        } => Some(*b),
        ProposedAction::AdjustBudget { requested_budget } => Some(*requested_budget),
        _ => None,
    };
    if let Some(requested) = requested {
        let ceiling = ctx.default_daily_budget * ctx.policy.budget_multiple;
        if requested > ceiling {
            return GuardrailDecision::Confirm {
                reason: format!(
                    "budget significantly above usual default ({requested:.0} vs {:.0}, more than {:.0}× the default)",
                    ctx.default_daily_budget, ctx.policy.budget_multiple
                ),
                threshold: ConfirmThreshold::BudgetMultiple {
                    requested,
                    default: ctx.default_daily_budget,
                    multiple: ctx.policy.budget_multiple,
                },
            };
        }
    }

    // Rule: irreversible calls need the explicit go-ahead even when every
    // numeric and content rule passes.
    if let ProposedAction::Publish { .. } = action {
        if !ctx.confirmation_affirmed {
            return GuardrailDecision::Confirm {
                reason: "publishing is irreversible and needs your explicit go-ahead".into(),
                threshold: ConfirmThreshold::ExplicitApprovalMissing,
            };
        }
    }

    GuardrailDecision::Allow
}

fn match_prohibited<'a>(copy: &str, terms: &'a [String]) -> Option<&'a str> {
    let lowered = copy.to_lowercase();
    terms
        .iter()
        .find(|term| lowered.contains(&term.to_lowercase()))
        .map(String::as_str)
}

/// Sensitive (warn-only) terms present in the copy. Not a gate — surfaced
/// in the confirmation summary so the user sees what may need review.
pub fn sensitive_matches<'a>(copy: &str, policy: &'a GuardrailConfig) -> Vec<&'a str> {
    let lowered = copy.to_lowercase();
    policy
        .sensitive_terms
        .iter()
        .filter(|term| lowered.contains(&term.to_lowercase()))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> GuardrailContext {
        GuardrailContext {
            default_daily_budget: 500.0,
            credential_connected: true,
            confirmation_affirmed: false,
            policy: GuardrailConfig::default(),
        }
    }

    fn publish_call(budget: f64, copy: &str) -> ProposedCall {
        ProposedCall {
            id: "c1".into(),
            name: "publish_campaign".into(),
            input: json!({
                "draft_id": "d1",
                "daily_budget": budget,
                "primary_text": copy,
            }),
        }
    }

    #[test]
    fn budget_over_multiple_requires_confirmation() {
        // 2600 > 500 × 5
        let action = classify(&publish_call(2600.0, "Great hoodie"), SideEffect::Irreversible);
        let decision = validate(&action, &ctx());
        match decision {
            GuardrailDecision::Confirm { reason, threshold } => {
                assert!(reason.contains("above usual default"));
                assert!(matches!(
                    threshold,
                    ConfirmThreshold::BudgetMultiple { multiple, .. } if (multiple - 5.0).abs() < f64::EPSILON
                ));
            }
            other => panic!("expected Confirm, got {other:?}"),
        }
    }

    #[test]
    fn requested_2000_against_default_300_confirms_never_allows() {
        let mut context = ctx();
        context.default_daily_budget = 300.0;
        let action = classify(&publish_call(2000.0, "Great hoodie"), SideEffect::Irreversible);
        let decision = validate(&action, &context);
        assert!(
            matches!(decision, GuardrailDecision::Confirm { .. }),
            "2000 > 300×5 must confirm, got {decision:?}"
        );
        assert!(!decision.is_allow());
    }

    #[test]
    fn budget_rule_applies_to_adjustments_too() {
        let call = ProposedCall {
            id: "c1".into(),
            name: "adjust_budget".into(),
            input: json!({"campaign_id": "camp_1", "new_budget": 9000.0}),
        };
        let action = classify(&call, SideEffect::Mutating);
        assert_eq!(
            action,
            ProposedAction::AdjustBudget {
                requested_budget: 9000.0
            }
        );
        let decision = validate(&action, &ctx());
        assert!(matches!(decision, GuardrailDecision::Confirm { .. }));
    }

    #[test]
    fn go_ahead_without_rendered_summary_confirms() {
        // "Go ahead" with no prior rendered confirmation summary: all
        // numeric/content rules pass, but the explicit-approval
        // precondition is missing.
        let action = classify(&publish_call(100.0, "Great hoodie"), SideEffect::Irreversible);
        let decision = validate(&action, &ctx());
        match decision {
            GuardrailDecision::Confirm { threshold, .. } => {
                assert_eq!(threshold, ConfirmThreshold::ExplicitApprovalMissing);
            }
            other => panic!("expected Confirm, got {other:?}"),
        }
    }

    #[test]
    fn affirmed_publish_within_limits_allows() {
        let mut context = ctx();
        context.confirmation_affirmed = true;
        let action = classify(&publish_call(100.0, "Great hoodie"), SideEffect::Irreversible);
        assert_eq!(validate(&action, &context), GuardrailDecision::Allow);
    }

    #[test]
    fn health_claim_blocks_with_category() {
        let action = classify(
            &publish_call(100.0, "This miracle cure melts fat overnight"),
            SideEffect::Irreversible,
        );
        let decision = validate(&action, &ctx());
        match decision {
            GuardrailDecision::Block { reason } => {
                assert!(reason.contains("policy violation"));
                assert!(reason.contains("cure") || reason.contains("miracle"));
            }
            other => panic!("expected Block, got {other:?}"),
        }
    }

    #[test]
    fn content_block_applies_to_draft_creation() {
        let call = ProposedCall {
            id: "c1".into(),
            name: "save_draft".into(),
            input: json!({"primary_text": "Guaranteed results or your money back", "headline": "Win"}),
        };
        let action = classify(&call, SideEffect::Mutating);
        let decision = validate(&action, &ctx());
        assert!(decision.is_block());
    }

    #[test]
    fn no_credential_blocks_regardless_of_budget() {
        let mut context = ctx();
        context.credential_connected = false;
        // enormous budget — the identity rule still wins
        let action = classify(&publish_call(50_000.0, "Great hoodie"), SideEffect::Irreversible);
        let decision = validate(&action, &context);
        match decision {
            GuardrailDecision::Block { reason } => {
                assert!(reason.contains("connected account"));
            }
            other => panic!("expected Block, got {other:?}"),
        }
    }

    #[test]
    fn pause_allows_without_confirmation() {
        let call = ProposedCall {
            id: "c1".into(),
            name: "pause_campaigns".into(),
            input: json!({"campaign_ids": ["camp_1"]}),
        };
        let action = classify(&call, SideEffect::Mutating);
        assert_eq!(action, ProposedAction::Pause);
        assert_eq!(validate(&action, &ctx()), GuardrailDecision::Allow);
    }

    #[test]
    fn prohibited_matching_is_case_insensitive() {
        let action = ProposedAction::WriteCreative {
            copy: "RISK-FREE trial!".into(),
        };
        assert!(validate(&action, &ctx()).is_block());
    }

    #[test]
    fn sensitive_terms_surface_without_blocking() {
        let copy = "Feel better in your own skin with our skincare routine";
        let config = GuardrailConfig::default();
        let matches = sensitive_matches(copy, &config);
        assert!(matches.contains(&"skin"));

        let action = ProposedAction::WriteCreative { copy: copy.into() };
        assert_eq!(validate(&action, &ctx()), GuardrailDecision::Allow);
    }
}
