//! Guardrail decision types.
//!
//! The outcome of validating one mutating or irreversible tool call.
//! Attached to the invocation record and the activity log; never silently
//! discarded.

use serde::{Deserialize, Serialize};

/// The specific threshold a `confirm` decision crossed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "threshold", rename_all = "snake_case")]
pub enum ConfirmThreshold {
    /// Requested daily budget exceeds default × multiple.
    BudgetMultiple {
        requested: f64,
        default: f64,
        multiple: f64,
    },

    /// Irreversible call without an explicit user affirmative immediately
    /// preceding it.
    ExplicitApprovalMissing,
}

/// allow / require-confirmation / block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardrailDecision {
    Allow,
    Confirm {
        reason: String,
        threshold: ConfirmThreshold,
    },
    Block {
        reason: String,
    },
}

impl GuardrailDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    /// User-facing explanation, empty for `Allow`.
    pub fn reason(&self) -> &str {
        match self {
            Self::Allow => "",
            Self::Confirm { reason, .. } | Self::Block { reason } => reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_serialization_snake_case() {
        let d = GuardrailDecision::Confirm {
            reason: "budget significantly above usual default".into(),
            threshold: ConfirmThreshold::BudgetMultiple {
                requested: 2000.0,
                default: 500.0,
                multiple: 5.0,
            },
        };
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains(r#""decision":"confirm""#));
        assert!(json.contains(r#""threshold":"budget_multiple""#));

        let back: GuardrailDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn reason_accessor() {
        assert_eq!(GuardrailDecision::Allow.reason(), "");
        let block = GuardrailDecision::Block {
            reason: "publishing requires a connected account".into(),
        };
        assert!(block.reason().contains("connected account"));
        assert!(block.is_block());
        assert!(!block.is_allow());
    }
}
