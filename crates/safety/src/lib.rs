//! # Warroom Safety
//!
//! The guardrail validator and the decision logger.
//!
//! The validator is a pure function over a proposed mutating/irreversible
//! tool call plus conversation context — it performs no I/O and is fully
//! unit-testable against fixed inputs. The decision logger is the durable,
//! append-only record of every tool invocation and its rationale; a
//! logging failure aborts irreversible paths, never read-only ones.

pub mod activity;
pub mod guardrails;

pub use activity::{ActivityLog, ActivitySink, TracingSink};
pub use guardrails::{GuardrailContext, ProposedAction, classify, validate};
