//! # Warroom Agent
//!
//! The orchestrator: one user message in, one ordered stream of events out.
//!
//! The turn loop is a bounded **reason → act → observe** cycle:
//!
//! 1. Load conversation state and assemble scoped memory (fresh per turn)
//! 2. Ask the completion backend for a final reply or proposed tool calls
//! 3. Read-only calls dispatch immediately (concurrently when proposed
//!    together); mutating and irreversible calls pass the guardrail
//!    validator first — `block` feeds a refusal back, `confirm` asks the
//!    user and ends the turn, `allow` dispatches and is logged
//! 4. Observations feed the next reasoning step until the backend yields a
//!    final reply or the step budget runs out
//!
//! Turns are serialized per conversation; every turn ends with a
//! human-readable reply.

pub mod cancel;
pub mod confirm;
pub mod orchestrator;
pub mod test_helpers;

pub use cancel::CancelToken;
pub use confirm::ConfirmationVerdict;
pub use orchestrator::Orchestrator;
