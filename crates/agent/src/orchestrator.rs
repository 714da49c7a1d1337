//! The orchestrator — the control loop behind every turn.
//!
//! One turn: load conversation state, assemble scoped memory, then run a
//! bounded reason/act/observe loop against the completion backend. Proposed
//! read-only calls dispatch immediately (concurrently when proposed
//! together); mutating and irreversible calls pass through the guardrail
//! validator first. The loop ends with a final reply, a confirmation
//! request, or the step budget's graceful fallback — the user always gets
//! a human-readable reply.
//!
//! Turns for the same conversation are serialized; different conversations
//! run fully independently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use warroom_config::{GuardrailConfig, OrchestratorConfig};
use warroom_core::activity::{ActivityEntry, ActivityKind, Actor};
use warroom_core::backend::{BackendReply, CompletionBackend, ProposedCall, TurnRequest};
use warroom_core::conversation::{
    Conversation, ConversationId, Message, PendingConfirmation, Stage, is_affirmative,
};
use warroom_core::event::TurnEvent;
use warroom_core::guardrail::GuardrailDecision;
use warroom_core::store::ConversationStore;
use warroom_core::tool::{SideEffect, ToolInvocation, ToolOutput, ToolRegistry};
use warroom_memory::{MemoryContext, MemoryScope};
use warroom_safety::ActivityLog;
use warroom_safety::guardrails::{GuardrailContext, classify, sensitive_matches, validate};
use warroom_tools::Persona;

use crate::cancel::CancelToken;
use crate::confirm::{self, ConfirmationVerdict};

/// An observation fed back to the backend after a dispatch.
#[derive(Debug, Clone)]
struct Observation {
    tool: String,
    content: String,
    success: bool,
}

fn render_observations(observations: &[Observation]) -> String {
    if observations.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n[Observations]\n");
    for obs in observations {
        if obs.success {
            out.push_str(&format!("- {}: {}\n", obs.tool, obs.content));
        } else {
            out.push_str(&format!("- {} (failed): {}\n", obs.tool, obs.content));
        }
    }
    out
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

/// The orchestrator. Cheap to share — hold it in an `Arc` and call
/// [`Orchestrator::process_turn`] per incoming user message.
pub struct Orchestrator {
    backend: Arc<dyn CompletionBackend>,
    tools: Arc<ToolRegistry>,
    memory: Arc<MemoryScope>,
    conversations: Arc<dyn ConversationStore>,
    activity: Arc<ActivityLog>,
    policy: GuardrailConfig,
    config: OrchestratorConfig,
    system_prompt: String,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        tools: Arc<ToolRegistry>,
        memory: Arc<MemoryScope>,
        conversations: Arc<dyn ConversationStore>,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self {
            backend,
            tools,
            memory,
            conversations,
            activity,
            policy: GuardrailConfig::default(),
            config: OrchestratorConfig::default(),
            system_prompt: Persona::media_buyer().prompt.to_string(),
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Set the guardrail policy inputs.
    pub fn with_policy(mut self, policy: GuardrailConfig) -> Self {
        self.policy = policy;
        self
    }

    /// Set loop knobs (step budget, history window).
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Frame the loop with a persona's prompt.
    pub fn with_persona(mut self, persona: &Persona) -> Self {
        self.system_prompt = persona.prompt.to_string();
        self
    }

    /// The single conversation for a scope, created on first use. One
    /// account-wide conversation exists per workspace and one page-scoped
    /// conversation per included page — never duplicated.
    pub async fn ensure_conversation(
        &self,
        scope: warroom_core::Scope,
    ) -> Result<Conversation, warroom_core::Error> {
        if let Some(existing) = self.conversations.find_by_scope(&scope).await? {
            return Ok(existing);
        }
        let conversation = Conversation::new(scope);
        self.conversations.save(&conversation).await?;
        info!(conversation_id = %conversation.id, "Conversation created for scope");
        Ok(conversation)
    }

    /// Process one user turn. Returns the ordered event stream; the turn
    /// itself runs in a background task.
    pub fn process_turn(
        self: &Arc<Self>,
        conversation_id: ConversationId,
        user_text: impl Into<String>,
    ) -> mpsc::Receiver<TurnEvent> {
        self.process_turn_with(conversation_id, user_text, CancelToken::new())
    }

    /// Like [`Self::process_turn`], with caller-held cancellation.
    pub fn process_turn_with(
        self: &Arc<Self>,
        conversation_id: ConversationId,
        user_text: impl Into<String>,
        cancel: CancelToken,
    ) -> mpsc::Receiver<TurnEvent> {
        let (tx, rx) = mpsc::channel::<TurnEvent>(64);
        let this = Arc::clone(self);
        let text = user_text.into();
        tokio::spawn(async move {
            this.run_turn(conversation_id, text, cancel, tx).await;
        });
        rx
    }

    async fn turn_lock(&self, conversation_id: &ConversationId) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        locks
            .entry(conversation_id.0.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn run_turn(
        &self,
        conversation_id: ConversationId,
        user_text: String,
        cancel: CancelToken,
        tx: mpsc::Sender<TurnEvent>,
    ) {
        // at most one turn (and so one outstanding mutating call) per
        // conversation at a time
        let lock = self.turn_lock(&conversation_id).await;
        let _guard = lock.lock().await;

        let mut conversation = match self.conversations.load(&conversation_id).await {
            Ok(c) => c,
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to load conversation");
                Self::emit_reply(
                    &tx,
                    &conversation_id,
                    "I'm sorry — I couldn't load this conversation. Please try again.",
                )
                .await;
                return;
            }
        };

        info!(conversation_id = %conversation_id, stage = %conversation.stage, "Turn started");
        conversation.push(Message::user(&user_text));

        if confirm::is_reset(&user_text) {
            conversation.reset();
            self.finish(
                conversation,
                Vec::new(),
                "Fresh start. What would you like to work on?",
                &tx,
            )
            .await;
            return;
        }

        if conversation.stage == Stage::Idle {
            let _ = conversation.advance(Stage::Discovery);
        }

        let trace: Vec<ToolInvocation> = Vec::new();

        // A pending gate from the previous turn: the next user message is
        // interpreted as confirm/deny before anything else.
        if let Some(pending) = conversation.context.pending_confirmation.take() {
            match confirm::interpret(&user_text) {
                ConfirmationVerdict::Affirmed => {
                    self.dispatch_confirmed(conversation, pending, trace, &tx).await;
                    return;
                }
                ConfirmationVerdict::Denied => {
                    debug!(conversation_id = %conversation_id, "Confirmation denied, gate dropped");
                    self.finish(
                        conversation,
                        trace,
                        "Okay — holding off. Tell me what you'd like to change.",
                        &tx,
                    )
                    .await;
                    return;
                }
                ConfirmationVerdict::Unrelated => {
                    debug!(conversation_id = %conversation_id, "Pending confirmation abandoned");
                }
            }
        } else if conversation.stage == Stage::Review && is_affirmative(&user_text) {
            // explicit approval with no edits pending
            let _ = conversation.advance(Stage::ReadyToPublish);
        }

        // Scoped memory: assembled fresh per turn, reused across the
        // reasoning steps within it.
        let memctx = match self.memory.assemble(&conversation).await {
            Ok(m) => m,
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Memory assembly failed");
                self.fail(
                    conversation,
                    trace,
                    "I'm sorry — I couldn't gather your workspace context. Please try again.",
                    &tx,
                )
                .await;
                return;
            }
        };

        self.reasoning_loop(conversation, memctx, user_text, trace, cancel, tx)
            .await;
    }

    async fn reasoning_loop(
        &self,
        mut conversation: Conversation,
        memctx: MemoryContext,
        user_text: String,
        mut trace: Vec<ToolInvocation>,
        cancel: CancelToken,
        tx: mpsc::Sender<TurnEvent>,
    ) {
        let mut observations: Vec<Observation> = Vec::new();
        let mut failure_counts: HashMap<String, u32> = HashMap::new();

        for step in 1..=self.config.max_steps {
            // cancellation takes effect at suspension points; results of
            // anything already dispatched are discarded, not interrupted
            if cancel.is_cancelled() {
                debug!(conversation_id = %conversation.id, step, "Turn cancelled");
                let _ = tx
                    .send(TurnEvent::Done {
                        conversation_id: conversation.id.to_string(),
                    })
                    .await;
                return;
            }

            let request = TurnRequest {
                system_prompt: self.system_prompt.clone(),
                context_block: format!("{}{}", memctx.render(), render_observations(&observations)),
                history: conversation.recent_window(self.config.history_window).to_vec(),
                user_message: user_text.clone(),
                tools: self.tools.definitions(),
            };

            debug!(conversation_id = %conversation.id, step, "Reasoning step");

            let reply = match self.backend.complete(request).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(conversation_id = %conversation.id, error = %e, "Backend call failed");
                    self.fail(
                        conversation,
                        trace,
                        "I'm sorry — I hit a problem while thinking that one through. Please try again in a moment.",
                        &tx,
                    )
                    .await;
                    return;
                }
            };

            let (thought, calls) = match reply {
                BackendReply::Final { text } => {
                    self.finish(conversation, trace, &text, &tx).await;
                    return;
                }
                BackendReply::Act { thought, calls } => (thought, calls),
            };

            if let Some(thought) = thought {
                let _ = tx.send(TurnEvent::Thinking { content: thought }).await;
            }

            // Partition by side-effect class, preserving proposal order.
            let mut read_only: Vec<ProposedCall> = Vec::new();
            let mut gated: Vec<(ProposedCall, SideEffect)> = Vec::new();
            for call in calls {
                match self.tools.side_effect_of(&call.name) {
                    Some(SideEffect::ReadOnly) => read_only.push(call),
                    Some(side_effect) => gated.push((call, side_effect)),
                    None => {
                        observations.push(Observation {
                            tool: call.name.clone(),
                            content: format!("unknown tool \"{}\"", call.name),
                            success: false,
                        });
                    }
                }
            }

            // Read-only fan-out: dispatched concurrently, observations fed
            // back in dispatch order.
            for call in &read_only {
                let _ = tx
                    .send(TurnEvent::ToolCall {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.input.clone(),
                    })
                    .await;
            }
            let results =
                futures::future::join_all(read_only.iter().map(|c| self.tools.execute(c))).await;

            for (call, result) in read_only.iter().zip(results) {
                match result {
                    Ok(output) => {
                        self.observe_success(
                            &mut conversation,
                            call,
                            SideEffect::ReadOnly,
                            None,
                            &output,
                            &mut observations,
                            &mut trace,
                            &mut failure_counts,
                            &tx,
                        )
                        .await;
                    }
                    Err(err) => {
                        let terminal = Self::observe_failure(
                            call,
                            SideEffect::ReadOnly,
                            &err.to_string(),
                            &mut observations,
                            &mut trace,
                            &mut failure_counts,
                            &tx,
                        )
                        .await;
                        if terminal {
                            self.fail(
                                conversation,
                                trace,
                                "I'm sorry — that keeps failing on my side, so I've stopped rather than guess. Could you try again or rephrase?",
                                &tx,
                            )
                            .await;
                            return;
                        }
                    }
                }
            }

            // Gated calls: one at a time, validator first, never in
            // parallel with anything.
            for (call, side_effect) in gated {
                if cancel.is_cancelled() {
                    let _ = tx
                        .send(TurnEvent::Done {
                            conversation_id: conversation.id.to_string(),
                        })
                        .await;
                    return;
                }

                let action = classify(&call, side_effect);
                let gctx = GuardrailContext {
                    default_daily_budget: memctx.workspace.default_daily_budget,
                    credential_connected: memctx.workspace.credential_connected,
                    confirmation_affirmed: false,
                    policy: self.policy.clone(),
                };
                let decision = validate(&action, &gctx);

                match decision {
                    GuardrailDecision::Block { ref reason } => {
                        info!(conversation_id = %conversation.id, tool = %call.name, %reason, "Guardrail block");
                        self.record_guardrail(&conversation, &call, &decision);
                        observations.push(Observation {
                            tool: call.name.clone(),
                            content: format!(
                                "refused by guardrails: {reason}. Do not retry the same call — offer the user a rephrase or an alternative instead."
                            ),
                            success: false,
                        });
                    }
                    GuardrailDecision::Confirm { ref reason, .. } => {
                        info!(conversation_id = %conversation.id, tool = %call.name, %reason, "Guardrail confirm");
                        self.record_guardrail(&conversation, &call, &decision);

                        let copy = creative_copy_of(&call);
                        let sensitive = sensitive_matches(&copy, &self.policy);
                        let summary = confirm::render_summary(&call, reason, &sensitive);

                        conversation.context.pending_confirmation = Some(PendingConfirmation {
                            summary: summary.clone(),
                            call: call.clone(),
                            reason: reason.clone(),
                            requested_at: Utc::now(),
                        });

                        // state stays put; the next user message answers the gate
                        self.finish(conversation, trace, &summary, &tx).await;
                        return;
                    }
                    GuardrailDecision::Allow => {
                        let _ = tx
                            .send(TurnEvent::ToolCall {
                                id: call.id.clone(),
                                name: call.name.clone(),
                                input: call.input.clone(),
                            })
                            .await;

                        match self.tools.execute(&call).await {
                            Ok(output) => {
                                self.observe_success(
                                    &mut conversation,
                                    &call,
                                    side_effect,
                                    Some(GuardrailDecision::Allow),
                                    &output,
                                    &mut observations,
                                    &mut trace,
                                    &mut failure_counts,
                                    &tx,
                                )
                                .await;
                            }
                            Err(err) => {
                                let terminal = Self::observe_failure(
                                    &call,
                                    side_effect,
                                    &err.to_string(),
                                    &mut observations,
                                    &mut trace,
                                    &mut failure_counts,
                                    &tx,
                                )
                                .await;
                                if terminal {
                                    self.fail(
                                        conversation,
                                        trace,
                                        "I'm sorry — that action failed twice in a row, so I've stopped. Nothing further was changed.",
                                        &tx,
                                    )
                                    .await;
                                    return;
                                }
                            }
                        }
                    }
                }
            }

            debug!(conversation_id = %conversation.id, step, observations = observations.len(), "Step complete");
        }

        // step budget exhausted — the loop's safety valve
        warn!(conversation_id = %conversation.id, max_steps = self.config.max_steps, "Step budget exhausted");
        self.finish(
            conversation,
            trace,
            "I wasn't able to finish that within my working budget. Could you give me more specific instructions?",
            &tx,
        )
        .await;
    }

    /// Dispatch a call whose confirmation gate the user just affirmed.
    async fn dispatch_confirmed(
        &self,
        mut conversation: Conversation,
        pending: PendingConfirmation,
        mut trace: Vec<ToolInvocation>,
        tx: &mpsc::Sender<TurnEvent>,
    ) {
        let call = pending.call;
        let Some(side_effect) = self.tools.side_effect_of(&call.name) else {
            self.fail(
                conversation,
                trace,
                "The action I was waiting to confirm is no longer available, so nothing was done.",
                tx,
            )
            .await;
            return;
        };

        // Re-validate with the affirmative in hand — conditions may have
        // changed between turns, and blocks must still block.
        let memctx = match self.memory.assemble(&conversation).await {
            Ok(m) => m,
            Err(e) => {
                warn!(conversation_id = %conversation.id, error = %e, "Memory assembly failed");
                self.fail(
                    conversation,
                    trace,
                    "I'm sorry — I couldn't re-check your workspace before acting, so nothing was done.",
                    tx,
                )
                .await;
                return;
            }
        };

        let action = classify(&call, side_effect);
        let gctx = GuardrailContext {
            default_daily_budget: memctx.workspace.default_daily_budget,
            credential_connected: memctx.workspace.credential_connected,
            confirmation_affirmed: true,
            policy: self.policy.clone(),
        };
        // the user affirmed this exact summary: confirm-class outcomes
        // collapse to allow, block-class outcomes still stop everything
        let decision = match validate(&action, &gctx) {
            GuardrailDecision::Confirm { .. } => GuardrailDecision::Allow,
            other => other,
        };

        if let GuardrailDecision::Block { ref reason } = decision {
            self.record_guardrail(&conversation, &call, &decision);
            let text = format!("I can't proceed after all: {reason}.");
            self.finish(conversation, trace, &text, tx).await;
            return;
        }

        if side_effect == SideEffect::Irreversible {
            // approval walks the workflow up to the publish gate
            for stage in [Stage::Review, Stage::ReadyToPublish] {
                if conversation.stage.can_transition(stage) {
                    let _ = conversation.advance(stage);
                }
            }
        }

        // The audit trail is a precondition for irreversible actions: the
        // allow decision and the user's confirmation are recorded before
        // dispatch, and a logging failure aborts the action.
        let entry = ActivityEntry::new(
            format!("{}:{}:confirmed", conversation.id, call.id),
            conversation.id.clone(),
            Actor::User,
            self.activity_kind(&call.name, side_effect),
            format!("User confirmed \"{}\" — {}", call.name, pending.reason),
        )
        .with_invocation(call.id.clone())
        .with_decision(GuardrailDecision::Allow);

        if let Err(e) = self.activity.record(entry) {
            if side_effect == SideEffect::Irreversible {
                error!(conversation_id = %conversation.id, error = %e, "Audit write failed, publish aborted");
                self.finish(
                    conversation,
                    trace,
                    "I couldn't write the audit record, so I did not publish. Nothing has gone live.",
                    tx,
                )
                .await;
                return;
            }
            warn!(conversation_id = %conversation.id, error = %e, "Activity record failed");
        }

        let _ = tx
            .send(TurnEvent::ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.input.clone(),
            })
            .await;

        match self.tools.execute(&call).await {
            Ok(output) => {
                let _ = tx
                    .send(TurnEvent::ToolResult {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        output: output.summary.clone(),
                        success: true,
                    })
                    .await;
                trace.push(ToolInvocation {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.input.clone(),
                    side_effect,
                    decision: Some(GuardrailDecision::Allow),
                    output: Some(output.clone()),
                    error: None,
                    dispatched_at: Utc::now(),
                });

                self.apply_mutation_effects(&mut conversation, &call, &output);
                if side_effect == SideEffect::Irreversible
                    && conversation.stage.can_transition(Stage::Published)
                {
                    let _ = conversation.advance(Stage::Published);
                }

                let text = format!("{}\n\nAnything else you'd like to do?", output.summary);
                self.finish(conversation, trace, &text, tx).await;
            }
            Err(err) => {
                let _ = tx
                    .send(TurnEvent::ToolResult {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        output: err.to_string(),
                        success: false,
                    })
                    .await;
                trace.push(ToolInvocation {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.input.clone(),
                    side_effect,
                    decision: Some(GuardrailDecision::Allow),
                    output: None,
                    error: Some(err.to_string()),
                    dispatched_at: Utc::now(),
                });
                warn!(conversation_id = %conversation.id, tool = %call.name, error = %err, "Confirmed dispatch failed");
                self.fail(
                    conversation,
                    trace,
                    &format!(
                        "I'm sorry — the action didn't go through: {}. Nothing irreversible happened; want me to try again?",
                        first_line(&err.to_string())
                    ),
                    tx,
                )
                .await;
            }
        }
    }

    /// Shared success handling: events, trace, activity entry, stage
    /// transitions, observation feedback.
    #[allow(clippy::too_many_arguments)]
    async fn observe_success(
        &self,
        conversation: &mut Conversation,
        call: &ProposedCall,
        side_effect: SideEffect,
        decision: Option<GuardrailDecision>,
        output: &ToolOutput,
        observations: &mut Vec<Observation>,
        trace: &mut Vec<ToolInvocation>,
        failure_counts: &mut HashMap<String, u32>,
        tx: &mpsc::Sender<TurnEvent>,
    ) {
        let _ = tx
            .send(TurnEvent::ToolResult {
                id: call.id.clone(),
                name: call.name.clone(),
                output: output.summary.clone(),
                success: true,
            })
            .await;
        trace.push(ToolInvocation {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
            side_effect,
            decision: decision.clone(),
            output: Some(output.clone()),
            error: None,
            dispatched_at: Utc::now(),
        });
        failure_counts.remove(&call.name);

        let mut entry = ActivityEntry::new(
            format!("{}:{}", conversation.id, call.id),
            conversation.id.clone(),
            Actor::Agent,
            self.activity_kind(&call.name, side_effect),
            format!("{}: {}", call.name, first_line(&output.summary)),
        )
        .with_invocation(call.id.clone());
        if let Some(decision) = decision {
            entry = entry.with_decision(decision);
        }
        // read-only and reversible paths degrade on logging failure
        if let Err(e) = self.activity.record(entry) {
            warn!(conversation_id = %conversation.id, error = %e, "Activity record failed");
        }

        self.apply_mutation_effects(conversation, call, output);

        observations.push(Observation {
            tool: call.name.clone(),
            content: output.summary.clone(),
            success: true,
        });
    }

    /// Shared failure handling. Returns true when the turn must terminate
    /// (second consecutive failure of the same tool).
    #[allow(clippy::too_many_arguments)]
    async fn observe_failure(
        call: &ProposedCall,
        side_effect: SideEffect,
        error_text: &str,
        observations: &mut Vec<Observation>,
        trace: &mut Vec<ToolInvocation>,
        failure_counts: &mut HashMap<String, u32>,
        tx: &mpsc::Sender<TurnEvent>,
    ) -> bool {
        let _ = tx
            .send(TurnEvent::ToolResult {
                id: call.id.clone(),
                name: call.name.clone(),
                output: error_text.to_string(),
                success: false,
            })
            .await;
        trace.push(ToolInvocation {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
            side_effect,
            decision: None,
            output: None,
            error: Some(error_text.to_string()),
            dispatched_at: Utc::now(),
        });

        observations.push(Observation {
            tool: call.name.clone(),
            content: format!("Error: {error_text}. Adjust the input and retry once if it makes sense."),
            success: false,
        });

        let count = failure_counts.entry(call.name.clone()).or_insert(0);
        *count += 1;
        *count >= 2
    }

    /// Stage transitions and context updates driven by a successful call.
    fn apply_mutation_effects(
        &self,
        conversation: &mut Conversation,
        call: &ProposedCall,
        output: &ToolOutput,
    ) {
        // a product identified in context moves discovery forward
        if let Some(product_id) = call.input.get("product_id").and_then(|v| v.as_str()) {
            conversation.context.active_product_id = Some(product_id.to_string());
            if conversation.stage == Stage::Discovery {
                let _ = conversation.advance(Stage::Ideation);
            }
        }

        if let Some(data) = &output.data
            && let Some(draft_id) = data.get("draft_id").and_then(|v| v.as_str())
        {
            conversation.context.active_draft_id = Some(draft_id.to_string());
        }

        // a complete draft moves the workflow to review
        if matches!(call.name.as_str(), "generate_ad_copy" | "save_draft") {
            for stage in [Stage::Ideation, Stage::Drafting, Stage::Review] {
                if conversation.stage.can_transition(stage) {
                    let _ = conversation.advance(stage);
                }
            }
        }
    }

    fn record_guardrail(
        &self,
        conversation: &Conversation,
        call: &ProposedCall,
        decision: &GuardrailDecision,
    ) {
        let entry = ActivityEntry::new(
            format!("{}:{}:gate", conversation.id, call.id),
            conversation.id.clone(),
            Actor::Agent,
            ActivityKind::GuardrailFired,
            format!("Guardrail on \"{}\": {}", call.name, decision.reason()),
        )
        .with_invocation(call.id.clone())
        .with_decision(decision.clone());
        if let Err(e) = self.activity.record(entry) {
            warn!(conversation_id = %conversation.id, error = %e, "Guardrail record failed");
        }
    }

    fn activity_kind(&self, tool_name: &str, side_effect: SideEffect) -> ActivityKind {
        match tool_name {
            "generate_ad_copy" => ActivityKind::CopyGenerated,
            "generate_creative_briefs" => ActivityKind::BriefGenerated,
            "save_draft" => ActivityKind::DraftCreated,
            "adjust_budget" => ActivityKind::BudgetChanged,
            "pause_campaigns" => ActivityKind::CampaignPaused,
            "publish_campaign" => ActivityKind::CampaignPublished,
            "summarize_performance" => ActivityKind::RecommendationMade,
            _ => match side_effect {
                SideEffect::ReadOnly => ActivityKind::ToolInvoked,
                _ => ActivityKind::DraftUpdated,
            },
        }
    }

    /// Conclude the turn: persist, then stream the reply and `done`.
    async fn finish(
        &self,
        mut conversation: Conversation,
        trace: Vec<ToolInvocation>,
        text: &str,
        tx: &mpsc::Sender<TurnEvent>,
    ) {
        conversation.push(Message::agent(text).with_trace(trace));

        // published is terminal for the draft lineage; the conversation
        // itself returns to idle as the turn concludes
        if conversation.stage == Stage::Published {
            let _ = conversation.advance(Stage::Idle);
        }

        if let Err(e) = self.conversations.save(&conversation).await {
            warn!(conversation_id = %conversation.id, error = %e, "Failed to persist conversation");
        }

        info!(conversation_id = %conversation.id, stage = %conversation.stage, "Turn finished");
        Self::emit_reply(tx, &conversation.id, text).await;
    }

    /// Conclude a failed turn with an apology and a logged failure entry.
    async fn fail(
        &self,
        conversation: Conversation,
        trace: Vec<ToolInvocation>,
        text: &str,
        tx: &mpsc::Sender<TurnEvent>,
    ) {
        let entry = ActivityEntry::new(
            format!("{}:{}:turn-failed", conversation.id, Uuid::new_v4()),
            conversation.id.clone(),
            Actor::Agent,
            ActivityKind::TurnFailed,
            text,
        );
        if let Err(e) = self.activity.record(entry) {
            warn!(conversation_id = %conversation.id, error = %e, "Failure record failed");
        }
        self.finish(conversation, trace, text, tx).await;
    }

    /// Stream a reply as deltas, then the final text, then `done`.
    async fn emit_reply(tx: &mpsc::Sender<TurnEvent>, conversation_id: &ConversationId, text: &str) {
        let chars: Vec<char> = text.chars().collect();
        for chunk in chars.chunks(96) {
            let _ = tx
                .send(TurnEvent::MessageDelta {
                    content: chunk.iter().collect(),
                })
                .await;
        }
        let _ = tx
            .send(TurnEvent::MessageFinal {
                text: text.to_string(),
            })
            .await;
        let _ = tx
            .send(TurnEvent::Done {
                conversation_id: conversation_id.to_string(),
            })
            .await;
    }
}

/// Creative text fields of a proposed call, joined for the sensitive-term
/// scan in confirmation summaries.
fn creative_copy_of(call: &ProposedCall) -> String {
    let mut parts = Vec::new();
    for key in ["primary_text", "headline", "description"] {
        if let Some(text) = call.input.get(key).and_then(|v| v.as_str()) {
            parts.push(text);
        }
    }
    parts.join(" ")
}
