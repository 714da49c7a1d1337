//! End-to-end turn flow: draft → review → approval → confirmation → publish.
//!
//! Drives the orchestrator with a scripted backend over seeded in-memory
//! stores and checks the full audit chain around an irreversible publish.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tokio::sync::mpsc;
use warroom_agent::Orchestrator;
use warroom_agent::test_helpers::{SequentialMockBackend, act, call, final_reply};
use warroom_core::activity::{ActivityKind, Actor};
use warroom_core::conversation::{Conversation, ConversationId, Role, Scope, Stage};
use warroom_core::draft::DraftStatus;
use warroom_core::event::TurnEvent;
use warroom_core::guardrail::GuardrailDecision;
use warroom_core::store::{ConversationStore, DraftStore};
use warroom_memory::{InMemoryStores, MemoryScope};
use warroom_safety::ActivityLog;
use warroom_tools::{ToolContext, default_registry};

async fn drain(mut rx: mpsc::Receiver<TurnEvent>) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn final_text(events: &[TurnEvent]) -> String {
    events
        .iter()
        .find_map(|e| match e {
            TurnEvent::MessageFinal { text } => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

struct World {
    orchestrator: Arc<Orchestrator>,
    stores: Arc<InMemoryStores>,
    activity: Arc<ActivityLog>,
    conversation_id: ConversationId,
}

fn world(backend: SequentialMockBackend) -> World {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let stores = Arc::new(InMemoryStores::new());
    stores.seed_workspace("ws_1", "Acme Apparel", 500.0, "USD", true);
    stores.seed_page("ws_1", "page_a", "Streetwear", "bold", "urgent");
    stores.seed_product(
        "page_a",
        "prod_1",
        "Red Hoodie",
        "Warm winter hoodie",
        "Organic cotton",
    );
    stores.seed_page_performance("page_a", 500.0, 4.2);

    let conversation = Conversation::new(Scope::PageScoped {
        workspace_id: "ws_1".into(),
        page_id: "page_a".into(),
    });
    let conversation_id = conversation.id.clone();
    stores.insert_conversation(conversation);

    let ctx = ToolContext {
        settings: stores.clone(),
        performance: stores.clone(),
        drafts: stores.clone(),
        workspace_id: "ws_1".into(),
        page_id: Some("page_a".into()),
        conversation_id: conversation_id.clone(),
    };
    let tools = Arc::new(default_registry(&ctx));
    let memory = Arc::new(MemoryScope::new(
        stores.clone(),
        stores.clone(),
        stores.clone(),
        stores.clone(),
    ));
    let activity = Arc::new(ActivityLog::new());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(backend),
        tools,
        memory,
        stores.clone(),
        activity.clone(),
    ));

    World {
        orchestrator,
        stores,
        activity,
        conversation_id,
    }
}

#[tokio::test]
async fn draft_review_confirm_publish_journey() -> Result<()> {
    let backend = SequentialMockBackend::new(vec![
        // turn 1: write the ad, then report back
        act(
            vec![call(
                "generate_ad_copy",
                json!({"product_id": "prod_1", "daily_budget": 60.0}),
            )],
            Some("Drafting copy for the hoodie."),
        ),
        final_reply("Here's the draft — happy to adjust, or say yes to approve."),
        // turn 2 (after approval): propose the publish
        act(
            vec![call(
                "publish_campaign",
                json!({"daily_budget": 60.0, "primary_text": "Warm winter hoodie"}),
            )],
            None,
        ),
        // turn 3 dispatches the confirmed call without consulting the backend
    ]);
    let w = world(backend);

    // ── Turn 1: drafting ──
    let events = drain(
        w.orchestrator
            .process_turn(w.conversation_id.clone(), "write an ad for my hoodie"),
    )
    .await;
    assert!(final_text(&events).contains("draft"));

    let conv = w.stores.load(&w.conversation_id).await?;
    assert_eq!(conv.stage, Stage::Review);
    let draft_id = conv
        .context
        .active_draft_id
        .clone()
        .expect("active draft reference");
    let draft = w.stores.get(&draft_id).await?.expect("draft stored");
    assert_eq!(draft.status, DraftStatus::Draft);
    assert_eq!(draft.variant_number, 1);

    // ── Turn 2: explicit approval, publish proposal gates on confirmation ──
    let events = drain(w.orchestrator.process_turn(w.conversation_id.clone(), "yes")).await;
    let summary = final_text(&events);
    assert!(summary.contains("publish_campaign"));
    assert!(summary.contains("confirm"));

    let conv = w.stores.load(&w.conversation_id).await?;
    assert_eq!(conv.stage, Stage::ReadyToPublish);
    assert!(conv.context.pending_confirmation.is_some());
    // not yet published
    assert_eq!(
        w.stores.get(&draft_id).await?.unwrap().status,
        DraftStatus::Draft
    );

    // ── Turn 3: explicit go-ahead publishes ──
    let events = drain(
        w.orchestrator
            .process_turn(w.conversation_id.clone(), "go ahead"),
    )
    .await;
    assert!(final_text(&events).contains("live"));
    assert!(events.iter().any(
        |e| matches!(e, TurnEvent::ToolResult { name, success, .. } if name == "publish_campaign" && *success)
    ));

    // draft is terminally published
    let draft = w.stores.get(&draft_id).await?.unwrap();
    assert_eq!(draft.status, DraftStatus::Published);

    // the conversation passed through published and settled back to idle
    let conv = w.stores.load(&w.conversation_id).await?;
    assert_eq!(conv.stage, Stage::Idle);
    assert!(conv.context.pending_confirmation.is_none());

    // audit chain: an allow-decision entry for the publish, recorded from
    // the user's confirmation, and the message right before the closing
    // reply is that explicit affirmative
    let entries = w.activity.entries_for(&w.conversation_id);
    let publish_entry = entries
        .iter()
        .find(|e| e.kind == ActivityKind::CampaignPublished)
        .expect("publish audit entry");
    assert_eq!(publish_entry.decision, Some(GuardrailDecision::Allow));
    assert_eq!(publish_entry.actor, Actor::User);

    let user_messages: Vec<&str> = conv
        .messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(user_messages.last(), Some(&"go ahead"));

    // the closing agent message carries the invocation record
    let closing = conv.messages.last().expect("closing message");
    assert_eq!(closing.role, Role::Agent);
    assert_eq!(closing.tool_trace.len(), 1);
    let invocation = &closing.tool_trace[0];
    assert_eq!(invocation.name, "publish_campaign");
    assert_eq!(invocation.decision, Some(GuardrailDecision::Allow));
    assert!(invocation.success());

    Ok(())
}

#[tokio::test]
async fn separate_conversations_run_independently() -> Result<()> {
    let backend = SequentialMockBackend::new(vec![
        final_reply("reply for one of the conversations"),
        final_reply("reply for the other conversation"),
    ]);
    let w = world(backend);

    // a second conversation in the same workspace, account-wide scope
    let other = Conversation::new(Scope::AccountWide {
        workspace_id: "ws_1".into(),
    });
    let other_id = other.id.clone();
    w.stores.insert_conversation(other);

    let rx1 = w
        .orchestrator
        .process_turn(w.conversation_id.clone(), "hello page chat");
    let rx2 = w.orchestrator.process_turn(other_id.clone(), "hello overview");
    let (events1, events2) = tokio::join!(drain(rx1), drain(rx2));

    assert!(matches!(events1.last(), Some(TurnEvent::Done { .. })));
    assert!(matches!(events2.last(), Some(TurnEvent::Done { .. })));

    let conv1 = w.stores.load(&w.conversation_id).await?;
    let conv2 = w.stores.load(&other_id).await?;
    assert_eq!(conv1.messages.len(), 2);
    assert_eq!(conv2.messages.len(), 2);

    Ok(())
}
