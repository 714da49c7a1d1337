//! Legacy conversation migration — a one-time batch transform.
//!
//! Conversations that predate workspace scoping are archived and distilled
//! into a single immutable pinned summary per workspace, which the memory
//! scoping service injects into the account-wide conversation. This is an
//! offline collaborator, not a live orchestrator path.

use std::sync::Arc;

use chrono::Utc;
use warroom_core::conversation::{Conversation, Role, Scope, Stage};
use warroom_core::error::StoreError;
use warroom_core::store::{ConversationStore, PinnedSummary, PinnedSummaryStore};

/// Outcome of one migration run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub migrated_count: usize,
    pub summaries: Vec<String>,
}

/// The one-shot migrator.
pub struct LegacyMigration {
    conversations: Arc<dyn ConversationStore>,
    pinned: Arc<dyn PinnedSummaryStore>,
}

impl LegacyMigration {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        pinned: Arc<dyn PinnedSummaryStore>,
    ) -> Self {
        Self {
            conversations,
            pinned,
        }
    }

    /// Archive the given pre-scoping conversations into `workspace_id` and
    /// write one pinned summary document for the workspace.
    ///
    /// Idempotent in effect: already-archived conversations are skipped,
    /// and the pinned summary is replaced wholesale rather than appended.
    pub async fn migrate(
        &self,
        workspace_id: &str,
        legacy: Vec<Conversation>,
    ) -> Result<MigrationReport, StoreError> {
        let mut summaries = Vec::new();
        let mut migrated = 0usize;

        for mut conversation in legacy {
            if matches!(conversation.scope, Scope::LegacyArchived { .. }) {
                continue;
            }

            let summary = summarize(&conversation);
            conversation.scope = Scope::LegacyArchived {
                workspace_id: workspace_id.to_string(),
            };
            conversation.stage = Stage::Idle;
            conversation.context.pending_confirmation = None;
            self.conversations.save(&conversation).await?;

            summaries.push(summary);
            migrated += 1;
        }

        if migrated > 0 {
            let plural = if migrated == 1 { "" } else { "s" };
            let mut body = format!("Archived {migrated} previous conversation{plural}:\n");
            for s in &summaries {
                body.push_str(&format!("- {s}\n"));
            }

            self.pinned
                .pin(&PinnedSummary {
                    workspace_id: workspace_id.to_string(),
                    migrated_at: Utc::now(),
                    conversation_count: migrated,
                    body,
                })
                .await?;
        }

        tracing::info!(workspace_id, migrated, "Legacy conversation migration complete");

        Ok(MigrationReport {
            migrated_count: migrated,
            summaries,
        })
    }
}

/// A plain text summary of one conversation: first ask plus traffic counts.
fn summarize(conversation: &Conversation) -> String {
    let first_user = conversation
        .messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| truncate(&m.content, 80))
        .unwrap_or_else(|| "(no user messages)".into());

    let user_count = conversation
        .messages
        .iter()
        .filter(|m| m.role == Role::User)
        .count();

    format!(
        "\"{first_user}\" — {user_count} user message{} over {} total",
        if user_count == 1 { "" } else { "s" },
        conversation.messages.len()
    )
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryStores;
    use warroom_core::conversation::Message;
    use warroom_core::store::PinnedSummaryStore;

    fn legacy_conversation(first_message: &str) -> Conversation {
        let mut conv = Conversation::new(Scope::AccountWide {
            workspace_id: "old".into(),
        });
        conv.push(Message::user(first_message));
        conv.push(Message::agent("Sure, let's do that."));
        conv
    }

    #[tokio::test]
    async fn migration_archives_and_pins_summary() {
        let stores = Arc::new(InMemoryStores::new());
        let migration = LegacyMigration::new(stores.clone(), stores.clone());

        let a = legacy_conversation("help me advertise my bakery");
        let b = legacy_conversation("write a hoodie ad");
        let a_id = a.id.clone();

        let report = migration.migrate("ws_1", vec![a, b]).await.unwrap();
        assert_eq!(report.migrated_count, 2);

        let archived = stores.load(&a_id).await.unwrap();
        assert_eq!(
            archived.scope,
            Scope::LegacyArchived {
                workspace_id: "ws_1".into()
            }
        );
        assert_eq!(archived.stage, Stage::Idle);

        let pinned = stores.pinned_for("ws_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pinned.conversation_count, 2);
        assert!(pinned.body.contains("bakery"));
        assert!(pinned.body.contains("Archived 2 previous conversations"));
    }

    #[tokio::test]
    async fn already_archived_conversations_skipped() {
        let stores = Arc::new(InMemoryStores::new());
        let migration = LegacyMigration::new(stores.clone(), stores.clone());

        let mut conv = legacy_conversation("old chat");
        conv.scope = Scope::LegacyArchived {
            workspace_id: "ws_1".into(),
        };

        let report = migration.migrate("ws_1", vec![conv]).await.unwrap();
        assert_eq!(report.migrated_count, 0);
        assert!(
            stores.pinned_for("ws_1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn summary_truncates_long_first_message() {
        let mut conv = Conversation::new(Scope::AccountWide {
            workspace_id: "old".into(),
        });
        conv.push(Message::user("x".repeat(200)));
        let summary = summarize(&conv);
        assert!(summary.contains('…'));
        assert!(summary.contains("1 user message"));
    }
}
