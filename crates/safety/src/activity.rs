//! Decision logging — the durable, append-only activity record.
//!
//! Every mutating tool invocation and notable user action lands here with
//! a rationale suitable for direct display in an activity timeline.
//! Appends are keyed: replaying the same entry twice is rejected, not
//! doubled. Entries are never reordered — persistence order is dispatch
//! order.

use std::collections::HashSet;
use std::sync::Mutex;

use warroom_core::activity::{ActivityEntry, ActivityKind};
use warroom_core::conversation::ConversationId;
use warroom_core::error::LogError;

/// Trait for activity log sinks (where entries are forwarded).
pub trait ActivitySink: Send + Sync {
    fn record(&self, entry: &ActivityEntry) -> Result<(), LogError>;
}

/// In-memory activity log with sink fan-out.
///
/// `record` never fails silently: a duplicate key or a sink failure is
/// returned to the caller, who decides whether the path can continue
/// (read-only paths degrade; the publish path aborts).
pub struct ActivityLog {
    entries: Mutex<Vec<ActivityEntry>>,
    keys: Mutex<HashSet<String>>,
    sinks: Vec<Box<dyn ActivitySink>>,
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.lock().unwrap().len();
        f.debug_struct("ActivityLog")
            .field("entry_count", &count)
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog {
    /// Create a new activity log with no sinks.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            keys: Mutex::new(HashSet::new()),
            sinks: Vec::new(),
        }
    }

    /// Create a new activity log with the given sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn ActivitySink>>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            keys: Mutex::new(HashSet::new()),
            sinks,
        }
    }

    /// Append an entry. Duplicate keys are rejected.
    pub fn record(&self, entry: ActivityEntry) -> Result<(), LogError> {
        {
            let mut keys = self.keys.lock().unwrap();
            if !keys.insert(entry.key.clone()) {
                return Err(LogError::DuplicateKey(entry.key.clone()));
            }
        }

        for sink in &self.sinks {
            if let Err(e) = sink.record(&entry) {
                // release the key so a retried append is not a false duplicate
                self.keys.lock().unwrap().remove(&entry.key);
                return Err(e);
            }
        }

        tracing::debug!(
            key = %entry.key,
            kind = ?entry.kind,
            conversation_id = %entry.conversation_id,
            "Activity recorded"
        );

        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    /// All recorded entries, in append order.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Entries for one conversation, in append order.
    pub fn entries_for(&self, conversation_id: &ConversationId) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    /// Entries of one kind, in append order.
    pub fn by_kind(&self, kind: &ActivityKind) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.kind == kind)
            .cloned()
            .collect()
    }

    /// Count of stored entries.
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// A tracing-based sink that emits entries via `tracing::info!`.
pub struct TracingSink;

impl ActivitySink for TracingSink {
    fn record(&self, entry: &ActivityEntry) -> Result<(), LogError> {
        tracing::info!(
            key = %entry.key,
            kind = ?entry.kind,
            actor = ?entry.actor,
            conversation_id = %entry.conversation_id,
            rationale = %entry.rationale,
            "ACTIVITY"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warroom_core::activity::Actor;
    use warroom_core::guardrail::GuardrailDecision;

    fn entry(key: &str, kind: ActivityKind) -> ActivityEntry {
        ActivityEntry::new(
            key,
            ConversationId::from("conv_1"),
            Actor::Agent,
            kind,
            "test rationale",
        )
    }

    #[test]
    fn record_and_retrieve_in_order() {
        let log = ActivityLog::new();
        log.record(entry("k1", ActivityKind::DraftCreated)).unwrap();
        log.record(entry("k2", ActivityKind::CopyGenerated)).unwrap();
        log.record(entry("k3", ActivityKind::CampaignPublished))
            .unwrap();

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["k1", "k2", "k3"]);
    }

    #[test]
    fn duplicate_key_rejected_not_doubled() {
        let log = ActivityLog::new();
        log.record(entry("k1", ActivityKind::DraftCreated)).unwrap();

        let err = log
            .record(entry("k1", ActivityKind::DraftCreated))
            .unwrap_err();
        assert!(matches!(err, LogError::DuplicateKey(_)));
        assert_eq!(log.count(), 1);
    }

    #[test]
    fn filter_by_conversation_and_kind() {
        let log = ActivityLog::new();
        log.record(entry("k1", ActivityKind::DraftCreated)).unwrap();
        log.record(
            ActivityEntry::new(
                "k2",
                ConversationId::from("conv_2"),
                Actor::User,
                ActivityKind::DraftCreated,
                "other conversation",
            ),
        )
        .unwrap();

        let for_one = log.entries_for(&ConversationId::from("conv_1"));
        assert_eq!(for_one.len(), 1);
        assert_eq!(for_one[0].key, "k1");

        let drafts = log.by_kind(&ActivityKind::DraftCreated);
        assert_eq!(drafts.len(), 2);
    }

    #[test]
    fn decision_attached_entries_survive() {
        let log = ActivityLog::new();
        let e = entry("k1", ActivityKind::CampaignPublished).with_decision(GuardrailDecision::Allow);
        log.record(e).unwrap();

        let stored = &log.entries()[0];
        assert_eq!(stored.decision, Some(GuardrailDecision::Allow));
    }

    #[test]
    fn failing_sink_propagates_error() {
        struct FailingSink;
        impl ActivitySink for FailingSink {
            fn record(&self, _entry: &ActivityEntry) -> Result<(), LogError> {
                Err(LogError::SinkFailed("disk full".into()))
            }
        }

        let log = ActivityLog::with_sinks(vec![Box::new(FailingSink)]);
        let err = log.record(entry("k1", ActivityKind::CampaignPublished)).unwrap_err();
        assert!(matches!(err, LogError::SinkFailed(_)));
        // entry must not be stored when a sink refuses it
        assert_eq!(log.count(), 0);
    }

    #[test]
    fn custom_sink_receives_entries() {
        use std::sync::{Arc, Mutex};

        struct TestSink {
            received: Arc<Mutex<Vec<String>>>,
        }

        impl ActivitySink for TestSink {
            fn record(&self, entry: &ActivityEntry) -> Result<(), LogError> {
                self.received.lock().unwrap().push(entry.key.clone());
                Ok(())
            }
        }

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = TestSink {
            received: received.clone(),
        };
        let log = ActivityLog::with_sinks(vec![Box::new(sink)]);
        log.record(entry("k1", ActivityKind::BudgetChanged)).unwrap();

        let seen = received.lock().unwrap();
        assert_eq!(seen.as_slice(), ["k1"]);
    }

    #[test]
    fn debug_format() {
        let log = ActivityLog::new();
        let debug_str = format!("{log:?}");
        assert!(debug_str.contains("ActivityLog"));
        assert!(debug_str.contains("entry_count"));
    }
}
