//! Test support — a scripted completion backend.
//!
//! Public (not `cfg(test)`) so integration tests and downstream crates can
//! drive the orchestrator without a live model.

use std::sync::Mutex;

use async_trait::async_trait;
use warroom_core::backend::{BackendReply, CompletionBackend, ProposedCall, TurnRequest};
use warroom_core::error::BackendError;

/// A mock backend that returns a sequence of scripted replies.
///
/// Each call to `complete` returns the next reply in the queue and records
/// the request it was given, so tests can assert on the fed-back context.
/// Returns a `NotConfigured` error if the script runs dry.
pub struct SequentialMockBackend {
    replies: Mutex<Vec<BackendReply>>,
    requests: Mutex<Vec<TurnRequest>>,
    cursor: Mutex<usize>,
}

impl SequentialMockBackend {
    pub fn new(replies: Vec<BackendReply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
            cursor: Mutex::new(0),
        }
    }

    /// A backend that immediately answers with a final reply.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![final_reply(text)])
    }

    /// A backend that proposes tool calls, then answers.
    pub fn act_then_answer(calls: Vec<ProposedCall>, thought: &str, answer: &str) -> Self {
        Self::new(vec![act(calls, Some(thought)), final_reply(answer)])
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<TurnRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        *self.cursor.lock().unwrap()
    }
}

#[async_trait]
impl CompletionBackend for SequentialMockBackend {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: TurnRequest) -> Result<BackendReply, BackendError> {
        self.requests.lock().unwrap().push(request);

        let mut cursor = self.cursor.lock().unwrap();
        let replies = self.replies.lock().unwrap();
        let Some(reply) = replies.get(*cursor) else {
            return Err(BackendError::NotConfigured(format!(
                "mock script exhausted after {} replies",
                replies.len()
            )));
        };
        *cursor += 1;
        Ok(reply.clone())
    }
}

/// Build a final text reply.
pub fn final_reply(text: &str) -> BackendReply {
    BackendReply::Final { text: text.into() }
}

/// Build an act reply with optional visible thought.
pub fn act(calls: Vec<ProposedCall>, thought: Option<&str>) -> BackendReply {
    BackendReply::Act {
        thought: thought.map(String::from),
        calls,
    }
}

/// Build a proposed call.
pub fn call(name: &str, input: serde_json::Value) -> ProposedCall {
    ProposedCall {
        id: format!("call_{name}"),
        name: name.into(),
        input,
    }
}
