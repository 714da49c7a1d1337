//! Tool contract — the abstraction over agent capabilities.
//!
//! Tools are what let the agent act on the advertising workspace: read
//! performance, generate creative, adjust budgets, publish campaigns. Each
//! tool declares a side-effect class; the orchestrator consults it before
//! dispatch so that mutating and irreversible calls pass through the
//! guardrail validator first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::ProposedCall;
use crate::error::ToolError;
use crate::guardrail::GuardrailDecision;

/// How a tool affects the world outside the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    /// Pure read — may be dispatched immediately, and concurrently with
    /// other read-only calls proposed in the same step.
    ReadOnly,
    /// Changes local state (drafts, budgets, pauses). Gated, reversible.
    Mutating,
    /// Real-world effect that a local state change cannot undo (publish).
    Irreversible,
}

/// A tool definition as presented to the completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does (sent to the backend)
    pub description: String,

    /// JSON Schema describing this tool's input
    pub parameters: serde_json::Value,

    /// Side-effect class consulted before dispatch
    pub side_effect: SideEffect,
}

/// The result of a successful tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Human/LLM-readable summary, fed back as the observation
    pub summary: String,

    /// Optional structured payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolOutput {
    pub fn text(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            data: None,
        }
    }

    pub fn with_data(summary: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            summary: summary.into(),
            data: Some(data),
        }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The definition (name, schema, side-effect class) for this tool.
    fn definition(&self) -> ToolDefinition;

    /// Execute with validated input.
    async fn execute(&self, input: serde_json::Value) -> std::result::Result<ToolOutput, ToolError>;
}

/// One completed (or failed) dispatch of a tool. Never mutated after
/// completion — a retry is a new invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
    pub side_effect: SideEffect,

    /// The guardrail decision, for gated calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<GuardrailDecision>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ToolOutput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub dispatched_at: DateTime<Utc>,
}

impl ToolInvocation {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// A registry of available tools.
///
/// The orchestrator uses this to:
/// 1. Get tool definitions to send to the completion backend
/// 2. Classify proposed calls by side-effect class
/// 3. Validate inputs and execute calls
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// All tool definitions, sorted by name for deterministic prompts.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Side-effect class of a registered tool.
    pub fn side_effect_of(&self, name: &str) -> Option<SideEffect> {
        self.tools.get(name).map(|t| t.definition().side_effect)
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Build a sub-registry containing only the named tools.
    pub fn subset(&self, names: &[&str]) -> ToolRegistry {
        let mut out = ToolRegistry::new();
        for name in names {
            if let Some(tool) = self.tools.get(*name) {
                out.register(Arc::clone(tool));
            }
        }
        out
    }

    /// Validate a proposed input against the tool's declared schema.
    ///
    /// Checks required properties and primitive types. Failing here is
    /// `ToolError::InvalidInput` — the call is never dispatched.
    pub fn validate_input(
        &self,
        name: &str,
        input: &serde_json::Value,
    ) -> std::result::Result<(), ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let schema = tool.definition().parameters;
        validate_against_schema(name, &schema, input)
    }

    /// Validate and execute a proposed call.
    pub async fn execute(
        &self,
        call: &ProposedCall,
    ) -> std::result::Result<ToolOutput, ToolError> {
        self.validate_input(&call.name, &call.input)?;
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.execute(call.input.clone()).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal JSON-schema check: object shape, required keys, primitive types.
fn validate_against_schema(
    tool_name: &str,
    schema: &serde_json::Value,
    input: &serde_json::Value,
) -> std::result::Result<(), ToolError> {
    let invalid = |reason: String| ToolError::InvalidInput {
        tool_name: tool_name.to_string(),
        reason,
    };

    let obj = input
        .as_object()
        .ok_or_else(|| invalid("input must be a JSON object".into()))?;

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if !obj.contains_key(key) {
                return Err(invalid(format!("missing required field `{key}`")));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Ok(());
    };

    for (key, value) in obj {
        let Some(prop) = properties.get(key) else {
            continue; // unknown keys tolerated, the tool ignores them
        };
        let Some(expected) = prop.get("type").and_then(|t| t.as_str()) else {
            continue;
        };
        let ok = match expected {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        };
        if !ok {
            return Err(invalid(format!("field `{key}` must be of type {expected}")));
        }
    }

    Ok(())
}
