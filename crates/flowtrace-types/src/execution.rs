//! Execution-side data model
//!
//! One `BlockLog` is emitted per executed workflow block, carrying timing,
//! status, and whatever provider-specific output the block produced. These
//! types mirror the camelCase JSON written by the workflow engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Block types eligible as parents during hierarchy reconstruction.
pub const CONTAINER_BLOCK_TYPES: [&str; 2] = ["agent", "workflow"];

/// A single workflow run: the flat, ordered-by-occurrence list of block logs
/// plus run-level metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    /// Identifier of the workflow that ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Overall run success, when the engine reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Per-block execution logs in order of occurrence (not necessarily
    /// chronologically sorted)
    #[serde(default)]
    pub logs: Vec<BlockLog>,
    /// Final workflow output, shape owned by the workflow author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Run-level metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// One record per executed workflow block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLog {
    /// Block identifier; entries without one are skipped by the builder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    /// Block type tag (e.g. "agent", "workflow", "tool", "api")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
    /// Block display name
    #[serde(default)]
    pub block_name: String,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// End timestamp
    pub ended_at: DateTime<Utc>,
    /// Execution duration in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
    /// Error message when the block failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Block output payload, possibly carrying provider timing metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<BlockOutput>,
}

impl BlockLog {
    /// Whether this block type may contain sibling log entries as children.
    /// Only agent and workflow blocks act as containers; provider/model/tool
    /// children synthesized from output metadata nest regardless.
    pub fn is_container(&self) -> bool {
        self.block_type
            .as_deref()
            .map(|t| CONTAINER_BLOCK_TYPES.contains(&t))
            .unwrap_or(false)
    }
}

/// Output payload of a block. Only the `response` envelope is understood;
/// everything else is provider-defined and retained verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockOutput {
    /// Provider response envelope, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ProviderResponse>,
    /// Remaining provider-defined fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Provider (LLM API) response metadata embedded in a block's output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    /// Model name, e.g. "gpt-4o"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Token usage counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenUsage>,
    /// Vendor timing breakdown for the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_timing: Option<ProviderTiming>,
    /// Tool invocations made during the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<ToolCallList>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl TokenUsage {
    /// Best available total: the explicit total, falling back to the
    /// completion count.
    pub fn effective_total(&self) -> Option<u64> {
        self.total.or(self.completion)
    }
}

/// Vendor-specific timing metadata for a provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTiming {
    /// Wall-clock duration of the whole provider call in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
    /// Call start timestamp
    pub start_time: DateTime<Utc>,
    /// Call end timestamp
    pub end_time: DateTime<Utc>,
    /// Time spent in model generation, when reported separately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_time_ms: Option<u64>,
    /// Ordered latency segments, when the provider breaks the call down
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_segments: Option<Vec<TimeSegment>>,
}

/// One latency segment inside a provider call.
///
/// `segment_type` is the provider's own vocabulary; the builder normalizes it
/// to the span-kind union (`model`/`tool`/generic span).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSegment {
    #[serde(rename = "type", default)]
    pub segment_type: String,
    #[serde(default)]
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Tool invocations recorded on a block's output, in the engine's
/// `toolCalls.list` envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallList {
    #[serde(default)]
    pub list: Vec<ToolCallLog>,
}

/// One tool invocation as recorded by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallLog {
    /// Tool name
    #[serde(default)]
    pub name: String,
    /// Execution duration in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
    /// Invocation start timestamp
    pub start_time: DateTime<Utc>,
    /// Invocation end timestamp
    pub end_time: DateTime<Utc>,
    /// Raw status string as recorded by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Tool input arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Tool result payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Error message when the invocation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
