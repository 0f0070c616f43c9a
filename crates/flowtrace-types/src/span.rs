//! Trace-side data model
//!
//! The builder turns flat block logs into a forest of `TraceSpan` suitable
//! for a timeline/waterfall view. Spans are built fresh on every request and
//! never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Kind tag of a trace span.
///
/// Known synthetic kinds are closed variants; anything else is the original
/// block type carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SpanKind {
    /// Model generation segment
    Model,
    /// Tool invocation segment
    Tool,
    /// Synthetic provider-call child
    Provider,
    /// Generic timing segment
    Span,
    /// A workflow block, tagged with its original block type
    Block(String),
}

impl From<String> for SpanKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "model" => SpanKind::Model,
            "tool" => SpanKind::Tool,
            "provider" => SpanKind::Provider,
            "span" => SpanKind::Span,
            _ => SpanKind::Block(value),
        }
    }
}

impl From<SpanKind> for String {
    fn from(kind: SpanKind) -> Self {
        match kind {
            SpanKind::Model => "model".to_string(),
            SpanKind::Tool => "tool".to_string(),
            SpanKind::Provider => "provider".to_string(),
            SpanKind::Span => "span".to_string(),
            SpanKind::Block(block_type) => block_type,
        }
    }
}

impl SpanKind {
    /// String form of the kind tag.
    pub fn as_str(&self) -> &str {
        match self {
            SpanKind::Model => "model",
            SpanKind::Tool => "tool",
            SpanKind::Provider => "provider",
            SpanKind::Span => "span",
            SpanKind::Block(block_type) => block_type,
        }
    }
}

/// Span outcome, derived from the presence of an error on the source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SpanStatus {
    Success,
    Error,
}

impl SpanStatus {
    /// `Error` when an error is present, `Success` otherwise.
    pub fn from_error_flag(has_error: bool) -> Self {
        if has_error {
            SpanStatus::Error
        } else {
            SpanStatus::Success
        }
    }
}

/// A timed unit of work in the reconstructed trace: a block, or a synthesized
/// sub-unit such as a model generation or a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSpan {
    /// Span identifier: block id + start-millis, or a suffixed id for
    /// synthetic children
    pub id: String,
    /// Display name
    pub name: String,
    /// Kind tag
    #[serde(rename = "type")]
    pub kind: SpanKind,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// End timestamp
    pub ended_at: DateTime<Utc>,
    /// Outcome
    pub status: SpanStatus,
    /// Offset from the first sibling segment, for segments after the first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_start_ms: Option<i64>,
    /// Token count, when the provider reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    /// Nested child spans
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TraceSpan>,
    /// Flat tool-call records attached to this span
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl TraceSpan {
    /// Number of spans in this subtree, self included.
    pub fn span_count(&self) -> usize {
        1 + self.children.iter().map(TraceSpan::span_count).sum::<usize>()
    }
}

/// A tool invocation attached to a span.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub name: String,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: SpanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of trace reconstruction: the root-span forest and the total
/// duration, which sums root spans only (children overlap their parents).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceTree {
    #[serde(rename = "traceSpans", default)]
    pub spans: Vec<TraceSpan>,
    #[serde(default)]
    pub total_duration_ms: u64,
}

impl TraceTree {
    /// Number of spans across the whole forest.
    pub fn span_count(&self) -> usize {
        self.spans.iter().map(TraceSpan::span_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_kind_round_trip() {
        let kinds = serde_json::json!(["model", "tool", "provider", "span", "api"]);
        let parsed: Vec<SpanKind> = serde_json::from_value(kinds).unwrap();
        assert_eq!(parsed[0], SpanKind::Model);
        assert_eq!(parsed[4], SpanKind::Block("api".to_string()));
        assert_eq!(serde_json::to_value(&parsed[4]).unwrap(), "api");
    }

    #[test]
    fn test_span_status_display() {
        assert_eq!(SpanStatus::Success.to_string(), "success");
        assert_eq!(SpanStatus::from_error_flag(true), SpanStatus::Error);
    }
}
