//! ASCII waterfall rendering for trace trees
//!
//! Terminal counterpart of a timeline view: the reconstructed span forest is
//! rendered as an ASCII tree with durations, statuses, token counts and
//! tool-call leaves.

use ascii_tree::Tree;
use flowtrace_types::{SpanKind, SpanStatus, ToolCall, TraceSpan, TraceTree};

/// Trait for rendering trace trees as ASCII waterfalls
pub trait TraceTreeRenderer {
    /// Render the whole trace as an ASCII tree
    fn render_as_ascii_tree(&self) -> String;

    /// Render a single span as a tree node
    fn render_span_as_tree_node(&self, span: &TraceSpan) -> Tree;
}

impl TraceTreeRenderer for TraceTree {
    fn render_as_ascii_tree(&self) -> String {
        let root_label = format!(
            "🌊 Workflow trace - {} root spans, {} total (Duration: {})",
            self.spans.len(),
            self.span_count(),
            format_duration(self.total_duration_ms)
        );

        let children = self
            .spans
            .iter()
            .map(|span| self.render_span_as_tree_node(span))
            .collect();

        let tree = Tree::Node(root_label, children);
        let mut buffer = String::new();
        ascii_tree::write_tree(&mut buffer, &tree).unwrap();
        buffer
    }

    fn render_span_as_tree_node(&self, span: &TraceSpan) -> Tree {
        let status_icon = match span.status {
            SpanStatus::Success => "✅",
            SpanStatus::Error => "❌",
        };

        let mut label = format!(
            "{} {} [{}] ({}) {}",
            span_glyph(&span.kind),
            span.name,
            span.kind.as_str(),
            format_duration(span.duration_ms),
            status_icon
        );
        if let Some(offset) = span.relative_start_ms {
            label.push_str(&format!(" (+{offset}ms)"));
        }
        if let Some(tokens) = span.tokens {
            label.push_str(&format!(" [{tokens} tokens]"));
        }

        let mut children: Vec<Tree> = span
            .tool_calls
            .iter()
            .map(render_tool_call_as_leaf)
            .collect();
        children.extend(
            span.children
                .iter()
                .map(|child| self.render_span_as_tree_node(child)),
        );

        Tree::Node(label, children)
    }
}

/// Tool calls render as leaves with an input preview.
fn render_tool_call_as_leaf(call: &ToolCall) -> Tree {
    let status_icon = match call.status {
        SpanStatus::Success => "✅",
        SpanStatus::Error => "❌",
    };
    let mut lines = vec![format!(
        "🔧 {} ({}) {}",
        call.name,
        format_duration(call.duration_ms),
        status_icon
    )];

    if let Some(input) = &call.input {
        let input_str = serde_json::to_string(input).unwrap_or_default();
        let preview = if input_str.len() > 80 {
            format!("{}...", &input_str[..80])
        } else {
            input_str
        };
        lines.push(format!("📝 Args: {preview}"));
    }
    if let Some(error) = &call.error {
        lines.push(format!("💥 Error: {error}"));
    }

    Tree::Leaf(lines)
}

fn span_glyph(kind: &SpanKind) -> &'static str {
    match kind {
        SpanKind::Model => "🤖",
        SpanKind::Tool => "🔧",
        SpanKind::Provider => "📡",
        SpanKind::Span => "⏱️",
        SpanKind::Block(_) => "📦",
    }
}

/// Millisecond durations below one second, fractional seconds above.
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms >= 1000 {
        format!("{:.2}s", duration_ms as f64 / 1000.0)
    } else {
        format!("{duration_ms}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_trace_spans;
    use chrono::DateTime;
    use flowtrace_types::{BlockLog, WorkflowExecution};

    #[test]
    fn test_format_duration_thresholds() {
        assert_eq!(format_duration(999), "999ms");
        assert_eq!(format_duration(1500), "1.50s");
    }

    #[test]
    fn test_rendered_tree_names_spans() {
        let execution = WorkflowExecution {
            logs: vec![BlockLog {
                block_id: Some("b1".to_string()),
                block_type: Some("agent".to_string()),
                block_name: "Research agent".to_string(),
                started_at: DateTime::from_timestamp_millis(0).unwrap(),
                ended_at: DateTime::from_timestamp_millis(1500).unwrap(),
                duration_ms: 1500,
                error: None,
                output: None,
            }],
            ..Default::default()
        };

        let rendered = build_trace_spans(&execution).render_as_ascii_tree();
        assert!(rendered.contains("Research agent"));
        assert!(rendered.contains("1.50s"));
        assert!(rendered.contains("1 root spans"));
    }
}
