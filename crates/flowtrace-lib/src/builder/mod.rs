//! Trace span reconstruction
//!
//! Rebuilds the nested timing structure of a workflow run from its flat,
//! ordered-by-occurrence block logs. Two passes: first every well-formed log
//! entry becomes one span enriched from its own provider output (latency
//! segments, a synthetic provider/model pair, tool calls), then spans are
//! nested by time-interval containment.
//!
//! The input carries no explicit parent ids, so the hierarchy is a
//! best-effort reconstruction: a span whose start falls inside a still-open
//! agent or workflow span is adopted as its child. Overlapping-but-unrelated
//! spans can be mis-nested by that rule; the builder warns when an adopted
//! child outlives its parent instead of nesting silently.

use chrono::Duration;
use flowtrace_types::{
    BlockLog, ProviderResponse, ProviderTiming, SpanKind, SpanStatus, TimeSegment, ToolCall,
    ToolCallLog, TraceSpan, TraceTree, WorkflowExecution,
};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Matches model-segment names like "iteration 3" (case-insensitive).
fn iteration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)iteration\s+(\d+)").expect("valid regex literal"))
}

/// Reconstruct the span forest of a workflow run.
///
/// Pure and infallible: an empty or absent log list yields the empty tree,
/// entries missing a block id or block type are skipped, and malformed
/// optional fields degrade to defaults rather than failing the build.
///
/// `total_duration_ms` sums root spans only; child durations overlap their
/// parents and are not separately counted.
pub fn build_trace_spans(execution: &WorkflowExecution) -> TraceTree {
    if execution.logs.is_empty() {
        return TraceTree::default();
    }

    // Pass 1: one span per well-formed entry, enriched from its own output.
    let mut spans: Vec<TraceSpan> = Vec::with_capacity(execution.logs.len());
    let mut containers: Vec<bool> = Vec::with_capacity(execution.logs.len());
    for log in &execution.logs {
        let (Some(block_id), Some(block_type)) =
            (log.block_id.as_deref(), log.block_type.as_deref())
        else {
            debug!(
                block_name = %log.block_name,
                "skipping log entry without block id or block type"
            );
            continue;
        };

        spans.push(build_block_span(log, block_id, block_type));
        containers.push(log.is_container());
    }

    // Pass 2: nest by time-interval containment, ascending by start time.
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by_key(|&index| spans[index].started_at);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); spans.len()];
    let mut is_child = vec![false; spans.len()];
    let mut stack: Vec<usize> = Vec::new();

    for &index in &order {
        let start = spans[index].started_at;
        while let Some(&top) = stack.last() {
            // The stack is processed in start order, so parent.started_at <=
            // start already holds; containment reduces to the end bound.
            if start <= spans[top].ended_at {
                if spans[index].ended_at > spans[top].ended_at {
                    warn!(
                        child = %spans[index].id,
                        parent = %spans[top].id,
                        "child span ends after its parent; interval nesting is heuristic"
                    );
                }
                children[top].push(index);
                is_child[index] = true;
                break;
            }
            stack.pop();
        }
        if containers[index] {
            stack.push(index);
        }
    }

    let mut slots: Vec<Option<TraceSpan>> = spans.into_iter().map(Some).collect();
    let mut roots = Vec::new();
    let mut total_duration_ms = 0u64;
    for &index in &order {
        if is_child[index] {
            continue;
        }
        if let Some(root) = assemble_span(index, &mut slots, &children) {
            total_duration_ms += root.duration_ms;
            roots.push(root);
        }
    }

    TraceTree {
        spans: roots,
        total_duration_ms,
    }
}

/// Move a span out of its slot with its children attached, depth-first.
fn assemble_span(
    index: usize,
    slots: &mut [Option<TraceSpan>],
    children: &[Vec<usize>],
) -> Option<TraceSpan> {
    let mut span = slots[index].take()?;
    for &child in &children[index] {
        if let Some(child_span) = assemble_span(child, slots, children) {
            span.children.push(child_span);
        }
    }
    Some(span)
}

/// Build one span from a log entry and enrich it from the entry's output.
fn build_block_span(log: &BlockLog, block_id: &str, block_type: &str) -> TraceSpan {
    // Start-millis suffix disambiguates repeated executions of the same
    // block, e.g. inside a loop.
    let id = format!("{block_id}-{}", log.started_at.timestamp_millis());
    let response = log.output.as_ref().and_then(|output| output.response.as_ref());
    let model = response.and_then(|response| response.model.as_deref());

    let mut span = TraceSpan {
        id: id.clone(),
        name: if log.block_name.is_empty() {
            block_id.to_string()
        } else {
            log.block_name.clone()
        },
        kind: SpanKind::from(block_type.to_string()),
        duration_ms: log.duration_ms,
        started_at: log.started_at,
        ended_at: log.ended_at,
        status: SpanStatus::from_error_flag(log.error.is_some()),
        relative_start_ms: None,
        tokens: response
            .and_then(|response| response.tokens)
            .and_then(|tokens| tokens.effective_total()),
        children: Vec::new(),
        tool_calls: Vec::new(),
    };

    let timing = response.and_then(|response| response.provider_timing.as_ref());
    let segments = timing
        .and_then(|timing| timing.time_segments.as_deref())
        .filter(|segments| !segments.is_empty());

    match (timing, segments) {
        // Explicit latency segments take precedence; tool segments already
        // represent the flat tool-call list, so it is not re-attached.
        (Some(_), Some(segments)) => {
            span.children = build_segment_children(&id, segments, model);
        }
        (Some(timing), None) => {
            span.children.push(build_provider_child(&id, timing, model));
            attach_tool_calls(&mut span, response);
        }
        _ => {
            attach_tool_calls(&mut span, response);
        }
    }

    span
}

/// Children built directly from provider latency segments, with start
/// offsets relative to the first segment.
fn build_segment_children(
    parent_id: &str,
    segments: &[TimeSegment],
    model: Option<&str>,
) -> Vec<TraceSpan> {
    let first_start = segments[0].start_time;

    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            let kind = normalize_segment_kind(&segment.segment_type);
            let name = if kind == SpanKind::Model {
                rename_model_segment(&segment.name, model)
            } else {
                segment.name.clone()
            };

            TraceSpan {
                id: format!("{parent_id}-segment-{index}"),
                name,
                kind,
                duration_ms: segment.duration_ms,
                started_at: segment.start_time,
                ended_at: segment.end_time,
                status: SpanStatus::Success,
                relative_start_ms: (index > 0)
                    .then(|| (segment.start_time - first_start).num_milliseconds()),
                tokens: None,
                children: Vec::new(),
                tool_calls: Vec::new(),
            }
        })
        .collect()
}

/// Providers own the segment-type vocabulary; anything that is not a model
/// or tool segment becomes a generic span.
fn normalize_segment_kind(raw: &str) -> SpanKind {
    match raw {
        "model" => SpanKind::Model,
        "tool" => SpanKind::Tool,
        _ => SpanKind::Span,
    }
}

/// Cosmetic renames for model segments: the initial response gets the model
/// name appended, iteration segments are rewritten to a uniform label.
fn rename_model_segment(name: &str, model: Option<&str>) -> String {
    if let Some(captures) = iteration_pattern().captures(name) {
        let iteration = &captures[1];
        return match model {
            Some(model) => format!("Model response (iteration {iteration}) ({model})"),
            None => format!("Model response (iteration {iteration})"),
        };
    }

    match (name, model) {
        ("Initial response", Some(model)) => format!("Initial response ({model})"),
        _ => name.to_string(),
    }
}

/// Synthetic provider child for timing data without segments, with a nested
/// model grandchild when generation time was reported separately.
fn build_provider_child(parent_id: &str, timing: &ProviderTiming, model: Option<&str>) -> TraceSpan {
    let mut provider = TraceSpan {
        id: format!("{parent_id}-provider"),
        name: model.unwrap_or("provider").to_string(),
        kind: SpanKind::Provider,
        duration_ms: timing.duration_ms,
        started_at: timing.start_time,
        ended_at: timing.end_time,
        status: SpanStatus::Success,
        relative_start_ms: None,
        tokens: None,
        children: Vec::new(),
        tool_calls: Vec::new(),
    };

    if let Some(model_time_ms) = timing.model_time_ms {
        provider.children.push(TraceSpan {
            id: format!("{parent_id}-model"),
            name: match model {
                Some(model) => format!("Model generation ({model})"),
                None => "Model generation".to_string(),
            },
            kind: SpanKind::Model,
            duration_ms: model_time_ms,
            started_at: timing.start_time,
            ended_at: timing.start_time + Duration::milliseconds(model_time_ms as i64),
            status: SpanStatus::Success,
            relative_start_ms: None,
            tokens: None,
            children: Vec::new(),
            tool_calls: Vec::new(),
        });
    }

    provider
}

/// Attach the entry's flat tool-call list to the span itself. Tool calls
/// stay on the block span even when a synthetic provider child exists.
fn attach_tool_calls(span: &mut TraceSpan, response: Option<&ProviderResponse>) {
    if let Some(list) = response.and_then(|response| response.tool_calls.as_ref()) {
        span.tool_calls = list.list.iter().map(convert_tool_call).collect();
    }
}

fn convert_tool_call(call: &ToolCallLog) -> ToolCall {
    let failed = call.error.is_some() || call.status.as_deref() == Some("error");
    ToolCall {
        name: call.name.clone(),
        duration_ms: call.duration_ms,
        started_at: call.start_time,
        ended_at: call.end_time,
        status: SpanStatus::from_error_flag(failed),
        input: call.input.clone(),
        output: call.output.clone(),
        error: call.error.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn block(id: &str, block_type: &str, start: i64, duration: u64) -> BlockLog {
        BlockLog {
            block_id: Some(id.to_string()),
            block_type: Some(block_type.to_string()),
            block_name: format!("{id} block"),
            started_at: at(start),
            ended_at: at(start + duration as i64),
            duration_ms: duration,
            error: None,
            output: None,
        }
    }

    #[test]
    fn test_empty_logs_yield_empty_tree() {
        let tree = build_trace_spans(&WorkflowExecution::default());
        assert!(tree.spans.is_empty());
        assert_eq!(tree.total_duration_ms, 0);
    }

    #[test]
    fn test_single_entry_becomes_one_root_span() {
        let execution = WorkflowExecution {
            logs: vec![block("b1", "agent", 1_000, 250)],
            ..Default::default()
        };

        let tree = build_trace_spans(&execution);
        assert_eq!(tree.spans.len(), 1);

        let span = &tree.spans[0];
        assert_eq!(span.id, "b1-1000");
        assert_eq!(span.kind, SpanKind::Block("agent".to_string()));
        assert_eq!(span.status, SpanStatus::Success);
        assert_eq!(span.duration_ms, 250);
        assert!(span.children.is_empty());
        assert_eq!(tree.total_duration_ms, 250);
    }

    #[test]
    fn test_error_entry_yields_error_status() {
        let mut failing = block("b1", "agent", 0, 100);
        failing.error = Some("provider timeout".to_string());

        let tree = build_trace_spans(&WorkflowExecution {
            logs: vec![failing],
            ..Default::default()
        });
        assert_eq!(tree.spans[0].status, SpanStatus::Error);
    }

    #[test]
    fn test_entries_without_id_or_type_are_skipped() {
        let mut no_id = block("ignored", "agent", 0, 10);
        no_id.block_id = None;
        let mut no_type = block("b2", "agent", 0, 10);
        no_type.block_type = None;

        let tree = build_trace_spans(&WorkflowExecution {
            logs: vec![no_id, no_type, block("b3", "tool", 0, 10)],
            ..Default::default()
        });
        assert_eq!(tree.spans.len(), 1);
        assert_eq!(tree.spans[0].id, "b3-0");
    }

    #[test]
    fn test_repeated_block_executions_get_distinct_ids() {
        let tree = build_trace_spans(&WorkflowExecution {
            logs: vec![block("loop", "tool", 0, 10), block("loop", "tool", 100, 10)],
            ..Default::default()
        });
        assert_eq!(tree.spans.len(), 2);
        assert_ne!(tree.spans[0].id, tree.spans[1].id);
    }

    #[test]
    fn test_iteration_rename() {
        assert_eq!(
            rename_model_segment("iteration 3", Some("gpt-4o")),
            "Model response (iteration 3) (gpt-4o)"
        );
        assert_eq!(
            rename_model_segment("Iteration 12", None),
            "Model response (iteration 12)"
        );
        assert_eq!(
            rename_model_segment("Initial response", Some("gpt-4o")),
            "Initial response (gpt-4o)"
        );
        assert_eq!(rename_model_segment("warmup", Some("gpt-4o")), "warmup");
    }

    #[test]
    fn test_unknown_segment_kind_normalizes_to_span() {
        assert_eq!(normalize_segment_kind("model"), SpanKind::Model);
        assert_eq!(normalize_segment_kind("tool"), SpanKind::Tool);
        assert_eq!(normalize_segment_kind("streaming"), SpanKind::Span);
    }
}
