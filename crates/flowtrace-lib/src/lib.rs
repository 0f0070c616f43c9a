//! # Flowtrace
//!
//! Execution-trace reconstruction for AI agent workflows.
//!
//! A workflow run produces a flat, ordered list of per-block execution logs.
//! This crate rebuilds the nested timing structure of such a run (block →
//! provider call → model generation → tool calls), records runs to disk with
//! an explicit lifecycle, and renders the result as an ASCII waterfall.

pub mod builder;
pub mod error;
pub mod export;
pub mod renderer;
pub mod session;

pub use builder::build_trace_spans;
pub use error::{TraceError, TraceResult};
