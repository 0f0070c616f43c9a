//! # Flowtrace Types
//!
//! Shared types for the flowtrace ecosystem.
//!
//! This crate provides the data model for workflow execution logs and the
//! trace spans reconstructed from them, designed to be:
//! 1. Serializable for storage and API communication
//! 2. Faithful to the camelCase JSON the workflow engine emits
//! 3. Strongly typed where the shape is ours, `serde_json::Value` only where
//!    the payload is genuinely provider-defined

pub mod execution;
pub mod span;

pub use execution::*;
pub use span::*;
