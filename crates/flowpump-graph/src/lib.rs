//! Flowpump Graph
//!
//! This crate provides the loaded flow graph representation for flowpump.
//! A loaded project is a validated, immutable form of a `flowpump-config`
//! project that the runtime can execute.
//!
//! Key differences from `flowpump-config`:
//! - Connection endpoints are resolved to component indices and validated
//! - Implicit `@seqin`, `@seqout` and `@error` terminals are materialized
//! - Component variants are a closed enumeration with capability queries
//! - Connections are indexed by source and target for propagation lookups

mod component;
mod error;
mod flow;
mod graph;
mod project;

pub use component::{Component, ComponentKind, Input, InputKind};
pub use error::GraphError;
pub use flow::{ComponentIndex, Connection, ConnectionIndex, Flow, FlowKind};
pub use flowpump_config::VariableDef;
pub use graph::Graph;
pub use project::Project;

/// Implicit sequence input present on every non-input component.
pub const SEQIN: &str = "@seqin";
/// Implicit sequence output.
pub const SEQOUT: &str = "@seqout";
/// Implicit error output.
pub const ERROR_OUTPUT: &str = "@error";
/// Input (and output) carrying error messages into catch handlers.
pub const MESSAGE: &str = "message";
