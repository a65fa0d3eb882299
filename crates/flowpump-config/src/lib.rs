//! Flowpump Config
//!
//! This crate contains the serializable project configuration types for
//! flowpump. These types describe pages, actions and variables before they are
//! validated and loaded into a flow graph by `flowpump-graph`.
//!
//! Configuration is loaded from JSON project files (via the CLI with
//! `flowpump run project.json`) or handed over by an editor that already
//! holds the project in memory.

mod component;
mod connection;
mod flow;
mod project;
mod variable;

pub use component::{ComponentDef, ComponentKindDef, InputDef};
pub use connection::ConnectionDef;
pub use flow::FlowDef;
pub use project::ProjectDef;
pub use variable::VariableDef;
