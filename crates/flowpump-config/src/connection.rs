use serde::{Deserialize, Serialize};

/// A directed edge from a component output to a component input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDef {
  pub source: String,
  pub output: String,
  pub target: String,
  pub input: String,
}
