use std::collections::HashSet;
use std::sync::Arc;

use flowpump_config::{ProjectDef, VariableDef};

use crate::error::GraphError;
use crate::flow::{Flow, FlowKind};

/// A loaded project: pages, actions and global variable declarations.
#[derive(Debug, Clone)]
pub struct Project {
  pub name: String,
  pub pages: Vec<Arc<Flow>>,
  pub actions: Vec<Arc<Flow>>,
  pub variables: Vec<VariableDef>,
}

impl Project {
  /// Validate and load a project definition.
  pub fn from_def(def: ProjectDef) -> Result<Self, GraphError> {
    let mut seen = HashSet::new();

    let mut load = |defs: Vec<flowpump_config::FlowDef>, kind: FlowKind| {
      defs
        .into_iter()
        .map(|flow_def| {
          if !seen.insert(flow_def.flow_id.clone()) {
            return Err(GraphError::DuplicateFlow(flow_def.flow_id));
          }
          Flow::from_def(flow_def, kind).map(Arc::new)
        })
        .collect::<Result<Vec<_>, _>>()
    };

    let pages = load(def.pages, FlowKind::Page)?;
    let actions = load(def.actions, FlowKind::Action)?;

    Ok(Self {
      name: def.name,
      pages,
      actions,
      variables: def.variables,
    })
  }

  /// Find an action by id or display name.
  pub fn find_action(&self, name: &str) -> Option<&Arc<Flow>> {
    self
      .actions
      .iter()
      .find(|flow| flow.flow_id == name)
      .or_else(|| self.actions.iter().find(|flow| flow.name == name))
  }

  /// Find any flow (page or action) by id.
  pub fn find_flow(&self, flow_id: &str) -> Option<&Arc<Flow>> {
    self
      .pages
      .iter()
      .chain(self.actions.iter())
      .find(|flow| flow.flow_id == flow_id)
  }

  /// Find a global variable declaration.
  pub fn variable(&self, name: &str) -> Option<&VariableDef> {
    self.variables.iter().find(|variable| variable.name == name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_load_project() {
    let def: ProjectDef = serde_json::from_value(json!({
      "name": "demo",
      "pages": [{ "flow_id": "main", "components": [{ "component_id": "w", "type": "widget" }] }],
      "actions": [{ "flow_id": "do_it", "name": "Do It", "components": [{ "component_id": "s", "type": "start" }] }],
      "variables": [{ "name": "g", "default_value": 1 }]
    }))
    .unwrap();

    let project = Project::from_def(def).unwrap();
    assert_eq!(project.pages[0].kind, FlowKind::Page);
    assert!(project.find_action("do_it").unwrap().is_action());
    assert!(project.find_action("Do It").is_some());
    assert!(project.find_action("missing").is_none());
    assert!(project.find_flow("main").is_some());
    assert_eq!(project.variable("g").unwrap().default_value, json!(1));
  }

  #[test]
  fn test_duplicate_flow_ids() {
    let def: ProjectDef = serde_json::from_value(json!({
      "name": "demo",
      "pages": [{ "flow_id": "x" }],
      "actions": [{ "flow_id": "x" }]
    }))
    .unwrap();

    assert!(matches!(
      Project::from_def(def),
      Err(GraphError::DuplicateFlow(id)) if id == "x"
    ));
  }
}
