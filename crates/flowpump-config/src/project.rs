use serde::{Deserialize, Serialize};

use crate::flow::FlowDef;
use crate::variable::VariableDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDef {
  pub name: String,
  #[serde(default)]
  pub pages: Vec<FlowDef>,
  #[serde(default)]
  pub actions: Vec<FlowDef>,
  #[serde(default)]
  pub variables: Vec<VariableDef>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_project() {
    let project: ProjectDef = serde_json::from_value(json!({
      "name": "demo",
      "pages": [{
        "flow_id": "main",
        "components": [
          { "component_id": "start", "type": "start" },
          { "component_id": "log", "type": "action", "executor": "log" }
        ],
        "connections": [
          { "source": "start", "output": "@seqout", "target": "log", "input": "@seqin" }
        ]
      }],
      "variables": [
        { "name": "counter", "type": "integer", "default_value": 0, "persistent": true }
      ]
    }))
    .unwrap();

    assert_eq!(project.pages.len(), 1);
    assert!(project.actions.is_empty());
    assert_eq!(project.pages[0].connections[0].input, "@seqin");
    assert_eq!(project.variables[0].type_name, "integer");
    assert!(project.variables[0].persistent);
  }

  #[test]
  fn test_variable_defaults() {
    let var: VariableDef = serde_json::from_value(json!({ "name": "x" })).unwrap();
    assert_eq!(var.type_name, "any");
    assert_eq!(var.default_value, serde_json::Value::Null);
    assert!(!var.persistent);
  }
}
