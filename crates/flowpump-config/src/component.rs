use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
  pub component_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(flatten)]
  pub kind: ComponentKindDef,
  #[serde(default)]
  pub inputs: Vec<InputDef>,
  #[serde(default)]
  pub outputs: Vec<String>,
  /// Passive (decorative) components are never scheduled.
  #[serde(default = "default_executable")]
  pub executable: bool,
  /// Free-form component configuration consumed by its executor.
  #[serde(default)]
  pub properties: serde_json::Map<String, serde_json::Value>,
}

fn default_executable() -> bool {
  true
}

/// A named data input of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDef {
  pub name: String,
  #[serde(default)]
  pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKindDef {
  /// A page widget. Widgets run as soon as data arrives.
  Widget {
    /// Name of the action invoked when the widget is activated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action: Option<String>,
  },
  /// A generic action component backed by a named executor.
  Action { executor: String },
  /// The single entry point of an action flow.
  Start,
  /// Receives the value supplied by the invoking context.
  Input,
  /// Forwards a value back to the invoking `call_action` component.
  Output,
  /// Fails with the value delivered to its `message` input.
  Error,
  /// Receives errors raised elsewhere in the flow.
  CatchError,
  /// Invokes another action flow and continues once it finishes.
  CallAction { action: String },
}
