use serde::{Deserialize, Serialize};

/// A global or flow-local variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
  pub name: String,
  /// Type name used to look up load/construct/save hooks.
  #[serde(rename = "type", default = "default_type")]
  pub type_name: String,
  #[serde(default)]
  pub default_value: serde_json::Value,
  /// Persistent variables survive runtime restarts through the settings file.
  #[serde(default)]
  pub persistent: bool,
}

fn default_type() -> String {
  "any".to_string()
}
