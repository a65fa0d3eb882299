use serde::{Deserialize, Serialize};

use crate::component::ComponentDef;
use crate::connection::ConnectionDef;
use crate::variable::VariableDef;

/// A page or action body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDef {
  pub flow_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default)]
  pub components: Vec<ComponentDef>,
  #[serde(default)]
  pub connections: Vec<ConnectionDef>,
  #[serde(default)]
  pub local_variables: Vec<VariableDef>,
  /// Pages used as custom widgets get no root flow state.
  #[serde(default)]
  pub used_as_custom_widget: bool,
}
