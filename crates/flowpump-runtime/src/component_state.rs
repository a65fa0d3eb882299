use std::collections::{HashMap, HashSet};
use std::fmt;

use flowpump_graph::{ComponentIndex, Flow};

use crate::executor::Dispose;

/// Mutable execution record of one component inside one flow state.
pub struct ComponentState {
  pub component: ComponentIndex,
  /// Last value delivered to each input.
  pub inputs_data: HashMap<String, serde_json::Value>,
  /// Set while the component's unit of work is in flight.
  pub is_running: bool,
  pub connected_sequence_inputs: HashSet<String>,
  pub mandatory_data_inputs: Vec<String>,
  pub sequence_inputs: Vec<String>,
  /// Resource handle kept from the previous run.
  pub dispose: Option<Box<dyn Dispose>>,
}

impl ComponentState {
  pub fn new(flow: &Flow, component: ComponentIndex) -> Self {
    let definition = flow.component(component);
    Self {
      component,
      inputs_data: HashMap::new(),
      is_running: false,
      connected_sequence_inputs: flow.connected_sequence_inputs(component),
      mandatory_data_inputs: definition
        .mandatory_data_inputs()
        .map(|input| input.name.clone())
        .collect(),
      sequence_inputs: definition
        .sequence_inputs()
        .map(|input| input.name.clone())
        .collect(),
      dispose: None,
    }
  }

  pub fn has_input(&self, name: &str) -> bool {
    self.inputs_data.contains_key(name)
  }

  pub fn input(&self, name: &str) -> Option<&serde_json::Value> {
    self.inputs_data.get(name)
  }

  /// Whether any sequence input has a value this activation.
  pub fn has_sequence_signal(&self) -> bool {
    self.sequence_inputs.iter().any(|name| self.has_input(name))
  }

  pub fn missing_mandatory_input(&self) -> Option<&str> {
    self
      .mandatory_data_inputs
      .iter()
      .find(|name| !self.has_input(name))
      .map(String::as_str)
  }

  /// Drop consumed sequence input values. Data inputs persist.
  pub fn clear_sequence_inputs(&mut self) {
    for name in &self.sequence_inputs {
      self.inputs_data.remove(name);
    }
  }
}

impl fmt::Debug for ComponentState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ComponentState")
      .field("component", &self.component)
      .field("inputs_data", &self.inputs_data)
      .field("is_running", &self.is_running)
      .field("connected_sequence_inputs", &self.connected_sequence_inputs)
      .field("has_dispose", &self.dispose.is_some())
      .finish()
  }
}
