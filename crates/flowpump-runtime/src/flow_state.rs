//! Flow states: one execution instance of a flow each.
//!
//! Flow states live in an arena ([`FlowStates`]) and refer to each other by
//! [`FlowStateId`]. A child keeps its parent as a plain id, so there is no
//! ownership cycle between invocations.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use flowpump_graph::{ComponentIndex, Flow};
use serde::{Deserialize, Serialize};

use crate::component_state::ComponentState;
use crate::executor::Dispose;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowStateId(pub usize);

impl fmt::Display for FlowStateId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "fs{}", self.0)
  }
}

#[derive(Debug)]
pub struct FlowState {
  pub id: FlowStateId,
  pub flow: Arc<Flow>,
  pub parent: Option<FlowStateId>,
  /// Component of the parent flow that created this invocation.
  pub invoking_component: Option<ComponentIndex>,
  pub children: Vec<FlowStateId>,
  /// Local variable bindings.
  pub data_context: HashMap<String, serde_json::Value>,
  /// Queued plus in-flight units of work.
  pub num_active_components: usize,
  pub is_finished: bool,
  pub error: Option<String>,
  component_states: HashMap<ComponentIndex, ComponentState>,
}

impl FlowState {
  fn new(
    id: FlowStateId,
    flow: Arc<Flow>,
    parent: Option<FlowStateId>,
    invoking_component: Option<ComponentIndex>,
  ) -> Self {
    let data_context = flow
      .local_variables
      .iter()
      .map(|variable| (variable.name.clone(), variable.default_value.clone()))
      .collect();

    Self {
      id,
      flow,
      parent,
      invoking_component,
      children: Vec::new(),
      data_context,
      num_active_components: 0,
      is_finished: false,
      error: None,
      component_states: HashMap::new(),
    }
  }

  pub fn component_state(&self, component: ComponentIndex) -> Option<&ComponentState> {
    self.component_states.get(&component)
  }

  /// Get the state of a component, creating it on first access.
  pub fn component_state_mut(&mut self, component: ComponentIndex) -> &mut ComponentState {
    let flow = &self.flow;
    self
      .component_states
      .entry(component)
      .or_insert_with(|| ComponentState::new(flow, component))
  }

  /// Get the state of a component only if it already exists.
  pub fn existing_component_state_mut(
    &mut self,
    component: ComponentIndex,
  ) -> Option<&mut ComponentState> {
    self.component_states.get_mut(&component)
  }

  pub fn component_states(&self) -> impl Iterator<Item = &ComponentState> {
    self.component_states.values()
  }

  pub fn is_any_component_running(&self) -> bool {
    self.component_states.values().any(|state| state.is_running)
  }

  pub fn increment_active(&mut self) {
    self.num_active_components += 1;
  }

  /// Decrement the active counter. Never goes below zero.
  pub fn decrement_active(&mut self) -> usize {
    self.num_active_components = self.num_active_components.saturating_sub(1);
    self.num_active_components
  }

  pub fn release_active(&mut self, count: usize) {
    self.num_active_components = self.num_active_components.saturating_sub(count);
  }

  /// Whether an action invocation has drained and should finish.
  pub fn should_finish(&self) -> bool {
    self.flow.is_action() && !self.is_finished && self.num_active_components == 0
  }

  pub fn local_variable(&self, name: &str) -> Option<&serde_json::Value> {
    self.data_context.get(name)
  }

  /// Set a declared local variable. Returns false when `name` is not local.
  pub fn set_local_variable(&mut self, name: &str, value: serde_json::Value) -> bool {
    match self.data_context.get_mut(name) {
      Some(slot) => {
        *slot = value;
        true
      }
      None => false,
    }
  }

  /// Mark finished and drop every component state, returning held disposers.
  pub(crate) fn finish(&mut self) -> Vec<Box<dyn Dispose>> {
    self.is_finished = true;
    self
      .component_states
      .drain()
      .filter_map(|(_, mut state)| state.dispose.take())
      .collect()
  }
}

/// Arena of every flow state created during a run.
#[derive(Debug, Default)]
pub struct FlowStates {
  states: Vec<FlowState>,
}

impl FlowStates {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(
    &mut self,
    flow: Arc<Flow>,
    parent: Option<FlowStateId>,
    invoking_component: Option<ComponentIndex>,
  ) -> FlowStateId {
    let id = FlowStateId(self.states.len());
    self
      .states
      .push(FlowState::new(id, flow, parent, invoking_component));
    id
  }

  pub fn get(&self, id: FlowStateId) -> Option<&FlowState> {
    self.states.get(id.0)
  }

  pub fn get_mut(&mut self, id: FlowStateId) -> Option<&mut FlowState> {
    self.states.get_mut(id.0)
  }

  pub fn iter(&self) -> impl Iterator<Item = &FlowState> {
    self.states.iter()
  }

  pub fn ids(&self) -> Vec<FlowStateId> {
    (0..self.states.len()).map(FlowStateId).collect()
  }

  pub fn len(&self) -> usize {
    self.states.len()
  }

  pub fn is_empty(&self) -> bool {
    self.states.is_empty()
  }

  /// `id` followed by its ancestors, innermost first.
  pub fn lineage(&self, id: FlowStateId) -> Vec<FlowStateId> {
    let mut lineage = Vec::new();
    let mut current = self.get(id).map(|state| state.id);
    while let Some(id) = current {
      lineage.push(id);
      current = self.states[id.0].parent;
    }
    lineage
  }

  /// Resolve a variable through local contexts, innermost first.
  pub fn lookup_local(&self, id: FlowStateId, name: &str) -> Option<&serde_json::Value> {
    self
      .lineage(id)
      .into_iter()
      .find_map(|id| self.states[id.0].local_variable(name))
  }
}

impl Index<FlowStateId> for FlowStates {
  type Output = FlowState;

  fn index(&self, id: FlowStateId) -> &FlowState {
    &self.states[id.0]
  }
}

impl IndexMut<FlowStateId> for FlowStates {
  fn index_mut(&mut self, id: FlowStateId) -> &mut FlowState {
    &mut self.states[id.0]
  }
}
