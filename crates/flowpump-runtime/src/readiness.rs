//! Readiness evaluation.

use flowpump_graph::{ComponentIndex, MESSAGE, SEQIN};

use crate::events::EventNotifier;
use crate::flow_state::FlowStateId;
use crate::runtime::Runtime;

impl<N: EventNotifier> Runtime<N> {
  /// Whether a component may be scheduled.
  ///
  /// Control edges are an OR (any delivered sequence input will do) while
  /// mandatory data edges are an AND. Widgets are always ready, catch-error
  /// components wait for a message, input parameters are never self-ready,
  /// and the start of an invoked action waits for its caller's `@seqin`
  /// when that input is wired.
  pub fn is_ready_to_run(&mut self, flow_state: FlowStateId, component: ComponentIndex) -> bool {
    let flow = self.flow_states[flow_state].flow.clone();
    let definition = flow.component(component);

    if !definition.executable {
      return false;
    }

    if definition.kind.is_widget() {
      return true;
    }

    let state = self.flow_states[flow_state].component_state_mut(component);

    if definition.kind.is_catch_error() {
      return state.input(MESSAGE).is_some_and(|message| !message.is_null());
    }

    if !state.connected_sequence_inputs.is_empty() && !state.has_sequence_signal() {
      return false;
    }

    if state.missing_mandatory_input().is_some() {
      return false;
    }

    if definition.kind.is_input() {
      return false;
    }

    if definition.kind.is_start() {
      return self.caller_has_progressed(flow_state);
    }

    true
  }

  /// For an invoked flow: the caller's `@seqin` arrived, or is not wired.
  fn caller_has_progressed(&mut self, flow_state: FlowStateId) -> bool {
    let state = &self.flow_states[flow_state];
    let (Some(parent), Some(invoker)) = (state.parent, state.invoking_component) else {
      return true;
    };

    let parent_flow = self.flow_states[parent].flow.clone();
    if !parent_flow.has_seqin_connection(invoker) {
      return true;
    }

    self.flow_states[parent]
      .component_state_mut(invoker)
      .has_input(SEQIN)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::registry::ExecutorRegistry;
  use crate::runtime::RuntimeConfig;
  use flowpump_graph::Project;
  use serde_json::json;
  use std::sync::Arc;

  fn runtime(project: serde_json::Value) -> Runtime {
    let project = Project::from_def(serde_json::from_value(project).unwrap()).unwrap();
    Runtime::new(
      Arc::new(project),
      ExecutorRegistry::with_builtins(),
      RuntimeConfig::default(),
    )
  }

  fn page_runtime(components: serde_json::Value, connections: serde_json::Value) -> (Runtime, FlowStateId) {
    let mut runtime = runtime(json!({
      "name": "t",
      "pages": [{ "flow_id": "main", "components": components, "connections": connections }]
    }));
    let flow = runtime.project.pages[0].clone();
    let id = runtime.flow_states.insert(flow, None, None);
    (runtime, id)
  }

  fn index(runtime: &Runtime, flow_state: FlowStateId, id: &str) -> ComponentIndex {
    runtime.find_component(flow_state, id).unwrap()
  }

  #[test]
  fn test_optional_inputs_only_is_ready() {
    let (mut runtime, fs) = page_runtime(
      json!([{ "component_id": "a", "type": "action", "executor": "log",
        "inputs": [{ "name": "x", "optional": true }] }]),
      json!([]),
    );
    let a = index(&runtime, fs, "a");
    assert!(runtime.is_ready_to_run(fs, a));
  }

  #[test]
  fn test_connected_sequence_input_gates_even_with_data() {
    let (mut runtime, fs) = page_runtime(
      json!([
        { "component_id": "s", "type": "start" },
        { "component_id": "a", "type": "action", "executor": "log", "inputs": [{ "name": "x" }] }
      ]),
      json!([{ "source": "s", "output": "@seqout", "target": "a", "input": "@seqin" }]),
    );
    let a = index(&runtime, fs, "a");

    runtime.flow_states[fs]
      .component_state_mut(a)
      .inputs_data
      .insert("x".to_string(), json!(1));
    assert!(!runtime.is_ready_to_run(fs, a));

    runtime.flow_states[fs]
      .component_state_mut(a)
      .inputs_data
      .insert(SEQIN.to_string(), json!(null));
    assert!(runtime.is_ready_to_run(fs, a));
  }

  #[test]
  fn test_mandatory_data_input_required() {
    let (mut runtime, fs) = page_runtime(
      json!([{ "component_id": "a", "type": "action", "executor": "log", "inputs": [{ "name": "x" }] }]),
      json!([]),
    );
    let a = index(&runtime, fs, "a");
    assert!(!runtime.is_ready_to_run(fs, a));
  }

  #[test]
  fn test_widget_and_non_executable() {
    let (mut runtime, fs) = page_runtime(
      json!([
        { "component_id": "w", "type": "widget", "inputs": [{ "name": "x" }] },
        { "component_id": "d", "type": "widget", "executable": false }
      ]),
      json!([]),
    );
    let w = index(&runtime, fs, "w");
    let d = index(&runtime, fs, "d");
    assert!(runtime.is_ready_to_run(fs, w));
    assert!(!runtime.is_ready_to_run(fs, d));
  }

  #[test]
  fn test_catch_error_waits_for_message() {
    let (mut runtime, fs) = page_runtime(json!([{ "component_id": "c", "type": "catch_error" }]), json!([]));
    let c = index(&runtime, fs, "c");
    assert!(!runtime.is_ready_to_run(fs, c));

    runtime.flow_states[fs]
      .component_state_mut(c)
      .inputs_data
      .insert(MESSAGE.to_string(), json!("boom"));
    assert!(runtime.is_ready_to_run(fs, c));
  }

  #[test]
  fn test_input_component_never_ready() {
    let (mut runtime, fs) = page_runtime(json!([{ "component_id": "i", "type": "input" }]), json!([]));
    let i = index(&runtime, fs, "i");
    assert!(!runtime.is_ready_to_run(fs, i));
  }

  #[test]
  fn test_start_waits_for_caller_seqin() {
    let mut runtime = runtime(json!({
      "name": "t",
      "pages": [{
        "flow_id": "main",
        "components": [
          { "component_id": "s", "type": "start" },
          { "component_id": "call", "type": "call_action", "action": "foo" }
        ],
        "connections": [{ "source": "s", "output": "@seqout", "target": "call", "input": "@seqin" }]
      }],
      "actions": [{ "flow_id": "foo", "components": [{ "component_id": "start", "type": "start" }] }]
    }));
    let page = runtime.project.pages[0].clone();
    let action = runtime.project.actions[0].clone();
    let parent = runtime.flow_states.insert(page, None, None);
    let call = index(&runtime, parent, "call");
    let child = runtime.flow_states.insert(action, Some(parent), Some(call));
    let start = index(&runtime, child, "start");

    assert!(!runtime.is_ready_to_run(child, start));

    runtime.flow_states[parent]
      .component_state_mut(call)
      .inputs_data
      .insert(SEQIN.to_string(), json!(null));
    assert!(runtime.is_ready_to_run(child, start));
  }
}
