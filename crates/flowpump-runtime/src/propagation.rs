//! Value propagation along connections and value assignment.

use flowpump_graph::{ComponentIndex, ConnectionIndex};
use serde_json::Value;
use tracing::debug;

use crate::error::RuntimeError;
use crate::events::EventNotifier;
use crate::flow_state::FlowStateId;
use crate::logs::{LogItem, LogKind};
use crate::runtime::Runtime;

impl<N: EventNotifier> Runtime<N> {
  /// Deliver `value` through every connection leaving `output` of `source`.
  ///
  /// This is the only way execution spreads through a flow.
  pub fn propagate_value(
    &mut self,
    flow_state: FlowStateId,
    source: ComponentIndex,
    output: &str,
    value: Value,
  ) {
    let flow = self.flow_states[flow_state].flow.clone();

    for (index, connection) in flow.connections_from(source, output) {
      self.active_connections.insert((flow_state, index));

      let target = flow.component(connection.target);
      self.log(
        LogItem::info(LogKind::OutputValue {
          output: output.to_string(),
          target: target.display_name().to_string(),
          input: connection.input.clone(),
          value: value.clone(),
        })
        .at_component(flow_state, source),
      );

      self.deliver(
        flow_state,
        connection.target,
        &connection.input,
        value.clone(),
        Some(index),
      );
    }
  }

  /// Store an input value and queue the component if it became ready.
  pub fn set_input_value(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentIndex,
    input: &str,
    value: Value,
  ) {
    self.deliver(flow_state, component, input, value, None);
  }

  fn deliver(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentIndex,
    input: &str,
    value: Value,
    connection: Option<ConnectionIndex>,
  ) {
    self.flow_states[flow_state]
      .component_state_mut(component)
      .inputs_data
      .insert(input.to_string(), value);

    if self.is_ready_to_run(flow_state, component) {
      self.enqueue(flow_state, component, connection);
    }
  }

  /// Deliver an external value to a component input, e.g. from a UI.
  pub fn deliver_input(
    &mut self,
    flow_state: FlowStateId,
    component_id: &str,
    input: &str,
    value: Value,
  ) -> Result<(), RuntimeError> {
    if self.is_stopped {
      return Err(RuntimeError::Stopped);
    }
    let component = self.find_component(flow_state, component_id)?;
    let flow = &self.flow_states[flow_state].flow;
    if flow.component(component).input(input).is_none() {
      return Err(RuntimeError::InputNotFound {
        flow_id: flow.flow_id.clone(),
        component: component_id.to_string(),
        input: input.to_string(),
      });
    }

    self.set_input_value(flow_state, component, input, value);
    Ok(())
  }

  /// Write `value` to an assignable target named from `component`'s view.
  ///
  /// Resolution order: an output of the component, a local variable visible
  /// from the flow state, then a declared global.
  pub fn assign_value(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentIndex,
    target: &str,
    value: Value,
  ) -> Result<(), RuntimeError> {
    let flow = self.flow_states[flow_state].flow.clone();
    if flow.component(component).has_output(target) {
      self.propagate_value(flow_state, component, target, value);
      return Ok(());
    }

    let owner = self
      .flow_states
      .lineage(flow_state)
      .into_iter()
      .find(|id| self.flow_states[*id].local_variable(target).is_some());
    if let Some(owner) = owner {
      debug!(flow_state = %owner, variable = target, "local_variable_assigned");
      self.flow_states[owner].set_local_variable(target, value);
      return Ok(());
    }

    if self.variables.set(target, value) {
      debug!(variable = target, "global_variable_assigned");
      return Ok(());
    }

    Err(RuntimeError::NotAssignable {
      target: target.to_string(),
    })
  }
}
