//! Error-catch resolution.
//!
//! A failure is first routed through `@error` connections: those of the
//! failing component, or else those of the component that invoked its flow,
//! walking out through callers. Failing that, the nearest catch-error
//! component of the failing flow or its ancestors receives the error value.
//! An error with no taker stops the runtime.

use flowpump_graph::{ComponentIndex, ERROR_OUTPUT, MESSAGE};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ComponentError;
use crate::events::EventNotifier;
use crate::flow_state::FlowStateId;
use crate::logs::{LogItem, LogKind};
use crate::runtime::Runtime;

impl<N: EventNotifier> Runtime<N> {
  /// Record a component failure and route it to a catcher.
  pub(crate) fn handle_failure(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentIndex,
    err: ComponentError,
  ) {
    let flow = self.flow_states[flow_state].flow.clone();
    let definition = flow.component(component);
    let message = err.message().to_string();

    self.flow_states[flow_state].error = Some(message.clone());
    self.error = Some(message.clone());

    let item = if definition.kind.is_error() {
      LogItem::error(LogKind::Message {
        text: format!("Error: {message}"),
      })
    } else {
      LogItem::error(LogKind::ExecutionError {
        component: definition.display_name().to_string(),
        error: message.clone(),
      })
    };
    self.log(item.at_component(flow_state, component));

    warn!(
      flow_state = %flow_state,
      component = %definition.id,
      error = %message,
      "component_failed"
    );

    self.resolve_catch(flow_state, component, definition.kind.is_error(), err.value().clone());
  }

  fn resolve_catch(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentIndex,
    is_error_component: bool,
    value: Value,
  ) {
    if !self.flow_states[flow_state].is_finished {
      if let Some((owner, source)) = self.find_catch_error_output(flow_state, component) {
        info!(flow_state = %owner, component = %source, "error_routed_to_error_output");
        self.propagate_value(owner, source, ERROR_OUTPUT, value);
        if owner != flow_state {
          self.abandon(flow_state, owner);
        }
        return;
      }
    }

    let search_from = if is_error_component {
      self.flow_states[flow_state].parent
    } else {
      Some(flow_state)
    };

    match search_from.and_then(|start| self.find_catch_error_component(start)) {
      Some((owner, catcher)) => {
        info!(flow_state = %owner, component = %catcher, "error_caught");
        self.remove_queue_tasks_for_flow_state(flow_state);
        self.set_input_value(owner, catcher, MESSAGE, value);
        if owner != flow_state {
          self.abandon(flow_state, owner);
        }
      }
      None => {
        warn!(flow_state = %flow_state, "uncaught_error");
        self.stop_runtime();
      }
    }
  }

  /// Nearest component with a wired `@error` output: the failing component,
  /// else the invoking component of each enclosing invocation.
  fn find_catch_error_output(
    &self,
    flow_state: FlowStateId,
    component: ComponentIndex,
  ) -> Option<(FlowStateId, ComponentIndex)> {
    let mut current = (flow_state, component);
    loop {
      let state = &self.flow_states[current.0];
      if !state.is_finished && state.flow.has_error_connection(current.1) {
        return Some(current);
      }
      match (state.parent, state.invoking_component) {
        (Some(parent), Some(invoker)) => current = (parent, invoker),
        _ => return None,
      }
    }
  }

  /// Nearest catch-error component in `start` or its ancestors.
  fn find_catch_error_component(&self, start: FlowStateId) -> Option<(FlowStateId, ComponentIndex)> {
    self
      .flow_states
      .lineage(start)
      .into_iter()
      .filter(|id| !self.flow_states[*id].is_finished)
      .find_map(|id| {
        self.flow_states[id]
          .flow
          .find_catch_error()
          .map(|catcher| (id, catcher))
      })
  }

  /// Finish every flow state from `failed` up to, not including, `catcher`.
  ///
  /// Outermost first, so no intermediate caller is reported as completed.
  fn abandon(&mut self, failed: FlowStateId, catcher: FlowStateId) {
    let chain: Vec<FlowStateId> = self
      .flow_states
      .lineage(failed)
      .into_iter()
      .take_while(|id| *id != catcher)
      .collect();

    for id in chain.into_iter().rev() {
      self.remove_queue_tasks_for_flow_state(id);
      self.finish_flow_state(id, false);
    }
  }
}
