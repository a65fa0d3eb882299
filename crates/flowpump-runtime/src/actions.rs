//! Sub-flow invocation and flow completion.

use flowpump_graph::{ComponentIndex, ComponentKind, SEQOUT};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::RuntimeError;
use crate::events::{EventNotifier, RuntimeEvent};
use crate::flow_state::FlowStateId;
use crate::logs::{LogItem, LogKind};
use crate::runtime::Runtime;

const NO_START_COMPONENT: &str = "No Start action component";

/// Output through which a widget hands its action to the graph.
const ACTION_OUTPUT: &str = "action";

impl<N: EventNotifier> Runtime<N> {
  /// Trigger a widget's action.
  ///
  /// A widget with an `action` output propagates `value` through it.
  /// Otherwise the named action is invoked. Unknown or missing actions are
  /// logged. Ignored once the runtime is stopped.
  pub fn execute_widget_action(
    &mut self,
    flow_state: FlowStateId,
    widget_id: &str,
    value: Value,
  ) -> Result<(), RuntimeError> {
    if self.is_stopped {
      return Ok(());
    }

    let widget = self.find_component(flow_state, widget_id)?;
    let flow = self.flow_states[flow_state].flow.clone();
    let definition = flow.component(widget);

    if definition.has_output(ACTION_OUTPUT) {
      self.propagate_value(flow_state, widget, ACTION_OUTPUT, value);
      return Ok(());
    }

    match &definition.kind {
      ComponentKind::Widget {
        action: Some(action),
      } => {
        if self.project.find_action(action).is_some() {
          self.invoke_action(flow_state, widget, action, value)?;
        } else {
          self.log(
            LogItem::error(LogKind::WidgetActionNotFound {
              action: action.clone(),
            })
            .in_flow_state(flow_state),
          );
        }
      }
      _ => {
        self.log(
          LogItem::error(LogKind::WidgetActionNotDefined {
            widget: definition.display_name().to_string(),
          })
          .in_flow_state(flow_state),
        );
      }
    }

    Ok(())
  }

  /// Create a child flow state for `action` and queue its start component.
  ///
  /// Every input parameter component of the action receives `value` through
  /// its `@seqout`. A call-action invoker stays counted in its own flow until
  /// the child finishes.
  pub fn invoke_action(
    &mut self,
    parent: FlowStateId,
    invoking_component: ComponentIndex,
    action: &str,
    value: Value,
  ) -> Result<FlowStateId, RuntimeError> {
    let flow = self
      .project
      .find_action(action)
      .cloned()
      .ok_or_else(|| RuntimeError::ActionNotFound(action.to_string()))?;

    let child = self
      .flow_states
      .insert(flow.clone(), Some(parent), Some(invoking_component));
    info!(parent = %parent, child = %child, action = %flow.flow_id, "action_invoked");

    let invoker = self.flow_states[parent].flow.clone();
    let invoker = invoker.component(invoking_component);
    if invoker.kind.is_widget() {
      self.log(
        LogItem::info(LogKind::ExecuteWidgetAction {
          widget: invoker.display_name().to_string(),
        })
        .in_flow_state(child),
      );
    }
    if invoker.kind.is_call_action() {
      self.flow_states[parent].increment_active();
    }

    for input in flow.input_components() {
      self.propagate_value(child, input, SEQOUT, value.clone());
    }

    self.flow_states[parent].children.push(child);
    self.execute_start_action(child)?;
    Ok(child)
  }

  /// Queue the start component of an invoked flow.
  pub(crate) fn execute_start_action(&mut self, flow_state: FlowStateId) -> Result<(), RuntimeError> {
    let flow = self.flow_states[flow_state].flow.clone();
    self.log(
      LogItem::info(LogKind::ActionStart {
        action: flow.name.clone(),
      })
      .in_flow_state(flow_state),
    );

    match flow.find_start() {
      Some(start) => {
        self.enqueue(flow_state, start, None);
        Ok(())
      }
      None => {
        self.log(LogItem::error(LogKind::NoStartComponent).in_flow_state(flow_state));
        warn!(flow_state = %flow_state, flow_id = %flow.flow_id, "no_start_component");
        self.error = Some(NO_START_COMPONENT.to_string());
        self.stop_runtime();
        Err(RuntimeError::NoStartComponent {
          flow_id: flow.flow_id.clone(),
        })
      }
    }
  }

  /// Finish an action flow state whose active counter drained.
  pub(crate) fn check_finished(&mut self, flow_state: FlowStateId) {
    if self.flow_states[flow_state].should_finish() {
      self.finish_flow_state(flow_state, true);
    }
  }

  /// Mark a flow state finished and release its component states.
  ///
  /// When a call-action component invoked it, the caller's counter slot is
  /// released, and on completion the caller's `@seqout` fires.
  pub(crate) fn finish_flow_state(&mut self, flow_state: FlowStateId, completed: bool) {
    if self.flow_states[flow_state].is_finished {
      return;
    }

    for disposer in self.flow_states[flow_state].finish() {
      disposer.dispose();
    }

    let state = &self.flow_states[flow_state];
    let flow = state.flow.clone();
    let caller = state.parent.zip(state.invoking_component);

    if flow.is_action() {
      self.log(
        LogItem::info(LogKind::ActionEnd {
          action: flow.name.clone(),
        })
        .in_flow_state(flow_state),
      );
    }
    info!(flow_state = %flow_state, flow_id = %flow.flow_id, completed, "flow_finished");
    self.notifier.notify(RuntimeEvent::FlowFinished {
      flow_state,
      flow_id: flow.flow_id.clone(),
    });

    let Some((parent, invoker)) = caller else {
      return;
    };
    let parent_flow = self.flow_states[parent].flow.clone();
    if !parent_flow.component(invoker).kind.is_call_action() || self.flow_states[parent].is_finished {
      return;
    }

    if completed {
      self.propagate_value(parent, invoker, SEQOUT, Value::Null);
    }
    self.flow_states[parent].decrement_active();
    self.check_finished(parent);
  }
}
