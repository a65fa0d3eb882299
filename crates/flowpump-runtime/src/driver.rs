//! The execution driver: runs one component and interprets the outcome.

use std::sync::Arc;

use flowpump_graph::{ComponentIndex, Flow, SEQOUT};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::error::{ComponentError, RuntimeError};
use crate::events::{EventNotifier, RuntimeEvent};
use crate::executor::{ComponentExecutor, Dispose, Effect, Execution, ExecutionContext};
use crate::flow_state::FlowStateId;
use crate::logs::{LogItem, LogKind};
use crate::runtime::Runtime;

pub const FLOW_ALREADY_COMPLETED: &str = "The flow has already completed execution.";

/// A component run whose unit of work has not been awaited yet.
///
/// Owns the executor and its context, so awaiting it never borrows the
/// runtime. Commands can be applied while it is suspended.
pub(crate) struct PendingRun {
  flow_state: FlowStateId,
  component: ComponentIndex,
  work: Work,
}

enum Work {
  Execute {
    executor: Arc<dyn ComponentExecutor>,
    context: ExecutionContext,
  },
  Fail(ComponentError),
}

/// The outcome of a [`PendingRun`], ready to be applied to the runtime.
pub(crate) struct CompletedRun {
  flow_state: FlowStateId,
  component: ComponentIndex,
  result: Result<Execution, ComponentError>,
  context: Option<ExecutionContext>,
}

impl PendingRun {
  pub(crate) async fn execute(self) -> CompletedRun {
    let (result, context) = match self.work {
      Work::Execute {
        executor,
        mut context,
      } => {
        let result = executor.execute(&mut context).await;
        (result, Some(context))
      }
      Work::Fail(err) => (Err(err), None),
    };
    CompletedRun {
      flow_state: self.flow_state,
      component: self.component,
      result,
      context,
    }
  }
}

impl<N: EventNotifier> Runtime<N> {
  /// Execute a component of a flow state.
  ///
  /// The caller must have counted the unit in the flow's active counter.
  #[instrument(
    name = "run_component",
    skip(self),
    fields(flow_state = %flow_state, component = %component)
  )]
  pub(crate) async fn run(&mut self, flow_state: FlowStateId, component: ComponentIndex) {
    let pending = self.begin_run(flow_state, component);
    let completed = pending.execute().await;
    self.finish_run(completed);
  }

  /// Mark the component running and hand out its unit of work.
  pub(crate) fn begin_run(&mut self, flow_state: FlowStateId, component: ComponentIndex) -> PendingRun {
    let flow = self.flow_states[flow_state].flow.clone();
    let definition = flow.component(component);

    self.log(
      LogItem::info(LogKind::ExecuteComponent {
        component: definition.display_name().to_string(),
      })
      .at_component(flow_state, component),
    );
    self.flow_states[flow_state]
      .component_state_mut(component)
      .is_running = true;

    let work = if self.flow_states[flow_state].is_finished {
      Work::Fail(ComponentError::new(FLOW_ALREADY_COMPLETED))
    } else {
      match self.registry.resolve(definition) {
        Some(executor) => Work::Execute {
          executor,
          context: self.execution_context(flow_state, &flow, component),
        },
        None => Work::Fail(ComponentError::new(format!(
          "no executor for {} component '{}'",
          definition.kind.name(),
          definition.id
        ))),
      }
    };

    PendingRun {
      flow_state,
      component,
      work,
    }
  }

  /// Apply a finished unit of work.
  ///
  /// Effects recorded by the executor are applied while the component is
  /// still marked running. Afterwards `@seqout` fires unless the outcome is
  /// managed, consumed sequence inputs are cleared, and an action flow whose
  /// counter drained is finished.
  pub(crate) fn finish_run(&mut self, completed: CompletedRun) {
    let CompletedRun {
      flow_state,
      component,
      result,
      context,
    } = completed;

    let mut leftover = None;
    if let Some(context) = context {
      let (effects, disposer) = context.into_parts();
      leftover = disposer;
      self.apply_effects(flow_state, component, effects);
    }

    let (propagate_seqout, failure) = match result {
      Ok(Execution::Continue) => {
        self.keep_disposer(flow_state, component, leftover);
        (true, None)
      }
      Ok(Execution::Managed) => {
        self.keep_disposer(flow_state, component, leftover);
        (false, None)
      }
      Ok(Execution::Retain(handle)) => {
        if let Some(previous) = leftover {
          previous.dispose();
        }
        self.keep_disposer(flow_state, component, Some(handle));
        (true, None)
      }
      Err(err) => {
        self.keep_disposer(flow_state, component, leftover);
        (false, Some(err))
      }
    };

    let error = failure.map(|err| {
      self.flow_states[flow_state].decrement_active();
      let message = err.message().to_string();
      self.handle_failure(flow_state, component, err);
      message
    });

    if let Some(state) = self.flow_states[flow_state].existing_component_state_mut(component) {
      state.is_running = false;
    }

    if propagate_seqout {
      self.propagate_value(flow_state, component, SEQOUT, Value::Null);
    }

    if let Some(state) = self.flow_states[flow_state].existing_component_state_mut(component) {
      state.clear_sequence_inputs();
    }

    if error.is_none() {
      self.flow_states[flow_state].decrement_active();
    }
    self.check_finished(flow_state);

    let component_id = self.flow_states[flow_state].flow.component(component).id.clone();
    self.notifier.notify(RuntimeEvent::ComponentExecuted {
      flow_state,
      component_id,
      error,
    });
  }

  fn execution_context(
    &mut self,
    flow_state: FlowStateId,
    flow: &Arc<Flow>,
    component: ComponentIndex,
  ) -> ExecutionContext {
    let variables = self.visible_variables(flow_state);
    let state = self.flow_states[flow_state].component_state_mut(component);
    ExecutionContext::new(
      flow_state,
      flow.clone(),
      component,
      state.inputs_data.clone(),
      variables,
      state.dispose.take(),
    )
  }

  /// Store a disposer, releasing it at once if the flow already finished.
  fn keep_disposer(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentIndex,
    disposer: Option<Box<dyn Dispose>>,
  ) {
    let Some(disposer) = disposer else {
      return;
    };
    let state = &mut self.flow_states[flow_state];
    if state.is_finished {
      disposer.dispose();
    } else {
      state.component_state_mut(component).dispose = Some(disposer);
    }
  }

  fn apply_effects(&mut self, flow_state: FlowStateId, component: ComponentIndex, effects: Vec<Effect>) {
    for effect in effects {
      if self.is_stopped {
        debug!(flow_state = %flow_state, "effects_dropped_after_stop");
        break;
      }

      match effect {
        Effect::Propagate { output, value } => {
          self.propagate_value(flow_state, component, &output, value);
        }
        Effect::Assign { target, value } => {
          if let Err(e) = self.assign_value(flow_state, component, &target, value) {
            self.fail_structural(flow_state, component, e);
          }
        }
        Effect::Log { level, message } => {
          self.log(LogItem::new(level, LogKind::Message { text: message }).at_component(flow_state, component));
        }
        Effect::InvokeAction { action, value } => {
          match self.invoke_action(flow_state, component, &action, value) {
            Ok(_) | Err(RuntimeError::NoStartComponent { .. }) => {}
            Err(e) => self.fail_structural(flow_state, component, e),
          }
        }
        Effect::ForwardToCaller { output, value } => {
          self.forward_to_caller(flow_state, &output, value);
        }
      }
    }
  }

  /// Emit through the invoking component's output in the parent flow.
  fn forward_to_caller(&mut self, flow_state: FlowStateId, output: &str, value: Value) {
    let state = &self.flow_states[flow_state];
    match (state.parent, state.invoking_component) {
      (Some(parent), Some(invoker)) => self.propagate_value(parent, invoker, output, value),
      _ => debug!(flow_state = %flow_state, output, "output_without_caller"),
    }
  }

  /// A configuration error is fatal to the whole runtime.
  pub(crate) fn fail_structural(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentIndex,
    err: RuntimeError,
  ) {
    let message = err.to_string();
    let name = self.flow_states[flow_state]
      .flow
      .component(component)
      .display_name()
      .to_string();
    error!(flow_state = %flow_state, component = %name, error = %message, "structural_error");

    self.log(
      LogItem::error(LogKind::ExecutionError {
        component: name,
        error: message.clone(),
      })
      .at_component(flow_state, component),
    );
    self.flow_states[flow_state].error = Some(message.clone());
    self.error = Some(message);
    self.stop_runtime();
  }
}
