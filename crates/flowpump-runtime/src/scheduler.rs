//! The pump loop.
//!
//! ```text
//!   queue: [t0 t1 t2 ...]          horizon = next task id
//!      │
//!      ▼  pop while id < horizon
//!   running? ──yes──► deferred
//!      │no
//!   breakpoint? ──yes──► deferred, single-step, stop cycle
//!      │no
//!   run(task) ──► effects, propagation, new tasks at the tail
//!      │
//!   single-step / paused / stopped? ──yes──► stop cycle
//!
//!   deferred ──► reinserted at the head in order
//! ```

use flowpump_graph::ConnectionIndex;
use tracing::{info, instrument};

use crate::debugger::DebuggerAction;
use crate::driver::{CompletedRun, PendingRun};
use crate::events::EventNotifier;
use crate::flow_state::FlowStateId;
use crate::queue::QueueTask;
use crate::runtime::Runtime;

/// Progress of one pump cycle.
///
/// [`Runtime::pump_cycle`] drives it to the end in one call. The runner
/// steps through it so it can serve commands while a unit of work is
/// suspended.
pub(crate) struct PumpCycle {
  horizon: u64,
  deferred: Vec<QueueTask>,
  single_step: bool,
  executed: usize,
  done: bool,
  connection: Option<(FlowStateId, ConnectionIndex)>,
}

impl<N: EventNotifier> Runtime<N> {
  /// Run one bounded pass over the queue. Returns the number of executed tasks.
  ///
  /// Tasks pushed during the cycle wait for the next one.
  #[instrument(name = "pump_cycle", skip(self), fields(queued = self.queue.len()))]
  pub async fn pump_cycle(&mut self) -> usize {
    let Some(mut cycle) = self.begin_cycle() else {
      return 0;
    };
    while let Some(pending) = self.next_run(&mut cycle) {
      let completed = pending.execute().await;
      self.complete_run(&mut cycle, completed);
    }
    self.end_cycle(cycle)
  }

  pub(crate) fn begin_cycle(&mut self) -> Option<PumpCycle> {
    if self.is_stopped || self.debugger.halts_pump() || self.queue.is_empty() {
      return None;
    }
    Some(PumpCycle {
      horizon: self.queue.next_id(),
      deferred: Vec::new(),
      single_step: self.debugger.is_single_step(),
      executed: 0,
      done: false,
      connection: None,
    })
  }

  /// Pop tasks until one can run and begin it.
  ///
  /// Running components are deferred. A breakpoint defers its task and ends
  /// the cycle in single-step.
  pub(crate) fn next_run(&mut self, cycle: &mut PumpCycle) -> Option<PendingRun> {
    while !cycle.done {
      let task = self.queue.pop_front_before(cycle.horizon)?;

      let is_running = self.flow_states[task.flow_state]
        .component_state(task.component)
        .is_some_and(|state| state.is_running);

      if is_running {
        cycle.deferred.push(task);
        self.check_cycle_end(cycle);
        continue;
      }

      let flow = &self.flow_states[task.flow_state].flow;
      let component_id = &flow.component(task.component).id;
      let breakpoint_hit = self.debugger.is_active()
        && !cycle.single_step
        && self.last_breakpoint_task != Some(task.id)
        && self.debugger.is_breakpoint_enabled(&flow.flow_id, component_id);

      if breakpoint_hit {
        info!(
          flow_id = %flow.flow_id,
          component = %component_id,
          task = task.id,
          "breakpoint_hit"
        );
        self.last_breakpoint_task = Some(task.id);
        cycle.deferred.push(task);
        cycle.single_step = true;
        cycle.done = true;
        return None;
      }

      self.last_breakpoint_task = None;
      cycle.connection = task.connection.map(|connection| (task.flow_state, connection));

      // The dequeued task's counter slot is released by `finish_run`.
      return Some(self.begin_run(task.flow_state, task.component));
    }
    None
  }

  pub(crate) fn complete_run(&mut self, cycle: &mut PumpCycle, completed: CompletedRun) {
    self.finish_run(completed);
    cycle.executed += 1;
    if let Some(connection) = cycle.connection.take() {
      self.active_connections.insert(connection);
    }
    self.check_cycle_end(cycle);
  }

  fn check_cycle_end(&self, cycle: &mut PumpCycle) {
    if cycle.single_step || self.debugger.halts_pump() || self.is_stopped {
      cycle.done = true;
    }
  }

  /// Put deferred tasks back at the head. Returns the number of executed tasks.
  pub(crate) fn end_cycle(&mut self, cycle: PumpCycle) -> usize {
    self.queue.requeue_front(cycle.deferred);
    if cycle.single_step {
      self.transition(DebuggerAction::Pause);
    }
    cycle.executed
  }

  /// Pump until there is no runnable work or `max_cycles` is reached.
  ///
  /// Returns the number of cycles run.
  pub async fn run_until_idle(&mut self, max_cycles: usize) -> usize {
    let mut cycles = 0;
    while cycles < max_cycles && self.has_pending_work() {
      self.pump_cycle().await;
      cycles += 1;
    }
    cycles
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

  fn runtime() -> Runtime {
    let project = Project::from_def(
      serde_json::from_value(json!({
        "name": "t",
        "pages": [{
          "flow_id": "main",
          "components": [
            { "component_id": "a", "type": "action", "executor": "noop" },
            { "component_id": "b", "type": "action", "executor": "noop" }
          ]
        }]
      }))
      .unwrap(),
    )
    .unwrap();
    Runtime::new(
      Arc::new(project),
      ExecutorRegistry::with_builtins(),
      RuntimeConfig::default(),
    )
  }

  #[tokio::test]
  async fn test_running_component_is_deferred_not_rerun() {
    let mut runtime = runtime();
    runtime.start().await.unwrap();
    let fs = runtime.root_flow_states()[0];
    let a = runtime.find_component(fs, "a").unwrap();
    assert_eq!(runtime.queued_tasks().count(), 2);

    runtime.flow_states[fs].component_state_mut(a).is_running = true;
    let executed = runtime.pump_cycle().await;

    assert_eq!(executed, 1);
    let queued: Vec<_> = runtime.queued_tasks().map(|task| task.component).collect();
    assert_eq!(queued, vec![a]);

    runtime.flow_states[fs].component_state_mut(a).is_running = false;
    assert_eq!(runtime.pump_cycle().await, 1);
    assert_eq!(runtime.queued_tasks().count(), 0);
  }

  #[tokio::test]
  async fn test_paused_pump_does_nothing() {
    let mut runtime = runtime();
    runtime.start().await.unwrap();
    runtime.pause();

    assert_eq!(runtime.pump_cycle().await, 0);
    assert_eq!(runtime.queued_tasks().count(), 2);
    assert!(!runtime.has_pending_work());
  }
}
