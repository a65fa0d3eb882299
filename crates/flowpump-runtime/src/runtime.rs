//! The runtime controller.
//!
//! `Runtime` owns every piece of execution state for one loaded project: the
//! flow state arena, the task queue, the debugger, the log sink, settings and
//! global variables. Scheduling, execution, propagation, catch resolution and
//! action invocation are implemented in sibling modules as further `impl`
//! blocks on this type.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use flowpump_graph::{ComponentIndex, ConnectionIndex, Project};
use tracing::{debug, info, instrument, warn};

use crate::debugger::{Debugger, DebuggerAction, DebuggerState};
use crate::error::RuntimeError;
use crate::events::{EventNotifier, NoopNotifier, RuntimeEvent};
use crate::flow_state::{FlowState, FlowStateId, FlowStates};
use crate::logs::{LogItem, LogSink, MAX_LOG_ITEMS};
use crate::queue::{QueueTask, TaskQueue};
use crate::registry::ExecutorRegistry;
use crate::settings::{RuntimeSettings, settings_path};
use crate::variables::VariableStore;

/// Configuration for a runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Project file path. Settings are kept next to it when set.
  pub project_path: Option<PathBuf>,
  /// Log sink capacity.
  pub max_log_items: usize,
  /// Upper bound on waiting for a suspended unit of work at stop.
  pub stop_timeout: Duration,
  /// Start paused with the debugger active.
  pub debugger_active: bool,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      project_path: None,
      max_log_items: MAX_LOG_ITEMS,
      stop_timeout: Duration::from_secs(3),
      debugger_active: false,
    }
  }
}

impl RuntimeConfig {
  pub fn settings_path(&self) -> Option<PathBuf> {
    self.project_path.as_deref().map(settings_path)
  }
}

/// Executes the flows of a project.
///
/// Generic over `N: EventNotifier` to allow different notification strategies.
/// Use `Runtime::new()` for a runtime with no-op notifications, or
/// `Runtime::with_notifier()` to observe events.
pub struct Runtime<N: EventNotifier = NoopNotifier> {
  pub(crate) config: RuntimeConfig,
  pub(crate) project: Arc<Project>,
  pub(crate) registry: ExecutorRegistry,
  pub(crate) notifier: N,
  pub(crate) flow_states: FlowStates,
  pub(crate) root_flow_states: Vec<FlowStateId>,
  pub(crate) queue: TaskQueue,
  pub(crate) debugger: Debugger,
  /// Task id of the last breakpoint stop.
  pub(crate) last_breakpoint_task: Option<u64>,
  pub(crate) logs: LogSink,
  pub(crate) settings: RuntimeSettings,
  pub(crate) variables: VariableStore,
  /// Connections that carried a value, for UI highlighting.
  pub(crate) active_connections: HashSet<(FlowStateId, ConnectionIndex)>,
  pub(crate) is_started: bool,
  pub(crate) is_stopped: bool,
  pub(crate) is_shut_down: bool,
  pub(crate) error: Option<String>,
}

impl Runtime<NoopNotifier> {
  /// Create a runtime with no-op notifications.
  pub fn new(project: Arc<Project>, registry: ExecutorRegistry, config: RuntimeConfig) -> Self {
    Self::with_notifier(project, registry, config, NoopNotifier)
  }
}

impl<N: EventNotifier> Runtime<N> {
  /// Create a runtime with a custom notifier.
  pub fn with_notifier(
    project: Arc<Project>,
    registry: ExecutorRegistry,
    config: RuntimeConfig,
    notifier: N,
  ) -> Self {
    let variables = VariableStore::new(&project.variables);
    let logs = LogSink::new(config.max_log_items);

    Self {
      config,
      project,
      registry,
      notifier,
      flow_states: FlowStates::new(),
      root_flow_states: Vec::new(),
      queue: TaskQueue::new(),
      debugger: Debugger::new(),
      last_breakpoint_task: None,
      logs,
      settings: RuntimeSettings::in_memory(),
      variables,
      active_connections: HashSet::new(),
      is_started: false,
      is_stopped: false,
      is_shut_down: false,
      error: None,
    }
  }

  /// Start every page, then enter RUNNING (or PAUSED with the debugger active).
  #[instrument(name = "runtime_start", skip(self), fields(project = %self.project.name))]
  pub async fn start(&mut self) -> Result<(), RuntimeError> {
    if self.is_started {
      return Err(RuntimeError::AlreadyStarted);
    }
    self.is_started = true;

    let project = self.project.clone();
    for page in project.pages.iter().filter(|page| !page.used_as_custom_widget) {
      let id = self.flow_states.insert(page.clone(), None, None);
      self.root_flow_states.push(id);
    }

    self.settings = RuntimeSettings::load(self.config.settings_path()).await;
    self.load_persistent_variables().await;
    self.variables.construct_globals().await;

    for id in self.root_flow_states.clone() {
      if self.is_stopped {
        break;
      }
      self.start_flow(id).await;
    }

    let action = if self.config.debugger_active {
      DebuggerAction::Pause
    } else {
      DebuggerAction::Run
    };
    self.transition(action);

    info!(
      project = %project.name,
      root_flow_states = self.root_flow_states.len(),
      queued = self.queue.len(),
      "runtime_started"
    );
    self.notifier.notify(RuntimeEvent::Started {
      project: project.name.clone(),
    });

    Ok(())
  }

  /// Visit components in order: ready widgets run now, other ready components are queued.
  pub(crate) async fn start_flow(&mut self, flow_state: FlowStateId) {
    let flow = self.flow_states[flow_state].flow.clone();
    for component in flow.component_indices() {
      if self.is_stopped {
        break;
      }
      if !self.is_ready_to_run(flow_state, component) {
        continue;
      }
      if flow.component(component).kind.is_widget() {
        self.flow_states[flow_state].increment_active();
        self.run(flow_state, component).await;
      } else {
        self.enqueue(flow_state, component, None);
      }
    }
  }

  /// Request a stop. The pump does no more work once set.
  pub fn stop_runtime(&mut self) {
    if !self.is_stopped {
      self.is_stopped = true;
      info!(error = ?self.error, "runtime_stop_requested");
    }
  }

  /// Stop and release everything.
  pub async fn stop(&mut self) {
    self.stop_runtime();
    self.shutdown().await;
  }

  /// Save settings, then finish every flow state, releasing disposers.
  ///
  /// Idempotent. A unit of work still suspended in a [`RuntimeRunner`] is
  /// awaited (bounded by `stop_timeout`) before this runs.
  ///
  /// [`RuntimeRunner`]: crate::RuntimeRunner
  #[instrument(name = "runtime_shutdown", skip(self))]
  pub async fn shutdown(&mut self) {
    if self.is_shut_down {
      return;
    }
    self.is_shut_down = true;
    self.is_stopped = true;

    self.save_persistent_variables().await;
    if let Err(e) = self.settings.save().await {
      warn!(error = %e, "settings_save_failed");
    }

    for id in self.flow_states.ids() {
      if self.flow_states[id].is_finished {
        continue;
      }
      for disposer in self.flow_states[id].finish() {
        disposer.dispose();
      }
    }
    self.queue.clear();

    info!(error = ?self.error, "runtime_stopped");
    self.notifier.notify(RuntimeEvent::Stopped {
      error: self.error.clone(),
    });
  }

  async fn load_persistent_variables(&mut self) {
    if let Some(saved) = self.settings.persistent_variables().cloned() {
      self.variables.load_persistent(&saved).await;
    }
  }

  async fn save_persistent_variables(&mut self) {
    let saved = self.variables.save_persistent().await;
    if !saved.is_empty() {
      self.settings.set_persistent_variables(saved);
    }
  }

  /// Append a task after validating its flow state and component.
  pub fn push_task(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentIndex,
    connection: Option<ConnectionIndex>,
  ) -> Result<u64, RuntimeError> {
    let state = self
      .flow_states
      .get(flow_state)
      .ok_or(RuntimeError::FlowStateNotFound(flow_state))?;
    if component.0 >= state.flow.components.len() {
      return Err(RuntimeError::ComponentNotFound {
        flow_id: state.flow.flow_id.clone(),
        component: component.to_string(),
      });
    }
    Ok(self.enqueue(flow_state, component, connection))
  }

  pub(crate) fn enqueue(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentIndex,
    connection: Option<ConnectionIndex>,
  ) -> u64 {
    self.flow_states[flow_state].increment_active();
    let task = self.queue.push(flow_state, component, connection);

    let component_id = self.flow_states[flow_state].flow.component(component).id.clone();
    debug!(flow_state = %flow_state, component = %component_id, task, "task_queued");
    self.notifier.notify(RuntimeEvent::TaskQueued {
      flow_state,
      component_id,
    });
    task
  }

  /// Purge a flow state's queued tasks, releasing their counter slots.
  pub(crate) fn remove_queue_tasks_for_flow_state(&mut self, flow_state: FlowStateId) {
    let removed = self.queue.remove_for_flow_state(flow_state);
    if removed > 0 {
      self.flow_states[flow_state].release_active(removed);
      debug!(flow_state = %flow_state, removed, "queue_tasks_removed");
    }
  }

  pub(crate) fn log(&mut self, item: LogItem) {
    self.logs.add(item);
  }

  /// Globals overlaid with locals from the outermost ancestor inwards.
  pub(crate) fn visible_variables(&self, flow_state: FlowStateId) -> HashMap<String, serde_json::Value> {
    let mut variables = self.variables.values().clone();
    for id in self.flow_states.lineage(flow_state).into_iter().rev() {
      for (name, value) in &self.flow_states[id].data_context {
        variables.insert(name.clone(), value.clone());
      }
    }
    variables
  }

  /// Resolve a component id within a flow state.
  pub fn find_component(
    &self,
    flow_state: FlowStateId,
    component_id: &str,
  ) -> Result<ComponentIndex, RuntimeError> {
    let state = self
      .flow_states
      .get(flow_state)
      .ok_or(RuntimeError::FlowStateNotFound(flow_state))?;
    state
      .flow
      .find_component(component_id)
      .ok_or_else(|| RuntimeError::ComponentNotFound {
        flow_id: state.flow.flow_id.clone(),
        component: component_id.to_string(),
      })
  }

  /// First unfinished flow state running `flow_id`, roots before nested ones.
  pub fn find_flow_state(&self, flow_id: &str) -> Option<FlowStateId> {
    self
      .flow_states
      .iter()
      .find(|state| !state.is_finished && state.flow.flow_id == flow_id)
      .map(|state| state.id)
  }

  // Debugger controls

  pub fn transition(&mut self, action: DebuggerAction) -> DebuggerState {
    let state = self.debugger.transition(action);
    info!(action = ?action, state = ?state, "debugger_transition");
    self.notifier.notify(RuntimeEvent::StateChanged { state });
    state
  }

  pub fn toggle_debugger(&mut self) -> DebuggerState {
    if self.debugger.is_active() {
      self.transition(DebuggerAction::Run)
    } else {
      self.transition(DebuggerAction::Pause)
    }
  }

  pub fn pause(&mut self) -> DebuggerState {
    self.transition(DebuggerAction::Pause)
  }

  pub fn resume(&mut self) -> DebuggerState {
    self.transition(DebuggerAction::Resume)
  }

  pub fn run_single_step(&mut self) -> DebuggerState {
    self.transition(DebuggerAction::SingleStep)
  }

  pub fn add_breakpoint(&mut self, flow_id: &str, component_id: &str) {
    self.debugger.add_breakpoint(flow_id, component_id);
  }

  pub fn remove_breakpoint(&mut self, flow_id: &str, component_id: &str) -> bool {
    self.debugger.remove_breakpoint(flow_id, component_id)
  }

  pub fn enable_breakpoint(&mut self, flow_id: &str, component_id: &str) -> bool {
    self.debugger.set_breakpoint_enabled(flow_id, component_id, true)
  }

  pub fn disable_breakpoint(&mut self, flow_id: &str, component_id: &str) -> bool {
    self.debugger.set_breakpoint_enabled(flow_id, component_id, false)
  }

  // Accessors

  pub fn project(&self) -> &Project {
    &self.project
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.config
  }

  pub fn is_started(&self) -> bool {
    self.is_started
  }

  pub fn is_stopped(&self) -> bool {
    self.is_stopped
  }

  /// Last recorded error.
  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn debugger(&self) -> &Debugger {
    &self.debugger
  }

  pub fn logs(&self) -> &LogSink {
    &self.logs
  }

  pub fn logs_mut(&mut self) -> &mut LogSink {
    &mut self.logs
  }

  pub fn settings(&self) -> &RuntimeSettings {
    &self.settings
  }

  pub fn settings_mut(&mut self) -> &mut RuntimeSettings {
    &mut self.settings
  }

  pub fn variables(&self) -> &VariableStore {
    &self.variables
  }

  pub fn variables_mut(&mut self) -> &mut VariableStore {
    &mut self.variables
  }

  pub fn queued_tasks(&self) -> impl Iterator<Item = &QueueTask> {
    self.queue.iter()
  }

  pub fn root_flow_states(&self) -> &[FlowStateId] {
    &self.root_flow_states
  }

  pub fn flow_state(&self, id: FlowStateId) -> Option<&FlowState> {
    self.flow_states.get(id)
  }

  pub fn flow_states(&self) -> &FlowStates {
    &self.flow_states
  }

  pub fn is_active_connection(&self, flow_state: FlowStateId, connection: ConnectionIndex) -> bool {
    self.active_connections.contains(&(flow_state, connection))
  }

  pub fn clear_active_connections(&mut self) {
    self.active_connections.clear();
  }

  pub fn is_any_component_running(&self) -> bool {
    self
      .flow_states
      .iter()
      .any(|state| !state.is_finished && state.is_any_component_running())
  }

  /// Whether a pump cycle would do any work.
  pub fn has_pending_work(&self) -> bool {
    !self.is_stopped && !self.debugger.halts_pump() && !self.queue.is_empty()
  }
}
