//! Debugger state machine and breakpoints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebuggerState {
  Running,
  Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebuggerAction {
  /// Leave debugging and run freely.
  Run,
  /// Enter debugging and halt the pump.
  Pause,
  /// Keep debugging but run freely.
  Resume,
  /// Execute exactly one ready task, then pause.
  SingleStep,
}

/// Identifies a component across flow states of the same flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BreakpointKey {
  flow_id: String,
  component_id: String,
}

impl BreakpointKey {
  fn new(flow_id: &str, component_id: &str) -> Self {
    Self {
      flow_id: flow_id.to_string(),
      component_id: component_id.to_string(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct Debugger {
  state: DebuggerState,
  active: bool,
  single_step: bool,
  /// Breakpoint -> enabled.
  breakpoints: HashMap<BreakpointKey, bool>,
}

impl Default for Debugger {
  fn default() -> Self {
    Self {
      state: DebuggerState::Running,
      active: false,
      single_step: false,
      breakpoints: HashMap::new(),
    }
  }
}

impl Debugger {
  pub fn new() -> Self {
    Self::default()
  }

  /// Apply an action and return the resulting state.
  pub fn transition(&mut self, action: DebuggerAction) -> DebuggerState {
    let (state, active, single_step) = match action {
      DebuggerAction::Run => (DebuggerState::Running, false, false),
      DebuggerAction::Pause => (DebuggerState::Paused, true, false),
      DebuggerAction::Resume => (DebuggerState::Running, true, false),
      DebuggerAction::SingleStep => (DebuggerState::Running, true, true),
    };
    self.state = state;
    self.active = active;
    self.single_step = single_step;
    state
  }

  pub fn state(&self) -> DebuggerState {
    self.state
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn is_paused(&self) -> bool {
    self.state == DebuggerState::Paused
  }

  pub fn is_single_step(&self) -> bool {
    self.single_step
  }

  /// Whether the pump must not do any work.
  pub fn halts_pump(&self) -> bool {
    self.active && self.is_paused()
  }

  pub fn add_breakpoint(&mut self, flow_id: &str, component_id: &str) {
    self
      .breakpoints
      .insert(BreakpointKey::new(flow_id, component_id), true);
  }

  pub fn remove_breakpoint(&mut self, flow_id: &str, component_id: &str) -> bool {
    self
      .breakpoints
      .remove(&BreakpointKey::new(flow_id, component_id))
      .is_some()
  }

  pub fn set_breakpoint_enabled(&mut self, flow_id: &str, component_id: &str, enabled: bool) -> bool {
    match self
      .breakpoints
      .get_mut(&BreakpointKey::new(flow_id, component_id))
    {
      Some(slot) => {
        *slot = enabled;
        true
      }
      None => false,
    }
  }

  pub fn is_breakpoint_enabled(&self, flow_id: &str, component_id: &str) -> bool {
    self
      .breakpoints
      .get(&BreakpointKey::new(flow_id, component_id))
      .copied()
      .unwrap_or(false)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_initial_state() {
    let debugger = Debugger::new();
    assert_eq!(debugger.state(), DebuggerState::Running);
    assert!(!debugger.is_active());
    assert!(!debugger.halts_pump());
  }

  #[test]
  fn test_transitions() {
    let mut debugger = Debugger::new();

    assert_eq!(debugger.transition(DebuggerAction::Pause), DebuggerState::Paused);
    assert!(debugger.is_active());
    assert!(debugger.halts_pump());

    assert_eq!(
      debugger.transition(DebuggerAction::SingleStep),
      DebuggerState::Running
    );
    assert!(debugger.is_single_step());
    assert!(!debugger.halts_pump());

    assert_eq!(debugger.transition(DebuggerAction::Resume), DebuggerState::Running);
    assert!(debugger.is_active());
    assert!(!debugger.is_single_step());

    assert_eq!(debugger.transition(DebuggerAction::Run), DebuggerState::Running);
    assert!(!debugger.is_active());
  }

  #[test]
  fn test_breakpoints() {
    let mut debugger = Debugger::new();
    assert!(!debugger.is_breakpoint_enabled("main", "a"));

    debugger.add_breakpoint("main", "a");
    assert!(debugger.is_breakpoint_enabled("main", "a"));
    assert!(!debugger.is_breakpoint_enabled("other", "a"));

    assert!(debugger.set_breakpoint_enabled("main", "a", false));
    assert!(!debugger.is_breakpoint_enabled("main", "a"));
    assert!(!debugger.set_breakpoint_enabled("main", "missing", true));

    assert!(debugger.remove_breakpoint("main", "a"));
    assert!(!debugger.remove_breakpoint("main", "a"));
  }
}
