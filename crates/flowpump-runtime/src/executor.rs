//! The component execution contract.
//!
//! A component's unit of work is a [`ComponentExecutor`]. The runtime hands it
//! an owned [`ExecutionContext`] holding snapshots of the component's inputs
//! and the variables visible from its flow state. Anything the executor wants
//! to do to the graph (emit outputs, assign variables, invoke actions, log) is
//! recorded on the context as an [`Effect`] and applied by the runtime once
//! the executor returns.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use flowpump_graph::{Component, ComponentIndex, Flow};

use crate::error::ComponentError;
use crate::flow_state::FlowStateId;
use crate::logs::LogLevel;

/// A resource handle kept alive between runs of a component.
///
/// Released when the owning flow state finishes.
pub trait Dispose: Send {
  fn dispose(self: Box<Self>);
}

impl<F> Dispose for F
where
  F: FnOnce() + Send,
{
  fn dispose(self: Box<Self>) {
    (*self)()
  }
}

/// How a successful run continues.
pub enum Execution {
  /// Propagate through `@seqout`.
  Continue,
  /// The component emitted its own outputs; no automatic propagation.
  Managed,
  /// Keep a resource handle as the component's disposer, then propagate.
  Retain(Box<dyn Dispose>),
}

impl std::fmt::Debug for Execution {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Continue => write!(f, "Continue"),
      Self::Managed => write!(f, "Managed"),
      Self::Retain(_) => write!(f, "Retain(..)"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
  Propagate {
    output: String,
    value: serde_json::Value,
  },
  Assign {
    target: String,
    value: serde_json::Value,
  },
  Log {
    level: LogLevel,
    message: String,
  },
  InvokeAction {
    action: String,
    value: serde_json::Value,
  },
  /// Emit through an output of the component that invoked this flow.
  ForwardToCaller {
    output: String,
    value: serde_json::Value,
  },
}

/// A component's unit of work.
#[async_trait]
pub trait ComponentExecutor: Send + Sync {
  async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Execution, ComponentError>;
}

pub struct ExecutionContext {
  flow_state: FlowStateId,
  flow: Arc<Flow>,
  component: ComponentIndex,
  inputs: HashMap<String, serde_json::Value>,
  variables: HashMap<String, serde_json::Value>,
  disposer: Option<Box<dyn Dispose>>,
  effects: Vec<Effect>,
}

impl ExecutionContext {
  pub fn new(
    flow_state: FlowStateId,
    flow: Arc<Flow>,
    component: ComponentIndex,
    inputs: HashMap<String, serde_json::Value>,
    variables: HashMap<String, serde_json::Value>,
    disposer: Option<Box<dyn Dispose>>,
  ) -> Self {
    Self {
      flow_state,
      flow,
      component,
      inputs,
      variables,
      disposer,
      effects: Vec::new(),
    }
  }

  pub fn flow_state(&self) -> FlowStateId {
    self.flow_state
  }

  pub fn flow(&self) -> &Flow {
    &self.flow
  }

  pub fn component(&self) -> &Component {
    self.flow.component(self.component)
  }

  pub fn component_index(&self) -> ComponentIndex {
    self.component
  }

  pub fn input(&self, name: &str) -> Option<&serde_json::Value> {
    self.inputs.get(name)
  }

  /// Value of a mandatory input, failing the run when it is missing.
  pub fn required_input(&self, name: &str) -> Result<&serde_json::Value, ComponentError> {
    self
      .input(name)
      .ok_or_else(|| ComponentError::new(format!("missing input '{name}'")))
  }

  pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
    self.component().property(name)
  }

  pub fn string_property(&self, name: &str) -> Result<&str, ComponentError> {
    self
      .property(name)
      .and_then(serde_json::Value::as_str)
      .ok_or_else(|| ComponentError::new(format!("property '{name}' must be a string")))
  }

  /// A variable visible from this flow state: locals shadow globals.
  pub fn variable(&self, name: &str) -> Option<&serde_json::Value> {
    self.variables.get(name)
  }

  pub fn propagate_value(&mut self, output: impl Into<String>, value: serde_json::Value) {
    self.effects.push(Effect::Propagate {
      output: output.into(),
      value,
    });
  }

  pub fn assign_value(&mut self, target: impl Into<String>, value: serde_json::Value) {
    self.effects.push(Effect::Assign {
      target: target.into(),
      value,
    });
  }

  pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
    self.effects.push(Effect::Log {
      level,
      message: message.into(),
    });
  }

  pub fn invoke_action(&mut self, action: impl Into<String>, value: serde_json::Value) {
    self.effects.push(Effect::InvokeAction {
      action: action.into(),
      value,
    });
  }

  pub fn forward_to_caller(&mut self, output: impl Into<String>, value: serde_json::Value) {
    self.effects.push(Effect::ForwardToCaller {
      output: output.into(),
      value,
    });
  }

  /// Take the handle retained by the previous run.
  ///
  /// A handle left in place is kept for the next run.
  pub fn take_disposer(&mut self) -> Option<Box<dyn Dispose>> {
    self.disposer.take()
  }

  pub fn effects(&self) -> &[Effect] {
    &self.effects
  }

  pub(crate) fn into_parts(mut self) -> (Vec<Effect>, Option<Box<dyn Dispose>>) {
    (std::mem::take(&mut self.effects), self.disposer.take())
  }
}

/// A run abandoned before it returned still releases the handle it held.
impl Drop for ExecutionContext {
  fn drop(&mut self) {
    if let Some(disposer) = self.disposer.take() {
      disposer.dispose();
    }
  }
}
