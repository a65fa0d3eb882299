//! Runtime error types.

use std::path::PathBuf;

use crate::flow_state::FlowStateId;

/// Errors raised by the runtime itself.
///
/// Component failures are not runtime errors: they are [`ComponentError`]s
/// and go through catch-error resolution instead.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// `start` was called twice.
  #[error("runtime already started")]
  AlreadyStarted,

  /// The runtime has been stopped.
  #[error("runtime is stopped")]
  Stopped,

  /// Unknown flow state id.
  #[error("flow state {0} not found")]
  FlowStateNotFound(FlowStateId),

  /// Unknown component id.
  #[error("component '{component}' not found in flow '{flow_id}'")]
  ComponentNotFound { flow_id: String, component: String },

  /// Unknown input on an existing component.
  #[error("input '{input}' not found on component '{component}' in flow '{flow_id}'")]
  InputNotFound {
    flow_id: String,
    component: String,
    input: String,
  },

  /// The runner's command channel is closed.
  #[error("runtime runner channel closed")]
  ChannelClosed,

  /// Invoked action does not exist.
  #[error("action '{0}' not found")]
  ActionNotFound(String),

  /// Invoked action has no start component.
  #[error("no start component in action '{flow_id}'")]
  NoStartComponent { flow_id: String },

  /// Assignment target resolves to nothing writable.
  #[error("Not an assignable expression: '{target}'")]
  NotAssignable { target: String },

  /// Settings file could not be read or written.
  #[error("settings i/o failed for {}: {source}", path.display())]
  SettingsIo {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Settings file is not valid JSON.
  #[error("invalid settings file {}: {source}", path.display())]
  SettingsFormat {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// A variable type hook failed.
  #[error("variable hook failed for '{name}': {message}")]
  VariableHook { name: String, message: String },
}

/// Failure of a component's unit of work.
///
/// The carried value is what catch handlers receive on their `message` input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ComponentError {
  message: String,
  value: serde_json::Value,
}

impl ComponentError {
  /// Create an error whose value is the message itself.
  pub fn new(message: impl Into<String>) -> Self {
    let message = message.into();
    Self {
      value: serde_json::Value::String(message.clone()),
      message,
    }
  }

  /// Create an error carrying an arbitrary value.
  pub fn with_value(message: impl Into<String>, value: serde_json::Value) -> Self {
    Self {
      message: message.into(),
      value,
    }
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn value(&self) -> &serde_json::Value {
    &self.value
  }
}

impl From<RuntimeError> for ComponentError {
  fn from(err: RuntimeError) -> Self {
    Self::new(err.to_string())
  }
}
