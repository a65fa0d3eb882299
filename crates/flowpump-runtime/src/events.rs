//! Runtime events and notifiers for observability.
//!
//! Events are emitted as the runtime starts, schedules and executes work, so
//! a UI can follow debugger state and queued tasks without polling.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::debugger::DebuggerState;
use crate::flow_state::FlowStateId;

/// Events emitted by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuntimeEvent {
  /// The runtime has started its root flows.
  Started { project: String },

  /// The debugger state machine moved.
  StateChanged { state: DebuggerState },

  /// A task was appended to the queue.
  TaskQueued {
    flow_state: FlowStateId,
    component_id: String,
  },

  /// A component's unit of work completed or failed.
  ComponentExecuted {
    flow_state: FlowStateId,
    component_id: String,
    error: Option<String>,
  },

  /// A flow state finished.
  FlowFinished {
    flow_state: FlowStateId,
    flow_id: String,
  },

  /// The runtime has stopped.
  Stopped { error: Option<String> },
}

/// Trait for receiving runtime events.
pub trait EventNotifier: Send + Sync {
  fn notify(&self, event: RuntimeEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl EventNotifier for NoopNotifier {
  fn notify(&self, _event: RuntimeEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Unbounded so a slow consumer never stalls the pump.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<RuntimeEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<RuntimeEvent>) -> Self {
    Self { sender }
  }
}

impl EventNotifier for ChannelNotifier {
  fn notify(&self, event: RuntimeEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_channel_notifier_delivers() {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let notifier = ChannelNotifier::new(sender);

    notifier.notify(RuntimeEvent::Stopped { error: None });

    assert_eq!(
      receiver.try_recv().unwrap(),
      RuntimeEvent::Stopped { error: None }
    );
  }

  #[test]
  fn test_channel_notifier_ignores_closed_receiver() {
    let (sender, receiver) = mpsc::unbounded_channel();
    drop(receiver);
    ChannelNotifier::new(sender).notify(RuntimeEvent::Stopped { error: None });
  }
}
