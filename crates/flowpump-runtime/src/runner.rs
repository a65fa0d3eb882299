//! Runtime runner with channel-based commands.
//!
//! The `RuntimeRunner` owns the `Runtime` and an mpsc channel. UI handlers,
//! timers and other embedders send [`RuntimeCommand`]s. The runner applies
//! them between pump cycles and while a component's unit of work is
//! suspended, so input can arrive during a long-running component while the
//! runtime is still only ever touched by one task.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::debugger::DebuggerAction;
use crate::driver::CompletedRun;
use crate::error::RuntimeError;
use crate::events::{EventNotifier, NoopNotifier};
use crate::flow_state::FlowStateId;
use crate::runtime::Runtime;

/// Requests delivered to a running runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RuntimeCommand {
  /// Deliver a value to a component input.
  SetInput {
    flow_state: FlowStateId,
    component_id: String,
    input: String,
    value: Value,
  },
  /// Trigger a widget's action.
  WidgetAction {
    flow_state: FlowStateId,
    widget_id: String,
    value: Value,
  },
  Debugger { action: DebuggerAction },
  ToggleDebugger,
  AddBreakpoint {
    flow_id: String,
    component_id: String,
  },
  RemoveBreakpoint {
    flow_id: String,
    component_id: String,
  },
  EnableBreakpoint {
    flow_id: String,
    component_id: String,
  },
  DisableBreakpoint {
    flow_id: String,
    component_id: String,
  },
  Stop,
}

impl<N: EventNotifier> Runtime<N> {
  /// Apply one command.
  pub fn apply_command(&mut self, command: RuntimeCommand) -> Result<(), RuntimeError> {
    match command {
      RuntimeCommand::SetInput {
        flow_state,
        component_id,
        input,
        value,
      } => self.deliver_input(flow_state, &component_id, &input, value),
      RuntimeCommand::WidgetAction {
        flow_state,
        widget_id,
        value,
      } => self.execute_widget_action(flow_state, &widget_id, value),
      RuntimeCommand::Debugger { action } => {
        self.transition(action);
        Ok(())
      }
      RuntimeCommand::ToggleDebugger => {
        self.toggle_debugger();
        Ok(())
      }
      RuntimeCommand::AddBreakpoint {
        flow_id,
        component_id,
      } => {
        self.add_breakpoint(&flow_id, &component_id);
        Ok(())
      }
      RuntimeCommand::RemoveBreakpoint {
        flow_id,
        component_id,
      } => {
        self.remove_breakpoint(&flow_id, &component_id);
        Ok(())
      }
      RuntimeCommand::EnableBreakpoint {
        flow_id,
        component_id,
      } => {
        self.enable_breakpoint(&flow_id, &component_id);
        Ok(())
      }
      RuntimeCommand::DisableBreakpoint {
        flow_id,
        component_id,
      } => {
        self.disable_breakpoint(&flow_id, &component_id);
        Ok(())
      }
      RuntimeCommand::Stop => {
        self.stop_runtime();
        Ok(())
      }
    }
  }
}

/// A runner that pumps a runtime and applies commands as they arrive.
///
/// # Usage
///
/// ```ignore
/// let runner = RuntimeRunner::new(runtime);
///
/// // Get sender for UI events
/// let sender = runner.sender();
///
/// // Start the pump loop
/// let cancel = CancellationToken::new();
/// let runtime = runner.start(cancel).await?;
/// ```
pub struct RuntimeRunner<N: EventNotifier = NoopNotifier> {
  sender: mpsc::Sender<RuntimeCommand>,
  receiver: mpsc::Receiver<RuntimeCommand>,
  runtime: Runtime<N>,
}

impl<N: EventNotifier> RuntimeRunner<N> {
  /// Create a new runner.
  pub fn new(runtime: Runtime<N>) -> Self {
    Self::with_buffer_size(runtime, 100)
  }

  /// Create a new runner with a custom command buffer size.
  pub fn with_buffer_size(runtime: Runtime<N>, buffer_size: usize) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      runtime,
    }
  }

  /// Get a sender handle for commands.
  pub fn sender(&self) -> mpsc::Sender<RuntimeCommand> {
    self.sender.clone()
  }

  /// Send a command through the runner's own channel.
  pub async fn send(&self, command: RuntimeCommand) -> Result<(), RuntimeError> {
    self
      .sender
      .send(command)
      .await
      .map_err(|_| RuntimeError::ChannelClosed)
  }

  pub fn runtime(&self) -> &Runtime<N> {
    &self.runtime
  }

  pub fn runtime_mut(&mut self) -> &mut Runtime<N> {
    &mut self.runtime
  }

  /// Start the runtime if needed and pump until stopped or cancelled.
  ///
  /// Pending commands are drained before every cycle and served while a
  /// component's unit of work is suspended. When there is no runnable work
  /// the loop waits for a command. The stopped runtime is returned so its
  /// logs and error stay inspectable.
  pub async fn start(mut self, cancel: CancellationToken) -> Result<Runtime<N>, RuntimeError> {
    if !self.runtime.is_started() {
      self.runtime.start().await?;
    }
    info!(project = %self.runtime.project().name, "starting runtime runner");

    loop {
      while let Ok(command) = self.receiver.try_recv() {
        self.apply(command);
      }

      if self.runtime.is_stopped() {
        info!("runtime runner stopped");
        break;
      }

      if self.runtime.has_pending_work() {
        if cancel.is_cancelled() {
          info!("runtime runner cancelled");
          break;
        }
        self.pump_cycle(&cancel).await;
        tokio::task::yield_now().await;
        continue;
      }

      tokio::select! {
        _ = cancel.cancelled() => {
          info!("runtime runner cancelled");
          break;
        }
        command = self.receiver.recv() => {
          match command {
            Some(command) => self.apply(command),
            None => {
              // Unreachable while we hold a sender
              info!("runtime runner channel closed");
              break;
            }
          }
        }
      }
    }

    self.runtime.stop().await;
    Ok(self.runtime)
  }

  /// One pump cycle, applying commands while a unit of work is suspended.
  ///
  /// A stop or cancellation during a suspension waits up to `stop_timeout`
  /// for the unit to return. A unit still suspended after that is dropped.
  async fn pump_cycle(&mut self, cancel: &CancellationToken) {
    let Some(mut cycle) = self.runtime.begin_cycle() else {
      return;
    };
    let stop_timeout = self.runtime.config().stop_timeout;

    while let Some(pending) = self.runtime.next_run(&mut cycle) {
      let execution = pending.execute();
      tokio::pin!(execution);

      let completed = loop {
        tokio::select! {
          completed = &mut execution => break Some(completed),
          _ = cancel.cancelled() => {
            info!("runtime runner cancelled");
            self.runtime.stop_runtime();
            break wait_for_suspended(stop_timeout, execution.as_mut()).await;
          }
          Some(command) = self.receiver.recv() => {
            self.apply(command);
            if self.runtime.is_stopped() {
              break wait_for_suspended(stop_timeout, execution.as_mut()).await;
            }
          }
        }
      };

      match completed {
        Some(completed) => self.runtime.complete_run(&mut cycle, completed),
        None => break,
      }
    }

    self.runtime.end_cycle(cycle);
  }

  fn apply(&mut self, command: RuntimeCommand) {
    if let Err(e) = self.runtime.apply_command(command) {
      warn!(error = %e, "runtime command failed");
    }
  }
}

/// Await a suspended unit of work for at most `timeout`.
async fn wait_for_suspended<F>(timeout: Duration, execution: Pin<&mut F>) -> Option<CompletedRun>
where
  F: Future<Output = CompletedRun>,
{
  match tokio::time::timeout(timeout, execution).await {
    Ok(completed) => Some(completed),
    Err(_) => {
      warn!(timeout_ms = timeout.as_millis() as u64, "stop_timeout_elapsed");
      None
    }
  }
}
