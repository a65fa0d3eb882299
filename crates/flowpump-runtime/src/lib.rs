//! Flowpump Runtime
//!
//! This crate executes the flows of a loaded `flowpump-graph` project.
//! Components become runnable when their inputs are satisfied, values travel
//! along connections, errors are routed to catch handlers, and actions run as
//! nested sub-flows.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RuntimeRunner                          │
//! │  - owns mpsc channel of RuntimeCommand                      │
//! │  - start(cancel) pumps cycles, applies commands in between  │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Runtime                             │
//! │  - task queue + pump cycle, debugger, breakpoints           │
//! │  - readiness, propagation, catch resolution, actions        │
//! │  - flow state arena, log sink, settings, variables          │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ComponentExecutor                        │
//! │  - resolved through ExecutorRegistry                        │
//! │  - records effects on an ExecutionContext                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use flowpump_runtime::{ExecutorRegistry, Runtime, RuntimeConfig, RuntimeRunner};
//! use tokio_util::sync::CancellationToken;
//!
//! let runtime = Runtime::new(project, ExecutorRegistry::with_builtins(), RuntimeConfig::default());
//! let runner = RuntimeRunner::new(runtime);
//! let sender = runner.sender();
//!
//! let runtime = runner.start(CancellationToken::new()).await?;
//! for label in runtime.logs().labels() {
//!     println!("{label}");
//! }
//! ```

mod actions;
mod builtin;
mod catch;
mod component_state;
mod debugger;
mod driver;
mod error;
mod events;
mod executor;
mod flow_state;
mod logs;
mod propagation;
mod queue;
mod readiness;
mod registry;
mod runner;
mod runtime;
mod scheduler;
mod settings;
mod variables;

pub use builtin::{
  CallActionExecutor, CatchErrorExecutor, CompareExecutor, ConstantExecutor, DelayExecutor,
  ErrorExecutor, LogExecutor, NoopExecutor, OutputExecutor, SetVariableExecutor, StartExecutor,
};
pub use component_state::ComponentState;
pub use debugger::{Debugger, DebuggerAction, DebuggerState};
pub use driver::FLOW_ALREADY_COMPLETED;
pub use error::{ComponentError, RuntimeError};
pub use events::{ChannelNotifier, EventNotifier, NoopNotifier, RuntimeEvent};
pub use executor::{ComponentExecutor, Dispose, Effect, Execution, ExecutionContext};
pub use flow_state::{FlowState, FlowStateId, FlowStates};
pub use logs::{LogItem, LogKind, LogLevel, LogSink, MAX_LOG_ITEMS};
pub use queue::{QueueTask, TaskQueue};
pub use registry::ExecutorRegistry;
pub use runner::{RuntimeCommand, RuntimeRunner};
pub use runtime::{Runtime, RuntimeConfig};
pub use settings::{PERSISTENT_VARIABLES_KEY, RuntimeSettings, settings_path};
pub use variables::{VariableHooks, VariableStore};
