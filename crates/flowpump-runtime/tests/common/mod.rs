//! Shared fixtures for runtime integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use flowpump_graph::Project;
use flowpump_runtime::{
  ComponentError, ComponentExecutor, Execution, ExecutionContext, ExecutorRegistry, Runtime,
  RuntimeConfig,
};

pub fn project(value: serde_json::Value) -> Arc<Project> {
  let def = serde_json::from_value(value).expect("invalid project definition");
  Arc::new(Project::from_def(def).expect("invalid project graph"))
}

pub fn runtime(value: serde_json::Value) -> Runtime {
  runtime_with(value, ExecutorRegistry::with_builtins(), RuntimeConfig::default())
}

pub fn runtime_with(
  value: serde_json::Value,
  registry: ExecutorRegistry,
  config: RuntimeConfig,
) -> Runtime {
  Runtime::new(project(value), registry, config)
}

pub fn has_label(runtime: &Runtime, label: &str) -> bool {
  runtime.logs().labels().iter().any(|l| l == label)
}

/// Fails every time with the configured message.
pub struct FailExecutor(pub &'static str);

#[async_trait]
impl ComponentExecutor for FailExecutor {
  async fn execute(&self, _ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    Err(ComponentError::new(self.0))
  }
}

/// Counts runs and the peak number of overlapping runs.
#[derive(Default)]
pub struct OverlapExecutor {
  pub runs: Arc<AtomicUsize>,
  pub in_flight: Arc<AtomicUsize>,
  pub peak: Arc<AtomicUsize>,
}

#[async_trait]
impl ComponentExecutor for OverlapExecutor {
  async fn execute(&self, _ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(current, Ordering::SeqCst);
    tokio::task::yield_now().await;
    self.in_flight.fetch_sub(1, Ordering::SeqCst);
    self.runs.fetch_add(1, Ordering::SeqCst);
    Ok(Execution::Continue)
  }
}

/// Retains a handle whose disposal is counted.
#[derive(Default)]
pub struct RetainExecutor {
  pub disposed: Arc<AtomicUsize>,
}

#[async_trait]
impl ComponentExecutor for RetainExecutor {
  async fn execute(&self, _ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let disposed = self.disposed.clone();
    Ok(Execution::Retain(Box::new(move || {
      disposed.fetch_add(1, Ordering::SeqCst);
    })))
  }
}
