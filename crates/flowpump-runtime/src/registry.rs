use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use flowpump_graph::{Component, ComponentKind};

use crate::builtin::{
  CallActionExecutor, CatchErrorExecutor, CompareExecutor, ConstantExecutor, DelayExecutor,
  ErrorExecutor, LogExecutor, NoopExecutor, OutputExecutor, SetVariableExecutor, StartExecutor,
};
use crate::executor::ComponentExecutor;

/// Resolves the unit of work for each component.
///
/// `action` components are resolved by their executor name. Widgets may
/// name an executor through their `executor` property and otherwise use the
/// widget default. Every other variant uses its kind default.
#[derive(Clone)]
pub struct ExecutorRegistry {
  named: HashMap<String, Arc<dyn ComponentExecutor>>,
  defaults: HashMap<&'static str, Arc<dyn ComponentExecutor>>,
}

impl fmt::Debug for ExecutorRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut named: Vec<_> = self.named.keys().collect();
    named.sort();
    f.debug_struct("ExecutorRegistry")
      .field("named", &named)
      .finish()
  }
}

impl Default for ExecutorRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl ExecutorRegistry {
  /// A registry with kind defaults and no named executors.
  pub fn new() -> Self {
    let mut defaults: HashMap<&'static str, Arc<dyn ComponentExecutor>> = HashMap::new();
    defaults.insert("start", Arc::new(StartExecutor));
    defaults.insert("widget", Arc::new(NoopExecutor));
    defaults.insert("input", Arc::new(NoopExecutor));
    defaults.insert("output", Arc::new(OutputExecutor));
    defaults.insert("error", Arc::new(ErrorExecutor));
    defaults.insert("catch_error", Arc::new(CatchErrorExecutor));
    defaults.insert("call_action", Arc::new(CallActionExecutor));

    Self {
      named: HashMap::new(),
      defaults,
    }
  }

  /// A registry with kind defaults plus the builtin named executors.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry.register("log", LogExecutor);
    registry.register("constant", ConstantExecutor);
    registry.register("set_variable", SetVariableExecutor);
    registry.register("delay", DelayExecutor);
    registry.register("compare", CompareExecutor);
    registry.register("noop", NoopExecutor);
    registry
  }

  /// Register (or replace) a named executor.
  pub fn register(&mut self, name: impl Into<String>, executor: impl ComponentExecutor + 'static) {
    self.named.insert(name.into(), Arc::new(executor));
  }

  /// Replace the default executor of a component kind, e.g. `"widget"`.
  pub fn register_default(
    &mut self,
    kind: &'static str,
    executor: impl ComponentExecutor + 'static,
  ) {
    self.defaults.insert(kind, Arc::new(executor));
  }

  pub fn contains(&self, name: &str) -> bool {
    self.named.contains_key(name)
  }

  pub fn resolve(&self, component: &Component) -> Option<Arc<dyn ComponentExecutor>> {
    match &component.kind {
      ComponentKind::Action { executor } => self.named.get(executor).cloned(),
      ComponentKind::Widget { .. } => match component
        .property("executor")
        .and_then(serde_json::Value::as_str)
      {
        Some(name) => self.named.get(name).cloned(),
        None => self.defaults.get(component.kind.name()).cloned(),
      },
      kind => self.defaults.get(kind.name()).cloned(),
    }
  }
}
