//! Global variable store and per-type lifecycle hooks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use flowpump_graph::VariableDef;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::RuntimeError;

/// Lifecycle hooks for variables of a custom type.
///
/// `load` turns a saved value back into a live one at start, `construct`
/// builds a value for a variable that has none, and `save` produces the value
/// written to the settings file at stop. Defaults pass values through.
#[async_trait]
pub trait VariableHooks: Send + Sync {
  async fn load(&self, _variable: &VariableDef, saved: Value) -> Result<Value, RuntimeError> {
    Ok(saved)
  }

  async fn construct(&self, _variable: &VariableDef) -> Result<Value, RuntimeError> {
    Ok(Value::Null)
  }

  async fn save(&self, _variable: &VariableDef, value: &Value) -> Result<Value, RuntimeError> {
    Ok(value.clone())
  }
}

#[derive(Default, Clone)]
pub struct VariableStore {
  declarations: Vec<VariableDef>,
  values: HashMap<String, Value>,
  hooks: HashMap<String, Arc<dyn VariableHooks>>,
}

impl fmt::Debug for VariableStore {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("VariableStore")
      .field("values", &self.values)
      .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
      .finish()
  }
}

impl VariableStore {
  /// Create a store holding each declared variable's default value.
  pub fn new(declarations: &[VariableDef]) -> Self {
    let values = declarations
      .iter()
      .map(|variable| (variable.name.clone(), variable.default_value.clone()))
      .collect();

    Self {
      declarations: declarations.to_vec(),
      values,
      hooks: HashMap::new(),
    }
  }

  /// Install hooks for every variable of `type_name`.
  pub fn register_hooks(&mut self, type_name: impl Into<String>, hooks: impl VariableHooks + 'static) {
    self.hooks.insert(type_name.into(), Arc::new(hooks));
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.values.get(name)
  }

  /// Set a declared global. Returns false for undeclared names.
  pub fn set(&mut self, name: &str, value: Value) -> bool {
    if !self.is_declared(name) {
      return false;
    }
    self.values.insert(name.to_string(), value);
    true
  }

  pub fn is_declared(&self, name: &str) -> bool {
    self.declarations.iter().any(|variable| variable.name == name)
  }

  pub fn values(&self) -> &HashMap<String, Value> {
    &self.values
  }

  fn hooks_for(&self, variable: &VariableDef) -> Option<Arc<dyn VariableHooks>> {
    self.hooks.get(&variable.type_name).cloned()
  }

  /// Restore persistent variables from their saved values.
  pub async fn load_persistent(&mut self, saved: &Map<String, Value>) {
    for variable in self.declarations.clone() {
      if !variable.persistent {
        continue;
      }
      let Some(value) = saved.get(&variable.name).filter(|value| !value.is_null()) else {
        continue;
      };

      let loaded = match self.hooks_for(&variable) {
        Some(hooks) => hooks.load(&variable, value.clone()).await,
        None => Ok(value.clone()),
      };
      match loaded {
        Ok(value) => {
          self.values.insert(variable.name.clone(), value);
        }
        Err(e) => warn!(variable = %variable.name, error = %e, "persistent_variable_load_failed"),
      }
    }
  }

  /// Construct values for custom-typed globals that have none.
  pub async fn construct_globals(&mut self) {
    for variable in self.declarations.clone() {
      if self.get(&variable.name).is_some_and(|value| !value.is_null()) {
        continue;
      }
      let Some(hooks) = self.hooks_for(&variable) else {
        continue;
      };
      match hooks.construct(&variable).await {
        Ok(value) => {
          self.values.insert(variable.name.clone(), value);
        }
        Err(e) => warn!(variable = %variable.name, error = %e, "variable_construct_failed"),
      }
    }
  }

  /// Produce the saved form of every persistent variable with a value.
  pub async fn save_persistent(&self) -> Map<String, Value> {
    let mut saved = Map::new();
    for variable in self.declarations.iter().filter(|variable| variable.persistent) {
      let Some(value) = self.get(&variable.name).filter(|value| !value.is_null()) else {
        continue;
      };
      let result = match self.hooks_for(variable) {
        Some(hooks) => hooks.save(variable, value).await,
        None => Ok(value.clone()),
      };
      match result {
        Ok(value) => {
          saved.insert(variable.name.clone(), value);
        }
        Err(e) => warn!(variable = %variable.name, error = %e, "persistent_variable_save_failed"),
      }
    }
    saved
  }
}
