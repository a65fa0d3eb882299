//! Runtime settings side file.
//!
//! Settings are a JSON object stored next to the project file at
//! `<project path>-runtime-settings`. Persistent variables are kept under the
//! [`PERSISTENT_VARIABLES_KEY`] entry.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::RuntimeError;

pub const PERSISTENT_VARIABLES_KEY: &str = "__persistentVariables";

const SETTINGS_SUFFIX: &str = "-runtime-settings";

/// Path of the settings side file for a project file.
pub fn settings_path(project_path: &Path) -> PathBuf {
  let mut path = project_path.as_os_str().to_os_string();
  path.push(SETTINGS_SUFFIX);
  PathBuf::from(path)
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeSettings {
  path: Option<PathBuf>,
  values: Map<String, Value>,
}

impl RuntimeSettings {
  /// Settings that are never persisted.
  pub fn in_memory() -> Self {
    Self::default()
  }

  /// Load settings, falling back to defaults on any failure.
  ///
  /// A missing file is normal on first run. An unreadable or corrupt file is
  /// logged and ignored.
  pub async fn load(path: Option<PathBuf>) -> Self {
    let Some(path) = path else {
      return Self::in_memory();
    };

    match Self::try_load(&path).await {
      Ok(settings) => settings,
      Err(RuntimeError::SettingsIo { source, .. })
        if source.kind() == std::io::ErrorKind::NotFound =>
      {
        debug!(path = %path.display(), "settings_file_missing");
        Self {
          path: Some(path),
          values: Map::new(),
        }
      }
      Err(e) => {
        warn!(path = %path.display(), error = %e, "settings_load_failed");
        Self {
          path: Some(path),
          values: Map::new(),
        }
      }
    }
  }

  pub async fn try_load(path: &Path) -> Result<Self, RuntimeError> {
    let data = tokio::fs::read_to_string(path)
      .await
      .map_err(|source| RuntimeError::SettingsIo {
        path: path.to_path_buf(),
        source,
      })?;

    let values = match serde_json::from_str::<Value>(&data) {
      Ok(Value::Object(values)) => values,
      Ok(_) => Map::new(),
      Err(source) => {
        return Err(RuntimeError::SettingsFormat {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    Ok(Self {
      path: Some(path.to_path_buf()),
      values,
    })
  }

  /// Write the settings file. No-op for in-memory settings.
  pub async fn save(&self) -> Result<(), RuntimeError> {
    let Some(path) = &self.path else {
      return Ok(());
    };

    let data = serde_json::to_string_pretty(&self.values).map_err(|source| {
      RuntimeError::SettingsFormat {
        path: path.clone(),
        source,
      }
    })?;

    tokio::fs::write(path, data)
      .await
      .map_err(|source| RuntimeError::SettingsIo {
        path: path.clone(),
        source,
      })
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  pub fn read(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn write(&mut self, key: impl Into<String>, value: Value) {
    self.values.insert(key.into(), value);
  }

  pub fn persistent_variables(&self) -> Option<&Map<String, Value>> {
    self
      .values
      .get(PERSISTENT_VARIABLES_KEY)
      .and_then(Value::as_object)
  }

  pub fn set_persistent_variables(&mut self, variables: Map<String, Value>) {
    self
      .values
      .insert(PERSISTENT_VARIABLES_KEY.to_string(), Value::Object(variables));
  }
}
