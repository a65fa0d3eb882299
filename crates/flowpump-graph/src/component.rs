use flowpump_config::{ComponentDef, ComponentKindDef};
use serde::{Deserialize, Serialize};

use crate::{ERROR_OUTPUT, MESSAGE, SEQIN, SEQOUT};

/// Component variant. Readiness and scheduling rules switch on this tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKind {
  Widget { action: Option<String> },
  Action { executor: String },
  Start,
  Input,
  Output,
  Error,
  CatchError,
  CallAction { action: String },
}

impl ComponentKind {
  pub fn is_widget(&self) -> bool {
    matches!(self, Self::Widget { .. })
  }

  pub fn is_start(&self) -> bool {
    matches!(self, Self::Start)
  }

  pub fn is_input(&self) -> bool {
    matches!(self, Self::Input)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, Self::Error)
  }

  pub fn is_catch_error(&self) -> bool {
    matches!(self, Self::CatchError)
  }

  pub fn is_call_action(&self) -> bool {
    matches!(self, Self::CallAction { .. })
  }

  /// Short variant name used in logs.
  pub fn name(&self) -> &'static str {
    match self {
      Self::Widget { .. } => "widget",
      Self::Action { .. } => "action",
      Self::Start => "start",
      Self::Input => "input",
      Self::Output => "output",
      Self::Error => "error",
      Self::CatchError => "catch_error",
      Self::CallAction { .. } => "call_action",
    }
  }
}

impl From<ComponentKindDef> for ComponentKind {
  fn from(def: ComponentKindDef) -> Self {
    match def {
      ComponentKindDef::Widget { action } => Self::Widget { action },
      ComponentKindDef::Action { executor } => Self::Action { executor },
      ComponentKindDef::Start => Self::Start,
      ComponentKindDef::Input => Self::Input,
      ComponentKindDef::Output => Self::Output,
      ComponentKindDef::Error => Self::Error,
      ComponentKindDef::CatchError => Self::CatchError,
      ComponentKindDef::CallAction { action } => Self::CallAction { action },
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
  Sequence,
  Data { optional: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
  pub name: String,
  pub kind: InputKind,
}

impl Input {
  pub fn sequence(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      kind: InputKind::Sequence,
    }
  }

  pub fn data(name: impl Into<String>, optional: bool) -> Self {
    Self {
      name: name.into(),
      kind: InputKind::Data { optional },
    }
  }

  pub fn is_sequence(&self) -> bool {
    matches!(self.kind, InputKind::Sequence)
  }

  pub fn is_mandatory(&self) -> bool {
    matches!(self.kind, InputKind::Data { optional: false })
  }
}

/// A node of a flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
  pub id: String,
  pub label: Option<String>,
  pub kind: ComponentKind,
  pub inputs: Vec<Input>,
  pub outputs: Vec<String>,
  pub executable: bool,
  pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Component {
  /// Build a component from its definition, materializing implicit terminals.
  pub fn from_def(def: ComponentDef) -> Self {
    let kind = ComponentKind::from(def.kind);

    let mut inputs = Vec::with_capacity(def.inputs.len() + 2);
    if !kind.is_input() {
      inputs.push(Input::sequence(SEQIN));
    }
    for input in def.inputs {
      if input.name != SEQIN {
        inputs.push(Input::data(input.name, input.optional));
      }
    }

    let mut outputs = vec![SEQOUT.to_string(), ERROR_OUTPUT.to_string()];
    for output in def.outputs {
      if !outputs.contains(&output) {
        outputs.push(output);
      }
    }

    // Terminals the builtin variants always carry.
    match kind {
      ComponentKind::CatchError => {
        ensure_input(&mut inputs, Input::data(MESSAGE, true));
        ensure_output(&mut outputs, MESSAGE);
      }
      ComponentKind::Error => ensure_input(&mut inputs, Input::data(MESSAGE, false)),
      ComponentKind::Output => ensure_input(&mut inputs, Input::data("value", false)),
      _ => {}
    }

    Self {
      id: def.component_id,
      label: def.label,
      kind,
      inputs,
      outputs,
      executable: def.executable,
      properties: def.properties,
    }
  }

  /// Human readable label, falling back to the id.
  pub fn display_name(&self) -> &str {
    self.label.as_deref().unwrap_or(&self.id)
  }

  pub fn input(&self, name: &str) -> Option<&Input> {
    self.inputs.iter().find(|input| input.name == name)
  }

  pub fn has_output(&self, name: &str) -> bool {
    self.outputs.iter().any(|output| output == name)
  }

  pub fn sequence_inputs(&self) -> impl Iterator<Item = &Input> {
    self.inputs.iter().filter(|input| input.is_sequence())
  }

  pub fn mandatory_data_inputs(&self) -> impl Iterator<Item = &Input> {
    self.inputs.iter().filter(|input| input.is_mandatory())
  }

  /// Look up a configuration property.
  pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
    self.properties.get(name)
  }
}

fn ensure_input(inputs: &mut Vec<Input>, input: Input) {
  if !inputs.iter().any(|existing| existing.name == input.name) {
    inputs.push(input);
  }
}

fn ensure_output(outputs: &mut Vec<String>, output: &str) {
  if !outputs.iter().any(|existing| existing == output) {
    outputs.push(output.to_string());
  }
}
