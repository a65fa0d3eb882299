use std::collections::{HashMap, HashSet};
use std::fmt;

use flowpump_config::{FlowDef, VariableDef};
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::{ERROR_OUTPUT, SEQIN};

/// Position of a component inside its flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentIndex(pub usize);

impl fmt::Display for ComponentIndex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Position of a connection inside its flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionIndex(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
  /// Runs indefinitely while the runtime is up.
  Page,
  /// Invoked on demand; finishes when its active work drains.
  Action,
}

/// A resolved connection. Both endpoints live in the same flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
  pub source: ComponentIndex,
  pub output: String,
  pub target: ComponentIndex,
  pub input: String,
}

/// An immutable flow graph: a page or an action body.
#[derive(Debug, Clone)]
pub struct Flow {
  pub flow_id: String,
  pub name: String,
  pub kind: FlowKind,
  pub components: Vec<Component>,
  pub connections: Vec<Connection>,
  pub local_variables: Vec<VariableDef>,
  pub used_as_custom_widget: bool,
  by_id: HashMap<String, ComponentIndex>,
  graph: Graph,
}

impl Flow {
  /// Validate a flow definition and build its lookup indices.
  pub fn from_def(def: FlowDef, kind: FlowKind) -> Result<Self, GraphError> {
    let flow_id = def.flow_id;

    let mut by_id = HashMap::with_capacity(def.components.len());
    let mut components = Vec::with_capacity(def.components.len());
    for (index, component_def) in def.components.into_iter().enumerate() {
      let component = Component::from_def(component_def);
      if by_id
        .insert(component.id.clone(), ComponentIndex(index))
        .is_some()
      {
        return Err(GraphError::DuplicateComponent {
          flow: flow_id,
          component: component.id,
        });
      }
      components.push(component);
    }

    let resolve = |id: &str| {
      by_id
        .get(id)
        .copied()
        .ok_or_else(|| GraphError::UnknownComponent {
          flow: flow_id.clone(),
          component: id.to_string(),
        })
    };

    let mut connections = Vec::with_capacity(def.connections.len());
    for connection in def.connections {
      let source = resolve(&connection.source)?;
      let target = resolve(&connection.target)?;

      if !components[source.0].has_output(&connection.output) {
        return Err(GraphError::UnknownOutput {
          flow: flow_id.clone(),
          component: connection.source,
          output: connection.output,
        });
      }
      if components[target.0].input(&connection.input).is_none() {
        return Err(GraphError::UnknownInput {
          flow: flow_id.clone(),
          component: connection.target,
          input: connection.input,
        });
      }

      connections.push(Connection {
        source,
        output: connection.output,
        target,
        input: connection.input,
      });
    }

    let graph = Graph::new(&connections);

    Ok(Self {
      name: def.name.unwrap_or_else(|| flow_id.clone()),
      flow_id,
      kind,
      components,
      connections,
      local_variables: def.local_variables,
      used_as_custom_widget: def.used_as_custom_widget,
      by_id,
      graph,
    })
  }

  pub fn is_action(&self) -> bool {
    self.kind == FlowKind::Action
  }

  pub fn component(&self, index: ComponentIndex) -> &Component {
    &self.components[index.0]
  }

  pub fn connection(&self, index: ConnectionIndex) -> &Connection {
    &self.connections[index.0]
  }

  /// Find a component by its stable id.
  pub fn find_component(&self, id: &str) -> Option<ComponentIndex> {
    self.by_id.get(id).copied()
  }

  /// Iterate components in declaration order.
  pub fn component_indices(&self) -> impl Iterator<Item = ComponentIndex> + '_ {
    (0..self.components.len()).map(ComponentIndex)
  }

  /// Connections leaving `output` of `source` that reach a target.
  pub fn connections_from<'a>(
    &'a self,
    source: ComponentIndex,
    output: &'a str,
  ) -> impl Iterator<Item = (ConnectionIndex, &'a Connection)> + 'a {
    self
      .graph
      .outgoing(source)
      .iter()
      .map(move |index| (*index, self.connection(*index)))
      .filter(move |(_, connection)| connection.output == output)
  }

  /// Connections entering `input` of `target`.
  pub fn connections_into<'a>(
    &'a self,
    target: ComponentIndex,
    input: &'a str,
  ) -> impl Iterator<Item = (ConnectionIndex, &'a Connection)> + 'a {
    self
      .graph
      .incoming(target)
      .iter()
      .map(move |index| (*index, self.connection(*index)))
      .filter(move |(_, connection)| connection.input == input)
  }

  /// Names of sequence inputs of `target` that have at least one incoming edge.
  pub fn connected_sequence_inputs(&self, target: ComponentIndex) -> HashSet<String> {
    let component = self.component(target);
    self
      .graph
      .incoming(target)
      .iter()
      .map(|index| &self.connection(*index).input)
      .filter(|input| component.input(input).is_some_and(|i| i.is_sequence()))
      .cloned()
      .collect()
  }

  /// Whether `@seqin` of `target` is wired.
  pub fn has_seqin_connection(&self, target: ComponentIndex) -> bool {
    self.connections_into(target, SEQIN).next().is_some()
  }

  /// Whether `@error` of `source` reaches any target.
  pub fn has_error_connection(&self, source: ComponentIndex) -> bool {
    self.connections_from(source, ERROR_OUTPUT).next().is_some()
  }

  /// The first start component, if any.
  pub fn find_start(&self) -> Option<ComponentIndex> {
    self.find_kind(|component| component.kind.is_start())
  }

  /// The first catch-error component, if any.
  pub fn find_catch_error(&self) -> Option<ComponentIndex> {
    self.find_kind(|component| component.kind.is_catch_error())
  }

  /// All input parameter components.
  pub fn input_components(&self) -> impl Iterator<Item = ComponentIndex> + '_ {
    self
      .component_indices()
      .filter(|index| self.component(*index).kind.is_input())
  }

  fn find_kind(&self, predicate: impl Fn(&Component) -> bool) -> Option<ComponentIndex> {
    self
      .components
      .iter()
      .position(predicate)
      .map(ComponentIndex)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::SEQOUT;
  use serde_json::json;

  fn flow(value: serde_json::Value) -> Result<Flow, GraphError> {
    Flow::from_def(serde_json::from_value(value).unwrap(), FlowKind::Action)
  }

  fn sample() -> Flow {
    flow(json!({
      "flow_id": "f",
      "components": [
        { "component_id": "start", "type": "start" },
        { "component_id": "a", "type": "action", "executor": "log", "inputs": [{ "name": "x" }] },
        { "component_id": "b", "type": "action", "executor": "log" },
        { "component_id": "catch", "type": "catch_error" }
      ],
      "connections": [
        { "source": "start", "output": "@seqout", "target": "a", "input": "@seqin" },
        { "source": "a", "output": "@seqout", "target": "b", "input": "@seqin" },
        { "source": "start", "output": "@seqout", "target": "b", "input": "@seqin" },
        { "source": "a", "output": "@error", "target": "catch", "input": "message" }
      ]
    }))
    .unwrap()
  }

  #[test]
  fn test_lookups() {
    let flow = sample();
    let start = flow.find_component("start").unwrap();
    let b = flow.find_component("b").unwrap();

    assert_eq!(flow.find_start(), Some(start));
    assert_eq!(flow.connections_from(start, SEQOUT).count(), 2);
    assert_eq!(flow.connections_into(b, SEQIN).count(), 2);
    assert!(flow.has_seqin_connection(b));
    assert!(!flow.has_seqin_connection(start));
    assert!(flow.has_error_connection(flow.find_component("a").unwrap()));
    assert_eq!(flow.find_catch_error(), flow.find_component("catch"));
  }

  #[test]
  fn test_connected_sequence_inputs() {
    let flow = sample();
    let a = flow.find_component("a").unwrap();
    let inputs = flow.connected_sequence_inputs(a);
    assert_eq!(inputs.len(), 1);
    assert!(inputs.contains(SEQIN));

    let start = flow.find_component("start").unwrap();
    assert!(flow.connected_sequence_inputs(start).is_empty());
  }

  #[test]
  fn test_unknown_component() {
    let err = flow(json!({
      "flow_id": "f",
      "components": [{ "component_id": "a", "type": "start" }],
      "connections": [{ "source": "a", "output": "@seqout", "target": "missing", "input": "@seqin" }]
    }))
    .unwrap_err();
    assert!(matches!(err, GraphError::UnknownComponent { component, .. } if component == "missing"));
  }

  #[test]
  fn test_unknown_input() {
    let err = flow(json!({
      "flow_id": "f",
      "components": [
        { "component_id": "a", "type": "start" },
        { "component_id": "b", "type": "action", "executor": "log" }
      ],
      "connections": [{ "source": "a", "output": "@seqout", "target": "b", "input": "nope" }]
    }))
    .unwrap_err();
    assert!(matches!(err, GraphError::UnknownInput { input, .. } if input == "nope"));
  }

  #[test]
  fn test_duplicate_component() {
    let err = flow(json!({
      "flow_id": "f",
      "components": [
        { "component_id": "a", "type": "start" },
        { "component_id": "a", "type": "start" }
      ]
    }))
    .unwrap_err();
    assert!(matches!(err, GraphError::DuplicateComponent { .. }));
  }
}
