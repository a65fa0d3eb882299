use std::collections::HashMap;

use crate::flow::{ComponentIndex, Connection, ConnectionIndex};

/// Connection indices for propagation lookups.
#[derive(Debug, Clone, Default)]
pub struct Graph {
  /// Adjacency list: source component -> outgoing connections.
  outgoing: HashMap<ComponentIndex, Vec<ConnectionIndex>>,
  /// Reverse adjacency: target component -> incoming connections.
  incoming: HashMap<ComponentIndex, Vec<ConnectionIndex>>,
}

impl Graph {
  /// Build the indices from a connection list.
  pub fn new(connections: &[Connection]) -> Self {
    let mut outgoing: HashMap<ComponentIndex, Vec<ConnectionIndex>> = HashMap::new();
    let mut incoming: HashMap<ComponentIndex, Vec<ConnectionIndex>> = HashMap::new();

    for (index, connection) in connections.iter().enumerate() {
      let index = ConnectionIndex(index);
      outgoing.entry(connection.source).or_default().push(index);
      incoming.entry(connection.target).or_default().push(index);
    }

    Self { outgoing, incoming }
  }

  /// Get the connections leaving a component, in declaration order.
  pub fn outgoing(&self, component: ComponentIndex) -> &[ConnectionIndex] {
    self
      .outgoing
      .get(&component)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get the connections entering a component, in declaration order.
  pub fn incoming(&self, component: ComponentIndex) -> &[ConnectionIndex] {
    self
      .incoming
      .get(&component)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
