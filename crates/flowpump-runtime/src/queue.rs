//! Pending work items.

use std::collections::VecDeque;

use flowpump_graph::{ComponentIndex, ConnectionIndex};
use serde::{Deserialize, Serialize};

use crate::flow_state::FlowStateId;

/// One pending execution of a component inside a flow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTask {
  /// Unique per runtime, used to recognize a task across requeues.
  pub id: u64,
  pub flow_state: FlowStateId,
  pub component: ComponentIndex,
  /// The connection whose delivery made the component ready.
  pub connection: Option<ConnectionIndex>,
}

/// FIFO task queue with head reinsertion for deferred tasks.
#[derive(Debug, Default)]
pub struct TaskQueue {
  tasks: VecDeque<QueueTask>,
  next_id: u64,
}

impl TaskQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a task at the tail and return its id.
  pub fn push(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentIndex,
    connection: Option<ConnectionIndex>,
  ) -> u64 {
    let id = self.next_id;
    self.next_id += 1;
    self.tasks.push_back(QueueTask {
      id,
      flow_state,
      component,
      connection,
    });
    id
  }

  pub fn pop_front(&mut self) -> Option<QueueTask> {
    self.tasks.pop_front()
  }

  /// Pop the head only if it was pushed before `horizon`.
  pub fn pop_front_before(&mut self, horizon: u64) -> Option<QueueTask> {
    if self.tasks.front()?.id < horizon {
      self.tasks.pop_front()
    } else {
      None
    }
  }

  /// Id the next pushed task will get.
  pub fn next_id(&self) -> u64 {
    self.next_id
  }

  /// Put tasks back at the head, keeping their relative order.
  pub fn requeue_front(&mut self, tasks: Vec<QueueTask>) {
    for task in tasks.into_iter().rev() {
      self.tasks.push_front(task);
    }
  }

  /// Drop every task belonging to `flow_state`, returning how many were removed.
  pub fn remove_for_flow_state(&mut self, flow_state: FlowStateId) -> usize {
    let before = self.tasks.len();
    self.tasks.retain(|task| task.flow_state != flow_state);
    before - self.tasks.len()
  }

  pub fn clear(&mut self) {
    self.tasks.clear();
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &QueueTask> {
    self.tasks.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ids(queue: &TaskQueue) -> Vec<u64> {
    queue.iter().map(|task| task.id).collect()
  }

  #[test]
  fn test_fifo_order() {
    let mut queue = TaskQueue::new();
    let a = queue.push(FlowStateId(0), ComponentIndex(0), None);
    let b = queue.push(FlowStateId(0), ComponentIndex(1), None);

    assert_eq!(queue.pop_front().unwrap().id, a);
    assert_eq!(queue.pop_front().unwrap().id, b);
    assert!(queue.pop_front().is_none());
  }

  #[test]
  fn test_pop_front_before_horizon() {
    let mut queue = TaskQueue::new();
    queue.push(FlowStateId(0), ComponentIndex(0), None);
    let horizon = queue.next_id();
    queue.push(FlowStateId(0), ComponentIndex(1), None);

    assert_eq!(queue.pop_front_before(horizon).unwrap().id, 0);
    assert!(queue.pop_front_before(horizon).is_none());
    assert_eq!(queue.len(), 1);
  }

  #[test]
  fn test_requeue_front_preserves_order() {
    let mut queue = TaskQueue::new();
    for component in 0..4 {
      queue.push(FlowStateId(0), ComponentIndex(component), None);
    }

    let first = queue.pop_front().unwrap();
    let second = queue.pop_front().unwrap();
    queue.push(FlowStateId(0), ComponentIndex(9), None);

    queue.requeue_front(vec![first, second]);
    assert_eq!(ids(&queue), vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn test_remove_for_flow_state() {
    let mut queue = TaskQueue::new();
    queue.push(FlowStateId(0), ComponentIndex(0), None);
    queue.push(FlowStateId(1), ComponentIndex(0), None);
    queue.push(FlowStateId(1), ComponentIndex(1), None);

    assert_eq!(queue.remove_for_flow_state(FlowStateId(1)), 2);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.iter().next().unwrap().flow_state, FlowStateId(0));
  }
}
