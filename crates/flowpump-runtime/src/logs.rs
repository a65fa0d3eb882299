//! Runtime log sink.
//!
//! The sink is an append-only list for a UI to display. It is capped at
//! [`MAX_LOG_ITEMS`]: once full, the oldest non-error item is evicted first,
//! and only when every item is an error is the oldest error dropped. Every
//! item is also mirrored to `tracing`.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use flowpump_graph::ComponentIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::flow_state::FlowStateId;

pub const MAX_LOG_ITEMS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
  Debug,
  Info,
  Warn,
  Error,
}

/// What a log item reports. Rendered by [`LogItem::label`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogKind {
  ExecuteComponent {
    component: String,
  },
  ActionStart {
    action: String,
  },
  ActionEnd {
    action: String,
  },
  OutputValue {
    output: String,
    target: String,
    input: String,
    value: serde_json::Value,
  },
  ExecutionError {
    component: String,
    error: String,
  },
  ExecuteWidgetAction {
    widget: String,
  },
  WidgetActionNotFound {
    action: String,
  },
  WidgetActionNotDefined {
    widget: String,
  },
  NoStartComponent,
  Message {
    text: String,
  },
}

impl fmt::Display for LogKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::ExecuteComponent { component } => write!(f, "Execute component: {component}"),
      Self::ActionStart { action } => write!(f, "Action start: {action}"),
      Self::ActionEnd { action } => write!(f, "Action end: {action}"),
      Self::OutputValue {
        output,
        target,
        input,
        value,
      } => write!(f, "Output value from [{output}] to [{target}/{input}]: {value}"),
      Self::ExecutionError { component, error } => {
        write!(f, "Execution error in {component}: {error}")
      }
      Self::ExecuteWidgetAction { widget } => write!(f, "Execute widget action: {widget}"),
      Self::WidgetActionNotFound { action } => write!(f, "Widget action not found: {action}"),
      Self::WidgetActionNotDefined { widget } => write!(f, "Widget action not defined: {widget}"),
      Self::NoStartComponent => write!(f, "There is no StartActionComponent"),
      Self::Message { text } => write!(f, "{text}"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogItem {
  pub id: Uuid,
  pub date: DateTime<Utc>,
  pub level: LogLevel,
  pub flow_state: Option<FlowStateId>,
  pub component: Option<ComponentIndex>,
  pub kind: LogKind,
}

impl LogItem {
  pub fn new(level: LogLevel, kind: LogKind) -> Self {
    Self {
      id: Uuid::new_v4(),
      date: Utc::now(),
      level,
      flow_state: None,
      component: None,
      kind,
    }
  }

  pub fn info(kind: LogKind) -> Self {
    Self::new(LogLevel::Info, kind)
  }

  pub fn error(kind: LogKind) -> Self {
    Self::new(LogLevel::Error, kind)
  }

  /// Attach the flow state the item originates from.
  pub fn in_flow_state(mut self, flow_state: FlowStateId) -> Self {
    self.flow_state = Some(flow_state);
    self
  }

  /// Attach the component the item originates from.
  pub fn at_component(mut self, flow_state: FlowStateId, component: ComponentIndex) -> Self {
    self.flow_state = Some(flow_state);
    self.component = Some(component);
    self
  }

  pub fn is_error(&self) -> bool {
    self.level == LogLevel::Error
  }

  pub fn label(&self) -> String {
    self.kind.to_string()
  }
}

type Subscriber = Box<dyn Fn(&LogItem) + Send + Sync>;

/// Capped, ordered list of log items with subscriber callbacks.
pub struct LogSink {
  items: VecDeque<LogItem>,
  max_items: usize,
  subscribers: Vec<Subscriber>,
}

impl Default for LogSink {
  fn default() -> Self {
    Self::new(MAX_LOG_ITEMS)
  }
}

impl fmt::Debug for LogSink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LogSink")
      .field("items", &self.items.len())
      .field("max_items", &self.max_items)
      .field("subscribers", &self.subscribers.len())
      .finish()
  }
}

impl LogSink {
  pub fn new(max_items: usize) -> Self {
    Self {
      items: VecDeque::new(),
      max_items: max_items.max(1),
      subscribers: Vec::new(),
    }
  }

  /// Register a callback invoked for every added item.
  pub fn subscribe(&mut self, subscriber: impl Fn(&LogItem) + Send + Sync + 'static) {
    self.subscribers.push(Box::new(subscriber));
  }

  pub fn add(&mut self, item: LogItem) {
    mirror(&item);

    for subscriber in &self.subscribers {
      subscriber(&item);
    }

    self.items.push_back(item);
    if self.items.len() > self.max_items {
      match self.items.iter().position(|item| !item.is_error()) {
        Some(oldest) => {
          self.items.remove(oldest);
        }
        None => {
          self.items.pop_front();
        }
      }
    }
  }

  pub fn items(&self) -> impl Iterator<Item = &LogItem> {
    self.items.iter()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Labels of all items, oldest first.
  pub fn labels(&self) -> Vec<String> {
    self.items.iter().map(LogItem::label).collect()
  }

  pub fn clear(&mut self) {
    self.items.clear();
  }
}

fn mirror(item: &LogItem) {
  let flow_state = item.flow_state.map(|id| id.to_string()).unwrap_or_default();
  let label = item.label();
  match item.level {
    LogLevel::Debug => debug!(flow_state = %flow_state, "{}", label),
    LogLevel::Info => info!(flow_state = %flow_state, "{}", label),
    LogLevel::Warn => warn!(flow_state = %flow_state, "{}", label),
    LogLevel::Error => error!(flow_state = %flow_state, "{}", label),
  }
}
