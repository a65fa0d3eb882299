//! Builtin component executors.
//!
//! Kind defaults cover the structural variants (start, widget, input, output,
//! error, catch-error, call-action). Named executors (`log`, `constant`,
//! `set_variable`, `delay`, `compare`, `noop`) back `action` components.

use std::cmp::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use flowpump_graph::{ComponentKind, MESSAGE};
use serde_json::Value;

use crate::error::ComponentError;
use crate::executor::{ComponentExecutor, Execution, ExecutionContext};
use crate::logs::LogLevel;

/// Start components just open the sequence.
#[derive(Debug, Default)]
pub struct StartExecutor;

#[async_trait]
impl ComponentExecutor for StartExecutor {
  async fn execute(&self, _ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    Ok(Execution::Continue)
  }
}

/// Does nothing and continues. Used for widgets, input parameters and `noop`.
#[derive(Debug, Default)]
pub struct NoopExecutor;

#[async_trait]
impl ComponentExecutor for NoopExecutor {
  async fn execute(&self, _ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    Ok(Execution::Continue)
  }
}

/// Forwards `value` to the caller's output named after this component.
#[derive(Debug, Default)]
pub struct OutputExecutor;

#[async_trait]
impl ComponentExecutor for OutputExecutor {
  async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let value = ctx.required_input("value")?.clone();
    let output = ctx.component().display_name().to_string();
    ctx.forward_to_caller(output, value);
    Ok(Execution::Continue)
  }
}

/// Fails with its `message` input.
#[derive(Debug, Default)]
pub struct ErrorExecutor;

#[async_trait]
impl ComponentExecutor for ErrorExecutor {
  async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let value = ctx.required_input(MESSAGE)?.clone();
    Err(ComponentError::with_value(display(&value), value))
  }
}

/// Emits the caught error through its `message` output.
#[derive(Debug, Default)]
pub struct CatchErrorExecutor;

#[async_trait]
impl ComponentExecutor for CatchErrorExecutor {
  async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let message = ctx.input(MESSAGE).cloned().unwrap_or(Value::Null);
    ctx.propagate_value(MESSAGE, message);
    Ok(Execution::Continue)
  }
}

/// Invokes the configured action. `@seqout` fires when the action finishes.
#[derive(Debug, Default)]
pub struct CallActionExecutor;

#[async_trait]
impl ComponentExecutor for CallActionExecutor {
  async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let action = match &ctx.component().kind {
      ComponentKind::CallAction { action } => action.clone(),
      other => {
        return Err(ComponentError::new(format!(
          "call action executor bound to a {} component",
          other.name()
        )));
      }
    };
    let value = ctx.input("value").cloned().unwrap_or(Value::Null);
    ctx.invoke_action(action, value);
    Ok(Execution::Managed)
  }
}

/// Logs the `message` input, or the `message` property when unwired.
#[derive(Debug, Default)]
pub struct LogExecutor;

#[async_trait]
impl ComponentExecutor for LogExecutor {
  async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let message = ctx
      .input(MESSAGE)
      .or_else(|| ctx.property(MESSAGE))
      .map(display)
      .unwrap_or_default();
    let level = match ctx.property("level").and_then(Value::as_str) {
      Some("debug") => LogLevel::Debug,
      Some("warn") => LogLevel::Warn,
      Some("error") => LogLevel::Error,
      _ => LogLevel::Info,
    };
    ctx.log(level, message);
    Ok(Execution::Continue)
  }
}

/// Emits the `value` property through the `output` property's output (default `value`).
#[derive(Debug, Default)]
pub struct ConstantExecutor;

#[async_trait]
impl ComponentExecutor for ConstantExecutor {
  async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let value = ctx.property("value").cloned().unwrap_or(Value::Null);
    let output = ctx
      .property("output")
      .and_then(Value::as_str)
      .unwrap_or("value")
      .to_string();
    ctx.propagate_value(output, value);
    Ok(Execution::Continue)
  }
}

/// Assigns the `value` input (or property) to the `variable` property's target.
#[derive(Debug, Default)]
pub struct SetVariableExecutor;

#[async_trait]
impl ComponentExecutor for SetVariableExecutor {
  async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let target = ctx.string_property("variable")?.to_string();
    let value = ctx
      .input("value")
      .or_else(|| ctx.property("value"))
      .cloned()
      .unwrap_or(Value::Null);
    ctx.assign_value(target, value);
    Ok(Execution::Continue)
  }
}

/// Sleeps for the `milliseconds` input or property.
#[derive(Debug, Default)]
pub struct DelayExecutor;

#[async_trait]
impl ComponentExecutor for DelayExecutor {
  async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let millis = ctx
      .input("milliseconds")
      .or_else(|| ctx.property("milliseconds"))
      .and_then(Value::as_u64)
      .ok_or_else(|| ComponentError::new("delay needs a non-negative 'milliseconds' value"))?;
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Ok(Execution::Continue)
  }
}

/// Compares inputs `a` and `b` and fires `true` or `false`.
///
/// The `operator` property is one of `eq`, `ne`, `lt`, `le`, `gt`, `ge`
/// (default `eq`). Ordering operators need two numbers or two strings.
#[derive(Debug, Default)]
pub struct CompareExecutor;

#[async_trait]
impl ComponentExecutor for CompareExecutor {
  async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Execution, ComponentError> {
    let a = ctx.required_input("a")?;
    let b = ctx.required_input("b")?;
    let operator = ctx
      .property("operator")
      .and_then(Value::as_str)
      .unwrap_or("eq");

    let result = match operator {
      "eq" => a == b,
      "ne" => a != b,
      "lt" | "le" | "gt" | "ge" => {
        let ordering = order(a, b).ok_or_else(|| {
          ComponentError::new(format!("cannot order {a} and {b}"))
        })?;
        match operator {
          "lt" => ordering == Ordering::Less,
          "le" => ordering != Ordering::Greater,
          "gt" => ordering == Ordering::Greater,
          _ => ordering != Ordering::Less,
        }
      }
      other => return Err(ComponentError::new(format!("unknown operator '{other}'"))),
    };

    ctx.propagate_value(if result { "true" } else { "false" }, Value::Null);
    Ok(Execution::Managed)
  }
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
  match (a, b) {
    (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
    _ => None,
  }
}

/// Strings render bare, everything else as JSON.
fn display(value: &Value) -> String {
  match value {
    Value::String(text) => text.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::executor::Effect;
  use crate::flow_state::FlowStateId;
  use flowpump_graph::{ComponentIndex, Flow, FlowKind};
  use serde_json::json;
  use std::collections::HashMap;
  use std::sync::Arc;

  fn context(component: Value, inputs: Value) -> ExecutionContext {
    let flow = Flow::from_def(
      serde_json::from_value(json!({ "flow_id": "f", "components": [component] })).unwrap(),
      FlowKind::Page,
    )
    .unwrap();
    let inputs: HashMap<String, Value> = serde_json::from_value(inputs).unwrap();
    ExecutionContext::new(
      FlowStateId(0),
      Arc::new(flow),
      ComponentIndex(0),
      inputs,
      HashMap::new(),
      None,
    )
  }

  #[tokio::test]
  async fn test_compare_branches() {
    let mut ctx = context(
      json!({ "component_id": "c", "type": "action", "executor": "compare",
        "properties": { "operator": "gt" } }),
      json!({ "a": 3, "b": 2 }),
    );
    let execution = CompareExecutor.execute(&mut ctx).await.unwrap();

    assert!(matches!(execution, Execution::Managed));
    assert!(matches!(&ctx.effects()[0], Effect::Propagate { output, .. } if output == "true"));
  }

  #[tokio::test]
  async fn test_compare_rejects_mixed_ordering() {
    let mut ctx = context(
      json!({ "component_id": "c", "type": "action", "executor": "compare",
        "properties": { "operator": "lt" } }),
      json!({ "a": 3, "b": "x" }),
    );
    assert!(CompareExecutor.execute(&mut ctx).await.is_err());
  }

  #[tokio::test]
  async fn test_error_executor_carries_value() {
    let mut ctx = context(
      json!({ "component_id": "e", "type": "error" }),
      json!({ "message": "boom" }),
    );
    let err = ErrorExecutor.execute(&mut ctx).await.unwrap_err();
    assert_eq!(err.message(), "boom");
    assert_eq!(err.value(), &json!("boom"));
  }

  #[tokio::test]
  async fn test_output_forwards_under_label() {
    let mut ctx = context(
      json!({ "component_id": "o", "label": "result", "type": "output" }),
      json!({ "value": 42 }),
    );
    OutputExecutor.execute(&mut ctx).await.unwrap();
    assert_eq!(
      ctx.effects(),
      &[Effect::ForwardToCaller {
        output: "result".to_string(),
        value: json!(42)
      }]
    );
  }

  #[tokio::test]
  async fn test_set_variable_requires_target() {
    let mut ctx = context(
      json!({ "component_id": "s", "type": "action", "executor": "set_variable" }),
      json!({ "value": 1 }),
    );
    assert!(SetVariableExecutor.execute(&mut ctx).await.is_err());
  }

  #[tokio::test(start_paused = true)]
  async fn test_delay_sleeps() {
    let mut ctx = context(
      json!({ "component_id": "d", "type": "action", "executor": "delay",
        "properties": { "milliseconds": 500 } }),
      json!({}),
    );
    let started = tokio::time::Instant::now();
    DelayExecutor.execute(&mut ctx).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(500));
  }
}
