//! Failure routing: `@error` outputs, catch-error components, uncaught errors.

mod common;

use common::{FailExecutor, has_label, runtime, runtime_with};
use flowpump_graph::MESSAGE;
use flowpump_runtime::{ExecutorRegistry, Runtime, RuntimeConfig};
use serde_json::json;

fn failing_runtime(value: serde_json::Value) -> Runtime {
  let mut registry = ExecutorRegistry::with_builtins();
  registry.register("fail", FailExecutor("bad"));
  runtime_with(value, registry, RuntimeConfig::default())
}

#[tokio::test]
async fn test_uncaught_error_stops_runtime() {
  let mut runtime = runtime(json!({
    "name": "errors",
    "pages": [{
      "flow_id": "main",
      "components": [
        { "component_id": "start", "type": "start" },
        { "component_id": "boom", "type": "action", "executor": "constant",
          "outputs": ["value"], "properties": { "value": "kaput" } },
        { "component_id": "err", "type": "error" }
      ],
      "connections": [
        { "source": "start", "output": "@seqout", "target": "boom", "input": "@seqin" },
        { "source": "boom", "output": "value", "target": "err", "input": "message" }
      ]
    }]
  }));
  runtime.start().await.unwrap();
  runtime.run_until_idle(10).await;

  assert!(runtime.is_stopped());
  assert_eq!(runtime.error(), Some("kaput"));
  assert!(has_label(&runtime, "Error: kaput"));
  assert!(!runtime.has_pending_work());
}

#[tokio::test]
async fn test_error_output_receives_failure() {
  let mut runtime = failing_runtime(json!({
    "name": "errors",
    "pages": [{
      "flow_id": "main",
      "components": [
        { "component_id": "f", "type": "action", "executor": "fail" },
        { "component_id": "handler", "type": "action", "executor": "log",
          "inputs": [{ "name": "message" }] }
      ],
      "connections": [
        { "source": "f", "output": "@error", "target": "handler", "input": "message" }
      ]
    }]
  }));
  runtime.start().await.unwrap();
  runtime.run_until_idle(10).await;

  assert!(!runtime.is_stopped());
  assert!(has_label(&runtime, "Execution error in f: bad"));
  assert!(has_label(&runtime, "bad"));
  assert!(has_label(&runtime, "Execute component: handler"));
}

#[tokio::test]
async fn test_catch_error_in_caller_receives_message() {
  let mut runtime = failing_runtime(json!({
    "name": "errors",
    "pages": [{
      "flow_id": "main",
      "components": [
        { "component_id": "start", "type": "start" },
        { "component_id": "call", "type": "call_action", "action": "Sub" },
        { "component_id": "after", "type": "action", "executor": "noop" },
        { "component_id": "catcher", "type": "catch_error" },
        { "component_id": "report", "type": "action", "executor": "log",
          "inputs": [{ "name": "message" }] }
      ],
      "connections": [
        { "source": "start", "output": "@seqout", "target": "call", "input": "@seqin" },
        { "source": "call", "output": "@seqout", "target": "after", "input": "@seqin" },
        { "source": "catcher", "output": "message", "target": "report", "input": "message" }
      ]
    }],
    "actions": [{
      "flow_id": "Sub",
      "components": [
        { "component_id": "start", "type": "start" },
        { "component_id": "f", "type": "action", "executor": "fail" },
        { "component_id": "other", "type": "action", "executor": "noop" }
      ],
      "connections": [
        { "source": "start", "output": "@seqout", "target": "f", "input": "@seqin" },
        { "source": "start", "output": "@seqout", "target": "other", "input": "@seqin" }
      ]
    }]
  }));
  runtime.start().await.unwrap();
  let page = runtime.root_flow_states()[0];

  // start, call, sub start, failure
  for _ in 0..4 {
    runtime.pump_cycle().await;
  }

  let child = runtime.flow_state(page).unwrap().children[0];
  assert!(runtime.flow_state(child).unwrap().is_finished);
  assert!(runtime.queued_tasks().all(|task| task.flow_state != child));

  let catcher = runtime.find_component(page, "catcher").unwrap();
  let state = runtime
    .flow_state(page)
    .unwrap()
    .component_state(catcher)
    .unwrap();
  assert_eq!(state.input(MESSAGE), Some(&json!("bad")));

  runtime.run_until_idle(10).await;

  assert!(!runtime.is_stopped());
  assert!(has_label(&runtime, "bad"));
  assert!(!has_label(&runtime, "Execute component: other"));
  assert!(!has_label(&runtime, "Execute component: after"));
  assert_eq!(runtime.flow_state(page).unwrap().num_active_components, 0);
}
