//! Action invocation, completion and output forwarding.

mod common;

use common::{has_label, runtime};
use flowpump_runtime::RuntimeError;
use serde_json::json;

#[tokio::test]
async fn test_widget_action_seeds_input_and_finishes() {
  let mut runtime = runtime(json!({
    "name": "actions",
    "pages": [{
      "flow_id": "main",
      "components": [{ "component_id": "button", "type": "widget", "action": "Foo" }]
    }],
    "actions": [{
      "flow_id": "foo",
      "name": "Foo",
      "components": [
        { "component_id": "start", "type": "start" },
        { "component_id": "param", "type": "input" },
        { "component_id": "sink", "type": "action", "executor": "log",
          "inputs": [{ "name": "message" }] }
      ],
      "connections": [
        { "source": "param", "output": "@seqout", "target": "sink", "input": "message" },
        { "source": "start", "output": "@seqout", "target": "sink", "input": "@seqin" }
      ]
    }]
  }));
  runtime.start().await.unwrap();
  let page = runtime.root_flow_states()[0];

  runtime
    .execute_widget_action(page, "button", json!(42))
    .unwrap();
  let child = runtime.flow_state(page).unwrap().children[0];
  assert!(!runtime.flow_state(child).unwrap().is_finished);
  assert_eq!(runtime.flow_state(child).unwrap().num_active_components, 1);
  assert_eq!(runtime.find_flow_state("foo"), Some(child));
  assert_eq!(runtime.find_flow_state("main"), Some(page));

  runtime.run_until_idle(10).await;
  assert_eq!(runtime.find_flow_state("foo"), None);

  let state = runtime.flow_state(child).unwrap();
  assert!(state.is_finished);
  assert_eq!(state.num_active_components, 0);
  assert_eq!(state.parent, Some(page));

  assert!(has_label(&runtime, "Execute widget action: button"));
  assert!(has_label(&runtime, "Action start: Foo"));
  assert!(has_label(&runtime, "Output value from [@seqout] to [sink/message]: 42"));
  assert!(has_label(&runtime, "42"));
  assert!(has_label(&runtime, "Action end: Foo"));
}

#[tokio::test]
async fn test_call_action_forwards_output_and_continues() {
  let mut runtime = runtime(json!({
    "name": "calls",
    "pages": [{
      "flow_id": "main",
      "components": [
        { "component_id": "start", "type": "start" },
        { "component_id": "call", "type": "call_action", "action": "Sub", "outputs": ["result"] },
        { "component_id": "shown", "type": "action", "executor": "log",
          "inputs": [{ "name": "message" }] },
        { "component_id": "after", "type": "action", "executor": "noop" }
      ],
      "connections": [
        { "source": "start", "output": "@seqout", "target": "call", "input": "@seqin" },
        { "source": "call", "output": "result", "target": "shown", "input": "message" },
        { "source": "call", "output": "@seqout", "target": "after", "input": "@seqin" }
      ]
    }],
    "actions": [{
      "flow_id": "Sub",
      "components": [
        { "component_id": "start", "type": "start" },
        { "component_id": "nine", "type": "action", "executor": "constant",
          "outputs": ["value"], "properties": { "value": 9 } },
        { "component_id": "result", "type": "output" }
      ],
      "connections": [
        { "source": "start", "output": "@seqout", "target": "nine", "input": "@seqin" },
        { "source": "nine", "output": "value", "target": "result", "input": "value" }
      ]
    }]
  }));
  runtime.start().await.unwrap();
  runtime.run_until_idle(20).await;

  let page = runtime.root_flow_states()[0];
  let labels = runtime.logs().labels();
  assert!(labels.contains(&"9".to_string()));
  assert!(labels.contains(&"Output value from [result] to [shown/message]: 9".to_string()));

  let end = labels.iter().position(|l| l == "Action end: Sub").unwrap();
  let after = labels
    .iter()
    .position(|l| l == "Execute component: after")
    .unwrap();
  assert!(end < after);

  let state = runtime.flow_state(page).unwrap();
  assert_eq!(state.num_active_components, 0);
  assert!(!state.is_finished);
  assert!(runtime.flow_state(state.children[0]).unwrap().is_finished);
  assert!(runtime.error().is_none());
}

#[tokio::test]
async fn test_missing_start_is_fatal() {
  let mut runtime = runtime(json!({
    "name": "broken",
    "pages": [{
      "flow_id": "main",
      "components": [{ "component_id": "button", "type": "widget", "action": "Empty" }]
    }],
    "actions": [{
      "flow_id": "Empty",
      "components": [{ "component_id": "n", "type": "action", "executor": "noop" }]
    }]
  }));
  runtime.start().await.unwrap();
  let page = runtime.root_flow_states()[0];

  let result = runtime.execute_widget_action(page, "button", json!(null));

  assert!(matches!(result, Err(RuntimeError::NoStartComponent { .. })));
  assert!(runtime.is_stopped());
  assert_eq!(runtime.error(), Some("No Start action component"));
  assert!(has_label(&runtime, "There is no StartActionComponent"));
}

#[tokio::test]
async fn test_widget_without_action_is_logged() {
  let mut runtime = runtime(json!({
    "name": "widgets",
    "pages": [{
      "flow_id": "main",
      "components": [
        { "component_id": "plain", "type": "widget" },
        { "component_id": "dangling", "type": "widget", "action": "Nowhere" }
      ]
    }]
  }));
  runtime.start().await.unwrap();
  let page = runtime.root_flow_states()[0];

  runtime.execute_widget_action(page, "plain", json!(1)).unwrap();
  runtime.execute_widget_action(page, "dangling", json!(1)).unwrap();

  assert!(has_label(&runtime, "Widget action not defined: plain"));
  assert!(has_label(&runtime, "Widget action not found: Nowhere"));
  assert!(!runtime.is_stopped());
}

#[tokio::test]
async fn test_widget_action_output_propagates() {
  let mut runtime = runtime(json!({
    "name": "outputs",
    "pages": [{
      "flow_id": "main",
      "components": [
        { "component_id": "button", "type": "widget", "outputs": ["action"] },
        { "component_id": "shown", "type": "action", "executor": "log",
          "inputs": [{ "name": "message" }] }
      ],
      "connections": [
        { "source": "button", "output": "action", "target": "shown", "input": "message" }
      ]
    }]
  }));
  runtime.start().await.unwrap();
  let page = runtime.root_flow_states()[0];

  runtime
    .execute_widget_action(page, "button", json!("clicked"))
    .unwrap();
  runtime.run_until_idle(10).await;

  assert!(has_label(&runtime, "clicked"));
}
