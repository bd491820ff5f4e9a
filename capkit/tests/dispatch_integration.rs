//! Full-dispatch integration tests: registry, validation, and result
//! shaping for every capability kind.

use capkit::capability::{CapabilityKind, PromptDef, PromptMessage, ResourceDef, ToolDef};
use capkit::protocol::{ErrorKind, Request, RequestId};
use capkit::registry::Registry;
use capkit::schema::{ArgumentSchema, PropertyType};
use capkit::{CancellationToken, CapError, Dispatcher};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;

const ZEN: &str = "Beautiful is better than ugly.\nExplicit is better than implicit.\n";

fn int_pair() -> ArgumentSchema {
    ArgumentSchema::new()
        .require("a", PropertyType::Integer)
        .require("b", PropertyType::Integer)
}

fn calc_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_tool(
            ToolDef::new("add").description("Add two integers").input_schema(int_pair()),
            |args| async move {
                let a = args.get("a").and_then(Value::as_i64).unwrap_or_default();
                let b = args.get("b").and_then(Value::as_i64).unwrap_or_default();
                Ok(Value::from(a + b))
            },
        )
        .unwrap();
    registry
        .register_tool(
            ToolDef::new("sub").description("Subtract b from a").input_schema(int_pair()),
            |args| async move {
                let a = args.get("a").and_then(Value::as_i64).unwrap_or_default();
                let b = args.get("b").and_then(Value::as_i64).unwrap_or_default();
                Ok(Value::from(a - b))
            },
        )
        .unwrap();
    registry
        .register_tool(
            ToolDef::new("mul").description("Multiply two integers").input_schema(int_pair()),
            |args| async move {
                let a = args.get("a").and_then(Value::as_i64).unwrap_or_default();
                let b = args.get("b").and_then(Value::as_i64).unwrap_or_default();
                Ok(Value::from(a * b))
            },
        )
        .unwrap();
    registry
        .register_resource(
            ResourceDef::new("zen_python").description("Zen of Python"),
            |_| async { Ok(ZEN.to_string()) },
        )
        .unwrap();
    registry
        .register_prompt(
            PromptDef::new("review_code")
                .input_schema(ArgumentSchema::new().require("code", PropertyType::String)),
            |args| async move {
                let code = args.get("code").and_then(Value::as_str).unwrap_or_default();
                Ok(vec![PromptMessage::user(format!(
                    "Please review this code:\n\n{code}"
                ))])
            },
        )
        .unwrap();
    registry
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(calc_registry()))
}

async fn call(dispatcher: &Dispatcher, kind: CapabilityKind, name: &str, args: Value) -> capkit::Response {
    let request = Request {
        id: RequestId::Number(1),
        kind,
        name: name.to_string(),
        arguments: args.as_object().cloned().unwrap_or_default(),
    };
    dispatcher.dispatch(request, &CancellationToken::new()).await
}

#[tokio::test]
async fn arithmetic_tools_compute_correctly() {
    let dispatcher = dispatcher();
    let cases = [
        ("add", 2, 3, 5),
        ("sub", 5, 9, -4),
        ("mul", 4, -3, -12),
    ];
    for (name, a, b, expected) in cases {
        let response = call(
            &dispatcher,
            CapabilityKind::Tool,
            name,
            serde_json::json!({"a": a, "b": b}),
        )
        .await;
        assert_eq!(response.result, Some(serde_json::json!(expected)), "{name}");
    }
}

#[tokio::test]
async fn every_registered_tool_is_reachable() {
    let registry = calc_registry();
    for name in ["add", "sub", "mul"] {
        assert!(registry.tool(name).is_some(), "{name} should be registered");
    }
    assert!(registry.contains(CapabilityKind::Resource, "zen_python"));
    assert!(registry.contains(CapabilityKind::Prompt, "review_code"));
}

#[tokio::test]
async fn unknown_capability_is_method_not_found() {
    let dispatcher = dispatcher();
    let response = call(
        &dispatcher,
        CapabilityKind::Tool,
        "pow",
        serde_json::json!({"a": 1, "b": 2}),
    )
    .await;
    let error = response.error.unwrap();
    assert_eq!(error.kind, ErrorKind::MethodNotFound);
    assert!(error.message.contains("pow"));
}

#[tokio::test]
async fn missing_argument_names_the_field() {
    let dispatcher = dispatcher();
    let response = call(
        &dispatcher,
        CapabilityKind::Tool,
        "add",
        serde_json::json!({"b": 3}),
    )
    .await;
    let error = response.error.unwrap();
    assert_eq!(error.kind, ErrorKind::InvalidArguments);
    assert!(error.message.contains("'a'"));
}

#[test]
fn duplicate_registration_fails_before_any_request() {
    let mut registry = calc_registry();
    let err = registry
        .register_tool(ToolDef::new("add").input_schema(int_pair()), |_| async {
            Ok(Value::Null)
        })
        .unwrap_err();
    assert!(matches!(
        err,
        CapError::DuplicateCapability {
            kind: CapabilityKind::Tool,
            ..
        }
    ));
}

#[tokio::test]
async fn repeated_resource_reads_are_byte_identical() {
    let dispatcher = dispatcher();
    let first = call(
        &dispatcher,
        CapabilityKind::Resource,
        "zen_python",
        serde_json::json!({}),
    )
    .await;
    let second = call(
        &dispatcher,
        CapabilityKind::Resource,
        "zen_python",
        serde_json::json!({}),
    )
    .await;
    let first = first.result.unwrap();
    assert_eq!(first, second.result.unwrap());
    assert_eq!(first["mimeType"], "text/plain");
    assert_eq!(first["text"].as_str().unwrap().as_bytes(), ZEN.as_bytes());
}

#[tokio::test]
async fn prompt_dispatch_yields_role_tagged_messages() {
    let dispatcher = dispatcher();
    let response = call(
        &dispatcher,
        CapabilityKind::Prompt,
        "review_code",
        serde_json::json!({"code": "fn main() {}"}),
    )
    .await;
    let messages = response.result.unwrap();
    assert_eq!(messages[0]["role"], "user");
    assert!(messages[0]["text"].as_str().unwrap().contains("fn main() {}"));
}

#[tokio::test]
async fn discovery_lists_in_registration_order() {
    let dispatcher = dispatcher();
    let response = call(
        &dispatcher,
        CapabilityKind::Tool,
        "list",
        serde_json::json!({}),
    )
    .await;
    let names: Vec<&str> = response
        .result
        .as_ref()
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["add", "sub", "mul"]);
}
