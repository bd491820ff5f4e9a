//! Calculator capability server over streamable HTTP, in stateless mode.
//!
//! Every `POST /rpc` is a fully self-contained request/response cycle: no
//! session token is issued and nothing persists between calls. A small
//! JSON info document at `GET /` describes the server.
//!
//! # Running
//!
//! ```bash
//! cargo run -p streamable-calc
//! ```
//!
//! # Testing with curl
//!
//! ```bash
//! curl -X POST http://127.0.0.1:8867/rpc \
//!   -H "Content-Type: application/json" \
//!   -d '{"id":"1","kind":"tool","name":"add","arguments":{"a":2,"b":3}}'
//! ```

use axum::routing::get;
use capkit::capability::{PromptDef, PromptMessage, ResourceDef, ToolDef};
use capkit::prelude::*;
use capkit::schema::{ArgumentSchema, PropertyType};
use serde_json::Value;
use std::sync::Arc;

const ZEN_PYTHON: &str = "\
Beautiful is better than ugly.
Explicit is better than implicit.
Simple is better than complex.
Complex is better than complicated.
Flat is better than nested.
Sparse is better than dense.
Readability counts.
Special cases aren't special enough to break the rules.
Although practicality beats purity.
Errors should never pass silently.
Unless explicitly silenced.
In the face of ambiguity, refuse the temptation to guess.
There should be one-- and preferably only one --obvious way to do it.
Although that way may not be obvious at first unless you're Dutch.
Now is better than never.
Although never is often better than *right* now.
If the implementation is hard to explain, it's a bad idea.
If the implementation is easy to explain, it may be a good idea.
Namespaces are one honking great idea -- let's do more of those!
";

fn int_pair() -> ArgumentSchema {
    ArgumentSchema::new()
        .require("a", PropertyType::Integer)
        .require("b", PropertyType::Integer)
}

fn arg_i64(args: &serde_json::Map<String, Value>, name: &str) -> i64 {
    args.get(name).and_then(Value::as_i64).unwrap_or_default()
}

fn build_registry() -> Result<Registry, CapError> {
    let mut registry = Registry::new();

    registry.register_tool(
        ToolDef::new("add")
            .description("Add two integers")
            .input_schema(int_pair()),
        |args| async move {
            tracing::info!(a = arg_i64(&args, "a"), b = arg_i64(&args, "b"), "add");
            Ok(Value::from(arg_i64(&args, "a") + arg_i64(&args, "b")))
        },
    )?;
    registry.register_tool(
        ToolDef::new("sub")
            .description("Subtract b from a")
            .input_schema(int_pair()),
        |args| async move { Ok(Value::from(arg_i64(&args, "a") - arg_i64(&args, "b"))) },
    )?;
    registry.register_tool(
        ToolDef::new("mul")
            .description("Multiply two integers")
            .input_schema(int_pair()),
        |args| async move { Ok(Value::from(arg_i64(&args, "a") * arg_i64(&args, "b"))) },
    )?;
    registry.register_tool(
        ToolDef::new("now").description("Current local time"),
        |_| async {
            Ok(Value::from(
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ))
        },
    )?;

    registry.register_resource(
        ResourceDef::new("zen_python").description("Zen of Python"),
        |_| async { Ok(ZEN_PYTHON.to_string()) },
    )?;

    registry.register_prompt(
        PromptDef::new("calculate_expression")
            .description("Ask for a mathematical expression to be evaluated")
            .input_schema(ArgumentSchema::new().require("expression", PropertyType::String)),
        |args| async move {
            let expression = args
                .get("expression")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(vec![PromptMessage::user(format!(
                "Please evaluate the following mathematical expression: {expression}"
            ))])
        },
    )?;
    registry.register_prompt(
        PromptDef::new("debug_code")
            .description("Start a debugging conversation for failing code")
            .input_schema(
                ArgumentSchema::new()
                    .require("code", PropertyType::String)
                    .require("error", PropertyType::String),
            ),
        |args| async move {
            let code = args.get("code").and_then(Value::as_str).unwrap_or_default();
            let error = args.get("error").and_then(Value::as_str).unwrap_or_default();
            Ok(vec![
                PromptMessage::user("I hit an error running this code:"),
                PromptMessage::user(format!("```\n{code}\n```")),
                PromptMessage::user(format!("The error message: {error}")),
                PromptMessage::assistant(
                    "Let me analyze the code and the error message for you...",
                ),
            ])
        },
    )?;

    Ok(registry)
}

/// `GET /` info document: name, version, endpoint map.
async fn info() -> axum::Json<Value> {
    axum::Json(serde_json::json!({
        "name": "streamable-calc",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "rpc": "/rpc"
        }
    }))
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let registry = build_registry()?;
    let config = ServerConfig::new(TransportKind::StreamableHttp)
        .with_host("127.0.0.1")
        .with_port(8867)
        .with_stateless_mode(true);
    tracing::info!(
        addr = %config.addr(),
        stateless = config.stateless_mode,
        "streamable HTTP calculator server starting"
    );

    let runtime = Arc::new(ServerRuntime::new(registry, config));
    let router = CapRouter::new(Arc::clone(&runtime))
        .with_cors()
        .with_tracing()
        .into_router()
        .route("/", get(info));
    capkit::serve(runtime, router).await?;
    Ok(())
}
