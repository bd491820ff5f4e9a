//! Calculator capability server over stdio.
//!
//! Registers three arithmetic tools, a greeting resource, the Zen of
//! Python, and two prompt templates, then serves newline-delimited JSON
//! over stdin/stdout. Suitable for exactly one client — typically a
//! desktop host launching this binary as a subprocess.
//!
//! # Running
//!
//! ```bash
//! cargo run -p stdio-calc
//! ```
//!
//! Then type a request:
//!
//! ```text
//! {"id":"1","kind":"tool","name":"add","arguments":{"a":2,"b":3}}
//! ```

use capkit::capability::{PromptDef, PromptMessage, ResourceDef, ToolDef};
use capkit::prelude::*;
use capkit::schema::{ArgumentSchema, PropertyType};
use serde_json::Value;

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
        |args| async move { Ok(Value::from(arg_i64(&args, "a") + arg_i64(&args, "b"))) },
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

    registry.register_resource(
        ResourceDef::new("greeting")
            .description("Personalized greeting")
            .input_schema(ArgumentSchema::new().property("name", PropertyType::String)),
        |args| async move {
            let name = args
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("friend")
                .to_string();
            Ok(format!("Hello, {name}, this is a greeting resource!"))
        },
    )?;
    registry.register_resource(
        ResourceDef::new("zen_python").description("Zen of Python"),
        |_| async { Ok(ZEN_PYTHON.to_string()) },
    )?;

    registry.register_prompt(
        PromptDef::new("review_code")
            .description("Ask for a code review")
            .input_schema(ArgumentSchema::new().require("code", PropertyType::String)),
        |args| async move {
            let code = args.get("code").and_then(Value::as_str).unwrap_or_default();
            Ok(vec![PromptMessage::user(format!(
                "Please review this code:\n\n{code}"
            ))])
        },
    )?;
    registry.register_prompt(
        PromptDef::new("debug_error")
            .description("Start a debugging conversation")
            .input_schema(ArgumentSchema::new().require("error", PropertyType::String)),
        |args| async move {
            let error = args
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Ok(vec![
                PromptMessage::user("I'm seeing this error:"),
                PromptMessage::user(error),
                PromptMessage::assistant("I'll help debug that. What have you tried so far?"),
            ])
        },
    )?;

    Ok(registry)
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Logs go to stderr so stdout stays protocol-clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let registry = build_registry()?;
    let runtime = ServerRuntime::new(registry, ServerConfig::new(TransportKind::Stdio));

    tracing::info!("stdio calculator server started");
    runtime.run_stdio(&StdioTransport::new()).await?;
    Ok(())
}
