//! End-to-end tests for the stdio binding over an in-memory duplex pipe.

use capkit::capability::ToolDef;
use capkit::registry::Registry;
use capkit::schema::{ArgumentSchema, PropertyType};
use capkit::{ServerConfig, ServerRuntime, StdioTransport, TransportKind};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn calc_runtime() -> ServerRuntime {
    let mut registry = Registry::new();
    let int_pair = || {
        ArgumentSchema::new()
            .require("a", PropertyType::Integer)
            .require("b", PropertyType::Integer)
    };
    registry
        .register_tool(ToolDef::new("add").input_schema(int_pair()), |args| async move {
            let a = args.get("a").and_then(Value::as_i64).unwrap_or_default();
            let b = args.get("b").and_then(Value::as_i64).unwrap_or_default();
            Ok(Value::from(a + b))
        })
        .unwrap();
    registry
        .register_tool(ToolDef::new("mul").input_schema(int_pair()), |args| async move {
            let a = args.get("a").and_then(Value::as_i64).unwrap_or_default();
            let b = args.get("b").and_then(Value::as_i64).unwrap_or_default();
            Ok(Value::from(a * b))
        })
        .unwrap();
    ServerRuntime::new(
        registry,
        ServerConfig::new(TransportKind::Stdio).with_drain_grace(Duration::from_millis(100)),
    )
}

#[tokio::test]
async fn request_gets_the_exact_wire_response() {
    let runtime = calc_runtime();
    let (client, server) = tokio::io::duplex(4096);
    let (server_read, server_write) = tokio::io::split(server);
    let (client_read, mut client_write) = tokio::io::split(client);
    let transport = StdioTransport::with_streams(server_read, server_write);

    let driver = async {
        runtime.run_stdio(&transport).await.unwrap();
    };
    let exchange = async {
        client_write
            .write_all(b"{\"id\":\"1\",\"kind\":\"tool\",\"name\":\"add\",\"arguments\":{\"a\":2,\"b\":3}}\n")
            .await
            .unwrap();
        let mut lines = BufReader::new(client_read).lines();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            r#"{"id":"1","result":5}"#
        );
        drop(client_write);
    };
    tokio::join!(driver, exchange);
}

#[tokio::test]
async fn responses_arrive_in_request_order() {
    let runtime = calc_runtime();
    let (client, server) = tokio::io::duplex(4096);
    let (server_read, server_write) = tokio::io::split(server);
    let (client_read, mut client_write) = tokio::io::split(client);
    let transport = StdioTransport::with_streams(server_read, server_write);

    let driver = async {
        runtime.run_stdio(&transport).await.unwrap();
    };
    let exchange = async {
        client_write
            .write_all(
                b"{\"id\":1,\"kind\":\"tool\",\"name\":\"add\",\"arguments\":{\"a\":1,\"b\":1}}\n\
                  {\"id\":2,\"kind\":\"tool\",\"name\":\"mul\",\"arguments\":{\"a\":2,\"b\":2}}\n\
                  {\"id\":3,\"kind\":\"tool\",\"name\":\"add\",\"arguments\":{\"a\":3,\"b\":3}}\n",
            )
            .await
            .unwrap();
        let mut lines = BufReader::new(client_read).lines();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let line = lines.next_line().await.unwrap().unwrap();
            let response: Value = serde_json::from_str(&line).unwrap();
            ids.push(response["id"].as_i64().unwrap());
        }
        assert_eq!(ids, [1, 2, 3]);
        drop(client_write);
    };
    tokio::join!(driver, exchange);
}

#[tokio::test]
async fn malformed_frame_is_answered_not_fatal() {
    let runtime = calc_runtime();
    let (client, server) = tokio::io::duplex(4096);
    let (server_read, server_write) = tokio::io::split(server);
    let (client_read, mut client_write) = tokio::io::split(client);
    let transport = StdioTransport::with_streams(server_read, server_write);

    let driver = async {
        runtime.run_stdio(&transport).await.unwrap();
    };
    let exchange = async {
        client_write.write_all(b"this is not json\n").await.unwrap();
        let mut lines = BufReader::new(client_read).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let response: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(response["id"], 0);
        assert_eq!(response["error"]["kind"], "transport_error");

        // The session survived: a well-formed request still works.
        client_write
            .write_all(b"{\"id\":9,\"kind\":\"tool\",\"name\":\"mul\",\"arguments\":{\"a\":6,\"b\":7}}\n")
            .await
            .unwrap();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"id":9,"result":42}"#);
        drop(client_write);
    };
    tokio::join!(driver, exchange);
}

#[tokio::test]
async fn terminate_frame_ends_the_session() {
    let runtime = calc_runtime();
    let (client, server) = tokio::io::duplex(4096);
    let (server_read, server_write) = tokio::io::split(server);
    let (_client_read, mut client_write) = tokio::io::split(client);
    let transport = StdioTransport::with_streams(server_read, server_write);

    let driver = runtime.run_stdio(&transport);
    let exchange = async {
        client_write.write_all(b"{\"terminate\":true}\n").await.unwrap();
    };
    let (result, ()) = tokio::join!(driver, exchange);
    result.unwrap();
    assert_eq!(runtime.sessions().count(), 0);
}

#[tokio::test]
async fn disconnect_leaves_no_session_behind() {
    let runtime = calc_runtime();
    let (client, server) = tokio::io::duplex(4096);
    let (server_read, server_write) = tokio::io::split(server);
    let transport = StdioTransport::with_streams(server_read, server_write);

    drop(client);
    runtime.run_stdio(&transport).await.unwrap();
    assert_eq!(runtime.sessions().count(), 0);
}
