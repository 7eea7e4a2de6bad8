//! End-to-end tests over the MCP boundary: protocol flow, tool dispatch,
//! and error hygiene (no stack traces ever cross the boundary).

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::{Value, json};

use memorygraph::config::MemoryGraphConfig;
use memorygraph::db::MemoryDatabase;
use memorygraph::mcp::{JSONRPC_VERSION, JsonRpcRequest, McpServer, ToolRegistry};
use memorygraph::storage::{MemoryOperations, SqliteBackend};

fn server() -> McpServer {
    let config = MemoryGraphConfig::default();
    let backend: Arc<dyn MemoryOperations> = Arc::new(SqliteBackend::in_memory().unwrap());
    let db = Arc::new(MemoryDatabase::new(backend, &config));
    McpServer::new(Arc::new(ToolRegistry::new(db, config)))
}

fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id: Some(Value::Number(id.into())),
        method: method.to_string(),
        params: Some(params),
    }
}

fn call_tool(server: &McpServer, id: i64, name: &str, arguments: Value) -> Value {
    let response = tokio_test::block_on(server.handle_request(request(
        id,
        "tools/call",
        json!({"name": name, "arguments": arguments}),
    )))
    .expect("tool calls always get a response");
    response.result.expect("tools/call returns a result")
}

fn text_of(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap()
}

#[test]
fn test_full_session_flow() {
    let server = server();

    let init = tokio_test::block_on(server.handle_request(request(1, "initialize", json!({}))))
        .unwrap()
        .result
        .unwrap();
    assert_eq!(init["serverInfo"]["name"], "memorygraph");

    let tools = tokio_test::block_on(server.handle_request(request(2, "tools/list", json!({}))))
        .unwrap()
        .result
        .unwrap();
    let names: Vec<&str> = tools["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 22);
    for expected in [
        "store_memory",
        "search_memories",
        "create_relationship",
        "query_as_of",
        "what_changed",
        "migrate_database",
    ] {
        assert!(names.contains(&expected), "missing tool {expected}");
    }

    // Store, then search finds it.
    let stored = call_tool(
        &server,
        3,
        "store_memory",
        json!({"type": "solution", "title": "Fix", "content": "Use backoff", "tags": ["Redis"]}),
    );
    assert_eq!(stored["isError"], false);

    let found = call_tool(&server, 4, "search_memories", json!({"query": "backoff"}));
    assert_eq!(found["isError"], false);
    assert!(text_of(&found).contains("Found 1 memories"));
}

#[test]
fn test_cycle_error_over_the_wire() {
    let server = server();
    let mut ids = Vec::new();
    for name in ["A", "B", "C"] {
        let result = call_tool(
            &server,
            10,
            "store_memory",
            json!({"title": name, "content": name}),
        );
        let text = text_of(&result);
        let id = text
            .lines()
            .find_map(|l| l.strip_prefix("- **ID**: `"))
            .and_then(|l| l.strip_suffix('`'))
            .unwrap()
            .to_string();
        ids.push(id);
    }

    for (from, to) in [(0, 1), (1, 2)] {
        let result = call_tool(
            &server,
            11,
            "create_relationship",
            json!({
                "from_memory_id": ids[from],
                "to_memory_id": ids[to],
                "relationship_type": "DEPENDS_ON"
            }),
        );
        assert_eq!(result["isError"], false);
    }

    let refused = call_tool(
        &server,
        12,
        "create_relationship",
        json!({
            "from_memory_id": ids[2],
            "to_memory_id": ids[0],
            "relationship_type": "DEPENDS_ON"
        }),
    );
    assert_eq!(refused["isError"], true);
    let text = text_of(&refused);
    assert!(text.contains("cycle"));
    for id in &ids {
        assert!(text.contains(id), "cycle path should mention {id}");
    }
}

#[test]
fn test_error_hygiene_no_stack_traces() {
    let server = server();

    // Oversized content: the message references the limit and nothing
    // resembling a stack trace leaks through.
    let oversized = "x".repeat(60_000);
    let result = call_tool(
        &server,
        20,
        "store_memory",
        json!({"title": "t", "content": oversized}),
    );
    assert_eq!(result["isError"], true);
    let text = text_of(&result);
    assert!(text.contains("50000"));
    for forbidden in ["Traceback", "at line", "panicked at", "backtrace", "src/"] {
        assert!(
            !text.contains(forbidden),
            "stack trace token {forbidden:?} leaked: {text}"
        );
    }

    // Missing required field.
    let result = call_tool(&server, 21, "store_memory", json!({"title": "t"}));
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("content"));

    // Unknown tool.
    let result = call_tool(&server, 22, "no_such_tool", json!({}));
    assert_eq!(result["isError"], true);
    assert_eq!(text_of(&result), "Unknown tool: no_such_tool");

    // NotFound surfaces concisely.
    let result = call_tool(&server, 23, "get_memory", json!({"memory_id": "ghost"}));
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("not found"));
}

#[test]
fn test_temporal_tools_over_the_wire() {
    let server = server();
    let store = |name: &str| -> String {
        let result = call_tool(
            &server,
            30,
            "store_memory",
            json!({"title": name, "content": name}),
        );
        text_of(&result)
            .lines()
            .find_map(|l| l.strip_prefix("- **ID**: `"))
            .and_then(|l| l.strip_suffix('`'))
            .unwrap()
            .to_string()
    };
    let a = store("a");
    let b = store("b");
    let result = call_tool(
        &server,
        31,
        "create_relationship",
        json!({
            "from_memory_id": a,
            "to_memory_id": b,
            "relationship_type": "SOLVES",
            "valid_from": "2024-01-01T00:00:00Z"
        }),
    );
    assert_eq!(result["isError"], false);

    let as_of = call_tool(
        &server,
        32,
        "query_as_of",
        json!({"memory_id": b, "as_of": "2024-03-01T00:00:00Z"}),
    );
    assert!(text_of(&as_of).contains("1 relationships valid"));

    let changed = call_tool(
        &server,
        33,
        "what_changed",
        json!({"since": "2000-01-01T00:00:00Z"}),
    );
    assert!(text_of(&changed).contains("Learned (1)"));

    let bad = call_tool(&server, 34, "query_as_of", json!({"memory_id": b, "as_of": "soon"}));
    assert_eq!(bad["isError"], true);
    assert!(text_of(&bad).contains("ISO-8601"));
}
