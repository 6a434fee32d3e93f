//! MCP surface under both policy states, against a mock Druid router.

mod helpers;

use helpers::{app, app_with, call_tool, result_text, rpc, tool_names};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_read_only_listing_hides_mutating_tools() {
    let druid = MockServer::start().await;
    let names = tool_names(&app(&druid, true)).await;

    assert_eq!(names.len(), 11);
    for hidden in [
        "deleteDatasource",
        "killTask",
        "suspendSupervisor",
        "resumeSupervisor",
        "terminateSupervisor",
        "createOrUpdateLookup",
        "deleteLookup",
        "createAuthenticationUser",
        "deleteAuthenticationUser",
    ] {
        assert!(
            !names.iter().any(|n| n == hidden),
            "{hidden} should be hidden"
        );
    }
    assert!(names.iter().any(|n| n == "queryDruidSql"));
    assert!(names.iter().any(|n| n == "taskStatusById"));
}

#[tokio::test]
async fn test_disabled_mode_lists_every_tool() {
    let druid = MockServer::start().await;
    assert_eq!(tool_names(&app(&druid, false)).await.len(), 20);
}

#[tokio::test]
async fn test_filtered_pages_keep_the_cursor() {
    let druid = MockServer::start().await;
    let app = app_with(&druid, true, 5, helpers::MAX_BODY_SIZE);

    let mut cursor: Option<String> = None;
    let mut seen = Vec::new();
    loop {
        let params = match &cursor {
            Some(c) => json!({"cursor": c}),
            None => json!({}),
        };
        let response = rpc(&app, "tools/list", params).await;
        for tool in response["result"]["tools"].as_array().unwrap() {
            seen.push(tool["name"].as_str().unwrap().to_string());
        }
        match response["result"]["nextCursor"].as_str() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    assert_eq!(seen.len(), 11);
}

#[tokio::test]
async fn test_read_only_blocks_text_tool_before_the_engine() {
    let druid = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/druid/coordinator/v1/datasources/wikipedia"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&druid)
        .await;

    let response = call_tool(
        &app(&druid, true),
        "deleteDatasource",
        json!({"datasource": "wikipedia"}),
    )
    .await;

    let payload: Value = serde_json::from_str(result_text(&response)).unwrap();
    assert_eq!(payload["error"], "read_only_mode");
    assert!(
        payload["message"]
            .as_str()
            .unwrap()
            .contains("deleteDatasource")
    );
    assert!(payload["allowedToolsHint"].is_string());
}

#[tokio::test]
async fn test_read_only_raises_for_structured_tool() {
    let druid = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/druid/indexer/v1/supervisor/kafka_wiki/terminate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&druid)
        .await;

    let response = call_tool(
        &app(&druid, true),
        "terminateSupervisor",
        json!({"supervisorId": "kafka_wiki"}),
    )
    .await;

    assert_eq!(response["error"]["code"], -32003);
    assert_eq!(response["error"]["data"]["error_type"], "read_only_mode");
    assert_eq!(response["error"]["data"]["gate"], "invocation");
}

#[tokio::test]
async fn test_read_only_still_runs_sql_queries() {
    let druid = MockServer::start().await;
    let expected_body = json!({"query": "SELECT 1", "resultFormat": "object"});
    Mock::given(method("POST"))
        .and(path("/druid/v2/sql"))
        .and(body_json(expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"EXPR$0": 1}])))
        .expect(1)
        .mount(&druid)
        .await;

    let args = json!({"query": "SELECT 1"});
    let response = call_tool(&app(&druid, true), "queryDruidSql", args).await;

    let rows: Value = serde_json::from_str(result_text(&response)).unwrap();
    assert_eq!(rows[0]["EXPR$0"], 1);
}

#[tokio::test]
async fn test_read_only_allows_task_status_by_id() {
    let druid = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/druid/indexer/v1/task/index_wiki_1/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": {"status": "RUNNING"}})),
        )
        .expect(1)
        .mount(&druid)
        .await;

    let response = call_tool(
        &app(&druid, true),
        "taskStatusById",
        json!({"taskId": "index_wiki_1"}),
    )
    .await;

    assert!(result_text(&response).contains("RUNNING"));
}

#[tokio::test]
async fn test_disabled_mode_runs_mutating_tools() {
    let druid = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/druid/indexer/v1/task/index_wiki_1/shutdown"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task": "index_wiki_1"})))
        .expect(1)
        .mount(&druid)
        .await;

    let response = call_tool(
        &app(&druid, false),
        "killTask",
        json!({"taskId": "index_wiki_1"}),
    )
    .await;

    assert_eq!(response["result"]["isError"], false);
    assert!(result_text(&response).contains("index_wiki_1"));
}

#[tokio::test]
async fn test_engine_errors_surface_as_error_results() {
    let druid = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/druid/coordinator/v1/datasources/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&druid)
        .await;

    let response = call_tool(
        &app(&druid, true),
        "showDatasourceDetails",
        json!({"datasource": "missing"}),
    )
    .await;

    assert_eq!(response["result"]["isError"], true);
    let payload: Value = serde_json::from_str(result_text(&response)).unwrap();
    assert_eq!(payload["error"], "engine_error");
}
