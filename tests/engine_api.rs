//! Integration tests for the engine REST client and the deployment adapter
//!
//! A wiremock server stands in for the remote workflow engine; the tests
//! drive real HTTP through EngineClient and assert on what actually went
//! over the wire.

use relaymend::config::{EngineConfig, TransportConfig};
use relaymend::delivery::RetryPolicy;
use relaymend::deploy::{apply_resilience_rollout, Deployer};
use relaymend::engine::EngineClient;
use relaymend::graph::GraphDocument;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-engine-key";
const WORKFLOW_ID: &str = "wf-chat-1";

fn engine_config(server: &MockServer) -> EngineConfig {
    EngineConfig {
        api_url: format!("{}/api/v1", server.uri()),
        api_key: API_KEY.to_string(),
        workflow_id: WORKFLOW_ID.to_string(),
    }
}

/// A pre-rollout document with the nodes the resilience plan expects
fn baseline_document() -> Value {
    json!({
        "id": WORKFLOW_ID,
        "name": "chat-faq-bot",
        "active": true,
        "versionId": "v-7",
        "nodes": [
            {"id": "n-ctx", "name": "Set_User_Context", "type": "n8n-nodes-base.set",
             "typeVersion": 3.4, "position": [224.0, 128.0], "parameters": {}},
            {"id": "n-hist", "name": "Merge_History_Context", "type": "n8n-nodes-base.code",
             "typeVersion": 2.0, "position": [448.0, 128.0], "parameters": {"jsCode": "return items;"}},
            {"id": "n-ai", "name": "AI_FAQ_Matcher", "type": "n8n-nodes-base.httpRequest",
             "typeVersion": 4.2, "position": [672.0, 128.0], "parameters": {}},
            {"id": "n-extract", "name": "Extract_AI_Response", "type": "n8n-nodes-base.set",
             "typeVersion": 3.4, "position": [1104.0, 128.0], "parameters": {}},
            {"id": "n-send", "name": "Send_Response", "type": "n8n-nodes-base.httpRequest",
             "typeVersion": 4.2, "position": [1328.0, 128.0], "parameters": {}},
            {"id": "n-prep", "name": "Prepare_Store_Data", "type": "n8n-nodes-base.code",
             "typeVersion": 2.0, "position": [1440.0, 128.0], "parameters": {"jsCode": "// old"}},
            {"id": "n-store", "name": "DB_Store_Conversation", "type": "n8n-nodes-base.postgres",
             "typeVersion": 2.6, "position": [1664.0, 128.0], "parameters": {},
             "credentials": {"postgres": {"id": "cred-1", "name": "PostgreSQL account"}}},
            {"id": "n-log", "name": "Build_Execution_Log", "type": "n8n-nodes-base.code",
             "typeVersion": 2.0, "position": [1888.0, 128.0], "parameters": {"jsCode": "// old"}},
            {"id": "n-dblog", "name": "DB_Log_Execution", "type": "n8n-nodes-base.postgres",
             "typeVersion": 2.6, "position": [2112.0, 128.0], "parameters": {},
             "credentials": {"postgres": {"id": "cred-1", "name": "PostgreSQL account"}}},
            {"id": "n-resp", "name": "Webhook_Response", "type": "n8n-nodes-base.respondToWebhook",
             "typeVersion": 1.1, "position": [2336.0, 256.0], "parameters": {}}
        ],
        "connections": {
            "Set_User_Context": {"main": [[{"node": "Merge_History_Context", "type": "main", "index": 0}]]},
            "Merge_History_Context": {"main": [[{"node": "AI_FAQ_Matcher", "type": "main", "index": 0}]]},
            "AI_FAQ_Matcher": {"main": [[{"node": "Extract_AI_Response", "type": "main", "index": 0}]]},
            "Extract_AI_Response": {"main": [[{"node": "Send_Response", "type": "main", "index": 0}]]},
            "Send_Response": {"main": [[{"node": "Prepare_Store_Data", "type": "main", "index": 0}]]},
            "Prepare_Store_Data": {"main": [[{"node": "DB_Store_Conversation", "type": "main", "index": 0}]]},
            "DB_Store_Conversation": {"main": [[{"node": "Build_Execution_Log", "type": "main", "index": 0}]]},
            "Build_Execution_Log": {"main": [[{"node": "DB_Log_Execution", "type": "main", "index": 0}]]},
            "DB_Log_Execution": {"main": [[{"node": "Webhook_Response", "type": "main", "index": 0}]]}
        }
    })
}

#[tokio::test]
async fn fetch_sends_the_api_key_and_parses_the_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/workflows/{}", WORKFLOW_ID)))
        .and(header("X-N8N-API-KEY", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(baseline_document()))
        .expect(1)
        .mount(&server)
        .await;

    let client = EngineClient::new(&engine_config(&server)).unwrap();
    let document = client.fetch_workflow(WORKFLOW_ID).await.unwrap();

    assert_eq!(document.name, "chat-faq-bot");
    assert_eq!(document.nodes.len(), 10);
    assert_eq!(document.extra["versionId"], "v-7");
}

#[tokio::test]
async fn fetch_surfaces_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/workflows/{}", WORKFLOW_ID)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = EngineClient::new(&engine_config(&server)).unwrap();
    let err = client.fetch_workflow(WORKFLOW_ID).await.unwrap_err();
    assert!(err.to_string().contains("404"), "unexpected error: {}", err);
}

#[tokio::test]
async fn update_pushes_only_the_accepted_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/v1/workflows/{}", WORKFLOW_ID)))
        .and(header("X-N8N-API-KEY", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(baseline_document()))
        .expect(1)
        .mount(&server)
        .await;

    let client = EngineClient::new(&engine_config(&server)).unwrap();
    let document: GraphDocument = serde_json::from_value(baseline_document()).unwrap();
    client.update_workflow(WORKFLOW_ID, &document).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let put = requests.iter().find(|r| r.method.to_string() == "PUT").unwrap();
    let body: Value = serde_json::from_slice(&put.body).unwrap();

    let mut keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, ["connections", "name", "nodes", "settings"]);
    assert_eq!(body["settings"], json!({"executionOrder": "v1"}));
    // Read-only fields from the GET never go back up
    assert!(body.get("versionId").is_none());
    assert!(body.get("active").is_none());
}

#[tokio::test]
async fn update_refuses_a_structurally_broken_document() {
    // No mock mounted: a request would fail the test by erroring anyway,
    // but validation has to reject the document before any HTTP happens.
    let server = MockServer::start().await;
    let client = EngineClient::new(&engine_config(&server)).unwrap();

    let mut document: GraphDocument = serde_json::from_value(baseline_document()).unwrap();
    document.connect("Send_Response", "No_Such_Node");

    let err = client.update_workflow(WORKFLOW_ID, &document).await.unwrap_err();
    assert!(err.to_string().contains("No_Such_Node"), "unexpected error: {}", err);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn activate_posts_to_the_activation_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/api/v1/workflows/{}/activate", WORKFLOW_ID)))
        .and(header("X-N8N-API-KEY", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = EngineClient::new(&engine_config(&server)).unwrap();
    client.activate_workflow(WORKFLOW_ID).await.unwrap();
}

#[tokio::test]
async fn full_rollout_fetches_edits_pushes_and_activates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/workflows/{}", WORKFLOW_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(baseline_document()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/v1/workflows/{}", WORKFLOW_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(baseline_document()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/v1/workflows/{}/activate", WORKFLOW_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": true})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = TransportConfig {
        url: "http://transport.local/api/sendText".to_string(),
        api_key: "tk-secret".to_string(),
        timeout_ms: 10_000,
    };
    let backups = tempfile::tempdir().unwrap();
    let client = EngineClient::new(&engine_config(&server)).unwrap();
    let deployer = Deployer::new(client, WORKFLOW_ID, Some(backups.path().to_path_buf()));

    deployer
        .run_edit(|document| {
            apply_resilience_rollout(document, &transport, &RetryPolicy::default(), "chat-faq-bot")
        })
        .await
        .unwrap();

    // The pushed document carries the retry pipeline, not the plain send
    let requests = server.received_requests().await.unwrap();
    let put = requests.iter().find(|r| r.method.to_string() == "PUT").unwrap();
    let body: Value = serde_json::from_slice(&put.body).unwrap();
    let node_names: Vec<&str> = body["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect();

    assert!(node_names.contains(&"Send_With_Retry"));
    assert!(node_names.contains(&"Check_Send_Status"));
    assert!(node_names.contains(&"DB_Store_Failed_Message"));
    assert!(!node_names.contains(&"Send_Response"));

    // The pre-edit backup still shows the old topology
    let backup_files: Vec<_> = std::fs::read_dir(backups.path()).unwrap().collect();
    assert_eq!(backup_files.len(), 1);
    let backup: Value = serde_json::from_str(
        &std::fs::read_to_string(backup_files[0].as_ref().unwrap().path()).unwrap(),
    )
    .unwrap();
    let backed_up: Vec<&str> = backup["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect();
    assert!(backed_up.contains(&"Send_Response"));
    assert!(!backed_up.contains(&"Send_With_Retry"));
}
