/// Edit plans against the remote graph
///
/// Each plan is a pure transformation of a fetched document; the Deployer
/// wraps one with fetch/backup/push/activate. The resilience rollout is the
/// big one: it swaps the plain send node for the retry pipeline and wires
/// the success/failure branches.

use crate::config::TransportConfig;
use crate::delivery::RetryPolicy;
use crate::deploy::payload;
use crate::graph::{validate, GraphDocument, GraphNode, NodeConnections};
use anyhow::{bail, Result};
use serde_json::json;

/// Install the retry pipeline: five added nodes, four modified nodes,
/// rewired lanes, and the success-chain repositioning.
pub fn apply_resilience_rollout(
    document: &mut GraphDocument,
    transport: &TransportConfig,
    policy: &RetryPolicy,
    workflow_name: &str,
) -> Result<()> {
    tracing::info!("🔧 Applying resilience rollout to '{}'", document.name);

    // The plain send node goes first; the retry node replaces it
    if document.remove_node("Send_Response") {
        tracing::info!("   Removed Send_Response");
    }

    document.add_node(GraphNode::code(
        "send-with-retry-001",
        "Send_With_Retry",
        [1328.0, 128.0],
        payload::send_with_retry(transport, policy),
    ));

    document.add_node(check_send_status_node());

    document.add_node(GraphNode::code(
        "prepare-failed-msg-001",
        "Prepare_Failed_Message",
        [1776.0, 384.0],
        payload::prepare_failed_message(policy),
    ));

    // The failure-store insert borrows credentials from the existing
    // conversation insert; both point at the same database
    let postgres_credentials = document
        .node("DB_Store_Conversation")
        .and_then(|node| node.credentials.clone());
    if postgres_credentials.is_none() {
        tracing::warn!("⚠️ No credentials found on DB_Store_Conversation to borrow");
    }
    document.add_node(store_failed_message_node(postgres_credentials));

    document.add_node(GraphNode::code(
        "build-error-log-001",
        "Build_Error_Log",
        [2224.0, 384.0],
        payload::build_error_log(workflow_name),
    ));

    convert_extract_node(document);

    if document.set_on_error_continue("AI_FAQ_Matcher") {
        tracing::info!("   AI_FAQ_Matcher set to continue on error");
    } else {
        tracing::warn!("⚠️ AI_FAQ_Matcher not found, skipping error-policy change");
    }

    if !document.set_node_param(
        "Build_Execution_Log",
        "jsCode",
        json!(payload::build_execution_log(workflow_name)),
    ) {
        tracing::warn!("⚠️ Build_Execution_Log not found, skipping payload refresh");
    }

    if !document.set_node_param(
        "Prepare_Store_Data",
        "jsCode",
        json!(payload::prepare_store_data()),
    ) {
        tracing::warn!("⚠️ Prepare_Store_Data not found, skipping payload refresh");
    }

    // Branch-first wiring: routing decides, then each branch persists
    document.connect("Extract_AI_Response", "Send_With_Retry");
    document.connect("Send_With_Retry", "Check_Send_Status");
    document.set_connections(
        "Check_Send_Status",
        NodeConnections::branch("Prepare_Store_Data", "Prepare_Failed_Message"),
    );
    document.connect("Prepare_Failed_Message", "DB_Store_Failed_Message");
    document.connect("DB_Store_Failed_Message", "Build_Error_Log");
    document.connect("Build_Error_Log", "DB_Log_Execution");

    // Shift the success chain right to make room for the new branch
    for (name, position) in [
        ("Prepare_Store_Data", [1776.0, 128.0]),
        ("DB_Store_Conversation", [2000.0, 128.0]),
        ("Build_Execution_Log", [2224.0, 128.0]),
        ("DB_Log_Execution", [2448.0, 128.0]),
        ("Send_Fallback_Error", [2448.0, 512.0]),
        ("Webhook_Response", [2672.0, 256.0]),
    ] {
        document.reposition(name, position);
    }

    validate(document)
}

/// Move conversation persistence ahead of the branch decision
///
/// After this, the conversation row is written with sent=true or sent=false
/// before routing happens:
///   Send_With_Retry → Prepare_Store_Data → DB_Store_Conversation →
///   Check_Send_Status → [true] Build_Execution_Log
///                       [false] Prepare_Failed_Message → ...
pub fn apply_persistence_rewire(document: &mut GraphDocument) -> Result<()> {
    for required in ["Send_With_Retry", "Check_Send_Status", "Prepare_Store_Data"] {
        if !document.has_node(required) {
            bail!(
                "Node '{}' not found - run the resilience rollout before rewiring persistence",
                required
            );
        }
    }

    tracing::info!("🔀 Moving conversation persistence ahead of the branch decision");
    document.connect("Send_With_Retry", "Prepare_Store_Data");
    document.connect("DB_Store_Conversation", "Check_Send_Status");
    document.set_connections(
        "Check_Send_Status",
        NodeConnections::branch("Build_Execution_Log", "Prepare_Failed_Message"),
    );

    validate(document)
}

/// Re-render only the retry-send payload (endpoint or policy changed)
pub fn refresh_send_payload(
    document: &mut GraphDocument,
    transport: &TransportConfig,
    policy: &RetryPolicy,
) -> Result<()> {
    if !document.set_node_param(
        "Send_With_Retry",
        "jsCode",
        json!(payload::send_with_retry(transport, policy)),
    ) {
        bail!("Node 'Send_With_Retry' not found - nothing to refresh");
    }
    tracing::info!("🔄 Send_With_Retry payload re-rendered");
    Ok(())
}

/// Swap the send node's body for the sandbox probe
///
/// Deliberately temporary: the next refresh-send-code run restores the real
/// payload.
pub fn install_sandbox_probe(document: &mut GraphDocument) -> Result<()> {
    if !document.set_node_param("Send_With_Retry", "jsCode", json!(payload::sandbox_probe())) {
        bail!("Node 'Send_With_Retry' not found - run the resilience rollout first");
    }
    tracing::info!("🔬 Sandbox probe installed in Send_With_Retry");
    Ok(())
}

fn check_send_status_node() -> GraphNode {
    GraphNode {
        id: "check-send-status-001".to_string(),
        name: "Check_Send_Status".to_string(),
        node_type: "n8n-nodes-base.if".to_string(),
        type_version: 2.2,
        position: [1552.0, 128.0],
        parameters: json!({
            "conditions": {
                "options": {
                    "caseSensitive": true,
                    "leftValue": "",
                    "typeValidation": "strict",
                },
                "conditions": [
                    {
                        "id": "send-status",
                        "leftValue": "={{ $json.sent }}",
                        "rightValue": true,
                        "operator": { "type": "boolean", "operation": "equals" },
                    }
                ],
                "combinator": "and",
            },
            "options": {},
        }),
        credentials: None,
        on_error: None,
        always_output_data: None,
        extra: serde_json::Map::new(),
    }
}

fn store_failed_message_node(credentials: Option<serde_json::Value>) -> GraphNode {
    GraphNode {
        id: "db-store-failed-001".to_string(),
        name: "DB_Store_Failed_Message".to_string(),
        node_type: "n8n-nodes-base.postgres".to_string(),
        type_version: 2.6,
        position: [2000.0, 384.0],
        parameters: json!({
            "operation": "insert",
            "schema": { "__rl": true, "mode": "name", "value": "public" },
            "table": { "__rl": true, "mode": "name", "value": "failed_messages" },
            "columns": { "mappingMode": "autoMapInputData", "value": null, "matchingColumns": [] },
            "options": {},
        }),
        credentials: None,
        on_error: None,
        always_output_data: None,
        extra: serde_json::Map::new(),
    }
    .with_credentials(credentials)
    .with_on_error_continue()
    .with_always_output_data()
}

/// Convert Extract_AI_Response into the fallback-aware code form, keeping
/// its id and canvas position.
fn convert_extract_node(document: &mut GraphDocument) {
    let Some(existing) = document.node("Extract_AI_Response") else {
        tracing::warn!("⚠️ Extract_AI_Response not found, skipping conversion");
        return;
    };
    let id = existing.id.clone();
    let position = existing.position;

    document.replace_node(
        "Extract_AI_Response",
        GraphNode::code(id, "Extract_AI_Response", position, payload::extract_ai_response()),
    );
    tracing::info!("   Extract_AI_Response converted to fallback-aware code node");
}
