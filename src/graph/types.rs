/// Serde model of the remote engine's workflow JSON
///
/// The document round-trips through fetch, edit, and push. Fields this tool
/// does not understand ride along in flattened maps so an edit cycle never
/// drops engine-side metadata, while the PUT body is rebuilt from scratch
/// because the update endpoint rejects most of what GET returns.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// A full workflow document as returned by GET /workflows/{id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub nodes: Vec<GraphNode>,
    /// Outgoing lanes keyed by source node name
    #[serde(default)]
    pub connections: HashMap<String, NodeConnections>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    /// Engine-side fields preserved verbatim (active, versionId, pinData, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single typed node in the remote graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(rename = "typeVersion")]
    pub type_version: f64,
    /// Canvas position, [x, y]
    pub position: [f64; 2],
    #[serde(default)]
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Value>,
    /// Engine error policy ("continueRegularOutput" keeps the run alive)
    #[serde(rename = "onError", default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
    #[serde(
        rename = "alwaysOutputData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub always_output_data: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphNode {
    /// A code node running an embedded script in the engine's sandbox
    pub fn code(
        id: impl Into<String>,
        name: impl Into<String>,
        position: [f64; 2],
        js_code: impl Into<String>,
    ) -> Self {
        let js_code: String = js_code.into();
        Self {
            id: id.into(),
            name: name.into(),
            node_type: "n8n-nodes-base.code".to_string(),
            type_version: 2.0,
            position,
            parameters: json!({ "jsCode": js_code }),
            credentials: None,
            on_error: None,
            always_output_data: None,
            extra: Map::new(),
        }
    }

    pub fn with_on_error_continue(mut self) -> Self {
        self.on_error = Some("continueRegularOutput".to_string());
        self
    }

    pub fn with_always_output_data(mut self) -> Self {
        self.always_output_data = Some(true);
        self
    }

    pub fn with_credentials(mut self, credentials: Option<Value>) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Outgoing lanes for one source node, keyed by port kind
///
/// Conditional nodes use lane 0 for the true path and lane 1 for the false
/// path; plain nodes have a single lane.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConnections {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub main: Vec<Vec<ConnectionTarget>>,
    /// Port kinds this tool does not edit (ai_tool, error, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeConnections {
    /// A single lane with a single main-port target
    pub fn single(target: impl Into<String>) -> Self {
        Self {
            main: vec![vec![ConnectionTarget::main(target)]],
            extra: Map::new(),
        }
    }

    /// Two lanes for a conditional source: true path then false path
    pub fn branch(true_target: impl Into<String>, false_target: impl Into<String>) -> Self {
        Self {
            main: vec![
                vec![ConnectionTarget::main(true_target)],
                vec![ConnectionTarget::main(false_target)],
            ],
            extra: Map::new(),
        }
    }
}

/// One edge endpoint inside a lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub node: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub index: u32,
}

impl ConnectionTarget {
    pub fn main(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            kind: "main".to_string(),
            index: 0,
        }
    }
}

/// The restricted body accepted by PUT /workflows/{id}
///
/// The update endpoint rejects documents carrying read-only fields, so the
/// push body is exactly these four and nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatePayload {
    pub name: String,
    pub nodes: Vec<GraphNode>,
    pub connections: HashMap<String, NodeConnections>,
    pub settings: Value,
}

impl GraphDocument {
    pub fn to_update_payload(&self) -> UpdatePayload {
        UpdatePayload {
            name: self.name.clone(),
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            settings: json!({ "executionOrder": "v1" }),
        }
    }
}
