/// Pre-push structural validation
///
/// Compiles the name-keyed connections map into a petgraph digraph and
/// rejects documents that reference unknown nodes or contain cycles before
/// they ever reach the engine. The engine would eventually refuse or, worse,
/// accept and loop; catching it locally keeps a bad edit from landing.

use crate::graph::types::GraphDocument;
use anyhow::{anyhow, Result};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::collections::HashMap;

pub fn validate(document: &GraphDocument) -> Result<()> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index_by_name = HashMap::new();

    for node in &document.nodes {
        let index = graph.add_node(node.name.as_str());
        index_by_name.insert(node.name.as_str(), index);
    }

    for (from, lanes) in &document.connections {
        let from_index = *index_by_name
            .get(from.as_str())
            .ok_or_else(|| anyhow!("Connection source references unknown node: {}", from))?;

        for lane in &lanes.main {
            for target in lane {
                let to_index = *index_by_name.get(target.node.as_str()).ok_or_else(|| {
                    anyhow!(
                        "Connection '{}' → '{}' references unknown node",
                        from,
                        target.node
                    )
                })?;
                graph.add_edge(from_index, to_index, ());
            }
        }
    }

    toposort(&graph, None)
        .map_err(|_| anyhow!("Workflow contains cycles - must be a DAG"))?;

    tracing::debug!(
        "✅ Graph validated: {} nodes, {} connection sources",
        document.nodes.len(),
        document.connections.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(connections: serde_json::Value) -> GraphDocument {
        serde_json::from_value(json!({
            "name": "chat-faq-bot",
            "nodes": [
                {"id": "a", "name": "A", "type": "n8n-nodes-base.code", "typeVersion": 2.0, "position": [0.0, 0.0], "parameters": {}},
                {"id": "b", "name": "B", "type": "n8n-nodes-base.code", "typeVersion": 2.0, "position": [224.0, 0.0], "parameters": {}},
                {"id": "c", "name": "C", "type": "n8n-nodes-base.code", "typeVersion": 2.0, "position": [448.0, 0.0], "parameters": {}}
            ],
            "connections": connections
        }))
        .unwrap()
    }

    #[test]
    fn accepts_a_well_formed_dag() {
        let doc = document(json!({
            "A": {"main": [[{"node": "B", "type": "main", "index": 0}]]},
            "B": {"main": [
                [{"node": "C", "type": "main", "index": 0}],
                [{"node": "C", "type": "main", "index": 0}]
            ]}
        }));
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn rejects_an_unknown_target() {
        let doc = document(json!({
            "A": {"main": [[{"node": "Ghost", "type": "main", "index": 0}]]}
        }));
        let err = validate(&doc).unwrap_err().to_string();
        assert!(err.contains("Ghost"), "unexpected error: {}", err);
    }

    #[test]
    fn rejects_an_unknown_source() {
        let doc = document(json!({
            "Phantom": {"main": [[{"node": "A", "type": "main", "index": 0}]]}
        }));
        let err = validate(&doc).unwrap_err().to_string();
        assert!(err.contains("Phantom"), "unexpected error: {}", err);
    }

    #[test]
    fn rejects_a_cycle() {
        let doc = document(json!({
            "A": {"main": [[{"node": "B", "type": "main", "index": 0}]]},
            "B": {"main": [[{"node": "C", "type": "main", "index": 0}]]},
            "C": {"main": [[{"node": "A", "type": "main", "index": 0}]]}
        }));
        let err = validate(&doc).unwrap_err().to_string();
        assert!(err.contains("cycles"), "unexpected error: {}", err);
    }
}
