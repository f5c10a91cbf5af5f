/// Graph surgery operations
///
/// The same add/remove/rewire/reposition moves the one-shot migration
/// scripts perform against the fetched document, exposed as reusable
/// operations keyed by node name (connections are name-keyed on the wire,
/// so names are the stable handle here, not ids).

use crate::graph::types::{GraphDocument, GraphNode, NodeConnections};
use serde_json::Value;

impl GraphDocument {
    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    /// Remove a node and its outgoing lanes. Inbound lanes still pointing at
    /// it are the caller's to rewire. Returns whether the node existed.
    pub fn remove_node(&mut self, name: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.name != name);
        self.connections.remove(name);
        self.nodes.len() != before
    }

    /// Append a node to the document
    pub fn add_node(&mut self, node: GraphNode) {
        tracing::debug!("➕ Adding node '{}' at {:?}", node.name, node.position);
        self.nodes.push(node);
    }

    /// Swap a named node for a replacement, keeping its slot in the list.
    /// Returns whether the node existed.
    pub fn replace_node(&mut self, name: &str, replacement: GraphNode) -> bool {
        match self.nodes.iter_mut().find(|n| n.name == name) {
            Some(slot) => {
                *slot = replacement;
                true
            }
            None => false,
        }
    }

    /// Overwrite the outgoing lanes of a source node
    pub fn set_connections(&mut self, from: impl Into<String>, lanes: NodeConnections) {
        self.connections.insert(from.into(), lanes);
    }

    /// Point a source's single main lane at one target
    pub fn connect(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.connections
            .insert(from.into(), NodeConnections::single(to));
    }

    pub fn reposition(&mut self, name: &str, position: [f64; 2]) -> bool {
        match self.node_mut(name) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Set one key inside a node's parameters object. Returns false when the
    /// node is missing or its parameters are not an object.
    pub fn set_node_param(&mut self, name: &str, key: &str, value: Value) -> bool {
        match self.node_mut(name) {
            Some(node) => match node.parameters.as_object_mut() {
                Some(params) => {
                    params.insert(key.to_string(), value);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    pub fn set_on_error_continue(&mut self, name: &str) -> bool {
        match self.node_mut(name) {
            Some(node) => {
                node.on_error = Some("continueRegularOutput".to_string());
                true
            }
            None => false,
        }
    }
}
