/// Remote workflow-graph layer
///
/// The engine's graph document as serde types, the surgery operations the
/// deployment plans are built from, and the structural validation run
/// before any push.

// Serde model of the engine's workflow JSON
pub mod types;

// Targeted edits: add/remove/replace nodes, rewire lanes, reposition
pub mod edit;

// Pre-push validation: endpoints exist, graph is acyclic
pub mod validate;

pub use types::{ConnectionTarget, GraphDocument, GraphNode, NodeConnections, UpdatePayload};
pub use validate::validate;
