/// Relaymend: resilient chat delivery with remote workflow-graph patching
///
/// This library pairs a directly-invocable delivery component (bounded
/// retries, exponential backoff, structured outcomes) with the deployment
/// adapter that installs the same logic into a remotely-hosted workflow
/// graph over its REST API.

// Configuration: engine API, transport endpoint, database
pub mod config;

// The resilient delivery unit and its transport seam
pub mod delivery;

// Outcome routing and record persistence downstream of delivery
pub mod pipeline;

// Remote graph document model, surgery operations, validation
pub mod graph;

// REST client for the remote engine (fetch/update/activate)
pub mod engine;

// Deployment plans and the fetch-edit-push-activate adapter
pub mod deploy;

// Re-export commonly used types for external consumers
pub use config::Config;
pub use delivery::{DeliveryOutcome, DeliveryRequest, DeliveryUnit, HttpTransport, RetryPolicy};
pub use engine::EngineClient;
pub use graph::{GraphDocument, GraphNode};
pub use pipeline::{route_outcome, DeliveryStore, TurnContext};
