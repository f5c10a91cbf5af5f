/// Outcome routing and persistence
///
/// Everything downstream of a delivery attempt sequence:
/// - Record shaping for the three durable tables
/// - The success/failure routing decision, as a pure function
/// - Insert-only Postgres writes that never abort the surrounding flow

// Durable record types (conversation, failure, execution log)
pub mod records;

// The binary routing step over DeliveryOutcome.sent
pub mod routing;

// Postgres persistence with continue-on-error semantics
pub mod store;

pub use records::{
    ConversationRecord, ExecutionLogRecord, ExecutionStatus, FailedMessageRecord, TurnContext,
};
pub use routing::{route_outcome, RoutedBranch, RoutedTurn};
pub use store::DeliveryStore;
