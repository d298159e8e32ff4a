pub mod actions;
pub mod dispatch;
pub mod gateway;
/// Flowboard client core: entity types, the in-memory entity store,
/// the persistence gateway contract, and the drag reconciliation engine
/// with its dispatch/refresh orchestration.
pub mod reorder;
pub mod store;
pub mod types;

pub use gateway::{BoardGateway, GatewayError};
pub use reorder::{reconcile, BoardSnapshot, DragEnd, ReconcileError, TaskSlot, UpdateIntent};
pub use store::{EntityStore, StoreEvent};
