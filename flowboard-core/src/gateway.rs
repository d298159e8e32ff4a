use async_trait::async_trait;

use crate::types::{
    Board, BoardId, EntityKind, Flow, FlowId, FlowPatch, NewFlow, NewTask, Task, TaskId, TaskPatch,
};

/// Abstract persistence gateway for board backends.
/// Implementations: RestGateway (HTTP, in flowboard-client), in-memory
/// fakes for tests.
///
/// Every call is an independent request/response: no batching, no
/// transaction across calls, no ordering between concurrent calls.
/// `update_*` returns the canonical record as the backend stored it;
/// callers must write that record back over any local guess.
#[async_trait]
pub trait BoardGateway: Send + Sync {
    async fn fetch_board(&self, id: BoardId) -> Result<Board, GatewayError>;

    /// Flows of one board, sorted by `order` ascending.
    async fn list_flows(&self, board_id: BoardId) -> Result<Vec<Flow>, GatewayError>;

    async fn create_flow(&self, draft: &NewFlow) -> Result<Flow, GatewayError>;

    async fn update_flow(&self, id: FlowId, patch: &FlowPatch) -> Result<Flow, GatewayError>;

    async fn delete_flow(&self, id: FlowId) -> Result<FlowId, GatewayError>;

    /// Tasks of one flow, sorted by `order` ascending.
    async fn list_tasks(&self, flow_id: FlowId) -> Result<Vec<Task>, GatewayError>;

    async fn create_task(&self, draft: &NewTask) -> Result<Task, GatewayError>;

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, GatewayError>;

    async fn delete_task(&self, id: TaskId) -> Result<TaskId, GatewayError>;
}

/// One error per failed gateway call. `detail` carries the HTTP status
/// or transport error text verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to fetch {entity}: {detail}")]
    Fetch { entity: EntityKind, detail: String },

    #[error("failed to create {entity}: {detail}")]
    Create { entity: EntityKind, detail: String },

    #[error("failed to update {entity} {id}: {detail}")]
    Update {
        entity: EntityKind,
        id: i64,
        detail: String,
    },

    #[error("failed to delete {entity} {id}: {detail}")]
    Delete {
        entity: EntityKind,
        id: i64,
        detail: String,
    },
}

impl GatewayError {
    /// The slice whose error flag this failure belongs to.
    pub fn entity(&self) -> EntityKind {
        match self {
            GatewayError::Fetch { entity, .. }
            | GatewayError::Create { entity, .. }
            | GatewayError::Update { entity, .. }
            | GatewayError::Delete { entity, .. } => *entity,
        }
    }
}
