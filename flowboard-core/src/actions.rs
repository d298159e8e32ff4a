/// Entity actions: one async helper per backend operation, each pairing
/// the gateway call with its store slice lifecycle (loading flag on
/// entry, data or error flag on exit). The returned value is the
/// canonical backend response, already written into the store.
use crate::gateway::{BoardGateway, GatewayError};
use crate::store::EntityStore;
use crate::types::{Board, Flow, FlowId, FlowPatch, NewFlow, NewTask, Task, TaskId, TaskPatch};

pub async fn fetch_board<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
) -> Result<Board, GatewayError> {
    store.set_board_loading();
    match gateway.fetch_board(store.board_id()).await {
        Ok(board) => {
            store.set_board(board.clone());
            Ok(board)
        }
        Err(e) => {
            log::warn!("[flowboard.actions] fetch_board: {}", e);
            store.set_board_error(e.to_string());
            Err(e)
        }
    }
}

/// Fetch every flow of the store's board and replace the flow slice.
pub async fn fetch_flows<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
) -> Result<Vec<Flow>, GatewayError> {
    store.set_flows_loading();
    match gateway.list_flows(store.board_id()).await {
        Ok(flows) => {
            store.set_flows(flows.clone());
            Ok(flows)
        }
        Err(e) => {
            log::warn!("[flowboard.actions] fetch_flows: {}", e);
            store.set_flows_error(e.to_string());
            Err(e)
        }
    }
}

pub async fn create_flow<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
    draft: &NewFlow,
) -> Result<Flow, GatewayError> {
    store.set_flows_loading();
    match gateway.create_flow(draft).await {
        Ok(flow) => {
            store.push_flow(flow.clone());
            Ok(flow)
        }
        Err(e) => {
            log::warn!("[flowboard.actions] create_flow: {}", e);
            store.set_flows_error(e.to_string());
            Err(e)
        }
    }
}

pub async fn update_flow<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
    id: FlowId,
    patch: &FlowPatch,
) -> Result<Flow, GatewayError> {
    store.set_flows_loading();
    match gateway.update_flow(id, patch).await {
        Ok(flow) => {
            store.replace_flow(flow.clone());
            Ok(flow)
        }
        Err(e) => {
            log::warn!("[flowboard.actions] update_flow {}: {}", id, e);
            store.set_flows_error(e.to_string());
            Err(e)
        }
    }
}

pub async fn delete_flow<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
    id: FlowId,
) -> Result<FlowId, GatewayError> {
    store.set_flows_loading();
    match gateway.delete_flow(id).await {
        Ok(deleted) => {
            store.remove_flow(deleted);
            Ok(deleted)
        }
        Err(e) => {
            log::warn!("[flowboard.actions] delete_flow {}: {}", id, e);
            store.set_flows_error(e.to_string());
            Err(e)
        }
    }
}

/// Fetch the tasks of one flow and replace that flow's page in the
/// task slice. Tasks cached for other flows are left alone.
pub async fn fetch_tasks<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
    flow_id: FlowId,
) -> Result<Vec<Task>, GatewayError> {
    store.set_tasks_loading();
    match gateway.list_tasks(flow_id).await {
        Ok(tasks) => {
            store.set_tasks_for_flow(flow_id, tasks.clone());
            Ok(tasks)
        }
        Err(e) => {
            log::warn!("[flowboard.actions] fetch_tasks for flow {}: {}", flow_id, e);
            store.set_tasks_error(e.to_string());
            Err(e)
        }
    }
}

pub async fn create_task<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
    draft: &NewTask,
) -> Result<Task, GatewayError> {
    store.set_tasks_loading();
    match gateway.create_task(draft).await {
        Ok(task) => {
            store.push_task(task.clone());
            Ok(task)
        }
        Err(e) => {
            log::warn!("[flowboard.actions] create_task: {}", e);
            store.set_tasks_error(e.to_string());
            Err(e)
        }
    }
}

pub async fn update_task<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
    id: TaskId,
    patch: &TaskPatch,
) -> Result<Task, GatewayError> {
    store.set_tasks_loading();
    match gateway.update_task(id, patch).await {
        Ok(task) => {
            store.replace_task(task.clone());
            Ok(task)
        }
        Err(e) => {
            log::warn!("[flowboard.actions] update_task {}: {}", id, e);
            store.set_tasks_error(e.to_string());
            Err(e)
        }
    }
}

pub async fn delete_task<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
    id: TaskId,
) -> Result<TaskId, GatewayError> {
    store.set_tasks_loading();
    match gateway.delete_task(id).await {
        Ok(deleted) => {
            store.remove_task(deleted);
            Ok(deleted)
        }
        Err(e) => {
            log::warn!("[flowboard.actions] delete_task {}: {}", id, e);
            store.set_tasks_error(e.to_string());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::types::{Board, EntityKind};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    fn make_flow(id: FlowId, order: i64) -> Flow {
        Flow {
            id,
            board_node_id: 1,
            title: format!("Flow {}", id),
            description: String::new(),
            order,
        }
    }

    fn make_task(id: TaskId, flow_id: FlowId, order: i64) -> Task {
        Task {
            id,
            flow_node_id: flow_id,
            title: format!("Task {}", id),
            description: String::new(),
            order,
            progress: 0,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    /// Gateway fake: canned responses, optional blanket failure, and a
    /// call log for asserting what went over the wire.
    #[derive(Default)]
    struct StubGateway {
        flows: Vec<Flow>,
        tasks: Vec<Task>,
        fail: bool,
        calls: Mutex<Vec<String>>,
    }

    impl StubGateway {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BoardGateway for StubGateway {
        async fn fetch_board(&self, id: crate::types::BoardId) -> Result<Board, GatewayError> {
            self.record(format!("fetch_board {}", id));
            if self.fail {
                return Err(GatewayError::Fetch {
                    entity: EntityKind::Board,
                    detail: "503 Service Unavailable".to_string(),
                });
            }
            Ok(Board { id })
        }

        async fn list_flows(
            &self,
            board_id: crate::types::BoardId,
        ) -> Result<Vec<Flow>, GatewayError> {
            self.record(format!("list_flows {}", board_id));
            if self.fail {
                return Err(GatewayError::Fetch {
                    entity: EntityKind::Flow,
                    detail: "503 Service Unavailable".to_string(),
                });
            }
            Ok(self.flows.clone())
        }

        async fn create_flow(&self, draft: &NewFlow) -> Result<Flow, GatewayError> {
            self.record(format!("create_flow {}", draft.title));
            Ok(Flow {
                id: 99,
                board_node_id: draft.board_node_id,
                title: draft.title.clone(),
                description: draft.description.clone(),
                order: self.flows.len() as i64,
            })
        }

        async fn update_flow(&self, id: FlowId, patch: &FlowPatch) -> Result<Flow, GatewayError> {
            self.record(format!("update_flow {}", id));
            let mut flow = self
                .flows
                .iter()
                .find(|f| f.id == id)
                .cloned()
                .ok_or_else(|| GatewayError::Update {
                    entity: EntityKind::Flow,
                    id,
                    detail: "404 Not Found".to_string(),
                })?;
            patch.apply_to(&mut flow);
            Ok(flow)
        }

        async fn delete_flow(&self, id: FlowId) -> Result<FlowId, GatewayError> {
            self.record(format!("delete_flow {}", id));
            if self.fail {
                return Err(GatewayError::Delete {
                    entity: EntityKind::Flow,
                    id,
                    detail: "500 Internal Server Error".to_string(),
                });
            }
            Ok(id)
        }

        async fn list_tasks(&self, flow_id: FlowId) -> Result<Vec<Task>, GatewayError> {
            self.record(format!("list_tasks {}", flow_id));
            Ok(self
                .tasks
                .iter()
                .filter(|t| t.flow_node_id == flow_id)
                .cloned()
                .collect())
        }

        async fn create_task(&self, draft: &NewTask) -> Result<Task, GatewayError> {
            self.record(format!("create_task {}", draft.title));
            Ok(Task {
                id: 99,
                flow_node_id: draft.flow_node_id,
                title: draft.title.clone(),
                description: draft.description.clone(),
                order: 0,
                progress: 0,
                created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            })
        }

        async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, GatewayError> {
            self.record(format!("update_task {}", id));
            let mut task = self
                .tasks
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| GatewayError::Update {
                    entity: EntityKind::Task,
                    id,
                    detail: "404 Not Found".to_string(),
                })?;
            patch.apply_to(&mut task);
            Ok(task)
        }

        async fn delete_task(&self, id: TaskId) -> Result<TaskId, GatewayError> {
            self.record(format!("delete_task {}", id));
            Ok(id)
        }
    }

    #[tokio::test]
    async fn test_fetch_flows_fills_slice_and_clears_loading() {
        let gateway = StubGateway {
            flows: vec![make_flow(1, 0), make_flow(2, 1)],
            ..StubGateway::default()
        };
        let store = EntityStore::new(1);

        let flows = fetch_flows(&gateway, &store).await.unwrap();
        assert_eq!(flows.len(), 2);
        assert_eq!(store.flows_ordered().len(), 2);
        assert!(!store.flows_loading());
        assert_eq!(store.flows_error(), None);
        assert_eq!(gateway.calls(), vec!["list_flows 1"]);
    }

    #[tokio::test]
    async fn test_fetch_flows_failure_sets_error_and_keeps_data() {
        let store = EntityStore::new(1);
        store.set_flows(vec![make_flow(1, 0)]);

        let gateway = StubGateway {
            fail: true,
            ..StubGateway::default()
        };
        let err = fetch_flows(&gateway, &store).await.unwrap_err();
        assert_eq!(err.entity(), EntityKind::Flow);
        assert!(store.flows_error().is_some());
        assert!(!store.flows_loading());
        // stale page survives the failed refresh
        assert_eq!(store.flows_ordered().len(), 1);
    }

    #[tokio::test]
    async fn test_update_task_writes_canonical_record_back() {
        let gateway = StubGateway {
            tasks: vec![make_task(1, 1, 0)],
            ..StubGateway::default()
        };
        let store = EntityStore::new(1);
        store.set_tasks_for_flow(1, vec![make_task(1, 1, 0)]);

        let patch = TaskPatch {
            title: Some("Renamed".to_string()),
            ..TaskPatch::default()
        };
        let task = update_task(&gateway, &store, 1, &patch).await.unwrap();
        assert_eq!(task.title, "Renamed");
        assert_eq!(store.tasks_for_flow(1)[0].title, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_task_filters_record_out() {
        let gateway = StubGateway::default();
        let store = EntityStore::new(1);
        store.set_tasks_for_flow(1, vec![make_task(1, 1, 0), make_task(2, 1, 1)]);

        delete_task(&gateway, &store, 1).await.unwrap();
        let ids: Vec<TaskId> = store.tasks_for_flow(1).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn test_create_flow_appends_backend_record() {
        let gateway = StubGateway::default();
        let store = EntityStore::new(1);
        let draft = NewFlow {
            title: "Done".to_string(),
            description: String::new(),
            board_node_id: 1,
        };
        let flow = create_flow(&gateway, &store, &draft).await.unwrap();
        assert_eq!(flow.id, 99);
        assert_eq!(store.flows_ordered()[0].id, 99);
    }

    #[tokio::test]
    async fn test_fetch_board_failure_flags_board_slice() {
        let gateway = StubGateway {
            fail: true,
            ..StubGateway::default()
        };
        let store = EntityStore::new(3);
        assert!(fetch_board(&gateway, &store).await.is_err());
        assert!(store.board_error().is_some());
        assert_eq!(store.board(), None);
    }
}
