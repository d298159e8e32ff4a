use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tokio::sync::broadcast;

use crate::reorder::{BoardSnapshot, UpdateIntent};
use crate::types::{Board, BoardId, EntityKind, Flow, FlowId, Task, TaskId};

/// Change notifications emitted after store mutations. Subscribers get
/// them best-effort over a broadcast channel; a lagging receiver drops
/// events rather than blocking writers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreEvent {
    BoardLoaded {
        board_id: BoardId,
    },
    FlowsChanged,
    TasksChanged {
        flow_id: FlowId,
    },
    /// A remote call for the given slice failed; the slice keeps its
    /// last data and records the error text.
    ScopeFailed {
        entity: EntityKind,
    },
}

#[derive(Debug, Default)]
struct BoardSlice {
    board: Option<Board>,
    loading: bool,
    error: Option<String>,
}

#[derive(Debug, Default)]
struct FlowSlice {
    flows: Vec<Flow>,
    loading: bool,
    error: Option<String>,
}

#[derive(Debug, Default)]
struct TaskSlice {
    tasks: Vec<Task>,
    loading: bool,
    error: Option<String>,
}

/// In-memory mirror of one board's entities, split into a slice per
/// entity family. Each slice pairs its data with a loading flag and the
/// last error text, so a UI can render spinners and failures per scope.
///
/// All reads hand out clones; locks are never held across await points.
pub struct EntityStore {
    board_id: BoardId,
    board: RwLock<BoardSlice>,
    flows: RwLock<FlowSlice>,
    tasks: RwLock<TaskSlice>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl EntityStore {
    pub fn new(board_id: BoardId) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            board_id,
            board: RwLock::new(BoardSlice::default()),
            flows: RwLock::new(FlowSlice::default()),
            tasks: RwLock::new(TaskSlice::default()),
            event_tx,
        }
    }

    /// The board this store mirrors. Every gateway call is scoped to it.
    pub fn board_id(&self) -> BoardId {
        self.board_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        let _ = self.event_tx.send(event);
    }

    // ------ board slice ------

    pub fn board(&self) -> Option<Board> {
        self.board.read().unwrap().board.clone()
    }

    pub fn board_loading(&self) -> bool {
        self.board.read().unwrap().loading
    }

    pub fn board_error(&self) -> Option<String> {
        self.board.read().unwrap().error.clone()
    }

    pub fn set_board_loading(&self) {
        let mut slice = self.board.write().unwrap();
        slice.loading = true;
        slice.error = None;
    }

    pub fn set_board(&self, board: Board) {
        let board_id = board.id;
        {
            let mut slice = self.board.write().unwrap();
            slice.loading = false;
            slice.board = Some(board);
        }
        self.emit(StoreEvent::BoardLoaded { board_id });
    }

    pub fn set_board_error(&self, error: impl Into<String>) {
        {
            let mut slice = self.board.write().unwrap();
            slice.loading = false;
            slice.error = Some(error.into());
        }
        self.emit(StoreEvent::ScopeFailed {
            entity: EntityKind::Board,
        });
    }

    // ------ flow slice ------

    /// Flows sorted by their `order` field.
    pub fn flows_ordered(&self) -> Vec<Flow> {
        let mut flows = self.flows.read().unwrap().flows.clone();
        flows.sort_by_key(|flow| flow.order);
        flows
    }

    pub fn flows_loading(&self) -> bool {
        self.flows.read().unwrap().loading
    }

    pub fn flows_error(&self) -> Option<String> {
        self.flows.read().unwrap().error.clone()
    }

    pub fn set_flows_loading(&self) {
        let mut slice = self.flows.write().unwrap();
        slice.loading = true;
        slice.error = None;
    }

    pub fn set_flows(&self, flows: Vec<Flow>) {
        {
            let mut slice = self.flows.write().unwrap();
            slice.loading = false;
            slice.flows = flows;
        }
        self.emit(StoreEvent::FlowsChanged);
    }

    pub fn push_flow(&self, flow: Flow) {
        {
            let mut slice = self.flows.write().unwrap();
            slice.loading = false;
            slice.flows.push(flow);
        }
        self.emit(StoreEvent::FlowsChanged);
    }

    /// Overwrite the stored flow with the canonical record from the
    /// backend. Unknown ids are ignored.
    pub fn replace_flow(&self, flow: Flow) {
        {
            let mut slice = self.flows.write().unwrap();
            slice.loading = false;
            if let Some(stored) = slice.flows.iter_mut().find(|f| f.id == flow.id) {
                *stored = flow;
            }
        }
        self.emit(StoreEvent::FlowsChanged);
    }

    pub fn remove_flow(&self, id: FlowId) {
        {
            let mut slice = self.flows.write().unwrap();
            slice.loading = false;
            slice.flows.retain(|flow| flow.id != id);
        }
        self.emit(StoreEvent::FlowsChanged);
    }

    pub fn set_flows_error(&self, error: impl Into<String>) {
        {
            let mut slice = self.flows.write().unwrap();
            slice.loading = false;
            slice.error = Some(error.into());
        }
        self.emit(StoreEvent::ScopeFailed {
            entity: EntityKind::Flow,
        });
    }

    // ------ task slice ------

    /// Tasks of one flow sorted by their `order` field.
    pub fn tasks_for_flow(&self, flow_id: FlowId) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .unwrap()
            .tasks
            .iter()
            .filter(|task| task.flow_node_id == flow_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.order);
        tasks
    }

    pub fn tasks_loading(&self) -> bool {
        self.tasks.read().unwrap().loading
    }

    pub fn tasks_error(&self) -> Option<String> {
        self.tasks.read().unwrap().error.clone()
    }

    pub fn set_tasks_loading(&self) {
        let mut slice = self.tasks.write().unwrap();
        slice.loading = true;
        slice.error = None;
    }

    /// Replace the tasks of one flow with a freshly fetched page.
    /// Tasks cached for other flows are left alone.
    pub fn set_tasks_for_flow(&self, flow_id: FlowId, tasks: Vec<Task>) {
        {
            let mut slice = self.tasks.write().unwrap();
            slice.loading = false;
            slice.tasks.retain(|task| task.flow_node_id != flow_id);
            slice.tasks.extend(tasks);
        }
        self.emit(StoreEvent::TasksChanged { flow_id });
    }

    pub fn push_task(&self, task: Task) {
        let flow_id = task.flow_node_id;
        {
            let mut slice = self.tasks.write().unwrap();
            slice.loading = false;
            slice.tasks.push(task);
        }
        self.emit(StoreEvent::TasksChanged { flow_id });
    }

    /// Overwrite the stored task with the canonical record from the
    /// backend. When the record moved between flows, both the old and
    /// the new flow get a change event.
    pub fn replace_task(&self, task: Task) {
        let new_flow = task.flow_node_id;
        let mut old_flow = None;
        {
            let mut slice = self.tasks.write().unwrap();
            slice.loading = false;
            if let Some(stored) = slice.tasks.iter_mut().find(|t| t.id == task.id) {
                old_flow = Some(stored.flow_node_id);
                *stored = task;
            }
        }
        match old_flow {
            Some(old) if old != new_flow => {
                self.emit(StoreEvent::TasksChanged { flow_id: old });
                self.emit(StoreEvent::TasksChanged { flow_id: new_flow });
            }
            Some(_) => self.emit(StoreEvent::TasksChanged { flow_id: new_flow }),
            None => {}
        }
    }

    pub fn remove_task(&self, id: TaskId) {
        let mut removed_from = None;
        {
            let mut slice = self.tasks.write().unwrap();
            slice.loading = false;
            if let Some(task) = slice.tasks.iter().find(|t| t.id == id) {
                removed_from = Some(task.flow_node_id);
            }
            slice.tasks.retain(|task| task.id != id);
        }
        if let Some(flow_id) = removed_from {
            self.emit(StoreEvent::TasksChanged { flow_id });
        }
    }

    pub fn set_tasks_error(&self, error: impl Into<String>) {
        {
            let mut slice = self.tasks.write().unwrap();
            slice.loading = false;
            slice.error = Some(error.into());
        }
        self.emit(StoreEvent::ScopeFailed {
            entity: EntityKind::Task,
        });
    }

    // ------ reconciliation support ------

    /// Copy of the flow and task collections for reconciliation.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            flows: self.flows.read().unwrap().flows.clone(),
            tasks: self.tasks.read().unwrap().tasks.clone(),
        }
    }

    /// Optimistically fold update intents into the cached records, so
    /// the board renders the post-drag layout before the backend
    /// answers. Canonical responses later overwrite these guesses.
    pub fn apply_intents(&self, intents: &[UpdateIntent]) {
        let mut flows_changed = false;
        let mut changed_task_flows: Vec<FlowId> = Vec::new();

        {
            let mut slice = self.flows.write().unwrap();
            for intent in intents {
                if let UpdateIntent::Flow { id, patch } = intent {
                    if let Some(flow) = slice.flows.iter_mut().find(|f| f.id == *id) {
                        patch.apply_to(flow);
                        flows_changed = true;
                    }
                }
            }
        }
        {
            let mut slice = self.tasks.write().unwrap();
            for intent in intents {
                if let UpdateIntent::Task { id, patch } = intent {
                    if let Some(task) = slice.tasks.iter_mut().find(|t| t.id == *id) {
                        let old_flow = task.flow_node_id;
                        patch.apply_to(task);
                        for flow_id in [old_flow, task.flow_node_id] {
                            if !changed_task_flows.contains(&flow_id) {
                                changed_task_flows.push(flow_id);
                            }
                        }
                    }
                }
            }
        }

        if flows_changed {
            self.emit(StoreEvent::FlowsChanged);
        }
        for flow_id in changed_task_flows {
            self.emit(StoreEvent::TasksChanged { flow_id });
        }
    }
}
