use crate::types::{EntityKind, Flow, FlowId, FlowPatch, Task, TaskId, TaskPatch};
/// Ordering reconciliation for drag-and-drop gestures.
///
/// Recomputes contiguous zero-based `order` values after a flow or task
/// drag and reduces the result to the minimal set of update intents:
/// one intent per record whose persisted fields actually change, with
/// only the changed fields populated.
use thiserror::Error;

/// A task position inside a specific flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSlot {
    pub flow_id: FlowId,
    pub index: usize,
}

impl TaskSlot {
    pub fn new(flow_id: FlowId, index: usize) -> Self {
        Self { flow_id, index }
    }
}

/// The end of a drag gesture as reported by the board surface.
/// A `None` destination means the pointer was released outside any
/// droppable target and the gesture is void.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEnd {
    Flow {
        id: FlowId,
        source_index: usize,
        destination_index: Option<usize>,
    },
    Task {
        id: TaskId,
        source: TaskSlot,
        destination: Option<TaskSlot>,
    },
}

impl DragEnd {
    /// True when the gesture ended outside any valid drop target.
    pub fn is_cancelled(&self) -> bool {
        match self {
            DragEnd::Flow {
                destination_index, ..
            } => destination_index.is_none(),
            DragEnd::Task { destination, .. } => destination.is_none(),
        }
    }
}

/// Read-only view of the entities reconciliation runs against.
/// Collection order is irrelevant; positions are derived from the
/// `order` fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSnapshot {
    pub flows: Vec<Flow>,
    pub tasks: Vec<Task>,
}

/// One pending persistence update produced by reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateIntent {
    Flow { id: FlowId, patch: FlowPatch },
    Task { id: TaskId, patch: TaskPatch },
}

impl UpdateIntent {
    pub fn entity(&self) -> EntityKind {
        match self {
            UpdateIntent::Flow { .. } => EntityKind::Flow,
            UpdateIntent::Task { .. } => EntityKind::Task,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            UpdateIntent::Flow { id, .. } => *id,
            UpdateIntent::Task { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The dragged record is not in the snapshot; the gesture referred
    /// to state that no longer exists and must not be persisted.
    #[error("dragged {entity} {id} is not in the current snapshot")]
    StaleReference { entity: EntityKind, id: i64 },
}

/// Turn a finished drag into update intents against `snapshot`.
///
/// Cancelled gestures and same-position drops produce no intents.
/// Records the drag does not disturb are never mentioned, so replaying
/// the same gesture against an already-reconciled snapshot yields an
/// empty set.
pub fn reconcile(
    event: &DragEnd,
    snapshot: &BoardSnapshot,
) -> Result<Vec<UpdateIntent>, ReconcileError> {
    match event {
        DragEnd::Flow {
            destination_index: None,
            ..
        }
        | DragEnd::Task {
            destination: None, ..
        } => Ok(Vec::new()),
        DragEnd::Flow {
            id,
            source_index,
            destination_index: Some(destination),
        } => reconcile_flows(*id, *source_index, *destination, snapshot),
        DragEnd::Task {
            id,
            source,
            destination: Some(destination),
        } => reconcile_tasks(*id, *source, *destination, snapshot),
    }
}

fn reconcile_flows(
    id: FlowId,
    source_index: usize,
    destination_index: usize,
    snapshot: &BoardSnapshot,
) -> Result<Vec<UpdateIntent>, ReconcileError> {
    if destination_index == source_index {
        return Ok(Vec::new());
    }
    let dragged = snapshot
        .flows
        .iter()
        .find(|flow| flow.id == id)
        .ok_or(ReconcileError::StaleReference {
            entity: EntityKind::Flow,
            id,
        })?;

    // Splice the dragged flow out of the ordered sequence and back in
    // at the destination, then renumber from zero.
    let mut flows: Vec<&Flow> = snapshot.flows.iter().filter(|flow| flow.id != id).collect();
    flows.sort_by_key(|flow| flow.order);
    let slot = destination_index.min(flows.len());
    flows.insert(slot, dragged);

    Ok(flows
        .iter()
        .enumerate()
        .filter(|(position, flow)| flow.order != *position as i64)
        .map(|(position, flow)| UpdateIntent::Flow {
            id: flow.id,
            patch: FlowPatch::order(position as i64),
        })
        .collect())
}

fn reconcile_tasks(
    id: TaskId,
    source: TaskSlot,
    destination: TaskSlot,
    snapshot: &BoardSnapshot,
) -> Result<Vec<UpdateIntent>, ReconcileError> {
    // Dropping a task back on its own slot changes nothing.
    if source.flow_id == destination.flow_id && source.index == destination.index {
        return Ok(Vec::new());
    }

    let dragged = snapshot
        .tasks
        .iter()
        .find(|task| task.id == id)
        .ok_or(ReconcileError::StaleReference {
            entity: EntityKind::Task,
            id,
        })?;

    // The snapshot, not the event, decides which flow the task leaves.
    // A replayed gesture then degenerates into a same-flow reorder and
    // reconciles to nothing instead of moving the task twice.
    let current_flow = dragged.flow_node_id;

    if current_flow == destination.flow_id {
        let mut siblings = flow_members(snapshot, current_flow, id);
        let slot = destination.index.min(siblings.len());
        siblings.insert(slot, dragged);

        return Ok(siblings
            .iter()
            .enumerate()
            .filter(|(position, task)| task.order != *position as i64)
            .map(|(position, task)| UpdateIntent::Task {
                id: task.id,
                patch: TaskPatch::order(position as i64),
            })
            .collect());
    }

    let mut intents = Vec::new();

    // Source flow closes the gap the task leaves behind.
    let source_rest = flow_members(snapshot, current_flow, id);
    for (position, task) in source_rest.iter().enumerate() {
        if task.order != position as i64 {
            intents.push(UpdateIntent::Task {
                id: task.id,
                patch: TaskPatch::order(position as i64),
            });
        }
    }

    // Destination flow takes the task at the drop slot. The moved task
    // always carries its new flow id, even when its numeric order
    // happens to be unchanged.
    let mut destination_members = flow_members(snapshot, destination.flow_id, id);
    let slot = destination.index.min(destination_members.len());
    destination_members.insert(slot, dragged);
    for (position, task) in destination_members.iter().enumerate() {
        if task.id == id {
            let mut patch = TaskPatch {
                flow_node_id: Some(destination.flow_id),
                ..TaskPatch::default()
            };
            if task.order != position as i64 {
                patch.order = Some(position as i64);
            }
            intents.push(UpdateIntent::Task { id, patch });
        } else if task.order != position as i64 {
            intents.push(UpdateIntent::Task {
                id: task.id,
                patch: TaskPatch::order(position as i64),
            });
        }
    }

    Ok(intents)
}

/// Tasks of one flow ordered by `order`, with the dragged task left out.
fn flow_members(snapshot: &BoardSnapshot, flow_id: FlowId, dragged_id: TaskId) -> Vec<&Task> {
    let mut members: Vec<&Task> = snapshot
        .tasks
        .iter()
        .filter(|task| task.flow_node_id == flow_id && task.id != dragged_id)
        .collect();
    members.sort_by_key(|task| task.order);
    members
}
