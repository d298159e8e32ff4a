/// Update dispatch and scope refresh: pushes reconciliation intents to
/// the backend concurrently, writes canonical responses back over the
/// optimistic local guesses, and re-fetches every scope a drag touched.
use futures_util::future::join_all;

use crate::actions;
use crate::gateway::{BoardGateway, GatewayError};
use crate::reorder::{reconcile, DragEnd, ReconcileError, UpdateIntent};
use crate::store::EntityStore;
use crate::types::FlowId;

/// One intent the backend rejected, kept with its error for the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedUpdate {
    pub intent: UpdateIntent,
    pub error: GatewayError,
}

/// Outcome of one dispatch round. `applied` counts intents the backend
/// confirmed; failures never roll back confirmed siblings, so a partial
/// round is a possible terminal state until the next refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub applied: usize,
    pub failures: Vec<FailedUpdate>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Dispatch every intent as its own concurrent gateway call. Completion
/// order is irrelevant: each intent carries final absolute values, so
/// last-applied-wins per field is safe within one round.
///
/// Successes overwrite the store with the backend's canonical record;
/// failures set the owning slice's error flag and leave the rest of the
/// round untouched.
pub async fn push_intents<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
    intents: Vec<UpdateIntent>,
) -> DispatchReport {
    let calls = intents.into_iter().map(|intent| async move {
        match &intent {
            UpdateIntent::Flow { id, patch } => match gateway.update_flow(*id, patch).await {
                Ok(flow) => {
                    store.replace_flow(flow);
                    Ok(())
                }
                Err(error) => Err(FailedUpdate { intent, error }),
            },
            UpdateIntent::Task { id, patch } => match gateway.update_task(*id, patch).await {
                Ok(task) => {
                    store.replace_task(task);
                    Ok(())
                }
                Err(error) => Err(FailedUpdate { intent, error }),
            },
        }
    });

    let mut report = DispatchReport::default();
    for outcome in join_all(calls).await {
        match outcome {
            Ok(()) => report.applied += 1,
            Err(failed) => {
                log::warn!(
                    "[flowboard.dispatch] {} {} not persisted: {}",
                    failed.intent.entity(),
                    failed.intent.id(),
                    failed.error
                );
                match failed.intent {
                    UpdateIntent::Flow { .. } => store.set_flows_error(failed.error.to_string()),
                    UpdateIntent::Task { .. } => store.set_tasks_error(failed.error.to_string()),
                }
                report.failures.push(failed);
            }
        }
    }
    report
}

/// The scopes a drag disturbed, re-fetched once dispatch settles.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RefreshScope {
    BoardFlows,
    FlowTasks(Vec<FlowId>),
}

/// Full drag-end round: snapshot, reconcile, optimistic local apply,
/// concurrent dispatch, then a refresh of every affected scope so the
/// store converges on the backend's view even after concurrent edits.
///
/// Cancelled gestures and same-slot drops return an empty report with
/// zero gateway calls. A stale dragged entity aborts before anything
/// is dispatched.
pub async fn handle_drag_end<G: BoardGateway + ?Sized>(
    gateway: &G,
    store: &EntityStore,
    event: &DragEnd,
) -> Result<DispatchReport, ReconcileError> {
    if event.is_cancelled() {
        log::debug!("[flowboard.dispatch] drag cancelled, nothing to persist");
        return Ok(DispatchReport::default());
    }

    let snapshot = store.snapshot();
    let intents = reconcile(event, &snapshot)?;
    if intents.is_empty() {
        return Ok(DispatchReport::default());
    }

    // Resolve the affected scopes against the pre-drag snapshot; the
    // source flow of a task is where the snapshot says the task lives.
    let scope = match event {
        DragEnd::Flow { .. } => RefreshScope::BoardFlows,
        DragEnd::Task { id, destination, .. } => {
            let mut flow_ids = Vec::new();
            if let Some(task) = snapshot.tasks.iter().find(|t| t.id == *id) {
                flow_ids.push(task.flow_node_id);
            }
            if let Some(slot) = destination {
                if !flow_ids.contains(&slot.flow_id) {
                    flow_ids.push(slot.flow_id);
                }
            }
            RefreshScope::FlowTasks(flow_ids)
        }
    };

    log::debug!(
        "[flowboard.dispatch] drag produced {} update intent(s)",
        intents.len()
    );

    // The board renders the post-drag layout immediately; canonical
    // responses and the final refresh overwrite this guess.
    store.apply_intents(&intents);

    let report = push_intents(gateway, store, intents).await;
    if !report.is_clean() {
        log::warn!(
            "[flowboard.dispatch] {}/{} intents failed; persisted order may lag the board",
            report.failures.len(),
            report.applied + report.failures.len()
        );
    }

    match scope {
        RefreshScope::BoardFlows => {
            if let Err(e) = actions::fetch_flows(gateway, store).await {
                log::error!("[flowboard.dispatch] flow refresh failed: {}", e);
            }
        }
        RefreshScope::FlowTasks(flow_ids) => {
            for flow_id in flow_ids {
                if let Err(e) = actions::fetch_tasks(gateway, store, flow_id).await {
                    log::error!(
                        "[flowboard.dispatch] task refresh for flow {} failed: {}",
                        flow_id,
                        e
                    );
                }
            }
        }
    }

    Ok(report)
}
