use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type BoardId = i64;
pub type FlowId = i64;
pub type TaskId = i64;

/// Entity families the backend exposes. Mostly used to label errors
/// and store events with the slice they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Board,
    Flow,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Board => write!(f, "board"),
            EntityKind::Flow => write!(f, "flow"),
            EntityKind::Task => write!(f, "task"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
}

/// A column on the board. `order` is the zero-based position among the
/// flows of the same board and is contiguous whenever the backend and
/// the local store agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: FlowId,
    pub board_node_id: BoardId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: i64,
}

/// A card inside a flow. `order` positions the task within its flow,
/// independent of task orders in other flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub flow_node_id: FlowId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: i64,
    #[serde(default)]
    pub progress: i64,
    pub created_at: DateTime<Utc>,
}

/// Creation payload for a flow. The backend assigns `id` and the
/// end-of-board `order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlow {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub board_node_id: BoardId,
}

/// Creation payload for a task. The backend assigns `id`, `order`,
/// `progress` and `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub flow_node_id: FlowId,
}

/// Partial update for a flow. Only populated fields are sent on the
/// wire and only those fields change on the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl FlowPatch {
    /// Patch that changes nothing but the position.
    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.order.is_none()
    }

    /// Fold the patch into a record, leaving unpopulated fields alone.
    pub fn apply_to(&self, flow: &mut Flow) {
        if let Some(title) = &self.title {
            flow.title = title.clone();
        }
        if let Some(description) = &self.description {
            flow.description = description.clone();
        }
        if let Some(order) = self.order {
            flow.order = order;
        }
    }
}

/// Partial update for a task. `flow_node_id` reassigns the task to a
/// different flow when a drag crosses columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_node_id: Option<FlowId>,
}

impl TaskPatch {
    /// Patch that changes nothing but the position.
    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.order.is_none()
            && self.progress.is_none()
            && self.flow_node_id.is_none()
    }

    /// Fold the patch into a record, leaving unpopulated fields alone.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        if let Some(progress) = self.progress {
            task.progress = progress;
        }
        if let Some(flow_node_id) = self.flow_node_id {
            task.flow_node_id = flow_node_id;
        }
    }
}

/// Relative age of a task the way the board renders it, e.g.
/// "created 42 seconds ago" or "created 3 days ago". Each step rounds
/// to the nearest unit before comparing, so 90 seconds reads as
/// "2 mins", not "1 min".
pub fn created_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = ((now - created_at).num_milliseconds() as f64 / 1000.0).round().max(0.0) as i64;
    if seconds < 60 {
        return format!("created {} seconds ago", seconds);
    }
    let minutes = (seconds as f64 / 60.0).round() as i64;
    if minutes < 60 {
        return format!("created {} mins ago", minutes);
    }
    let hours = (minutes as f64 / 60.0).round() as i64;
    if hours < 24 {
        return format!("created {} hours ago", hours);
    }
    let days = (hours as f64 / 24.0).round() as i64;
    format!("created {} days ago", days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    #[test]
    fn test_task_wire_names_are_camel_case() {
        let task = Task {
            id: 7,
            flow_node_id: 3,
            title: "Write report".to_string(),
            description: "".to_string(),
            order: 2,
            progress: 40,
            created_at: at(1_700_000_000),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["flowNodeId"], 3);
        assert_eq!(json["createdAt"], "2023-11-14T22:13:20Z");
        assert!(json.get("flow_node_id").is_none());
    }

    #[test]
    fn test_flow_deserializes_without_description() {
        let flow: Flow =
            serde_json::from_str(r#"{"id":1,"boardNodeId":1,"title":"Todo","order":0}"#).unwrap();
        assert_eq!(flow.description, "");
        assert_eq!(flow.order, 0);
    }

    #[test]
    fn test_patch_serializes_only_populated_fields() {
        let patch = TaskPatch::order(4);
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"order":4}"#);

        let moved = TaskPatch {
            order: Some(1),
            flow_node_id: Some(9),
            ..TaskPatch::default()
        };
        let json = serde_json::to_value(&moved).unwrap();
        assert_eq!(json["order"], 1);
        assert_eq!(json["flowNodeId"], 9);
        assert!(json.get("title").is_none());
        assert!(json.get("progress").is_none());
    }

    #[test]
    fn test_empty_patch_is_empty() {
        assert!(TaskPatch::default().is_empty());
        assert!(FlowPatch::default().is_empty());
        assert!(!TaskPatch::order(0).is_empty());
    }

    #[test]
    fn test_patch_apply_leaves_other_fields_alone() {
        let mut task = Task {
            id: 1,
            flow_node_id: 2,
            title: "Keep me".to_string(),
            description: "and me".to_string(),
            order: 0,
            progress: 10,
            created_at: at(0),
        };
        let patch = TaskPatch {
            order: Some(3),
            flow_node_id: Some(5),
            ..TaskPatch::default()
        };
        patch.apply_to(&mut task);
        assert_eq!(task.order, 3);
        assert_eq!(task.flow_node_id, 5);
        assert_eq!(task.title, "Keep me");
        assert_eq!(task.progress, 10);
    }

    #[test]
    fn test_created_ago_buckets() {
        let base = at(1_000_000);
        assert_eq!(created_ago(base, at(1_000_000)), "created 0 seconds ago");
        assert_eq!(created_ago(base, at(1_000_059)), "created 59 seconds ago");
        // 90 seconds rounds up to 2 minutes
        assert_eq!(created_ago(base, at(1_000_090)), "created 2 mins ago");
        assert_eq!(created_ago(base, at(1_000_000 + 3 * 3600)), "created 3 hours ago");
        assert_eq!(
            created_ago(base, at(1_000_000 + 5 * 86_400)),
            "created 5 days ago"
        );
    }

    #[test]
    fn test_created_ago_clamps_future_timestamps() {
        assert_eq!(created_ago(at(2_000), at(1_000)), "created 0 seconds ago");
    }
}
