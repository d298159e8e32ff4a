/// REST implementation of the board gateway.
///
/// Speaks the backend's plain-HTTP dialect: flat entity records as JSON
/// bodies, PATCH with only the populated fields, query-parameter scoping
/// for list endpoints. Non-2xx responses and transport failures map onto
/// the gateway error taxonomy with the status or error text as detail.
use async_trait::async_trait;
use std::time::Duration;

use flowboard_core::gateway::{BoardGateway, GatewayError};
use flowboard_core::types::{
    Board, BoardId, EntityKind, Flow, FlowId, FlowPatch, NewFlow, NewTask, Task, TaskId, TaskPatch,
};

use crate::config::ClientConfig;

pub struct RestGateway {
    base_url: String,
    client: reqwest::Client,
}

impl RestGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|e| {
            log::warn!(
                "[flowboard.rest] client builder failed ({}), using defaults",
                e
            );
            reqwest::Client::new()
        });
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Status line or transport error, verbatim, for the error `detail`.
async fn send(
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, String> {
    let response = request.send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(response.status().to_string());
    }
    Ok(response)
}

async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, String> {
    response.json().await.map_err(|e| e.to_string())
}

#[async_trait]
impl BoardGateway for RestGateway {
    async fn fetch_board(&self, id: BoardId) -> Result<Board, GatewayError> {
        let request = self.client.get(self.url(&format!("/board/{}", id)));
        let response = send(request).await.map_err(|detail| GatewayError::Fetch {
            entity: EntityKind::Board,
            detail,
        })?;
        parse(response).await.map_err(|detail| GatewayError::Fetch {
            entity: EntityKind::Board,
            detail,
        })
    }

    async fn list_flows(&self, board_id: BoardId) -> Result<Vec<Flow>, GatewayError> {
        let request = self
            .client
            .get(self.url("/flows"))
            .query(&[("boardId", board_id)]);
        let response = send(request).await.map_err(|detail| GatewayError::Fetch {
            entity: EntityKind::Flow,
            detail,
        })?;
        let mut flows: Vec<Flow> =
            parse(response).await.map_err(|detail| GatewayError::Fetch {
                entity: EntityKind::Flow,
                detail,
            })?;
        flows.sort_by_key(|flow| flow.order);
        Ok(flows)
    }

    async fn create_flow(&self, draft: &NewFlow) -> Result<Flow, GatewayError> {
        let request = self.client.post(self.url("/flow")).json(draft);
        let response = send(request).await.map_err(|detail| GatewayError::Create {
            entity: EntityKind::Flow,
            detail,
        })?;
        parse(response).await.map_err(|detail| GatewayError::Create {
            entity: EntityKind::Flow,
            detail,
        })
    }

    async fn update_flow(&self, id: FlowId, patch: &FlowPatch) -> Result<Flow, GatewayError> {
        let request = self
            .client
            .patch(self.url(&format!("/flow/{}", id)))
            .json(patch);
        let response = send(request).await.map_err(|detail| GatewayError::Update {
            entity: EntityKind::Flow,
            id,
            detail,
        })?;
        parse(response).await.map_err(|detail| GatewayError::Update {
            entity: EntityKind::Flow,
            id,
            detail,
        })
    }

    async fn delete_flow(&self, id: FlowId) -> Result<FlowId, GatewayError> {
        let request = self.client.delete(self.url(&format!("/flow/{}", id)));
        send(request).await.map_err(|detail| GatewayError::Delete {
            entity: EntityKind::Flow,
            id,
            detail,
        })?;
        Ok(id)
    }

    async fn list_tasks(&self, flow_id: FlowId) -> Result<Vec<Task>, GatewayError> {
        let request = self
            .client
            .get(self.url("/tasks"))
            .query(&[("id", flow_id)]);
        let response = send(request).await.map_err(|detail| GatewayError::Fetch {
            entity: EntityKind::Task,
            detail,
        })?;
        let mut tasks: Vec<Task> =
            parse(response).await.map_err(|detail| GatewayError::Fetch {
                entity: EntityKind::Task,
                detail,
            })?;
        tasks.sort_by_key(|task| task.order);
        Ok(tasks)
    }

    async fn create_task(&self, draft: &NewTask) -> Result<Task, GatewayError> {
        let request = self.client.post(self.url("/task")).json(draft);
        let response = send(request).await.map_err(|detail| GatewayError::Create {
            entity: EntityKind::Task,
            detail,
        })?;
        parse(response).await.map_err(|detail| GatewayError::Create {
            entity: EntityKind::Task,
            detail,
        })
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, GatewayError> {
        let request = self
            .client
            .patch(self.url(&format!("/task/{}", id)))
            .json(patch);
        let response = send(request).await.map_err(|detail| GatewayError::Update {
            entity: EntityKind::Task,
            id,
            detail,
        })?;
        parse(response).await.map_err(|detail| GatewayError::Update {
            entity: EntityKind::Task,
            id,
            detail,
        })
    }

    async fn delete_task(&self, id: TaskId) -> Result<TaskId, GatewayError> {
        let request = self.client.delete(self.url(&format!("/task/{}", id)));
        send(request).await.map_err(|detail| GatewayError::Delete {
            entity: EntityKind::Task,
            id,
            detail,
        })?;
        Ok(id)
    }
}
