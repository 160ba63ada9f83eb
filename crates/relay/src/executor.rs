//! Server side of the relay. An executor turns one request envelope into one response
//! envelope; decode and gateway failures are reported inside the response as `error` results.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderlink_core::config::RelayMode;
use orderlink_core::{
    envelope, resolve, CatalogGateway, FulfillmentGateway, FulfillmentRequest, GatewayError,
    MessageEnvelope, OrderResult, RelayError, ResolutionOutcome, Role, TaskSpecification,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::RelayClient;

const DEFAULT_GATEWAY_DEADLINE: Duration = Duration::from_secs(10);

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    fn mode(&self) -> RelayMode;

    async fn execute(&self, request: &MessageEnvelope) -> MessageEnvelope;

    async fn cancel(&self, task_id: Option<&str>) -> Result<(), RelayError> {
        warn!(
            event_name = "relay.executor.cancel_rejected",
            task_id = task_id.unwrap_or("unknown"),
            "cancel requested but not supported"
        );
        Err(RelayError::CancelUnsupported)
    }
}

/// Wraps a result as the agent-role response envelope.
pub fn respond(result: &OrderResult) -> MessageEnvelope {
    match envelope::encode_as(Role::Agent, result) {
        Ok(message) => message,
        Err(error) => {
            // OrderResult always serializes; keep a well-formed reply regardless.
            let fallback = serde_json::json!({"status": "error", "reason": error.to_string()});
            MessageEnvelope::text(Role::Agent, fallback.to_string())
        }
    }
}

/// Decodes an inbound envelope into a task, or into the `error` result to send back.
pub fn decode_task(request: &MessageEnvelope) -> Result<TaskSpecification, OrderResult> {
    let payload = envelope::decode(request).map_err(|error| {
        warn!(
            event_name = "relay.executor.decode_failed",
            message_id = %request.message_id,
            error_kind = error.kind(),
            error = %error,
            "request envelope could not be decoded"
        );
        OrderResult::error(None, error.to_string())
    })?;

    if payload.is_object() && payload.get("requirements").is_none() {
        let task_id = payload.get("task_id").and_then(Value::as_str).unwrap_or("unknown");
        debug!(
            event_name = "relay.executor.flat_requirements",
            message_id = %request.message_id,
            task_id = task_id,
            "task has no requirements object; reading the payload itself as requirements"
        );
    }

    TaskSpecification::from_payload(payload).map_err(|error| {
        warn!(
            event_name = "relay.executor.invalid_task",
            message_id = %request.message_id,
            task_id = error.task_id.as_deref().unwrap_or("unknown"),
            error = %error,
            "request payload is not a task specification"
        );
        OrderResult::error(error.task_id.clone(), error.to_string())
    })
}

/// Resolves tasks locally against the catalog and places the order with fulfillment.
#[derive(Clone)]
pub struct OrderExecutor {
    catalog: Arc<dyn CatalogGateway>,
    fulfillment: Arc<dyn FulfillmentGateway>,
    gateway_deadline: Duration,
}

impl OrderExecutor {
    pub fn new(catalog: Arc<dyn CatalogGateway>, fulfillment: Arc<dyn FulfillmentGateway>) -> Self {
        Self { catalog, fulfillment, gateway_deadline: DEFAULT_GATEWAY_DEADLINE }
    }

    pub fn with_gateway_deadline(mut self, deadline: Duration) -> Self {
        self.gateway_deadline = deadline;
        self
    }

    pub async fn fulfil(&self, task: &TaskSpecification) -> OrderResult {
        let task_id = task.task_id.clone();

        let catalog = match self.bounded(self.catalog.name(), self.catalog.list_items()).await {
            Ok(items) => items,
            Err(error) => return self.gateway_failed(task_id, error),
        };

        match resolve(&catalog, task.wish(), task.budget()) {
            ResolutionOutcome::Confirmed { item, tier } => {
                info!(
                    event_name = "relay.executor.resolved",
                    task_id = task_id.as_deref().unwrap_or("unknown"),
                    item = %item.name,
                    price = item.price,
                    tier = ?tier,
                    "catalog item selected"
                );
                let request = FulfillmentRequest::from(&item);
                let placed = self.fulfillment.place_order(&request);
                match self.bounded(self.fulfillment.name(), placed).await {
                    Ok(commitment) => OrderResult::confirmed(task_id, commitment),
                    Err(error) => self.gateway_failed(task_id, error),
                }
            }
            ResolutionOutcome::NoMatch { reason } => {
                info!(
                    event_name = "relay.executor.no_match",
                    task_id = task_id.as_deref().unwrap_or("unknown"),
                    catalog_size = catalog.len(),
                    "no catalog item matched"
                );
                OrderResult::no_match(task_id, reason)
            }
            ResolutionOutcome::Error { reason } => OrderResult::error(task_id, reason),
        }
    }

    async fn bounded<T>(
        &self,
        gateway: &'static str,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        let deadline_ms = u64::try_from(self.gateway_deadline.as_millis()).unwrap_or(u64::MAX);
        tokio::time::timeout(self.gateway_deadline, call)
            .await
            .unwrap_or(Err(GatewayError::Timeout { gateway, deadline_ms }))
    }

    fn gateway_failed(&self, task_id: Option<String>, error: GatewayError) -> OrderResult {
        warn!(
            event_name = "relay.executor.gateway_failed",
            task_id = task_id.as_deref().unwrap_or("unknown"),
            error_kind = error.kind(),
            error = %error,
            "gateway call failed"
        );
        OrderResult::error(task_id, error.to_string())
    }
}

#[async_trait]
impl TaskExecutor for OrderExecutor {
    fn mode(&self) -> RelayMode {
        RelayMode::Fulfiller
    }

    async fn execute(&self, request: &MessageEnvelope) -> MessageEnvelope {
        let result = match decode_task(request) {
            Ok(task) => self.fulfil(&task).await,
            Err(result) => result,
        };
        info!(
            event_name = "relay.executor.completed",
            message_id = %request.message_id,
            task_id = result.task_id().unwrap_or("unknown"),
            status = %result.status(),
            "task executed"
        );
        respond(&result)
    }
}

/// Forwards every task to another relay peer and returns that peer's result.
#[derive(Clone, Debug)]
pub struct ProxyExecutor {
    client: RelayClient,
    peer_url: String,
}

impl ProxyExecutor {
    pub fn new(client: RelayClient, peer_url: impl Into<String>) -> Self {
        Self { client, peer_url: peer_url.into() }
    }

    /// The peer's result always carries this task's id, whatever the peer echoed.
    pub async fn forward(&self, task: &TaskSpecification) -> OrderResult {
        match self.client.send(&self.peer_url, task).await {
            Ok(result) => {
                if result.task_id() != task.task_id.as_deref() {
                    warn!(
                        event_name = "relay.proxy.task_id_mismatch",
                        peer = %self.peer_url,
                        task_id = task.task_id.as_deref().unwrap_or("unknown"),
                        peer_task_id = result.task_id().unwrap_or("unknown"),
                        "peer echoed a different task id; restoring the requester's"
                    );
                }
                result.with_task_id(task.task_id.clone())
            }
            Err(error) => {
                warn!(
                    event_name = "relay.proxy.forward_failed",
                    peer = %self.peer_url,
                    task_id = task.task_id.as_deref().unwrap_or("unknown"),
                    error_kind = error.kind(),
                    error = %error,
                    "forwarding to peer failed"
                );
                OrderResult::error(task.task_id.clone(), error.to_string())
            }
        }
    }
}

#[async_trait]
impl TaskExecutor for ProxyExecutor {
    fn mode(&self) -> RelayMode {
        RelayMode::Proxy
    }

    async fn execute(&self, request: &MessageEnvelope) -> MessageEnvelope {
        let result = match decode_task(request) {
            Ok(task) => self.forward(&task).await,
            Err(result) => result,
        };
        info!(
            event_name = "relay.proxy.completed",
            message_id = %request.message_id,
            peer = %self.peer_url,
            task_id = result.task_id().unwrap_or("unknown"),
            status = %result.status(),
            "task forwarded"
        );
        respond(&result)
    }
}
