//! Requester side of the relay: discover the peer, send the task, decode the result.
//!
//! Discovery and transport failures come back as `Err`; they happen before any application
//! payload exists. Once a response body is in hand, anything that fails to decode becomes an
//! `error` [`OrderResult`] instead, so a misbehaving peer never surfaces as a hard fault.

use std::future::Future;
use std::time::Duration;

use orderlink_core::domain::descriptor::descriptor_url;
use orderlink_core::{
    envelope, CapabilityDescriptor, MessageEnvelope, OrderResult, RelayError, TaskSpecification,
};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::jsonrpc::{JsonRpcResponse, MessageSendRequest};

const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct RelayClient {
    deadline: Duration,
}

impl Default for RelayClient {
    fn default() -> Self {
        Self::new(DEFAULT_DEADLINE)
    }
}

impl RelayClient {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    fn deadline_ms(&self) -> u64 {
        u64::try_from(self.deadline.as_millis()).unwrap_or(u64::MAX)
    }

    /// Fetches only the peer's capability descriptor.
    pub async fn discover(&self, peer_address: &str) -> Result<CapabilityDescriptor, RelayError> {
        let http = self.http_client()?;
        self.fetch_descriptor(&http, peer_address).await
    }

    pub async fn send(
        &self,
        peer_address: &str,
        task: &TaskSpecification,
    ) -> Result<OrderResult, RelayError> {
        // One connection pool per exchange, dropped on every return path.
        let http = self.http_client()?;

        let descriptor = self.fetch_descriptor(&http, peer_address).await?;
        info!(
            event_name = "relay.client.discovered",
            peer = %peer_address,
            peer_name = %descriptor.name,
            relay_url = %descriptor.url,
            task_id = task.task_id.as_deref().unwrap_or("unknown"),
            "peer capability descriptor fetched"
        );

        let message = envelope::encode(task)?;
        let request = MessageSendRequest::new(&message);
        info!(
            event_name = "relay.client.sending",
            correlation_id = %request.id,
            message_id = %message.message_id,
            task_id = task.task_id.as_deref().unwrap_or("unknown"),
            "sending task to peer"
        );

        let body = self.dispatch(&http, &descriptor.url, &request).await?;
        let result = read_result(task, &request.id, &body)?;
        info!(
            event_name = "relay.client.completed",
            correlation_id = %request.id,
            task_id = result.task_id().unwrap_or("unknown"),
            status = %result.status(),
            "relay exchange completed"
        );
        Ok(result)
    }

    fn http_client(&self) -> Result<Client, RelayError> {
        Client::builder()
            .connect_timeout(self.deadline)
            .build()
            .map_err(|error| RelayError::Transport(format!("could not build http client: {error}")))
    }

    async fn fetch_descriptor(
        &self,
        http: &Client,
        peer_address: &str,
    ) -> Result<CapabilityDescriptor, RelayError> {
        let url = descriptor_url(peer_address);
        let unreachable = |message: String| RelayError::PeerUnreachable {
            address: peer_address.to_string(),
            message,
        };
        let invalid = |message: String| RelayError::InvalidDescriptor {
            address: peer_address.to_string(),
            message,
        };

        let fetch = async {
            let response =
                http.get(&url).send().await.map_err(|error| unreachable(error.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(invalid(format!("descriptor endpoint returned {status}")));
            }
            response.text().await.map_err(|error| unreachable(error.to_string()))
        };
        let body = bounded(self.deadline, fetch)
            .await
            .unwrap_or_else(|| {
                Err(unreachable(format!("no descriptor within {}ms", self.deadline_ms())))
            })?;

        let descriptor: CapabilityDescriptor =
            serde_json::from_str(&body).map_err(|error| invalid(error.to_string()))?;
        descriptor.validate().map_err(invalid)?;
        Ok(descriptor)
    }

    async fn dispatch(
        &self,
        http: &Client,
        relay_url: &str,
        request: &MessageSendRequest<'_>,
    ) -> Result<String, RelayError> {
        let deadline_ms = self.deadline_ms();
        let transport = |error: reqwest::Error| {
            if error.is_timeout() {
                RelayError::Timeout { deadline_ms }
            } else {
                RelayError::Transport(error.to_string())
            }
        };

        let exchange = async {
            let response = http.post(relay_url).json(request).send().await.map_err(transport)?;
            let status = response.status();
            if !status.is_success() {
                return Err(RelayError::Transport(format!("relay endpoint returned {status}")));
            }
            response.text().await.map_err(transport)
        };

        bounded(self.deadline, exchange).await.unwrap_or(Err(RelayError::Timeout { deadline_ms }))
    }
}

async fn bounded<T>(deadline: Duration, work: impl Future<Output = T>) -> Option<T> {
    tokio::time::timeout(deadline, work).await.ok()
}

/// Turns a raw `message/send` response body into the task's result.
pub(crate) fn read_result(
    task: &TaskSpecification,
    request_id: &str,
    body: &str,
) -> Result<OrderResult, RelayError> {
    let response: JsonRpcResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(error) => return Ok(undecodable(task, format!("unreadable relay response: {error}"))),
    };

    if let Some(error) = response.error {
        return Err(RelayError::Transport(format!(
            "peer rejected message/send ({}): {}",
            error.code, error.message
        )));
    }
    if response.id != Value::from(request_id) {
        return Err(RelayError::Transport(format!(
            "response id {} does not match request id `{request_id}`",
            response.id
        )));
    }

    let Some(result) = response.result else {
        return Ok(undecodable(task, "relay response carried no result".to_string()));
    };
    let message: MessageEnvelope = match serde_json::from_value(result) {
        Ok(message) => message,
        Err(error) => {
            return Ok(undecodable(task, format!("relay result is not a message envelope: {error}")))
        }
    };

    match envelope::decode(&message).and_then(OrderResult::from_payload) {
        Ok(result) => Ok(result),
        Err(error) => Ok(undecodable(task, format!("could not decode relay response: {error}"))),
    }
}

fn undecodable(task: &TaskSpecification, reason: String) -> OrderResult {
    warn!(
        event_name = "relay.client.decode_failed",
        task_id = task.task_id.as_deref().unwrap_or("unknown"),
        reason = %reason,
        "peer response could not be decoded; returning error result"
    );
    OrderResult::error(task.task_id.clone(), reason)
}
