//! HTTP/JSON adapters for the catalog and fulfillment gateways.

use std::time::Duration;

use async_trait::async_trait;
use orderlink_core::{
    CatalogGateway, CatalogItem, Commitment, FulfillmentGateway, FulfillmentRequest, GatewayError,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

const CATALOG: &str = "catalog";
const FULFILLMENT: &str = "fulfillment";

/// Catalog bodies come either as a bare array or wrapped in `{"items": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogBody {
    Items(Vec<CatalogItem>),
    Wrapped { items: Vec<CatalogItem> },
}

impl From<CatalogBody> for Vec<CatalogItem> {
    fn from(body: CatalogBody) -> Self {
        match body {
            CatalogBody::Items(items) | CatalogBody::Wrapped { items } => items,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpCatalogGateway {
    url: String,
    timeout: Duration,
}

impl HttpCatalogGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self { url: url.into(), timeout }
    }
}

#[async_trait]
impl CatalogGateway for HttpCatalogGateway {
    async fn list_items(&self) -> Result<Vec<CatalogItem>, GatewayError> {
        let http = scoped_client(CATALOG, self.timeout)?;
        let response = http
            .get(&self.url)
            .send()
            .await
            .map_err(|error| request_failed(CATALOG, self.timeout, error))?;
        let body: CatalogBody = read_json(CATALOG, self.timeout, response).await?;
        let items: Vec<CatalogItem> = body.into();
        debug!(
            event_name = "relay.gateway.catalog_listed",
            url = %self.url,
            item_count = items.len(),
            "catalog fetched"
        );
        Ok(items)
    }
}

#[derive(Clone, Debug)]
pub struct HttpFulfillmentGateway {
    url: String,
    timeout: Duration,
}

impl HttpFulfillmentGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self { url: url.into(), timeout }
    }
}

#[async_trait]
impl FulfillmentGateway for HttpFulfillmentGateway {
    async fn place_order(&self, request: &FulfillmentRequest) -> Result<Commitment, GatewayError> {
        let http = scoped_client(FULFILLMENT, self.timeout)?;
        let response = http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|error| request_failed(FULFILLMENT, self.timeout, error))?;
        let commitment: Commitment = read_json(FULFILLMENT, self.timeout, response).await?;
        debug!(
            event_name = "relay.gateway.order_placed",
            url = %self.url,
            item = %commitment.ordered_item,
            estimated_delivery = %commitment.estimated_delivery,
            "fulfillment committed"
        );
        Ok(commitment)
    }
}

fn scoped_client(gateway: &'static str, timeout: Duration) -> Result<Client, GatewayError> {
    Client::builder().timeout(timeout).build().map_err(|error| GatewayError::Unavailable {
        gateway,
        message: format!("could not build http client: {error}"),
    })
}

async fn read_json<T: DeserializeOwned>(
    gateway: &'static str,
    timeout: Duration,
    response: Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::Unavailable { gateway, message: format!("returned {status}") });
    }
    let body = response.text().await.map_err(|error| request_failed(gateway, timeout, error))?;
    serde_json::from_str(&body)
        .map_err(|error| GatewayError::InvalidResponse { gateway, message: error.to_string() })
}

fn request_failed(gateway: &'static str, timeout: Duration, error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout {
            gateway,
            deadline_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        GatewayError::Unavailable { gateway, message: error.to_string() }
    }
}
