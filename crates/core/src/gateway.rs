use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::domain::catalog::{CatalogItem, Commitment, FulfillmentRequest};
use crate::errors::GatewayError;

pub const DEFAULT_DELIVERY_LEAD_MINUTES: i64 = 35;

#[async_trait]
pub trait CatalogGateway: Send + Sync {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn list_items(&self) -> Result<Vec<CatalogItem>, GatewayError>;
}

#[async_trait]
pub trait FulfillmentGateway: Send + Sync {
    fn name(&self) -> &'static str {
        "fulfillment"
    }

    async fn place_order(&self, request: &FulfillmentRequest) -> Result<Commitment, GatewayError>;
}

/// In-process catalog backed by a fixed item list.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    items: Vec<CatalogItem>,
}

impl StaticCatalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    /// The pizza menu the reference fulfiller serves.
    pub fn pizza_menu() -> Self {
        Self::new(vec![
            CatalogItem::new("margherita", 1800, "tomato, mozzarella, basil"),
            CatalogItem::new("pepperoni", 2200, "spicy pepperoni"),
            CatalogItem::new("quattro formaggi", 2400, "four cheeses"),
            CatalogItem::new("marinara", 1200, "tomato, garlic, oregano"),
        ])
    }
}

#[async_trait]
impl CatalogGateway for StaticCatalog {
    async fn list_items(&self) -> Result<Vec<CatalogItem>, GatewayError> {
        Ok(self.items.clone())
    }
}

/// Commits every order and promises delivery a fixed lead time from now.
#[derive(Clone, Debug)]
pub struct FixedOffsetFulfillment {
    lead_time: Duration,
}

impl Default for FixedOffsetFulfillment {
    fn default() -> Self {
        Self::new(DEFAULT_DELIVERY_LEAD_MINUTES)
    }
}

impl FixedOffsetFulfillment {
    pub fn new(lead_minutes: i64) -> Self {
        Self { lead_time: Duration::minutes(lead_minutes) }
    }

    pub fn commit_at(&self, request: &FulfillmentRequest, now: DateTime<Utc>) -> Commitment {
        Commitment {
            ordered_item: request.item_name.clone(),
            price: request.price,
            estimated_delivery: (now + self.lead_time).to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[async_trait]
impl FulfillmentGateway for FixedOffsetFulfillment {
    async fn place_order(&self, request: &FulfillmentRequest) -> Result<Commitment, GatewayError> {
        Ok(self.commit_at(request, Utc::now()))
    }
}
