use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub price: u64,
    #[serde(default)]
    pub description: String,
}

impl CatalogItem {
    pub fn new(name: impl Into<String>, price: u64, description: impl Into<String>) -> Self {
        Self { name: name.into(), price, description: description.into() }
    }
}

/// What the fulfillment gateway is asked to commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentRequest {
    pub item_name: String,
    pub price: u64,
}

impl From<&CatalogItem> for FulfillmentRequest {
    fn from(item: &CatalogItem) -> Self {
        Self { item_name: item.name.clone(), price: item.price }
    }
}

/// A committed order as confirmed by the fulfillment gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub ordered_item: String,
    pub price: u64,
    pub estimated_delivery: String,
}
