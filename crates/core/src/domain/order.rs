use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::catalog::Commitment;
use crate::errors::CodecError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Confirmed,
    NoMatch,
    Error,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::NoMatch => "no_match",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Disposition {
    Confirmed(Commitment),
    NoMatch { reason: String },
    Error { reason: String },
}

/// Terminal result of one relayed task.
///
/// The status and the fields it implies are a single value, so a confirmed result always
/// carries its commitment and never a reason. The JSON form goes through a checked wire struct
/// and payloads that contradict their own status are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderResultWire", into = "OrderResultWire")]
pub struct OrderResult {
    task_id: Option<String>,
    disposition: Disposition,
}

impl OrderResult {
    pub fn confirmed(task_id: Option<String>, commitment: Commitment) -> Self {
        Self { task_id, disposition: Disposition::Confirmed(commitment) }
    }

    pub fn no_match(task_id: Option<String>, reason: impl Into<String>) -> Self {
        Self { task_id, disposition: Disposition::NoMatch { reason: reason.into() } }
    }

    pub fn error(task_id: Option<String>, reason: impl Into<String>) -> Self {
        Self { task_id, disposition: Disposition::Error { reason: reason.into() } }
    }

    pub fn from_payload(payload: Value) -> Result<Self, CodecError> {
        serde_json::from_value(payload)
            .map_err(|error| CodecError::MalformedPayload(format!("not an order result: {error}")))
    }

    /// Replaces the echoed task id, keeping the disposition.
    pub fn with_task_id(mut self, task_id: Option<String>) -> Self {
        self.task_id = task_id;
        self
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn status(&self) -> OrderStatus {
        match self.disposition {
            Disposition::Confirmed(_) => OrderStatus::Confirmed,
            Disposition::NoMatch { .. } => OrderStatus::NoMatch,
            Disposition::Error { .. } => OrderStatus::Error,
        }
    }

    pub fn commitment(&self) -> Option<&Commitment> {
        match &self.disposition {
            Disposition::Confirmed(commitment) => Some(commitment),
            _ => None,
        }
    }

    pub fn ordered_item(&self) -> Option<&str> {
        self.commitment().map(|commitment| commitment.ordered_item.as_str())
    }

    pub fn price(&self) -> Option<u64> {
        self.commitment().map(|commitment| commitment.price)
    }

    pub fn estimated_delivery(&self) -> Option<&str> {
        self.commitment().map(|commitment| commitment.estimated_delivery.as_str())
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.disposition {
            Disposition::Confirmed(_) => None,
            Disposition::NoMatch { reason } | Disposition::Error { reason } => Some(reason),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct OrderResultWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
    status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ordered_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    estimated_delivery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl From<OrderResult> for OrderResultWire {
    fn from(result: OrderResult) -> Self {
        let status = result.status();
        let mut wire = Self {
            task_id: result.task_id,
            status,
            ordered_item: None,
            price: None,
            estimated_delivery: None,
            reason: None,
        };
        match result.disposition {
            Disposition::Confirmed(commitment) => {
                wire.ordered_item = Some(commitment.ordered_item);
                wire.price = Some(commitment.price);
                wire.estimated_delivery = Some(commitment.estimated_delivery);
            }
            Disposition::NoMatch { reason } | Disposition::Error { reason } => {
                wire.reason = Some(reason);
            }
        }
        wire
    }
}

impl TryFrom<OrderResultWire> for OrderResult {
    type Error = String;

    fn try_from(wire: OrderResultWire) -> Result<Self, Self::Error> {
        let task_id = wire.task_id;
        match wire.status {
            OrderStatus::Confirmed => {
                if wire.reason.is_some() {
                    return Err("confirmed result must not carry a reason".to_string());
                }
                let ordered_item =
                    wire.ordered_item.ok_or("confirmed result is missing `ordered_item`")?;
                let price = wire.price.ok_or("confirmed result is missing `price`")?;
                let estimated_delivery = wire
                    .estimated_delivery
                    .ok_or("confirmed result is missing `estimated_delivery`")?;
                Ok(Self::confirmed(task_id, Commitment { ordered_item, price, estimated_delivery }))
            }
            status @ (OrderStatus::NoMatch | OrderStatus::Error) => {
                if wire.ordered_item.is_some() {
                    return Err(format!("{status} result must not carry `ordered_item`"));
                }
                let reason =
                    wire.reason.ok_or_else(|| format!("{status} result is missing `reason`"))?;
                Ok(if status == OrderStatus::NoMatch {
                    Self::no_match(task_id, reason)
                } else {
                    Self::error(task_id, reason)
                })
            }
        }
    }
}
