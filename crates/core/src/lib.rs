//! Core of the order relay: the task and result types, the envelope codec that moves them
//! over a text channel, and the deterministic resolver that turns a task into an order.
//!
//! Nothing in this crate performs network I/O. Transport lives in `orderlink-relay`.

pub mod config;
pub mod domain;
pub mod envelope;
pub mod errors;
pub mod gateway;
pub mod resolver;

pub use domain::catalog::{CatalogItem, Commitment, FulfillmentRequest};
pub use domain::descriptor::{CapabilityDescriptor, Capabilities, Operation};
pub use domain::order::{OrderResult, OrderStatus};
pub use domain::task::{Requirements, TaskDecodeError, TaskSpecification};
pub use envelope::{MessageEnvelope, Part, PartShape, Role};
pub use errors::{CodecError, GatewayError, RelayError};
pub use gateway::{CatalogGateway, FixedOffsetFulfillment, FulfillmentGateway, StaticCatalog};
pub use resolver::{resolve, ResolutionOutcome, ResolutionTier};
