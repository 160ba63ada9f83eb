//! Transport half of orderlink: JSON-RPC framing, the requester-side relay client, the
//! server-side executors and HTTP adapters for the gateways.

pub mod client;
pub mod executor;
pub mod http_gateway;
pub mod jsonrpc;

pub use client::RelayClient;
pub use executor::{decode_task, respond, OrderExecutor, ProxyExecutor, TaskExecutor};
pub use http_gateway::{HttpCatalogGateway, HttpFulfillmentGateway};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MessageSendRequest};
