use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use orderlink_core::config::{AppConfig, ConfigError, GatewayConfig, LoadOptions, RelayMode};
use orderlink_core::{
    CapabilityDescriptor, CatalogGateway, FixedOffsetFulfillment, FulfillmentGateway, Operation,
    StaticCatalog,
};
use orderlink_relay::{
    HttpCatalogGateway, HttpFulfillmentGateway, OrderExecutor, ProxyExecutor, RelayClient,
    TaskExecutor,
};
use thiserror::Error;
use tracing::info;

use crate::{a2a, health};

pub struct Application {
    pub config: AppConfig,
    pub descriptor: CapabilityDescriptor,
    pub executor: Arc<dyn TaskExecutor>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("relay.peer_url is required in proxy mode")]
    MissingPeerUrl,
    #[error("advertised capability descriptor is invalid: {0}")]
    InvalidDescriptor(String),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let executor = build_executor(&config)?;
    let descriptor = build_descriptor(&config)?;

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        mode = executor.mode().as_str(),
        advertised_url = %descriptor.url,
        "relay executor and descriptor assembled"
    );

    Ok(Application { config, descriptor, executor })
}

impl Application {
    /// Relay endpoints plus `/health`, ready to serve.
    pub fn router(&self) -> Router {
        let state = a2a::RelayState::new(self.descriptor.clone(), self.executor.clone());
        let relay = a2a::router(state);
        let health = health::router(health::HealthState::new(
            self.config.agent.name.clone(),
            self.executor.mode(),
        ));
        relay.merge(health)
    }
}

fn build_descriptor(config: &AppConfig) -> Result<CapabilityDescriptor, BootstrapError> {
    let operation = match config.relay.mode {
        RelayMode::Fulfiller => Operation::resolve_order(),
        RelayMode::Proxy => Operation::forward_order(),
    };
    let descriptor = CapabilityDescriptor::new(
        config.agent.name.clone(),
        config.agent.description.clone(),
        config.server.advertised_url(),
        vec![operation],
    )
    .with_version(config.agent.version.clone());

    descriptor.validate().map_err(BootstrapError::InvalidDescriptor)?;
    Ok(descriptor)
}

fn build_executor(config: &AppConfig) -> Result<Arc<dyn TaskExecutor>, BootstrapError> {
    match config.relay.mode {
        RelayMode::Fulfiller => {
            let gateways = &config.gateways;
            Ok(Arc::new(
                OrderExecutor::new(catalog_gateway(gateways), fulfillment_gateway(gateways))
                    .with_gateway_deadline(Duration::from_secs(gateways.timeout_secs)),
            ))
        }
        RelayMode::Proxy => {
            let peer_url = config.relay.peer_url.clone().ok_or(BootstrapError::MissingPeerUrl)?;
            let client = RelayClient::new(Duration::from_secs(config.relay.timeout_secs));
            Ok(Arc::new(ProxyExecutor::new(client, peer_url)))
        }
    }
}

fn catalog_gateway(config: &GatewayConfig) -> Arc<dyn CatalogGateway> {
    match &config.catalog_url {
        Some(url) => {
            Arc::new(HttpCatalogGateway::new(url, Duration::from_secs(config.timeout_secs)))
        }
        None => Arc::new(StaticCatalog::pizza_menu()),
    }
}

fn fulfillment_gateway(config: &GatewayConfig) -> Arc<dyn FulfillmentGateway> {
    match &config.fulfillment_url {
        Some(url) => {
            Arc::new(HttpFulfillmentGateway::new(url, Duration::from_secs(config.timeout_secs)))
        }
        None => Arc::new(FixedOffsetFulfillment::new(config.delivery_lead_minutes)),
    }
}
