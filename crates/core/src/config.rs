use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub agent: AgentConfig,
    pub relay: RelayConfig,
    pub gateways: GatewayConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub public_url: Option<String>,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub mode: RelayMode,
    pub peer_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub catalog_url: Option<String>,
    pub fulfillment_url: Option<String>,
    pub timeout_secs: u64,
    pub delivery_lead_minutes: i64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayMode {
    /// Resolve tasks locally against the catalog.
    Fulfiller,
    /// Forward tasks to `relay.peer_url` and relay the peer's result.
    Proxy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub public_url: Option<String>,
    pub log_level: Option<String>,
    pub relay_mode: Option<RelayMode>,
    pub peer_url: Option<String>,
    pub catalog_url: Option<String>,
    pub fulfillment_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 9000,
                public_url: None,
                graceful_shutdown_secs: 15,
            },
            agent: AgentConfig {
                name: "OrderlinkRelay".to_string(),
                description: "Relay interface for structured order tasks".to_string(),
                version: "1.0.0".to_string(),
            },
            relay: RelayConfig { mode: RelayMode::Fulfiller, peer_url: None, timeout_secs: 30 },
            gateways: GatewayConfig {
                catalog_url: None,
                fulfillment_url: None,
                timeout_secs: 10,
                delivery_lead_minutes: 35,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for RelayMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fulfiller" => Ok(Self::Fulfiller),
            "proxy" => Ok(Self::Proxy),
            other => Err(ConfigError::Validation(format!(
                "unsupported relay mode `{other}` (expected fulfiller|proxy)"
            ))),
        }
    }
}

impl RelayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fulfiller => "fulfiller",
            Self::Proxy => "proxy",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl ServerConfig {
    /// URL advertised in this server's capability descriptor.
    pub fn advertised_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.clone(),
            None => format!("http://{}:{}/", self.bind_address, self.port),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("orderlink.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(public_url) = server.public_url {
                self.server.public_url = Some(public_url);
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(name) = agent.name {
                self.agent.name = name;
            }
            if let Some(description) = agent.description {
                self.agent.description = description;
            }
            if let Some(version) = agent.version {
                self.agent.version = version;
            }
        }

        if let Some(relay) = patch.relay {
            if let Some(mode) = relay.mode {
                self.relay.mode = mode;
            }
            if let Some(peer_url) = relay.peer_url {
                self.relay.peer_url = Some(peer_url);
            }
            if let Some(timeout_secs) = relay.timeout_secs {
                self.relay.timeout_secs = timeout_secs;
            }
        }

        if let Some(gateways) = patch.gateways {
            if let Some(catalog_url) = gateways.catalog_url {
                self.gateways.catalog_url = Some(catalog_url);
            }
            if let Some(fulfillment_url) = gateways.fulfillment_url {
                self.gateways.fulfillment_url = Some(fulfillment_url);
            }
            if let Some(timeout_secs) = gateways.timeout_secs {
                self.gateways.timeout_secs = timeout_secs;
            }
            if let Some(delivery_lead_minutes) = gateways.delivery_lead_minutes {
                self.gateways.delivery_lead_minutes = delivery_lead_minutes;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ORDERLINK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(port) = parsed_env("ORDERLINK_SERVER_PORT")? {
            self.server.port = port;
        }
        if let Some(value) = read_env("ORDERLINK_SERVER_PUBLIC_URL") {
            self.server.public_url = Some(value);
        }
        if let Some(secs) = parsed_env("ORDERLINK_SERVER_GRACEFUL_SHUTDOWN_SECS")? {
            self.server.graceful_shutdown_secs = secs;
        }

        if let Some(value) = read_env("ORDERLINK_AGENT_NAME") {
            self.agent.name = value;
        }
        if let Some(value) = read_env("ORDERLINK_AGENT_DESCRIPTION") {
            self.agent.description = value;
        }

        if let Some(value) = read_env("ORDERLINK_RELAY_MODE") {
            self.relay.mode = value.parse()?;
        }
        if let Some(value) = read_env("ORDERLINK_RELAY_PEER_URL") {
            self.relay.peer_url = Some(value);
        }
        if let Some(secs) = parsed_env("ORDERLINK_RELAY_TIMEOUT_SECS")? {
            self.relay.timeout_secs = secs;
        }

        if let Some(value) = read_env("ORDERLINK_GATEWAYS_CATALOG_URL") {
            self.gateways.catalog_url = Some(value);
        }
        if let Some(value) = read_env("ORDERLINK_GATEWAYS_FULFILLMENT_URL") {
            self.gateways.fulfillment_url = Some(value);
        }
        if let Some(secs) = parsed_env("ORDERLINK_GATEWAYS_TIMEOUT_SECS")? {
            self.gateways.timeout_secs = secs;
        }
        if let Some(minutes) = parsed_env("ORDERLINK_GATEWAYS_DELIVERY_LEAD_MINUTES")? {
            self.gateways.delivery_lead_minutes = minutes;
        }

        if let Some(value) = read_env("ORDERLINK_LOGGING_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("ORDERLINK_LOGGING_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(public_url) = overrides.public_url {
            self.server.public_url = Some(public_url);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(relay_mode) = overrides.relay_mode {
            self.relay.mode = relay_mode;
        }
        if let Some(peer_url) = overrides.peer_url {
            self.relay.peer_url = Some(peer_url);
        }
        if let Some(catalog_url) = overrides.catalog_url {
            self.gateways.catalog_url = Some(catalog_url);
        }
        if let Some(fulfillment_url) = overrides.fulfillment_url {
            self.gateways.fulfillment_url = Some(fulfillment_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_agent(&self.agent)?;
        validate_relay(&self.relay)?;
        validate_gateways(&self.gateways)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("orderlink.toml"), PathBuf::from("config/orderlink.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands `${VAR}` references in the raw file text before it is parsed.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        output.push_str(&rest[..open]);
        let reference = &rest[open + 2..];
        let close = reference.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &reference[..close];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &reference[close + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(public_url) = &server.public_url {
        if !is_http_url(public_url) {
            return Err(ConfigError::Validation(
                "server.public_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "agent.name is required; it is advertised in the capability descriptor".to_string(),
        ));
    }

    Ok(())
}

fn validate_relay(relay: &RelayConfig) -> Result<(), ConfigError> {
    if relay.timeout_secs == 0 || relay.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "relay.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match (&relay.mode, &relay.peer_url) {
        (RelayMode::Proxy, None) => Err(ConfigError::Validation(
            "relay.peer_url is required when relay.mode is proxy (e.g. http://fulfiller:9000)"
                .to_string(),
        )),
        (_, Some(peer_url)) if !is_http_url(peer_url) => Err(ConfigError::Validation(
            "relay.peer_url must start with http:// or https://".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_gateways(gateways: &GatewayConfig) -> Result<(), ConfigError> {
    if gateways.timeout_secs == 0 || gateways.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "gateways.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0..=1440).contains(&gateways.delivery_lead_minutes) {
        return Err(ConfigError::Validation(
            "gateways.delivery_lead_minutes must be in range 0..=1440".to_string(),
        ));
    }

    for (key, url) in [
        ("gateways.catalog_url", &gateways.catalog_url),
        ("gateways.fulfillment_url", &gateways.fulfillment_url),
    ] {
        if let Some(url) = url {
            if !is_http_url(url) {
                return Err(ConfigError::Validation(format!(
                    "{key} must start with http:// or https://"
                )));
            }
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Reads a numeric override. A set but unparseable value is an error.
fn parsed_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    read_env(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    agent: Option<AgentPatch>,
    relay: Option<RelayPatch>,
    gateways: Option<GatewayPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    public_url: Option<String>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    name: Option<String>,
    description: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RelayPatch {
    mode: Option<RelayMode>,
    peer_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayPatch {
    catalog_url: Option<String>,
    fulfillment_url: Option<String>,
    timeout_secs: Option<u64>,
    delivery_lead_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
