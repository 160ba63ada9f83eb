use serde::{Deserialize, Serialize};

/// Well-known path, relative to a peer's base address, where its descriptor is served.
pub const DESCRIPTOR_PATH: &str = "/.well-known/agent-card.json";
/// Older well-known path some peers still serve.
pub const LEGACY_DESCRIPTOR_PATH: &str = "/.well-known/agent.json";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Discoverable description of a peer: where to send tasks and what it offers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default, rename = "skills")]
    pub operations: Vec<Operation>,
}

const TASK_EXAMPLE: &str =
    r#"{"task_id":"t-123","requirements":{"wish":"margherita","budget_jpy":2000}}"#;

impl Operation {
    pub fn resolve_order() -> Self {
        Self {
            id: "resolve_order_spec".to_string(),
            name: "Resolve order spec".to_string(),
            description: "Pick a catalog item for the task's wish and budget, place the order \
                          and return the committed result."
                .to_string(),
            tags: vec!["order".to_string(), "fulfillment".to_string()],
            examples: vec![TASK_EXAMPLE.to_string()],
        }
    }

    pub fn forward_order() -> Self {
        Self {
            id: "forward_order_spec".to_string(),
            name: "Forward order spec".to_string(),
            description: "Forward the order spec JSON to the fulfilling peer and return its result."
                .to_string(),
            tags: vec!["proxy".to_string(), "order".to_string()],
            examples: vec![TASK_EXAMPLE.to_string()],
        }
    }
}

impl CapabilityDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
            version: None,
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            capabilities: Capabilities::default(),
            operations,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("descriptor name is empty".to_string());
        }
        let url = self.url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("descriptor url `{url}` is not an absolute http(s) URL"));
        }
        Ok(())
    }

    pub fn offers(&self, operation_id: &str) -> bool {
        self.operations.iter().any(|operation| operation.id == operation_id)
    }
}

/// Joins a peer base address with the well-known descriptor path.
pub fn descriptor_url(base_address: &str) -> String {
    format!("{}{DESCRIPTOR_PATH}", base_address.trim_end_matches('/'))
}
