use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::errors::CodecError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wish: Option<String>,
    #[serde(
        rename = "budget_jpy",
        alias = "budget",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub budget: Option<u64>,
    /// Keys this side does not understand; carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Requirements {
    pub fn new(wish: Option<&str>, budget: Option<u64>) -> Self {
        Self { wish: wish.map(str::to_owned), budget, extra: Map::new() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpecification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A payload that decoded as JSON but is not a usable task.
///
/// Keeps whatever `task_id` could be read so the error result can still echo it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{source}")]
pub struct TaskDecodeError {
    pub task_id: Option<String>,
    pub source: CodecError,
}

impl TaskSpecification {
    pub fn new(task_id: Option<&str>, requirements: Requirements) -> Self {
        Self { task_id: task_id.map(str::to_owned), requirements, extra: Map::new() }
    }

    /// Interprets a decoded envelope payload as a task.
    ///
    /// Two shapes are accepted:
    /// - nested: `{"task_id": .., "requirements": {"wish": .., "budget_jpy": ..}}`
    /// - flat (compatibility): `{"task_id": .., "wish": .., "budget_jpy": ..}`, where the whole
    ///   object minus `task_id` is taken as the requirements.
    pub fn from_payload(payload: Value) -> Result<Self, TaskDecodeError> {
        let Value::Object(mut fields) = payload else {
            return Err(malformed(None, "task payload must be a JSON object"));
        };
        let task_id = fields.get("task_id").and_then(Value::as_str).map(str::to_owned);

        if fields.contains_key("requirements") {
            if let Some(Value::Object(requirements)) = fields.get_mut("requirements") {
                drop_shadowed_budget(requirements);
            }
            return serde_json::from_value(Value::Object(fields))
                .map_err(|error| malformed(task_id.clone(), error));
        }

        match fields.remove("task_id") {
            None | Some(Value::String(_)) => {}
            Some(_) => return Err(malformed(None, "task_id must be a string")),
        }
        drop_shadowed_budget(&mut fields);
        let requirements = serde_json::from_value::<Requirements>(Value::Object(fields))
            .map_err(|error| malformed(task_id.clone(), error))?;

        Ok(Self { task_id, requirements, extra: Map::new() })
    }

    pub fn wish(&self) -> Option<&str> {
        self.requirements.wish.as_deref()
    }

    pub fn budget(&self) -> Option<u64> {
        self.requirements.budget
    }
}

/// `budget` is the older spelling of `budget_jpy`; when both are sent, `budget_jpy` wins.
fn drop_shadowed_budget(requirements: &mut Map<String, Value>) {
    if requirements.contains_key("budget_jpy") {
        requirements.remove("budget");
    }
}

fn malformed(task_id: Option<String>, message: impl std::fmt::Display) -> TaskDecodeError {
    TaskDecodeError { task_id, source: CodecError::MalformedPayload(message.to_string()) }
}
