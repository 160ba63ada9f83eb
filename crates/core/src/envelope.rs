//! Envelope codec: carries one JSON payload as the text part of a message envelope.
//!
//! Peers are not consistent about how they shape parts. Some send a bare part
//! (`{"kind": "text", "text": ".."}`), others box it under `root` (or `__root__`). Both arrive
//! as [`PartShape`] and are normalized to a [`Part`] before anything looks at `kind`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::CodecError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        #[serde(default)]
        text: String,
    },
    Data {
        #[serde(default)]
        data: Value,
    },
    File {
        #[serde(default)]
        file: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxedPart {
    #[serde(alias = "__root__")]
    pub root: Box<PartShape>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartShape {
    Boxed(BoxedPart),
    Bare(Part),
}

impl PartShape {
    /// Strips any number of `root` wrappers.
    pub fn normalize(&self) -> &Part {
        let mut shape = self;
        loop {
            match shape {
                Self::Bare(part) => return part,
                Self::Boxed(boxed) => shape = &boxed.root,
            }
        }
    }
}

impl From<Part> for PartShape {
    fn from(part: Part) -> Self {
        Self::Bare(part)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<PartShape>,
    #[serde(default, alias = "messageId")]
    pub message_id: String,
}

impl MessageEnvelope {
    /// A new envelope whose only part is `text`, with a fresh message id.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::Text { text: text.into() }.into()],
            message_id: Uuid::new_v4().simple().to_string(),
        }
    }

    /// The first text part with non-empty text, in part order.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().map(PartShape::normalize).find_map(|part| match part {
            Part::Text { text } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
    }
}

pub fn encode<T>(payload: &T) -> Result<MessageEnvelope, CodecError>
where
    T: Serialize + ?Sized,
{
    encode_as(Role::User, payload)
}

pub fn encode_as<T>(role: Role, payload: &T) -> Result<MessageEnvelope, CodecError>
where
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string(payload)
        .map_err(|error| CodecError::MalformedPayload(error.to_string()))?;
    Ok(MessageEnvelope::text(role, text))
}

pub fn decode(envelope: &MessageEnvelope) -> Result<Value, CodecError> {
    let text = envelope.first_text().ok_or(CodecError::NoTextPart)?;
    serde_json::from_str(text).map_err(|error| CodecError::MalformedPayload(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use crate::domain::task::{Requirements, TaskSpecification};
    use crate::envelope::{decode, encode, encode_as, MessageEnvelope, Part, PartShape, Role};
    use crate::errors::CodecError;

    fn envelope_from(value: serde_json::Value) -> MessageEnvelope {
        serde_json::from_value(value).expect("envelope should parse")
    }

    #[test]
    fn encode_wraps_payload_as_single_user_text_part() {
        let envelope = encode(&json!({"task_id": "t-1"})).expect("encode");

        assert_eq!(envelope.role, Role::User);
        assert_eq!(envelope.parts.len(), 1);
        assert_eq!(envelope.first_text(), Some(r#"{"task_id":"t-1"}"#));
        assert!(!envelope.message_id.is_empty());
    }

    #[test]
    fn encode_keeps_non_ascii_text_unescaped() {
        let envelope = encode(&json!({"wish": "マルゲリータ"})).expect("encode");

        assert_eq!(envelope.first_text(), Some(r#"{"wish":"マルゲリータ"}"#));
    }

    #[test]
    fn every_envelope_gets_a_fresh_message_id() {
        let ids: HashSet<String> = (0..32)
            .map(|_| encode(&json!({})).expect("encode").message_id)
            .collect();

        assert_eq!(ids.len(), 32);
    }

    #[test]
    fn task_specification_survives_encode_then_decode() {
        let mut task = TaskSpecification::new(
            Some("t-round"),
            Requirements::new(Some("seafood"), Some(1900)),
        );
        task.extra.insert("note".to_string(), json!("no olives"));

        let decoded = decode(&encode(&task).expect("encode")).expect("decode");
        let recovered = TaskSpecification::from_payload(decoded).expect("task");

        assert_eq!(recovered, task);
    }

    #[test]
    fn decode_uses_first_non_empty_text_part() {
        let envelope = envelope_from(json!({
            "role": "agent",
            "parts": [
                {"kind": "data", "data": {"ignored": true}},
                {"kind": "text", "text": ""},
                {"kind": "text", "text": "{\"status\":\"no_match\",\"reason\":\"none\"}"},
                {"kind": "text", "text": "{\"status\":\"error\",\"reason\":\"later\"}"}
            ],
            "message_id": "m-1"
        }));

        assert_eq!(decode(&envelope), Ok(json!({"status": "no_match", "reason": "none"})));
    }

    #[test]
    fn decode_unwraps_boxed_parts() {
        let envelope = envelope_from(json!({
            "role": "user",
            "parts": [
                {"root": {"kind": "file", "file": {"uri": "s3://menu.pdf"}}},
                {"__root__": {"root": {"kind": "text", "text": "{\"wish\":\"pepperoni\"}"}}}
            ],
            "messageId": "m-2"
        }));

        assert_eq!(envelope.message_id, "m-2");
        assert!(matches!(envelope.parts[1], PartShape::Boxed(_)));
        assert_eq!(decode(&envelope), Ok(json!({"wish": "pepperoni"})));
    }

    #[test]
    fn unknown_part_kinds_are_ignored() {
        let envelope = envelope_from(json!({
            "role": "user",
            "parts": [
                {"kind": "audio", "uri": "file://x.wav"},
                {"kind": "text", "text": "{}"}
            ]
        }));

        assert_eq!(envelope.parts[0].normalize(), &Part::Other);
        assert_eq!(decode(&envelope), Ok(json!({})));
    }

    #[test]
    fn envelope_without_text_fails_with_no_text_part() {
        let envelope = envelope_from(json!({
            "role": "user",
            "parts": [{"kind": "data", "data": {"wish": "margherita"}}, {"kind": "text"}],
            "message_id": "m-3"
        }));

        assert_eq!(decode(&envelope), Err(CodecError::NoTextPart));
    }

    #[test]
    fn non_json_text_fails_with_malformed_payload() {
        let envelope = MessageEnvelope::text(Role::Agent, "not json");

        assert!(matches!(decode(&envelope), Err(CodecError::MalformedPayload(_))));
    }

    #[test]
    fn agent_role_envelopes_serialize_bare_parts() {
        let envelope = encode_as(Role::Agent, &json!({"status": "error"})).expect("encode");
        let value = serde_json::to_value(&envelope).expect("serialize");

        assert_eq!(value["role"], json!("agent"));
        assert_eq!(value["parts"], json!([{"kind": "text", "text": "{\"status\":\"error\"}"}]));
        assert!(value["message_id"].is_string());
    }
}
