use serde_json::Value;

/// One decoded message off the event stream. `kind` mirrors the payload's
/// `type` field; a message without one keeps an empty kind and is still
/// forwarded, since its `stats` field (if any) applies. Never mutated after
/// decoding.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub kind: String,
    pub payload: Value,
}

impl RawEvent {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let payload: Value = serde_json::from_str(text)?;
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Self { kind, payload })
    }

    /// Synthetic status event published by the listener itself.
    pub fn connection_status(status: &str) -> Self {
        Self {
            kind: "connection_status".to_string(),
            payload: serde_json::json!({ "type": "connection_status", "status": status }),
        }
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}
