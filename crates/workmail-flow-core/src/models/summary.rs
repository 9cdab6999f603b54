/// WorkMail message summary - the event a synchronous message flow rule receives
use crate::error::FlowError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    /// Idempotency token, stable across WorkMail retries of the same invocation
    pub invocation_id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub summary_version: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub flow_direction: Option<FlowDirection>,
    /// Reference to the message content held by the WorkMail message flow API
    #[serde(default, deserialize_with = "lenient")]
    pub message_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub envelope: Option<Envelope>,
    #[serde(default, deserialize_with = "lenient")]
    pub sender: Option<MailAddress>,
    #[serde(default, deserialize_with = "lenient")]
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowDirection {
    Inbound,
    Outbound,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, deserialize_with = "lenient")]
    pub mail_from: Option<MailAddress>,
    #[serde(default, deserialize_with = "lenient")]
    pub recipients: Vec<MailAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MailAddress {
    pub address: String,
}

/// Reads a field the flow only logs; a value of the wrong shape becomes the default
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl MessageSummary {
    /// Reads the typed view of a raw event, requiring only `invocationId`
    ///
    /// Other fields are informational; malformed ones are read as absent.
    pub fn from_value(value: &Value) -> Result<Self, FlowError> {
        if !value.is_object() {
            return Err(FlowError::Validation(
                "Message summary must be a JSON object".to_string(),
            ));
        }

        match value.get("invocationId") {
            Some(Value::String(id)) if !id.is_empty() => {}
            Some(Value::String(_)) => {
                return Err(FlowError::Validation(
                    "invocationId must not be empty".to_string(),
                ));
            }
            Some(_) => {
                return Err(FlowError::Validation(
                    "invocationId must be a string".to_string(),
                ));
            }
            None => {
                return Err(FlowError::Validation(
                    "Missing required field invocationId".to_string(),
                ));
            }
        }

        Self::deserialize(value)
            .map_err(|e| FlowError::Validation(format!("Invalid message summary: {}", e)))
    }

    pub fn mail_from(&self) -> Option<&str> {
        self.envelope
            .as_ref()
            .and_then(|envelope| envelope.mail_from.as_ref())
            .map(|addr| addr.address.as_str())
    }

    pub fn recipient_count(&self) -> usize {
        self.envelope
            .as_ref()
            .map(|envelope| envelope.recipients.len())
            .unwrap_or(0)
    }
}
