/// Routing decision returned to WorkMail by a synchronous message flow rule
use crate::error::FlowError;
use crate::utils::validation::validate_email_address;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The action list telling WorkMail how to dispose of a message
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoutingDecision {
    pub actions: Vec<RoutingAction>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingAction {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_recipients: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

/// Action types understood by WorkMail. Anything else is carried as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Default,
    Bounce,
    Drop,
    MoveToJunk,
    BypassSpamCheck,
    #[serde(untagged)]
    Other(String),
}

impl ActionType {
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// How much of a state machine output is checked before it is trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputValidation {
    /// Object with an `actions` list whose entries carry an action type
    #[default]
    Minimal,
    /// Minimal, plus known action types, at least one action and valid recipient addresses
    Strict,
}

impl std::str::FromStr for OutputValidation {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "strict" => Ok(Self::Strict),
            other => Err(FlowError::Config(format!(
                "Unknown output validation mode: {}",
                other
            ))),
        }
    }
}

impl RoutingDecision {
    /// Lets the message through unchanged for every recipient
    pub fn allow_all() -> Self {
        Self {
            actions: vec![RoutingAction {
                action: Action {
                    action_type: ActionType::Default,
                    parameters: None,
                },
                recipients: None,
                all_recipients: Some(true),
            }],
        }
    }

    /// Parses raw state machine output, rejecting anything WorkMail could not act on
    pub fn parse(raw: &str, validation: OutputValidation) -> Result<Self, FlowError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| FlowError::MalformedOutput(format!("Output is not JSON: {}", e)))?;

        let Some(object) = value.as_object() else {
            return Err(FlowError::MalformedOutput(
                "Output is not a JSON object".to_string(),
            ));
        };

        // An empty list passes here and leaves the message untouched; strict mode rejects it
        match object.get("actions") {
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(FlowError::MalformedOutput(
                    "Field 'actions' is not a list".to_string(),
                ));
            }
            None => {
                return Err(FlowError::MalformedOutput(
                    "Missing field 'actions'".to_string(),
                ));
            }
        }

        let decision = Self::deserialize(&value)
            .map_err(|e| FlowError::MalformedOutput(format!("Invalid action list: {}", e)))?;

        if validation == OutputValidation::Strict {
            decision.validate_strict()?;
        }

        Ok(decision)
    }

    fn validate_strict(&self) -> Result<(), FlowError> {
        if self.actions.is_empty() {
            return Err(FlowError::MalformedOutput(
                "At least one action is required".to_string(),
            ));
        }

        for (index, entry) in self.actions.iter().enumerate() {
            if let ActionType::Other(kind) = &entry.action.action_type {
                return Err(FlowError::MalformedOutput(format!(
                    "Action {} has unknown type '{}'",
                    index, kind
                )));
            }

            for recipient in entry.recipients.iter().flatten() {
                validate_email_address(recipient).map_err(|_| {
                    FlowError::MalformedOutput(format!(
                        "Action {} has an invalid recipient address",
                        index
                    ))
                })?;
            }
        }

        Ok(())
    }
}
