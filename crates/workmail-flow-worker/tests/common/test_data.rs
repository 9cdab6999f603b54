/// Test data builders and helpers
use serde_json::{Value, json};

pub const DEFAULT_DECISION: &str = r#"{"actions":[{"allRecipients":true,"action":{"type":"DEFAULT"}}]}"#;

pub const BOUNCE_DECISION: &str = r#"{"actions":[{"recipients":["spam@example.test"],"action":{"type":"BOUNCE","parameters":{"bounceMessage":"Rejected"}}}]}"#;

/// Output with no `actions` collection
pub const MALFORMED_DECISION: &str = r#"{"verdict":"BOUNCE"}"#;

/// Build a WorkMail message summary event
pub fn message_summary(invocation_id: &str) -> Value {
    json!({
        "summaryVersion": "2019-07-28",
        "envelope": {
            "mailFrom": { "address": "sender@example.test" },
            "recipients": [
                { "address": "alice@corp.example.test" },
                { "address": "bob@corp.example.test" }
            ]
        },
        "sender": { "address": "sender@example.test" },
        "subject": "Quarterly numbers",
        "messageId": "6d2b8a51-8d3a-4f6b-9c0e-2a0f7c1d3e4f",
        "invocationId": invocation_id,
        "flowDirection": "INBOUND",
        "truncated": false
    })
}

pub fn default_decision() -> Value {
    serde_json::from_str(DEFAULT_DECISION).unwrap()
}
