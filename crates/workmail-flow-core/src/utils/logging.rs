/// Logging utilities for PII redaction
///
/// Message summaries carry addresses and subjects; these helpers keep them out
/// of CloudWatch Logs while leaving enough to correlate an invocation.
use crate::models::MessageSummary;
use regex::Regex;
use std::sync::LazyLock;

// Email redaction regex
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

/// Redacts email addresses from text, preserving domain for debugging
///
/// # Examples
/// ```
/// use workmail_flow_core::utils::logging::redact_email;
///
/// assert_eq!(redact_email("user@example.com"), "***@example.com");
/// assert_eq!(redact_email("Bounce for test@acme.com"), "Bounce for ***@acme.com");
/// ```
pub fn redact_email(text: &str) -> String {
    EMAIL_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            let email = &caps[0];
            match email.find('@') {
                Some(at_pos) => format!("***{}", &email[at_pos..]),
                None => "***@***".to_string(),
            }
        })
        .to_string()
}

/// Redacts subject line for logging (truncates and masks)
///
/// # Examples
/// ```
/// use workmail_flow_core::utils::logging::redact_subject;
///
/// assert_eq!(redact_subject("Confidential Document"), "Con...[21 chars]");
/// assert_eq!(redact_subject("Hi"), "Hi");
/// ```
pub fn redact_subject(subject: &str) -> String {
    const MAX_VISIBLE_CHARS: usize = 3;
    const MIN_LENGTH_TO_REDACT: usize = 6;

    let length = subject.chars().count();
    if length < MIN_LENGTH_TO_REDACT {
        subject.to_string()
    } else {
        let visible: String = subject.chars().take(MAX_VISIBLE_CHARS).collect();
        format!("{}...[{} chars]", visible, length)
    }
}

/// Creates safe log context for a message summary
pub fn safe_summary_context(summary: &MessageSummary) -> serde_json::Value {
    serde_json::json!({
        "invocation_id": summary.invocation_id,
        "message_id": summary.message_id,
        "flow_direction": summary.flow_direction,
        "from_domain": summary.mail_from().map(extract_domain),
        "recipient_count": summary.recipient_count(),
        "subject_preview": summary.subject.as_deref().map(redact_subject),
        "truncated": summary.truncated,
    })
}

/// Extracts domain from email address for safe logging
fn extract_domain(email: &str) -> String {
    email.split('@').nth(1).unwrap_or("unknown").to_string()
}
