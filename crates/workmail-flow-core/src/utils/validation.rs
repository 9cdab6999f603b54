/// Input validation utilities
use crate::constants::MAX_EXECUTION_NAME_LENGTH;
use crate::error::FlowError;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

// Characters Step Functions refuses in execution names
static EXECUTION_NAME_FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"[\s<>{}\[\]?*"#%\\^|~`$&,;:/\p{Cc}]"##).unwrap());

pub fn validate_email_address(email: &str) -> Result<(), FlowError> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(FlowError::Validation(format!(
            "Invalid email address: {}",
            email
        )))
    }
}

/// Checks that an invocation id can be used verbatim as an execution name
pub fn validate_execution_name(name: &str) -> Result<(), FlowError> {
    let length = name.chars().count();
    if length == 0 || length > MAX_EXECUTION_NAME_LENGTH {
        return Err(FlowError::Validation(format!(
            "Execution name must be 1-{} characters, got {}",
            MAX_EXECUTION_NAME_LENGTH, length
        )));
    }

    if let Some(found) = EXECUTION_NAME_FORBIDDEN.find(name) {
        return Err(FlowError::Validation(format!(
            "Execution name contains forbidden character {:?} at offset {}",
            found.as_str(),
            found.start()
        )));
    }

    Ok(())
}
