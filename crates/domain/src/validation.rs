use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum allowed length for an email address
pub const MAX_EMAIL_LENGTH: usize = 254;

/// A problem with a single field of a submitted `MessageDraft`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIssue {
    pub field_name: String,
    pub field_message: String,
}

impl FieldIssue {
    pub fn new(field_name: &str, field_message: impl Into<String>) -> Self {
        Self {
            field_name: field_name.to_string(),
            field_message: field_message.into(),
        }
    }
}

/// Every field level problem found when validating user input.
/// Never constructed with an empty list of issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub fields: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(fields: Vec<FieldIssue>) -> Self {
        Self { fields }
    }

    pub fn has_issue_for(&self, field_name: &str) -> bool {
        self.fields.iter().any(|f| f.field_name == field_name)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field(s) with validation problems!", self.fields.len())?;
        for issue in &self.fields {
            write!(f, " {}: {}.", issue.field_name, issue.field_message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Basic syntactic check of an already trimmed email address: exactly one `@`,
/// a non empty local part and a dotted domain without empty labels.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("email address must not be empty".into());
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(format!(
            "email address is too long ({} chars, max {})",
            email.len(),
            MAX_EMAIL_LENGTH
        ));
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(format!("{} must not contain whitespace", email));
    }

    let parts = email.split('@').collect::<Vec<_>>();
    if parts.len() != 2 {
        return Err(format!("{} must contain exactly one @ symbol", email));
    }
    let (local, domain) = (parts[0], parts[1]);
    if local.is_empty() {
        return Err(format!("{} is missing the part before @", email));
    }

    let labels = domain.split('.').collect::<Vec<_>>();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(format!("{} has an invalid domain", email));
    }
    if labels
        .iter()
        .any(|label| label.starts_with('-') || label.ends_with('-'))
    {
        return Err(format!("{} has an invalid domain", email));
    }

    Ok(())
}
