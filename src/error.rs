//! Structured errors for caller-facing operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidDepth,
    InvalidStatus,

    // Not found errors
    TaskNotFound,
    ProjectNotFound,

    // Precondition errors
    NotBlocked,

    // Internal errors
    StoreError,
    InternalError,
}

/// Structured error reported to the caller. No state is mutated when one is raised.
#[derive(Debug, Clone, Serialize)]
pub struct HiveError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HiveError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn invalid_metadata(pair: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFieldValue,
            format!("Invalid metadata format: \"{}\". Use key=value.", pair),
        )
        .with_field("metadata")
    }

    pub fn invalid_depth(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidDepth, reason).with_field("depth")
    }

    pub fn invalid_status(value: &str) -> Self {
        Self::new(
            ErrorCode::InvalidStatus,
            format!(
                "Invalid status: {} (expected pending, in_progress, blocked, completed, failed or abandoned)",
                value
            ),
        )
        .with_field("status")
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn project_not_found(project_id: &str) -> Self {
        Self::new(
            ErrorCode::ProjectNotFound,
            format!("Project not found: {}", project_id),
        )
    }

    pub fn not_blocked(task_id: &str, status: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::NotBlocked,
            format!("Task {} is not blocked (status: {})", task_id, status),
        )
    }

    pub fn store(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StoreError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for HiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HiveError {}

impl From<anyhow::Error> for HiveError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<HiveError>() {
            Ok(hive_err) => hive_err,
            Err(err) => match err.downcast::<crate::store::StoreError>() {
                Ok(store_err) => HiveError::store(store_err),
                Err(err) => HiveError::internal(err),
            },
        }
    }
}

/// Result type for caller-facing operations.
pub type HiveResult<T> = std::result::Result<T, HiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_code_and_skips_empty_fields() {
        let err = HiveError::task_not_found("t1");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "TASK_NOT_FOUND");
        assert_eq!(json["message"], "Task not found: t1");
        assert!(json.get("field").is_none());
    }

    #[test]
    fn anyhow_roundtrip_keeps_structured_error() {
        let err: anyhow::Error = HiveError::not_blocked("t1", "pending").into();
        let back = HiveError::from(err);
        assert_eq!(back.code, ErrorCode::NotBlocked);
    }

    #[test]
    fn foreign_errors_become_internal() {
        let back = HiveError::from(anyhow::anyhow!("boom"));
        assert_eq!(back.code, ErrorCode::InternalError);
        assert_eq!(back.message, "boom");
    }
}
