/// Unified error types for the Owode Agent server
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the server
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors (missing/invalid token, bad credentials)
    #[error("{0}")]
    Authentication(String),

    /// Authorization errors (role checks, ownership checks)
    #[error("{0}")]
    Authorization(String),

    /// Field-level request validation errors
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Request is well formed but not acceptable in the current state
    #[error("{0}")]
    BadRequest(String),

    /// Not found errors
    #[error("{0}")]
    NotFound(String),

    /// Conflict errors (duplicate email, duplicate phone)
    #[error("{0}")]
    Conflict(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Email/SMS delivery errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Password hashing errors
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Single-field validation error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field));
                    FieldError::new(camel_case(&field), message)
                })
            })
            .collect();
        // HashMap iteration order is unstable
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

/// Request structs are camelCase on the wire; report fields the same way
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Validation failed".to_string()),
                Some(errors),
            ),
            AppError::BadRequest(ref m) | AppError::Conflict(ref m) => {
                (StatusCode::BAD_REQUEST, m.clone(), None)
            }
            AppError::Authentication(ref m) => (StatusCode::UNAUTHORIZED, m.clone(), None),
            AppError::Authorization(ref m) => (StatusCode::FORBIDDEN, m.clone(), None),
            AppError::NotFound(ref m) => (StatusCode::NOT_FOUND, m.clone(), None),
            AppError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
                None,
            ),
            ref e => {
                // Don't leak details
                tracing::error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorResponse { message, errors })).into_response()
    }
}

/// Result type alias for server operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_conflict_maps_to_bad_request() {
        let (status, body) = body_of(AppError::Conflict("Agent already exists".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Agent already exists");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_validation_lists_fields() {
        let err = AppError::Validation(vec![
            FieldError::new("email", "Valid email is required"),
            FieldError::new("phone", "Phone number is required"),
        ]);
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Valid email is required");
        assert_eq!(body["errors"][1]["field"], "phone");
    }

    #[test]
    fn test_field_names_are_camel_case() {
        assert_eq!(camel_case("contribution_amount"), "contributionAmount");
        assert_eq!(camel_case("email"), "email");
    }

    #[tokio::test]
    async fn test_internal_errors_are_opaque() {
        let (status, body) = body_of(AppError::Internal("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server error");
    }
}
