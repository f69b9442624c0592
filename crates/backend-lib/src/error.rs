// ============================
// greenpoll-backend-lib/src/error.rs
// ============================

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::store::StoreError;

/// Typed failures returned by every domain service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Deliberately identical for unknown-email and wrong-password so
    /// callers cannot tell which half of the check failed.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("You do not have permission to modify this resource")]
    PermissionDenied,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidCredentials | ServiceError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            },
            ServiceError::PermissionDenied => StatusCode::FORBIDDEN,
            ServiceError::Store(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VAL_001",
            ServiceError::NotFound(_) => "NF_001",
            ServiceError::InvalidCredentials => "AUTH_001",
            ServiceError::InvalidToken => "AUTH_002",
            ServiceError::PermissionDenied => "PERM_001",
            ServiceError::Store(_) => "STORE_001",
            ServiceError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use.
    ///
    /// Validation and not-found messages are part of the API contract
    /// and pass through unchanged; store and internal details do not.
    pub fn sanitized_message(&self) -> String {
        match self {
            ServiceError::Store(_) | ServiceError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_service_error_display() {
        let validation = ServiceError::Validation(
            "Username must be between 3 and 63 characters".to_string(),
        );
        assert_eq!(
            validation.to_string(),
            "Username must be between 3 and 63 characters"
        );

        let not_found = ServiceError::NotFound("Poll does not exist".to_string());
        assert_eq!(not_found.to_string(), "Poll does not exist");

        assert_eq!(
            ServiceError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }

    #[test]
    fn test_service_error_status_codes() {
        assert_eq!(
            ServiceError::Validation("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::NotFound("missing".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::InvalidToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::PermissionDenied.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_error_error_codes() {
        assert_eq!(
            ServiceError::Validation("bad".to_string()).error_code(),
            "VAL_001"
        );
        assert_eq!(ServiceError::InvalidCredentials.error_code(), "AUTH_001");
        assert_eq!(ServiceError::InvalidToken.error_code(), "AUTH_002");
        assert_eq!(ServiceError::PermissionDenied.error_code(), "PERM_001");
    }

    #[test]
    fn test_sanitized_messages() {
        // Store details never reach clients
        let store = ServiceError::Store(StoreError::UnknownOperation(
            "user/does_not_exist".to_string(),
        ));
        assert_eq!(
            store.sanitized_message(),
            "An internal server error occurred"
        );

        // Validation messages are the API contract
        let validation =
            ServiceError::Validation("Title must be between 1 and 255 characters".to_string());
        assert_eq!(
            validation.sanitized_message(),
            "Title must be between 1 and 255 characters"
        );
    }

    #[test]
    fn test_service_error_into_response() {
        let error = ServiceError::NotFound("Poll does not exist".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_from_store_error() {
        let err: ServiceError =
            StoreError::Constraint("username already in use".to_string()).into();
        assert!(matches!(err, ServiceError::Store(_)));
    }
}
