use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::Error;

/// Standard API response envelope. Every outcome travels through this
/// shape; the HTTP status code is the only machine-readable signal of the
/// error category.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub status: u16,
    pub message: String,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            errors: Vec::new(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            errors: Vec::new(),
            data: None,
        }
    }
}

/// API error that converts to a proper HTTP response in the same envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub errors: Vec<String>,
}

impl ApiError {
    #[must_use]
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn validation(errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "Validation error".to_string(),
            errors,
        }
    }

    /// The uniform answer for both a missing resource and a missing
    /// permission on it.
    #[must_use]
    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: "You are not authorized to perform the action.".to_string(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn no_result() -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "No available result.".to_string(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Connection error. Please retry.".to_string(),
            errors: Vec::new(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(errors) => ApiError::validation(errors),
            Error::Business(message) => ApiError::unprocessable(message),
            Error::InvitationResolved => {
                ApiError::unprocessable("The invitation has already been responded to.")
            }
            Error::AlreadyExists => ApiError::unprocessable("Already exists."),
            Error::NotFound => ApiError::no_result(),
            Error::Forbidden => ApiError::forbidden(),
            Error::Unauthorized => ApiError {
                status: StatusCode::UNAUTHORIZED,
                message: "Authentication required".to_string(),
                errors: Vec::new(),
            },
            err => {
                tracing::error!("request failed: {err}");
                ApiError::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "status": self.status.as_u16(),
            "message": self.message,
            "errors": self.errors,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_no_result(self) -> Result<T, ApiError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_no_result(self) -> Result<T, ApiError> {
        self.ok_or_else(ApiError::no_result)
    }
}
