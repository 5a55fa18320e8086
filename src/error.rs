use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::account::validate;
use crate::store::StoreError;

/// Field name -> human-readable messages, rendered under `error_msg`.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

pub fn field_error(field: &'static str, message: impl Into<String>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(field, vec![message.into()]);
    errors
}

/// Every failure a request can surface. Client-input failures are 4xx and
/// carry either a plain message or a field-keyed map; nothing here is fatal
/// to the process.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("email and password are required")]
    MissingCredentials,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("user is not logged in")]
    NotLoggedIn,
    #[error("authentication credentials were not provided")]
    Unauthenticated,
    #[error("invalid old password")]
    InvalidOldPassword,
    #[error("email is not registered")]
    UnknownEmail,
    #[error("unknown user in reset link")]
    UnknownUser,
    #[error("invalid or expired reset token")]
    InvalidToken,
    #[error("mail delivery failed")]
    Delivery(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::MissingCredentials
            | ApiError::InvalidCredentials
            | ApiError::NotLoggedIn
            | ApiError::InvalidOldPassword
            | ApiError::UnknownEmail
            | ApiError::UnknownUser
            | ApiError::InvalidToken => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::FORBIDDEN,
            ApiError::Delivery(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The wire body: `{"error_msg": <string> | {field: [message, ...]}}`.
    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::Validation(fields) => json!({ "error_msg": fields }),
            ApiError::MissingCredentials => {
                json!({ "error_msg": { "login_infos": ["Email and password are required"] } })
            }
            ApiError::InvalidCredentials => {
                json!({ "error_msg": { "invalid_login": ["Invalid email or password"] } })
            }
            ApiError::NotLoggedIn => {
                json!({ "error_msg": { "logout_error": ["User is not logged in"] } })
            }
            ApiError::Unauthenticated => {
                json!({ "error_msg": "Authentication credentials were not provided." })
            }
            ApiError::InvalidOldPassword => {
                json!({ "error_msg": { "password": ["Invalid old password"] } })
            }
            ApiError::UnknownEmail => {
                json!({ "error_msg": { "email": ["This email is not registered"] } })
            }
            ApiError::UnknownUser => json!({ "error_msg": "Invalid password reset link" }),
            ApiError::InvalidToken => json!({ "error_msg": "Invalid or expired reset token" }),
            ApiError::Delivery(_) => {
                json!({ "error_msg": "Failed to send the password reset email" })
            }
            ApiError::Internal(_) => json!({ "error_msg": "Internal server error" }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Delivery(e) => error!(error = %e, "mail delivery failed"),
            ApiError::Internal(e) => error!(error = %e, "internal error"),
            _ => {}
        }
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken => ApiError::Validation(field_error("email", validate::EMAIL_TAKEN)),
            StoreError::Other(e) => ApiError::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_render_as_field_map() {
        let err = ApiError::Validation(field_error("username", "bad"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body(), json!({ "error_msg": { "username": ["bad"] } }));
    }

    #[test]
    fn unauthenticated_is_forbidden_with_plain_message() {
        let err = ApiError::Unauthenticated;
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            err.body(),
            json!({ "error_msg": "Authentication credentials were not provided." })
        );
    }

    #[test]
    fn email_taken_store_error_maps_to_email_field() {
        let err = ApiError::from(StoreError::EmailTaken);
        let ApiError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields["email"], vec![validate::EMAIL_TAKEN.to_string()]);
    }

    #[test]
    fn delivery_failure_is_a_server_error() {
        let err = ApiError::Delivery(anyhow::anyhow!("smtp down"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
