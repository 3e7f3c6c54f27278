//! Unified error handling for admin.
//!
//! Back-office routes return [`AppError`] (plain-text `(status, message)`).
//! The user-management routes return [`ApiError`], which renders the
//! `{success:false, message, error}` JSON body their clients expect.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use quillhouse_commerce::db::RepositoryError;
use quillhouse_commerce::razorpay::RazorpayError;
use quillhouse_commerce::refunds::RefundFlowError;
use quillhouse_commerce::shiprocket::ShiprocketError;
use quillhouse_core::coupon::CouponError;
use quillhouse_core::order_flow::RefundError;

/// Application-level error type for the back-office.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Razorpay operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] RazorpayError),

    /// Shiprocket operation failed.
    #[error("Shipping error: {0}")]
    Shipping(#[from] ShiprocketError),

    /// Refund could not be issued.
    #[error("{0}")]
    Refund(#[from] RefundError),

    /// Coupon rules are invalid.
    #[error("{0}")]
    Coupon(#[from] CouponError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with the current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An optional integration is not configured.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {err}"))
    }
}

impl From<RefundFlowError> for AppError {
    fn from(err: RefundFlowError) -> Self {
        match err {
            RefundFlowError::Repository(err) => Self::Database(err),
            RefundFlowError::Gateway(err) => Self::Payment(err),
            RefundFlowError::Ineligible(err) => Self::Refund(err),
            RefundFlowError::NotCancellable(status) => {
                Self::Conflict(format!("Order is {status} and cannot be cancelled"))
            }
            RefundFlowError::ShipmentBooked(order) => Self::Conflict(format!(
                "Order {order} has already been handed to the courier"
            )),
            RefundFlowError::MissingPayment(order) => {
                Self::Internal(format!("paid order {order} has no payment id"))
            }
        }
    }
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(err) => !matches!(
                err,
                RepositoryError::NotFound | RepositoryError::Conflict(_)
            ),
            Self::Payment(err) => !matches!(err, RazorpayError::InvalidAmount(_)),
            Self::Shipping(err) => !matches!(err, ShiprocketError::NotShippable(_)),
            Self::Internal(_) => true,
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Payment(RazorpayError::InvalidAmount(_))
            | Self::Shipping(ShiprocketError::NotShippable(_))
            | Self::Refund(_)
            | Self::Coupon(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Payment(_) | Self::Shipping(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Payment(RazorpayError::InvalidAmount(_)) => "Invalid refund amount".to_string(),
            Self::Shipping(ShiprocketError::NotShippable(reason)) => reason.clone(),
            Self::Payment(_) | Self::Shipping(_) => "External service error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        (self.status(), self.client_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error body of the user-management API.
#[derive(Debug, Serialize)]
struct ApiErrorBody<'a> {
    success: bool,
    message: &'a str,
    error: &'a str,
}

/// Error returned by the user-management API.
///
/// `message` describes what failed; `error` carries the cause. Server
/// errors are reported to Sentry and their cause is replaced before it
/// reaches the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    error: String,
}

impl ApiError {
    /// 400 with a validation message.
    pub fn bad_request(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            error: error.into(),
        }
    }

    /// 401 for a request without an admin session.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Admin login required".to_owned(),
            error: "unauthenticated".to_owned(),
        }
    }

    /// 404 for an unknown user.
    pub fn user_not_found(uid: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "User not found".to_owned(),
            error: format!("no user record for uid {uid}"),
        }
    }

    /// 500, logging the underlying error.
    pub fn internal(message: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        let event_id = sentry::capture_error(err);
        tracing::error!(error = %err, sentry_event_id = %event_id, "User-management error");

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            error: "Internal server error".to_owned(),
        }
    }

    /// Map a repository failure, keeping conflicts as client errors.
    pub fn from_repository(message: &str, err: &RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self {
                status: StatusCode::NOT_FOUND,
                message: "User not found".to_owned(),
                error: err.to_string(),
            },
            RepositoryError::Conflict(reason) => Self::bad_request(message, reason.clone()),
            _ => Self::internal(message, err),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            success: false,
            message: &self.message,
            error: &self.error,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order".to_string());
        assert_eq!(err.to_string(), "Not found: order");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Unavailable("shiprocket".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Refund(RefundError::NotPaid)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_shipping_errors() {
        let err = AppError::Shipping(ShiprocketError::NotShippable(
            "order has no print items".into(),
        ));
        assert_eq!(err.client_message(), "order has no print items");
        assert_eq!(get_status(err), StatusCode::BAD_REQUEST);

        let err = AppError::Shipping(ShiprocketError::Api {
            status: 500,
            message: "upstream".into(),
        });
        assert_eq!(err.client_message(), "External service error");
        assert_eq!(get_status(err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_refund_flow_errors() {
        let err = AppError::from(RefundFlowError::NotCancellable(
            quillhouse_core::OrderStatus::Delivered,
        ));
        assert_eq!(get_status(err), StatusCode::CONFLICT);

        let err = AppError::from(RefundFlowError::MissingPayment("QH-1".into()));
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[tokio::test]
    async fn test_api_error_body() {
        let response = ApiError::bad_request("Invalid email", "not-an-email").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid email");
        assert_eq!(json["error"], "not-an-email");
    }

    #[test]
    fn test_api_error_from_repository() {
        let err = ApiError::from_repository("Failed to delete user", &RepositoryError::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from_repository(
            "Failed to delete user",
            &RepositoryError::Conflict("user has payment history".into()),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
