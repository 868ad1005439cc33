//! Helper types and traits for cleaner route handlers.
//!
//! Every failure leaves a handler as a status code plus a small JSON body,
//! so clients can always read `success` and `message`.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

/// JSON body of a failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

/// Error half of every route result.
pub type ApiError = (StatusCode, Json<ErrorBody>);

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, ApiError>;

/// Build an [`ApiError`] with the given status and message.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            success: false,
            message: message.into(),
        }),
    )
}

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
pub trait OptionExt<T> {
    /// Returns the contained value or a 404 Not Found error.
    fn or_not_found(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| api_error(StatusCode::NOT_FOUND, msg))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))
    }
}
