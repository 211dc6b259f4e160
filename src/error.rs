//! Error taxonomy for the HTTP surface.
//!
//! Every failure a handler can produce maps onto one of these variants, and
//! every variant renders as `{"success": false, "message": ...}` with an
//! appropriate status code. A missing saved document is deliberately NOT an
//! error — `/load` reports it as a normal `success: false` response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A required field was missing or empty after trimming.
    #[error("{0}")]
    Validation(String),

    /// Register number already taken. Relies on the store's UNIQUE
    /// constraint, so concurrent registrations race safely.
    #[error("{0}")]
    Conflict(String),

    /// Credential mismatch. One fixed message for both "no such register
    /// number" and "wrong PIN" so the response never reveals which.
    #[error("Invalid Register Number or PIN")]
    Auth,

    /// Persistence failure. Detail is logged server-side only.
    #[error("Server Error")]
    Storage(#[from] rusqlite::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            // Conflict stays on 400 — the client only branches on `success`.
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Storage(ref e) = self {
            tracing::error!("storage failure: {e}");
        }
        let body = serde_json::json!({
            "success": false,
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
