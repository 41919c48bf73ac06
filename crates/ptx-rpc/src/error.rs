//! Translates [`RpcError`] into the JSON-RPC 2.0 error envelope.

use axum::response::{IntoResponse, Json, Response};
use axum::http::StatusCode;
use ptx_types::error::{ErrorCode, RpcError};

/// A JSON-RPC error ready to serialize into a response body.
pub struct AppError(pub RpcError);

impl From<RpcError> for AppError {
    fn from(err: RpcError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RpcError::InvalidRequest(_) | RpcError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            RpcError::MethodNotFound(_) => StatusCode::NOT_FOUND,
            RpcError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if matches!(self.0, RpcError::Internal(_)) {
            tracing::error!(target = "ptx-rpc", error = %self.0, "internal error handling request");
        }
        ptx_telemetry::error_metrics().inc_error("rpc", self.0.code());
        (status, Json(serde_json::json!({
            "error": { "code": self.0.code(), "message": self.0.to_string() }
        })))
            .into_response()
    }
}
