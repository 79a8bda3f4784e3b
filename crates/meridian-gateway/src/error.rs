//! Gateway runtime error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meridian_kernel::gateway::{ErrorKind, GatewayError};
use serde_json::json;
use thiserror::Error;

/// Runtime errors: kernel errors plus transport failures.
#[derive(Debug, Error)]
pub enum GatewayImplError {
    #[error(transparent)]
    Kernel(#[from] GatewayError),

    /// A module call could not be completed (connect, timeout, body read).
    #[error("network error calling module '{module_id}': {source}")]
    Network {
        module_id: String,
        #[source]
        source: reqwest::Error,
    },

    /// A remote registry answered, but not usefully.
    #[error("remote registry {url} failed: {message}")]
    Remote { url: String, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayImplError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayImplError::Kernel(e) => e.kind(),
            GatewayImplError::Network { .. } | GatewayImplError::Remote { .. } => {
                ErrorKind::Upstream
            }
            GatewayImplError::InvalidRequest(_) => ErrorKind::BadRequest,
            GatewayImplError::Internal(_) => ErrorKind::Internal,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            GatewayImplError::Kernel(e) => match e {
                GatewayError::TenantNotFound(_) => "TENANT_NOT_FOUND",
                GatewayError::ModuleNotFound(_) => "MODULE_NOT_FOUND",
                GatewayError::NoRouteMatch { .. } => "NO_ROUTE",
                GatewayError::AmbiguousRoute { .. } => "AMBIGUOUS_ROUTE",
                GatewayError::NoRemoteReachable(_) => "NO_REMOTE_REACHABLE",
                GatewayError::InstanceNotFound(_) => "INSTANCE_NOT_FOUND",
                _ => match e.kind() {
                    ErrorKind::NotFound => "NOT_FOUND",
                    ErrorKind::Conflict => "CONFLICT",
                    ErrorKind::BadRequest => "BAD_REQUEST",
                    ErrorKind::Upstream => "UPSTREAM_ERROR",
                    ErrorKind::Internal => "INTERNAL_ERROR",
                },
            },
            GatewayImplError::Network { .. } => "MODULE_UNREACHABLE",
            GatewayImplError::Remote { .. } => "REMOTE_REGISTRY_ERROR",
            GatewayImplError::InvalidRequest(_) => "INVALID_REQUEST",
            GatewayImplError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// HTTP status for an error classification.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for GatewayImplError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind());
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayImplError>;
