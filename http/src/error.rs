use crate::response::json;
use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;
use packtrack_core::CoreError;
use packtrack_db::{ServiceError, StoreError};
use packtrack_session::SessionError;

/// Request failures, each mapped to one HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngressError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method {0} not allowed")]
    MethodNotAllowed(http::Method),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl IngressError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngressError::BadRequest(_) => StatusCode::BAD_REQUEST,
            IngressError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            IngressError::NotFound(_) => StatusCode::NOT_FOUND,
            IngressError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            IngressError::Conflict(_) => StatusCode::CONFLICT,
            IngressError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            IngressError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `{"error": "<message>"}` with the mapped status.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        json(status, &serde_json::json!({ "error": self.to_string() }))
    }
}

impl From<CoreError> for IngressError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition { .. } => IngressError::Conflict(err.to_string()),
            CoreError::InvalidCode(_) | CoreError::Validation(_) => {
                IngressError::BadRequest(err.to_string())
            }
            CoreError::Config(_) => IngressError::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for IngressError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(code) => IngressError::NotFound(format!("Package not found: {code}")),
            StoreError::Conflict(_) => IngressError::Conflict(err.to_string()),
            StoreError::Unavailable(_) => IngressError::Unavailable(err.to_string()),
            StoreError::Backend(_) | StoreError::InvalidData(_) => {
                IngressError::Internal(err.to_string())
            }
        }
    }
}

impl From<ServiceError> for IngressError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Core(e) => e.into(),
            ServiceError::Store(e) => e.into(),
        }
    }
}

impl From<SessionError> for IngressError {
    fn from(err: SessionError) -> Self {
        IngressError::Unauthorized(err.to_string())
    }
}

impl From<serde_json::Error> for IngressError {
    fn from(err: serde_json::Error) -> Self {
        IngressError::BadRequest(format!("Malformed JSON body: {err}"))
    }
}

impl From<serde_urlencoded::de::Error> for IngressError {
    fn from(err: serde_urlencoded::de::Error) -> Self {
        IngressError::BadRequest(format!("Malformed query string: {err}"))
    }
}

pub type IngressResult<T> = Result<T, IngressError>;
