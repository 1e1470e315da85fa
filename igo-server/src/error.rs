use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use igo::ServiceError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::NoPosition(_)) => StatusCode::CONFLICT,
            ApiError::Service(ServiceError::Core(igo_core::Error::UnknownLocation(_))) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Service(ServiceError::Core(igo_core::Error::PathNotFound { .. }))
            | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Service(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
