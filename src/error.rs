use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::types::api::ErrorBody;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// A backing medium could not complete an operation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("IO error")]
    IO {
        #[from]
        source: std::io::Error,
    },
    #[error("malformed stored data")]
    Malformed {
        #[from]
        source: serde_json::Error,
    },
    #[error("remote store request failed")]
    Remote {
        #[from]
        source: reqwest::Error,
    },
    #[error("remote store rejected command: {0}")]
    RemoteCommand(String),
    #[error("unexpected reply from remote store")]
    UnexpectedReply,
    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("paste not found or unavailable")]
    NotFound,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid x-test-now-ms header")]
    InvalidTestTime,
    #[error("invalid request body")]
    Json {
        #[from]
        source: JsonRejection,
    },
    #[error("storage unavailable")]
    Store {
        #[from]
        source: StoreError,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidTestTime => StatusCode::BAD_REQUEST,
            ApiError::Json { .. } => StatusCode::BAD_REQUEST,
            ApiError::Store { source } => {
                error!("storage failure: {source:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: format!("{self}"),
        };

        (status_code, Json(body)).into_response()
    }
}
