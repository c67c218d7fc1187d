use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid instance ID: {0}")]
    InvalidInstanceId(String),

    #[error("Instance not found")]
    InstanceNotFound,

    #[error("Invalid action")]
    InvalidAction(String),

    #[error("Instance is already running")]
    AlreadyRunning,

    #[error("Instance is already stopped")]
    AlreadyStopped,

    #[error("Invalid resource usage")]
    InvalidUsage(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInstanceId(_) => "INVALID_INSTANCE_ID",
            Self::InstanceNotFound => "INSTANCE_NOT_FOUND",
            Self::InvalidAction(_) => "INVALID_ACTION",
            Self::AlreadyRunning => "INSTANCE_ALREADY_RUNNING",
            Self::AlreadyStopped => "INSTANCE_ALREADY_STOPPED",
            Self::InvalidUsage(_) => "INVALID_USAGE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInstanceId(_) => StatusCode::BAD_REQUEST,
            Self::InstanceNotFound => StatusCode::NOT_FOUND,
            Self::InvalidAction(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyRunning => StatusCode::BAD_REQUEST,
            Self::AlreadyStopped => StatusCode::BAD_REQUEST,
            Self::InvalidUsage(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Internal detail stays in the server log
        let detail = match &self {
            Self::InvalidAction(msg) => Some(msg.clone()),
            Self::InvalidUsage(msg) => Some(msg.clone()),
            Self::Internal(msg) => {
                error!("Internal error: {}", msg);
                None
            }
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
                detail,
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
