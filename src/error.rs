use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::portfolio::NormalizationError;
use crate::upstream::UpstreamError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("upstream rejected the request: {0}")]
    InvalidUpstreamRequest(String),

    #[error(transparent)]
    UpstreamUnreachable(UpstreamError),

    #[error("upstream responded with status {0}")]
    UpstreamServerError(u16),

    #[error(transparent)]
    NormalizationFailure(NormalizationError),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::InvalidUpstreamRequest(_) => "invalid_upstream_request",
            ApiError::UpstreamUnreachable(_) => "upstream_unreachable",
            ApiError::UpstreamServerError(_) => "upstream_server_error",
            ApiError::NormalizationFailure(_) => "normalization_failure",
        }
    }

    /// The message callers see. Transport and parsing details stay in the logs.
    pub fn detail(&self) -> String {
        match self {
            ApiError::InvalidInput(message) => message.clone(),
            ApiError::InvalidUpstreamRequest(message) => message.clone(),
            ApiError::UpstreamUnreachable(_) => "Upstream request failed".to_string(),
            ApiError::UpstreamServerError(_) => "Upstream server error".to_string(),
            ApiError::NormalizationFailure(_) => "Internal server error".to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::InvalidUpstreamRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::UpstreamUnreachable(_) | ApiError::NormalizationFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::UpstreamServerError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.detail(),
        })
    }
}
