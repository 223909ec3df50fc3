use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::model::CompletionError;
use crate::store::StoreError;
use crate::web::models::ErrorPayload;

pub const MISSING_PARAMETERS: &str = "Missing required parameters";
pub const REPLY_FAILED: &str = "Failed to get a reply";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Missing required parameters: {0}")]
    MissingParameters(String),

    #[error("Invalid JSON payload: {details}")]
    InvalidPayload {
        details: String,
        too_large: bool,
    },

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No route for {0}")]
    NotFound(String),
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingParameters(_) => StatusCode::BAD_REQUEST,
            RelayError::InvalidPayload { too_large: true, .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            RelayError::Completion(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Store(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Completion(_) | RelayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let (error, details) = match self {
            RelayError::MissingParameters(fields) => (MISSING_PARAMETERS, fields.clone()),
            RelayError::InvalidPayload { details, .. } => {
                ("Invalid JSON payload", details.clone())
            }
            RelayError::Completion(e) => (REPLY_FAILED, e.to_string()),
            RelayError::NotFound(path) => ("Not found", path.clone()),
            // The store health check keeps its own response shape.
            RelayError::Store(e) => {
                return HttpResponse::build(status).json(json!({
                    "status": "error",
                    "error": e.to_string(),
                }))
            }
        };

        HttpResponse::build(status).json(ErrorPayload {
            error: error.to_string(),
            details,
        })
    }
}
