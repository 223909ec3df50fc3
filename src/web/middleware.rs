use actix_cors::Cors;
use actix_web::dev::ServiceResponse;
use actix_web::error::JsonPayloadError;
use actix_web::http::{header, Uri};
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers};
use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, warn};

use crate::config::RunMode;
use crate::error::RelayError;
use crate::web::models::ErrorPayload;

/// Builds the CORS policy. An empty allow-list accepts any origin without
/// credentials; otherwise only the listed origins, with credentials.
pub fn cors(allowed_origins: &[String]) -> Cors {
    let methods = ["GET", "POST"];

    if allowed_origins.is_empty() {
        return Cors::default()
            .allow_any_origin()
            .allowed_methods(methods)
            .allow_any_header()
            .max_age(3600);
    }

    let mut cors = Cors::default();
    for origin in allowed_origins {
        // actix-cors panics on origins it cannot parse.
        match origin.parse::<Uri>() {
            Ok(uri) if uri.scheme().is_some() && uri.host().is_some() => {
                cors = cors.allowed_origin(origin);
            }
            _ => warn!("Ignoring malformed CORS origin: {}", origin),
        }
    }

    cors.allowed_methods(methods)
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error_handler)
}

fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected JSON payload on {}: {}", req.path(), err);
    let too_large = matches!(
        err,
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. }
    );
    RelayError::InvalidPayload {
        details: err.to_string(),
        too_large,
    }
    .into()
}

pub const GENERIC_ERROR: &str = "Internal server error";
pub const PRODUCTION_DETAILS: &str = "Please try again later";

/// Last line of defense: any 5xx that was not already rendered as JSON is
/// logged and replaced with an `ErrorPayload`.
pub fn error_handlers<B: 'static>(mode: RunMode) -> ErrorHandlers<B> {
    ErrorHandlers::new().default_handler_server(move |res| render_server_error(res, mode))
}

fn render_server_error<B>(
    res: ServiceResponse<B>,
    mode: RunMode,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let already_json = res
        .response()
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("application/json"));
    if already_json {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let status = res.status();
    let message = res
        .response()
        .error()
        .map(|e| e.to_string())
        .unwrap_or_else(|| status.to_string());
    error!(
        "Unhandled error on {} {}: {}",
        res.request().method(),
        res.request().path(),
        message
    );

    let details = if mode.is_development() {
        message
    } else {
        PRODUCTION_DETAILS.to_string()
    };

    let (req, _) = res.into_parts();
    let response = HttpResponse::build(status).json(ErrorPayload {
        error: GENERIC_ERROR.to_string(),
        details,
    });
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}
