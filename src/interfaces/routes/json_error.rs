use actix_web::{error::InternalError, web, HttpRequest, ResponseError};

use crate::errors::AppError;

/// Malformed bodies, query strings and path segments answer with the same
/// `{ error, message }` payload as every other failure.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, req| {
        rejection(format!("JSON payload error: {err}"), req)
    }));
    cfg.app_data(web::QueryConfig::default().error_handler(|err, req| {
        rejection(format!("Query string error: {err}"), req)
    }));
    cfg.app_data(web::PathConfig::default().error_handler(|err, req| {
        rejection(format!("Path error: {err}"), req)
    }));
}

fn rejection(message: String, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), %message, "request rejected before reaching a handler");
    let error = AppError::InvalidInput(message.clone());
    let response = error.error_response();
    InternalError::from_response(message, response).into()
}
