use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, ResponseError,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::{rc::Rc, task::{Context, Poll}};

use crate::{
    entities::token::Identity,
    errors::AuthError,
    repositories::token::TokenService,
    AppState,
};

/// Authenticates every non-public request from its bearer token and
/// attaches the caller's [`Identity`] for the extractors.
pub struct AuthMiddleware;

impl<S> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            if is_public_route(req.path(), req.method().as_str()) {
                return service.call(req).await;
            }

            let identity = match authenticate(&req) {
                Ok(identity) => identity,
                Err(e) => {
                    tracing::warn!(path = %req.path(), reason = %e, "request rejected by auth middleware");
                    return Ok(reject(req, e));
                }
            };

            req.extensions_mut().insert(identity);
            service.call(req).await
        })
    }
}

fn is_public_route(path: &str, method: &str) -> bool {
    if method == "OPTIONS" {
        return true;
    }

    matches!(
        (path, method),
        ("/", "GET") |
        ("/health", "GET") |
        ("/api/v1/health", "GET") |
        ("/api/v1/auth/login", "POST") |
        ("/api/v1/auth/register", "POST")
    )
}

fn extract_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| {
            let parts: Vec<&str> = header.split_whitespace().collect();
            if parts.len() == 2 && parts[0].eq_ignore_ascii_case("bearer") {
                Some(parts[1].to_string())
            } else {
                None
            }
        })
}

fn authenticate(req: &ServiceRequest) -> Result<Identity, AuthError> {
    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        tracing::error!("AppState missing in middleware");
        AuthError::MissingJwtService
    })?;

    let token = extract_token(req).ok_or(AuthError::MissingCredentials)?;
    let claims = state.auth_handler.token_service.validate(&token)?;
    Identity::try_from(&claims)
}

fn reject(req: ServiceRequest, error: AuthError) -> ServiceResponse<BoxBody> {
    req.into_response(error.error_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_routes() {
        assert!(is_public_route("/", "GET"));
        assert!(is_public_route("/health", "GET"));
        assert!(is_public_route("/api/v1/auth/login", "POST"));
        assert!(is_public_route("/api/v1/students", "OPTIONS"));
        assert!(!is_public_route("/api/v1/auth/profile", "GET"));
        assert!(!is_public_route("/api/v1/auth/login", "GET"));
        assert!(!is_public_route("/api/v1/students", "GET"));
    }
}
