use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::{entities::token::Identity, errors::AuthError};

/// Any authenticated caller. Returns 401 when the auth middleware attached
/// no identity to the request.
#[derive(Debug)]
pub struct AuthClaims(pub Identity);

impl FromRequest for AuthClaims {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<Identity>() {
            Some(identity) => ready(Ok(AuthClaims(identity.clone()))),
            None => ready(Err(AuthError::MissingCredentials.into())),
        }
    }
}

/// Admin callers only: 403 for an authenticated non-admin, 401 otherwise.
#[derive(Debug)]
pub struct AdminClaims(pub Identity);

impl FromRequest for AdminClaims {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<Identity>() {
            Some(identity) if identity.is_admin() => ready(Ok(AdminClaims(identity.clone()))),
            Some(_) => ready(Err(AuthError::Forbidden("Admin access required".into()).into())),
            None => ready(Err(AuthError::MissingCredentials.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ids::RecordId, user::Role};
    use actix_web::{http::StatusCode, test::TestRequest, ResponseError};

    fn identity(role: Role) -> Identity {
        Identity { id: RecordId::Seq(3), username: "mira".into(), role }
    }

    #[actix_rt::test]
    async fn admin_extractor_checks_role() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(identity(Role::User));
        let err = AdminClaims::extract(&req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(identity(Role::Admin));
        assert!(AdminClaims::extract(&req).await.is_ok());
    }

    #[actix_rt::test]
    async fn missing_identity_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let err = AuthClaims::extract(&req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }
}
