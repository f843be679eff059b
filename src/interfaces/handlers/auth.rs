use actix_web::{get, post, web, HttpResponse, Responder};
use tracing::instrument;

use crate::entities::user::{LoginUser, RegisterUser};
use crate::errors::{AppError, AuthError};
use crate::use_cases::extractors::AuthClaims;
use crate::AppState;

#[post("/register")]
#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn register(
    state: web::Data<AppState>,
    user: web::Json<RegisterUser>
) -> Result<impl Responder, AppError> {
    let created = state.auth_handler.register(user.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User registered successfully",
        "user": created
    })))
}

#[post("/login")]
#[instrument(skip(state, user))]
pub async fn login(
    state: web::Data<AppState>,
    user: web::Json<LoginUser>
) -> Result<impl Responder, AuthError> {
    let auth_response = state.auth_handler.login(user.into_inner()).await?;
    Ok(HttpResponse::Ok().json(auth_response))
}

#[get("/profile")]
#[instrument(skip(state, claims), fields(user_id = %claims.0.id))]
pub async fn profile(
    claims: AuthClaims,
    state: web::Data<AppState>
) -> Result<impl Responder, AppError> {
    let user = state.auth_handler.profile(&claims.0).await?;
    Ok(HttpResponse::Ok().json(user))
}
