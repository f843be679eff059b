use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::{ids::RecordId, pagination::PaginationRequest, user::UpdateUser},
    errors::AppError,
    use_cases::extractors::AdminClaims,
    AppState,
};

#[instrument(skip(_claims, state))]
pub async fn list_users(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    query: web::Query<PaginationRequest>,
) -> Result<impl Responder, AppError> {
    let page = state.auth_handler.list_users(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[instrument(skip(_claims, state))]
pub async fn list_all_users(
    _claims: AdminClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let users = state.auth_handler.list_all_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

#[instrument(skip(_claims, state))]
pub async fn count_users(
    _claims: AdminClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let total = state.auth_handler.count_users().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "total": total })))
}

#[instrument(skip(_claims, state))]
pub async fn get_user(
    _claims: AdminClaims,
    user_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = user_id.parse()?;
    let user = state.auth_handler.get_user(&id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[instrument(skip(_claims, state, data))]
pub async fn update_user(
    _claims: AdminClaims,
    user_id: web::Path<String>,
    state: web::Data<AppState>,
    data: web::Json<UpdateUser>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = user_id.parse()?;
    let user = state.auth_handler.update_user(&id, data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[instrument(skip(_claims, state))]
pub async fn delete_user(
    _claims: AdminClaims,
    user_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = user_id.parse()?;
    state.auth_handler.delete_user(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "User deleted successfully" })))
}
