use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::{alumni::AlumniPayload, ids::RecordId, pagination::PaginationRequest},
    errors::AppError,
    use_cases::extractors::{AdminClaims, AuthClaims},
    AppState,
};

#[instrument(skip(_claims, state))]
pub async fn list_alumni(
    _claims: AuthClaims,
    state: web::Data<AppState>,
    query: web::Query<PaginationRequest>,
) -> Result<impl Responder, AppError> {
    let page = state.alumni_handler.list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[instrument(skip(_claims, state))]
pub async fn list_all_alumni(
    _claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let alumni = state.alumni_handler.list_all().await?;
    Ok(HttpResponse::Ok().json(alumni))
}

#[instrument(skip(_claims, state))]
pub async fn count_alumni(
    _claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let total = state.alumni_handler.count().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "total": total })))
}

#[instrument(skip(claims, state), fields(user_id = %claims.0.id))]
pub async fn my_alumni_profile(
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let alumni = state.alumni_handler.my_profile(&claims.0).await?;
    Ok(HttpResponse::Ok().json(alumni))
}

#[instrument(skip(_claims, state))]
pub async fn alumni_stats_by_year(
    _claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let stats = state.alumni_handler.stats_by_year().await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[instrument(skip(_claims, state))]
pub async fn alumni_stats_by_department(
    _claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let stats = state.alumni_handler.stats_by_department().await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[instrument(skip(_claims, state))]
pub async fn get_alumni(
    _claims: AuthClaims,
    alumni_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = alumni_id.parse()?;
    let alumni = state.alumni_handler.get(&id).await?;
    Ok(HttpResponse::Ok().json(alumni))
}

#[instrument(skip(_claims, state, data))]
pub async fn create_alumni(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    data: web::Json<AlumniPayload>,
) -> Result<impl Responder, AppError> {
    let alumni = state.alumni_handler.create(data.into_inner()).await?;
    Ok(HttpResponse::Created().json(alumni))
}

#[instrument(skip(_claims, state, data))]
pub async fn update_alumni(
    _claims: AdminClaims,
    alumni_id: web::Path<String>,
    state: web::Data<AppState>,
    data: web::Json<AlumniPayload>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = alumni_id.parse()?;
    let alumni = state.alumni_handler.update(&id, data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(alumni))
}

#[instrument(skip(_claims, state))]
pub async fn delete_alumni(
    _claims: AdminClaims,
    alumni_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = alumni_id.parse()?;
    let report = state.alumni_handler.delete(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Alumni deleted successfully",
        "employment_trashed": report.affected.len()
    })))
}
