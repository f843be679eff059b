use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::{employment::EmploymentPayload, ids::RecordId, pagination::PaginationRequest},
    errors::AppError,
    use_cases::extractors::{AdminClaims, AuthClaims},
    AppState,
};

#[instrument(skip(_claims, state))]
pub async fn list_employment(
    _claims: AuthClaims,
    state: web::Data<AppState>,
    query: web::Query<PaginationRequest>,
) -> Result<impl Responder, AppError> {
    let page = state.employment_handler.list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[instrument(skip(_claims, state))]
pub async fn list_all_employment(
    _claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let records = state.employment_handler.list_all().await?;
    Ok(HttpResponse::Ok().json(records))
}

#[instrument(skip(_claims, state))]
pub async fn count_employment(
    _claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let total = state.employment_handler.count().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "total": total })))
}

#[instrument(skip(claims, state), fields(user_id = %claims.0.id))]
pub async fn my_jobs(
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let records = state.employment_handler.my_jobs(&claims.0).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[instrument(skip(_claims, state))]
pub async fn list_employment_by_alumni(
    _claims: AuthClaims,
    alumni_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = alumni_id.parse()?;
    let records = state.employment_handler.list_by_alumni(&id).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[instrument(skip(_claims, state))]
pub async fn employment_stats_by_industry(
    _claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let stats = state.employment_handler.stats_by_industry().await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[instrument(skip(_claims, state))]
pub async fn employment_stats_by_location(
    _claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let stats = state.employment_handler.stats_by_location().await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[instrument(skip(_claims, state))]
pub async fn alumni_count_by_company(
    _claims: AuthClaims,
    company: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let company = company.into_inner();
    let total = state.employment_handler.alumni_count_by_company(&company).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "company": company.trim(),
        "total_alumni": total
    })))
}

#[instrument(skip(_claims, state))]
pub async fn get_employment(
    _claims: AuthClaims,
    employment_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = employment_id.parse()?;
    let record = state.employment_handler.get(&id).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[instrument(skip(_claims, state, data))]
pub async fn create_employment(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    data: web::Json<EmploymentPayload>,
) -> Result<impl Responder, AppError> {
    let record = state.employment_handler.create(data.into_inner()).await?;
    Ok(HttpResponse::Created().json(record))
}

#[instrument(skip(_claims, state, data))]
pub async fn update_employment(
    _claims: AdminClaims,
    employment_id: web::Path<String>,
    state: web::Data<AppState>,
    data: web::Json<EmploymentPayload>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = employment_id.parse()?;
    let record = state.employment_handler.update(&id, data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[instrument(skip(claims, state), fields(user_id = %claims.0.id))]
pub async fn soft_delete_employment(
    claims: AuthClaims,
    employment_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = employment_id.parse()?;
    state.employment_handler.soft_delete(&claims.0, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Employment record moved to trash" })))
}

#[instrument(skip(_claims, state))]
pub async fn soft_delete_employment_by_alumni(
    _claims: AdminClaims,
    alumni_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = alumni_id.parse()?;
    let report = state.employment_handler.soft_delete_by_alumni(&id).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[instrument(skip(_claims, state))]
pub async fn restore_employment(
    _claims: AdminClaims,
    employment_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = employment_id.parse()?;
    state.employment_handler.restore(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Employment record restored" })))
}

#[instrument(skip(_claims, state))]
pub async fn hard_delete_employment(
    _claims: AdminClaims,
    employment_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = employment_id.parse()?;
    state.employment_handler.hard_delete(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Employment record permanently deleted" })))
}
