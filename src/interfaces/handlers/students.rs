use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::{ids::RecordId, pagination::PaginationRequest, student::StudentPayload},
    errors::AppError,
    use_cases::extractors::{AdminClaims, AuthClaims},
    AppState,
};

#[instrument(skip(_claims, state))]
pub async fn list_students(
    _claims: AuthClaims,
    state: web::Data<AppState>,
    query: web::Query<PaginationRequest>,
) -> Result<impl Responder, AppError> {
    let page = state.student_handler.list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[instrument(skip(_claims, state))]
pub async fn list_all_students(
    _claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let students = state.student_handler.list_all().await?;
    Ok(HttpResponse::Ok().json(students))
}

#[instrument(skip(_claims, state))]
pub async fn count_students(
    _claims: AuthClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let total = state.student_handler.count().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "total": total })))
}

#[instrument(skip(_claims, state))]
pub async fn get_student(
    _claims: AuthClaims,
    student_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = student_id.parse()?;
    let student = state.student_handler.get(&id).await?;
    Ok(HttpResponse::Ok().json(student))
}

#[instrument(skip(_claims, state, data))]
pub async fn create_student(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    data: web::Json<StudentPayload>,
) -> Result<impl Responder, AppError> {
    let student = state.student_handler.create(data.into_inner()).await?;
    Ok(HttpResponse::Created().json(student))
}

#[instrument(skip(_claims, state, data))]
pub async fn update_student(
    _claims: AdminClaims,
    student_id: web::Path<String>,
    state: web::Data<AppState>,
    data: web::Json<StudentPayload>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = student_id.parse()?;
    let student = state.student_handler.update(&id, data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(student))
}

#[instrument(skip(_claims, state))]
pub async fn delete_student(
    _claims: AdminClaims,
    student_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id: RecordId = student_id.parse()?;
    state.student_handler.delete(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Student deleted successfully" })))
}
