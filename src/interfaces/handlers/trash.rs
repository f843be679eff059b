use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::pagination::PaginationRequest,
    errors::AppError,
    use_cases::extractors::AuthClaims,
    AppState,
};

/// Admins see every trashed record, other callers only their own.
#[instrument(skip(claims, state), fields(user_id = %claims.0.id))]
pub async fn employment_trash(
    claims: AuthClaims,
    state: web::Data<AppState>,
    query: web::Query<PaginationRequest>,
) -> Result<impl Responder, AppError> {
    let page = state.employment_handler.trash(&claims.0, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}
