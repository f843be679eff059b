use std::sync::Arc;

use tracing::info;
use validator::Validate;

use crate::entities::{
    ids::RecordId,
    pagination::{PaginationRequest, PaginationResponse},
    student::{Student, StudentFields, StudentPayload, STUDENT_SORT_FIELDS},
};
use crate::errors::AppError;
use crate::repositories::student::StudentRepository;

pub struct StudentHandler {
    pub repo: Arc<dyn StudentRepository>,
}

impl StudentHandler {
    pub fn new(repo: Arc<dyn StudentRepository>) -> Self {
        StudentHandler { repo }
    }

    pub async fn list(&self, request: &PaginationRequest) -> Result<PaginationResponse<Student>, AppError> {
        let query = request.normalize(STUDENT_SORT_FIELDS);
        let page = self.repo.list_paged(&query).await?;
        Ok(PaginationResponse::new(page, &query))
    }

    pub async fn list_all(&self) -> Result<Vec<Student>, AppError> {
        self.repo.list().await
    }

    pub async fn get(&self, id: &RecordId) -> Result<Student, AppError> {
        self.repo.get_by_id(id).await
    }

    pub async fn create(&self, payload: StudentPayload) -> Result<Student, AppError> {
        payload.validate()?;
        let fields = StudentFields::from(payload);
        self.ensure_unique(&fields, None).await?;

        let student = self.repo.create(&fields).await?;
        info!(student_id = %student.id, "Student created");
        Ok(student)
    }

    pub async fn update(&self, id: &RecordId, payload: StudentPayload) -> Result<Student, AppError> {
        payload.validate()?;
        let fields = StudentFields::from(payload);
        self.repo.get_by_id(id).await?;
        self.ensure_unique(&fields, Some(id)).await?;

        self.repo.update(id, &fields).await
    }

    pub async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        self.repo.delete(id).await?;
        info!(student_id = %id, "Student deleted");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        self.repo.count().await
    }

    async fn ensure_unique(&self, fields: &StudentFields, current: Option<&RecordId>) -> Result<(), AppError> {
        if let Some(existing) = self.repo.get_by_nim(&fields.nim).await? {
            if current != Some(&existing.id) {
                return Err(AppError::Conflict(format!("NIM {} is already registered", fields.nim)));
            }
        }
        if let Some(existing) = self.repo.get_by_email(&fields.email).await? {
            if current != Some(&existing.id) {
                return Err(AppError::Conflict("Email is already registered to another student".into()));
            }
        }
        Ok(())
    }
}
