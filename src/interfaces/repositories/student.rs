use async_trait::async_trait;

use crate::{
    entities::{
        ids::RecordId,
        pagination::{Page, PageQuery},
        student::{Student, StudentFields},
    },
    errors::AppError,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Student>, AppError>;
    /// Search covers nim, nama, jurusan and email.
    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Student>, AppError>;
    async fn get_by_id(&self, id: &RecordId) -> Result<Student, AppError>;
    async fn get_by_nim(&self, nim: &str) -> Result<Option<Student>, AppError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<Student>, AppError>;
    async fn create(&self, student: &StudentFields) -> Result<Student, AppError>;
    async fn update(&self, id: &RecordId, student: &StudentFields) -> Result<Student, AppError>;
    async fn delete(&self, id: &RecordId) -> Result<(), AppError>;
    async fn count(&self) -> Result<i64, AppError>;
}
