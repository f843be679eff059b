use async_trait::async_trait;

use crate::{
    entities::{
        alumni::{Alumni, AlumniFields},
        ids::RecordId,
        pagination::{Page, PageQuery},
    },
    errors::AppError,
};

/// Alumni profiles, always returned with the owning user joined in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlumniRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Alumni>, AppError>;
    /// Search covers nim, nama, jurusan and email.
    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Alumni>, AppError>;
    async fn get_by_id(&self, id: &RecordId) -> Result<Alumni, AppError>;
    async fn get_by_user_id(&self, user_id: &RecordId) -> Result<Option<Alumni>, AppError>;
    async fn get_by_nim(&self, nim: &str) -> Result<Option<Alumni>, AppError>;
    async fn create(&self, alumni: &AlumniFields) -> Result<Alumni, AppError>;
    async fn update(&self, id: &RecordId, alumni: &AlumniFields) -> Result<Alumni, AppError>;
    async fn delete(&self, id: &RecordId) -> Result<(), AppError>;
    async fn count(&self) -> Result<i64, AppError>;
}
