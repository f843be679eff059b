use async_trait::async_trait;

use crate::{
    entities::{
        ids::RecordId,
        pagination::{Page, PageQuery},
        user::{User, UserFields},
    },
    errors::AppError,
};

/// Persistence contract for user accounts. Lookups by a unique attribute
/// return `Ok(None)` when nothing matches; lookups by id return `NotFound`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn check_connection(&self) -> Result<(), AppError>;
    /// Every user, newest first.
    async fn list(&self) -> Result<Vec<User>, AppError>;
    /// Search covers username, email and role.
    async fn list_paged(&self, query: &PageQuery) -> Result<Page<User>, AppError>;
    async fn get_by_id(&self, id: &RecordId) -> Result<User, AppError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn create(&self, user: &UserFields) -> Result<User, AppError>;
    async fn update(&self, id: &RecordId, user: &UserFields) -> Result<User, AppError>;
    async fn delete(&self, id: &RecordId) -> Result<(), AppError>;
    async fn count(&self) -> Result<i64, AppError>;
}
