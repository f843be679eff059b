use async_trait::async_trait;

use crate::{
    entities::{
        employment::{BatchReport, EmploymentFields, EmploymentRecord, Visibility},
        ids::RecordId,
        pagination::{Page, PageQuery},
    },
    errors::AppError,
};

/// Employment records and their soft-delete lifecycle:
///
/// ```text
///  ACTIVE --soft_delete--> TRASHED --hard_delete--> GONE
///  ACTIVE <----restore---- TRASHED
/// ```
///
/// Every backend reports illegal transitions the same way:
/// * `soft_delete` on a trashed record is `Conflict`,
/// * `restore` on an active record is `NotFound`,
/// * `hard_delete` on an active record is `PreconditionFailed`,
/// * `update` and `get_by_id` only see active records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmploymentRepository: Send + Sync {
    /// Active records, newest first.
    async fn list(&self) -> Result<Vec<EmploymentRecord>, AppError>;
    /// Search covers nama_perusahaan, posisi_jabatan, bidang_industri and lokasi_kerja.
    async fn list_paged(&self, query: &PageQuery, visibility: Visibility) -> Result<Page<EmploymentRecord>, AppError>;
    async fn get_by_id(&self, id: &RecordId) -> Result<EmploymentRecord, AppError>;
    async fn list_by_alumni(&self, alumni_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError>;
    /// Active records of the alumni profile owned by `user_id`.
    async fn list_by_user(&self, user_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError>;
    async fn create(&self, record: &EmploymentFields) -> Result<EmploymentRecord, AppError>;
    async fn update(&self, id: &RecordId, record: &EmploymentFields) -> Result<EmploymentRecord, AppError>;
    async fn soft_delete(&self, id: &RecordId) -> Result<(), AppError>;
    /// Trashes every active record of `alumni_id`, reporting each item.
    async fn soft_delete_by_owner(&self, alumni_id: &RecordId) -> Result<BatchReport, AppError>;
    async fn restore(&self, id: &RecordId) -> Result<(), AppError>;
    async fn hard_delete(&self, id: &RecordId) -> Result<(), AppError>;
    /// Trashed records, most recently deleted first, optionally limited to
    /// those whose alumni profile belongs to `owner`.
    async fn list_deleted(&self, owner: Option<RecordId>) -> Result<Vec<EmploymentRecord>, AppError>;
    async fn count_active(&self) -> Result<i64, AppError>;
    /// Distinct alumni with an active record at exactly `company`.
    async fn count_alumni_by_company(&self, company: &str) -> Result<i64, AppError>;
}
