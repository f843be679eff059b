use std::{cmp::Ordering, sync::Arc};

use tracing::{info, warn};
use validator::Validate;

use super::{largest_first, tally};
use crate::entities::{
    alumni::CountBucket,
    employment::{BatchReport, EmploymentFields, EmploymentPayload, EmploymentRecord, Visibility, EMPLOYMENT_SORT_FIELDS},
    ids::RecordId,
    pagination::{Page, PaginationRequest, PaginationResponse, DEFAULT_SORT_FIELD},
    token::Identity,
};
use crate::errors::AppError;
use crate::repositories::{alumni::AlumniRepository, employment::EmploymentRepository};

pub struct EmploymentHandler {
    pub employment: Arc<dyn EmploymentRepository>,
    pub alumni: Arc<dyn AlumniRepository>,
}

impl EmploymentHandler {
    pub fn new(employment: Arc<dyn EmploymentRepository>, alumni: Arc<dyn AlumniRepository>) -> Self {
        EmploymentHandler { employment, alumni }
    }

    pub async fn list(&self, request: &PaginationRequest) -> Result<PaginationResponse<EmploymentRecord>, AppError> {
        let query = request.normalize(EMPLOYMENT_SORT_FIELDS);
        let page = self.employment.list_paged(&query, Visibility::Active).await?;
        Ok(PaginationResponse::new(page, &query))
    }

    pub async fn list_all(&self) -> Result<Vec<EmploymentRecord>, AppError> {
        self.employment.list().await
    }

    pub async fn get(&self, id: &RecordId) -> Result<EmploymentRecord, AppError> {
        self.employment.get_by_id(id).await
    }

    pub async fn list_by_alumni(&self, alumni_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        self.alumni.get_by_id(alumni_id).await?;
        self.employment.list_by_alumni(alumni_id).await
    }

    /// Active jobs of the caller's own alumni profile; empty without a profile.
    pub async fn my_jobs(&self, identity: &Identity) -> Result<Vec<EmploymentRecord>, AppError> {
        self.employment.list_by_user(&identity.id).await
    }

    pub async fn create(&self, payload: EmploymentPayload) -> Result<EmploymentRecord, AppError> {
        payload.validate()?;
        let fields = EmploymentFields::from(payload);
        self.ensure_alumni(&fields.alumni_id).await?;

        let record = self.employment.create(&fields).await?;
        info!(employment_id = %record.id, alumni_id = %record.alumni_id, "Employment record created");
        Ok(record)
    }

    pub async fn update(&self, id: &RecordId, payload: EmploymentPayload) -> Result<EmploymentRecord, AppError> {
        payload.validate()?;
        let fields = EmploymentFields::from(payload);
        self.ensure_alumni(&fields.alumni_id).await?;

        self.employment.update(id, &fields).await
    }

    /// Admins may trash any record; other callers only records of their own
    /// alumni profile.
    pub async fn soft_delete(&self, identity: &Identity, id: &RecordId) -> Result<(), AppError> {
        if !identity.is_admin() {
            self.ensure_owner(identity, id).await?;
        }

        self.employment.soft_delete(id).await?;
        info!(employment_id = %id, by = %identity.id, "Employment record moved to trash");
        Ok(())
    }

    pub async fn soft_delete_by_alumni(&self, alumni_id: &RecordId) -> Result<BatchReport, AppError> {
        let report = self.employment.soft_delete_by_owner(alumni_id).await?;
        if !report.is_complete() {
            warn!(
                alumni_id = %alumni_id,
                trashed = report.affected.len(),
                failed = report.failed.len(),
                "bulk soft delete finished with failures"
            );
        }
        Ok(report)
    }

    pub async fn restore(&self, id: &RecordId) -> Result<(), AppError> {
        self.employment.restore(id).await?;
        info!(employment_id = %id, "Employment record restored");
        Ok(())
    }

    pub async fn hard_delete(&self, id: &RecordId) -> Result<(), AppError> {
        self.employment.hard_delete(id).await?;
        info!(employment_id = %id, "Employment record permanently deleted");
        Ok(())
    }

    /// Admins page through the whole trash; other callers see their own
    /// trashed records in the same page shape. Both views honour the search
    /// term and sort field, and the default `id` sort of the caller's own
    /// view lists the newest deletion first.
    pub async fn trash(
        &self,
        identity: &Identity,
        request: &PaginationRequest,
    ) -> Result<PaginationResponse<EmploymentRecord>, AppError> {
        let query = request.normalize(EMPLOYMENT_SORT_FIELDS);
        if identity.is_admin() {
            let page = self.employment.list_paged(&query, Visibility::Trashed).await?;
            return Ok(PaginationResponse::new(page, &query));
        }

        let needle = query.needle();
        let mut own: Vec<EmploymentRecord> = self
            .employment
            .list_deleted(Some(identity.id.clone()))
            .await?
            .into_iter()
            .filter(|r| needle.as_deref().is_none_or(|n| r.matches_search(n)))
            .collect();
        if query.sort.field != DEFAULT_SORT_FIELD {
            own.sort_by(|a, b| {
                let ordering = compare_on(query.sort.field, a, b);
                if query.sort.direction.is_desc() { ordering.reverse() } else { ordering }
            });
        }
        let total = own.len() as i64;
        let items = own
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();
        Ok(PaginationResponse::new(Page { items, total }, &query))
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        self.employment.count_active().await
    }

    pub async fn alumni_count_by_company(&self, company: &str) -> Result<i64, AppError> {
        let company = company.trim();
        if company.is_empty() {
            return Err(AppError::InvalidInput("Company name cannot be empty".into()));
        }
        self.employment.count_alumni_by_company(company).await
    }

    pub async fn stats_by_industry(&self) -> Result<Vec<CountBucket>, AppError> {
        let records = self.employment.list().await?;
        Ok(largest_first(tally(records.into_iter().map(|r| r.bidang_industri))))
    }

    pub async fn stats_by_location(&self) -> Result<Vec<CountBucket>, AppError> {
        let records = self.employment.list().await?;
        Ok(largest_first(tally(records.into_iter().map(|r| r.lokasi_kerja))))
    }

    async fn ensure_alumni(&self, alumni_id: &RecordId) -> Result<(), AppError> {
        match self.alumni.get_by_id(alumni_id).await {
            Ok(_) => Ok(()),
            Err(AppError::NotFound(_)) => Err(AppError::InvalidInput(format!("Alumni {alumni_id} does not exist"))),
            Err(e) => Err(e),
        }
    }

    /// A trashed record of the caller still reports `Conflict`, exactly as
    /// it would for an admin; anything the caller cannot see is `NotFound`.
    async fn ensure_owner(&self, identity: &Identity, id: &RecordId) -> Result<(), AppError> {
        let record = match self.employment.get_by_id(id).await {
            Ok(record) => record,
            Err(AppError::NotFound(msg)) => {
                let own_trash = self.employment.list_deleted(Some(identity.id.clone())).await?;
                if own_trash.iter().any(|r| &r.id == id) {
                    return Err(AppError::Conflict("Employment record is already in the trash".into()));
                }
                return Err(AppError::NotFound(msg));
            }
            Err(e) => return Err(e),
        };

        let owner = record.alumni.as_ref().and_then(|a| a.user_id.as_ref());
        if owner != Some(&identity.id) {
            warn!(employment_id = %id, user_id = %identity.id, "soft delete refused: caller does not own the record");
            return Err(AppError::ForbiddenAccess);
        }
        Ok(())
    }
}

/// Orders two records on a whitelisted sort field; text compares case-insensitively.
fn compare_on(field: &str, a: &EmploymentRecord, b: &EmploymentRecord) -> Ordering {
    let text = |x: &str, y: &str| x.to_lowercase().cmp(&y.to_lowercase());
    match field {
        "nama_perusahaan" => text(&a.nama_perusahaan, &b.nama_perusahaan),
        "posisi_jabatan" => text(&a.posisi_jabatan, &b.posisi_jabatan),
        "bidang_industri" => text(&a.bidang_industri, &b.bidang_industri),
        "lokasi_kerja" => text(&a.lokasi_kerja, &b.lokasi_kerja),
        "tanggal_mulai_kerja" => a.tanggal_mulai_kerja.cmp(&b.tanggal_mulai_kerja),
        "created_at" => a.created_at.cmp(&b.created_at),
        "deleted_at" => a.deleted_at.cmp(&b.deleted_at),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{deadline::Deadlines, factory::{RepositoryFactory, Repositories}};
    use crate::entities::{
        alumni::AlumniFields,
        user::{Role, UserFields},
    };
    use chrono::NaiveDate;

    struct Fixture {
        repos: Repositories,
        handler: EmploymentHandler,
        owner: Identity,
        admin: Identity,
        alumni_id: RecordId,
    }

    async fn fixture() -> Fixture {
        let repos = RepositoryFactory::memory(Deadlines::default());
        let user = repos
            .users
            .create(&UserFields {
                username: "lina".into(),
                email: "lina@example.com".into(),
                password_hash: "x".into(),
                role: Role::User,
                is_active: true,
            })
            .await
            .unwrap();
        let alumni = repos
            .alumni
            .create(&AlumniFields {
                user_id: Some(user.id.clone()),
                nim: "1801".into(),
                nama: "Lina".into(),
                jurusan: "Informatika".into(),
                angkatan: 2018,
                tahun_lulus: 2022,
                email: "lina@alumni.example.com".into(),
                no_telepon: None,
                alamat: None,
            })
            .await
            .unwrap();

        Fixture {
            handler: EmploymentHandler::new(repos.employment.clone(), repos.alumni.clone()),
            owner: Identity { id: user.id, username: "lina".into(), role: Role::User },
            admin: Identity { id: RecordId::Seq(999), username: "root".into(), role: Role::Admin },
            alumni_id: alumni.id,
            repos,
        }
    }

    fn payload(alumni_id: &RecordId, company: &str, industry: &str, city: &str) -> EmploymentPayload {
        EmploymentPayload {
            alumni_id: alumni_id.clone(),
            nama_perusahaan: company.into(),
            posisi_jabatan: "Developer".into(),
            bidang_industri: industry.into(),
            lokasi_kerja: city.into(),
            gaji_range: Some("10-15jt".into()),
            tanggal_mulai_kerja: NaiveDate::from_ymd_opt(2022, 8, 1).unwrap(),
            tanggal_selesai_kerja: None,
            status_pekerjaan: None,
            deskripsi_pekerjaan: None,
        }
    }

    #[tokio::test]
    async fn create_requires_an_existing_alumni() {
        let f = fixture().await;
        let result = f.handler.create(payload(&RecordId::Seq(77), "Acme", "Tech", "Jakarta")).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let record = f.handler.create(payload(&f.alumni_id, "Acme", "Tech", "Jakarta")).await.unwrap();
        assert_eq!(record.status_pekerjaan, "aktif");
        assert_eq!(record.alumni.as_ref().map(|a| a.nim.as_str()), Some("1801"));
    }

    #[tokio::test]
    async fn owner_walks_the_full_lifecycle_with_admin() {
        let f = fixture().await;
        let record = f.handler.create(payload(&f.alumni_id, "Acme", "Tech", "Jakarta")).await.unwrap();

        f.handler.soft_delete(&f.owner, &record.id).await.unwrap();
        assert!(matches!(f.handler.get(&record.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            f.handler.soft_delete(&f.owner, &record.id).await,
            Err(AppError::Conflict(_))
        ));

        let trash = f.handler.trash(&f.owner, &PaginationRequest::default()).await.unwrap();
        assert_eq!(trash.total_data, 1);

        f.handler.restore(&record.id).await.unwrap();
        assert!(matches!(f.handler.restore(&record.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            f.handler.hard_delete(&record.id).await,
            Err(AppError::PreconditionFailed(_))
        ));

        f.handler.soft_delete(&f.admin, &record.id).await.unwrap();
        f.handler.hard_delete(&record.id).await.unwrap();
        assert!(matches!(f.handler.hard_delete(&record.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn stranger_cannot_trash_someone_elses_record() {
        let f = fixture().await;
        let record = f.handler.create(payload(&f.alumni_id, "Acme", "Tech", "Jakarta")).await.unwrap();
        let stranger = Identity { id: RecordId::Seq(42), username: "eve".into(), role: Role::User };

        assert!(matches!(
            f.handler.soft_delete(&stranger, &record.id).await,
            Err(AppError::ForbiddenAccess)
        ));
        assert!(f.handler.get(&record.id).await.is_ok());

        let trash = f.handler.trash(&stranger, &PaginationRequest::default()).await.unwrap();
        assert_eq!(trash.total_data, 0);
    }

    #[tokio::test]
    async fn bulk_soft_delete_is_safe_to_repeat() {
        let f = fixture().await;
        f.handler.create(payload(&f.alumni_id, "Acme", "Tech", "Jakarta")).await.unwrap();
        f.handler.create(payload(&f.alumni_id, "Globex", "Tech", "Surabaya")).await.unwrap();

        let first = f.handler.soft_delete_by_alumni(&f.alumni_id).await.unwrap();
        assert_eq!(first.affected.len(), 2);
        assert!(first.is_complete());

        let second = f.handler.soft_delete_by_alumni(&f.alumni_id).await.unwrap();
        assert!(second.affected.is_empty());
        assert_eq!(f.handler.count().await.unwrap(), 0);

        let admin_trash = f.handler.trash(&f.admin, &PaginationRequest::default()).await.unwrap();
        assert_eq!(admin_trash.total_data, 2);
    }

    #[tokio::test]
    async fn counts_and_stats_ignore_trashed_records() {
        let f = fixture().await;
        let first = f.handler.create(payload(&f.alumni_id, "Acme", "Tech", "Jakarta")).await.unwrap();
        f.handler.create(payload(&f.alumni_id, "Acme", "Tech", "Bandung")).await.unwrap();
        f.handler.create(payload(&f.alumni_id, "Initech", "Finance", "Jakarta")).await.unwrap();

        assert_eq!(f.handler.alumni_count_by_company(" Acme ").await.unwrap(), 1);
        assert!(matches!(
            f.handler.alumni_count_by_company("  ").await,
            Err(AppError::InvalidInput(_))
        ));

        f.handler.soft_delete(&f.admin, &first.id).await.unwrap();
        assert_eq!(f.handler.count().await.unwrap(), 2);

        let by_industry = f.handler.stats_by_industry().await.unwrap();
        assert_eq!(
            by_industry,
            vec![
                CountBucket { key: "Finance".into(), total: 1 },
                CountBucket { key: "Tech".into(), total: 1 },
            ]
        );
        let by_location = f.handler.stats_by_location().await.unwrap();
        assert_eq!(by_location.iter().map(|b| b.total).sum::<i64>(), 2);
    }

    #[tokio::test]
    async fn my_jobs_follow_the_callers_profile() {
        let f = fixture().await;
        f.handler.create(payload(&f.alumni_id, "Acme", "Tech", "Jakarta")).await.unwrap();

        assert_eq!(f.handler.my_jobs(&f.owner).await.unwrap().len(), 1);
        assert!(f.handler.my_jobs(&f.admin).await.unwrap().is_empty());
        assert_eq!(f.handler.list_by_alumni(&f.alumni_id).await.unwrap().len(), 1);
        assert!(matches!(
            f.handler.list_by_alumni(&RecordId::Seq(55)).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(f.repos.employment.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn blank_company_is_rejected_before_storage() {
        let f = fixture().await;
        let result = f.handler.create(payload(&f.alumni_id, "   ", "Tech", "Jakarta")).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert_eq!(f.repos.employment.count_active().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn own_trash_honours_search_and_sort() {
        let f = fixture().await;
        for (company, city) in [("Acme", "Jakarta"), ("Bumi Labs", "Bandung"), ("Cakra Corp", "Jakarta")] {
            let record = f.handler.create(payload(&f.alumni_id, company, "Tech", city)).await.unwrap();
            f.handler.soft_delete(&f.owner, &record.id).await.unwrap();
        }

        let request = PaginationRequest {
            search: Some("JAKARTA".into()),
            sort_by: Some("nama_perusahaan".into()),
            sort_order: Some("desc".into()),
            ..Default::default()
        };
        let trash = f.handler.trash(&f.owner, &request).await.unwrap();
        assert_eq!(trash.total_data, 2);
        let companies: Vec<_> = trash.data.iter().map(|r| r.nama_perusahaan.as_str()).collect();
        assert_eq!(companies, ["Cakra Corp", "Acme"]);

        let admin_view = f.handler.trash(&f.admin, &request).await.unwrap();
        assert_eq!(admin_view.total_data, 2);
    }
}
