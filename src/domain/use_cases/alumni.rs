use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use super::{largest_first, tally};
use crate::entities::{
    alumni::{Alumni, AlumniFields, AlumniPayload, CountBucket, ALUMNI_SORT_FIELDS},
    employment::BatchReport,
    ids::RecordId,
    pagination::{PaginationRequest, PaginationResponse},
    token::Identity,
};
use crate::errors::AppError;
use crate::repositories::{
    alumni::AlumniRepository, employment::EmploymentRepository, user::UserRepository,
};

pub struct AlumniHandler {
    pub alumni: Arc<dyn AlumniRepository>,
    pub users: Arc<dyn UserRepository>,
    pub employment: Arc<dyn EmploymentRepository>,
}

impl AlumniHandler {
    pub fn new(
        alumni: Arc<dyn AlumniRepository>,
        users: Arc<dyn UserRepository>,
        employment: Arc<dyn EmploymentRepository>,
    ) -> Self {
        AlumniHandler { alumni, users, employment }
    }

    pub async fn list(&self, request: &PaginationRequest) -> Result<PaginationResponse<Alumni>, AppError> {
        let query = request.normalize(ALUMNI_SORT_FIELDS);
        let page = self.alumni.list_paged(&query).await?;
        Ok(PaginationResponse::new(page, &query))
    }

    pub async fn list_all(&self) -> Result<Vec<Alumni>, AppError> {
        self.alumni.list().await
    }

    pub async fn get(&self, id: &RecordId) -> Result<Alumni, AppError> {
        self.alumni.get_by_id(id).await
    }

    pub async fn my_profile(&self, identity: &Identity) -> Result<Alumni, AppError> {
        self.alumni
            .get_by_user_id(&identity.id)
            .await?
            .ok_or_else(|| AppError::NotFound("No alumni profile is linked to this account".into()))
    }

    pub async fn create(&self, payload: AlumniPayload) -> Result<Alumni, AppError> {
        payload.validate()?;
        let fields = AlumniFields::from(payload);
        self.check_references(&fields, None).await?;

        let alumni = self.alumni.create(&fields).await?;
        info!(alumni_id = %alumni.id, "Alumni created");
        Ok(alumni)
    }

    pub async fn update(&self, id: &RecordId, payload: AlumniPayload) -> Result<Alumni, AppError> {
        payload.validate()?;
        let fields = AlumniFields::from(payload);
        self.alumni.get_by_id(id).await?;
        self.check_references(&fields, Some(id)).await?;

        self.alumni.update(id, &fields).await
    }

    /// Moves the profile's active employment records to the trash, then
    /// removes the profile. If any record could not be trashed the profile
    /// stays, and calling again only retries the records still active.
    pub async fn delete(&self, id: &RecordId) -> Result<BatchReport, AppError> {
        self.alumni.get_by_id(id).await?;

        let report = self.employment.soft_delete_by_owner(id).await?;
        if !report.is_complete() {
            warn!(
                alumni_id = %id,
                trashed = report.affected.len(),
                failed = report.failed.len(),
                "alumni delete halted: employment records left active"
            );
            return Err(AppError::Unavailable(format!(
                "{} employment record(s) of alumni {id} could not be moved to the trash",
                report.failed.len()
            )));
        }

        self.alumni.delete(id).await?;
        info!(alumni_id = %id, trashed = report.affected.len(), "Alumni deleted");
        Ok(report)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        self.alumni.count().await
    }

    /// Alumni per graduation year, oldest year first.
    pub async fn stats_by_year(&self) -> Result<Vec<CountBucket>, AppError> {
        let alumni = self.alumni.list().await?;
        Ok(tally(alumni.iter().map(|a| a.tahun_lulus.to_string())))
    }

    /// Alumni per department, largest first.
    pub async fn stats_by_department(&self) -> Result<Vec<CountBucket>, AppError> {
        let alumni = self.alumni.list().await?;
        Ok(largest_first(tally(alumni.into_iter().map(|a| a.jurusan))))
    }

    /// NIM is unique, the linked user must exist and may own only one profile.
    async fn check_references(&self, fields: &AlumniFields, current: Option<&RecordId>) -> Result<(), AppError> {
        if let Some(existing) = self.alumni.get_by_nim(&fields.nim).await? {
            if current != Some(&existing.id) {
                return Err(AppError::Conflict(format!("NIM {} already has an alumni profile", fields.nim)));
            }
        }

        let Some(user_id) = &fields.user_id else {
            return Ok(());
        };

        match self.users.get_by_id(user_id).await {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                return Err(AppError::InvalidInput(format!("User {user_id} does not exist")));
            }
            Err(e) => return Err(e),
        }

        if let Some(existing) = self.alumni.get_by_user_id(user_id).await? {
            if current != Some(&existing.id) {
                return Err(AppError::Conflict(format!("User {user_id} already has an alumni profile")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{deadline::Deadlines, factory::{RepositoryFactory, Repositories}};
    use crate::entities::{
        employment::{BatchFailure, EmploymentFields},
        user::{Role, UserFields},
    };
    use crate::repositories::{
        alumni::MockAlumniRepository, employment::MockEmploymentRepository, user::MockUserRepository,
    };
    use chrono::{NaiveDate, Utc};

    fn repos() -> Repositories {
        RepositoryFactory::memory(Deadlines::default())
    }

    fn handler(repos: &Repositories) -> AlumniHandler {
        AlumniHandler::new(repos.alumni.clone(), repos.users.clone(), repos.employment.clone())
    }

    fn payload(nim: &str, user_id: Option<RecordId>, jurusan: &str, tahun_lulus: i32) -> AlumniPayload {
        AlumniPayload {
            user_id,
            nim: nim.into(),
            nama: format!("Alumni {nim}"),
            jurusan: jurusan.into(),
            angkatan: 2015,
            tahun_lulus,
            email: format!("{nim}@alumni.example.com"),
            no_telepon: None,
            alamat: Some("  ".into()),
        }
    }

    async fn user(repos: &Repositories, name: &str) -> RecordId {
        repos
            .users
            .create(&UserFields {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: "x".into(),
                role: Role::User,
                is_active: true,
            })
            .await
            .unwrap()
            .id
    }

    fn job(alumni_id: &RecordId, company: &str) -> EmploymentFields {
        EmploymentFields {
            alumni_id: alumni_id.clone(),
            nama_perusahaan: company.into(),
            posisi_jabatan: "Analyst".into(),
            bidang_industri: "Finance".into(),
            lokasi_kerja: "Bandung".into(),
            gaji_range: None,
            tanggal_mulai_kerja: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
            tanggal_selesai_kerja: None,
            status_pekerjaan: "aktif".into(),
            deskripsi_pekerjaan: None,
        }
    }

    #[tokio::test]
    async fn create_links_existing_user_and_blanks_become_none() {
        let repos = repos();
        let handler = handler(&repos);
        let uid = user(&repos, "wati").await;

        let alumni = handler.create(payload("1501", Some(uid.clone()), "Informatika", 2019)).await.unwrap();
        assert_eq!(alumni.user.as_ref().map(|u| u.username.as_str()), Some("wati"));
        assert!(alumni.alamat.is_none());

        let identity = Identity { id: uid, username: "wati".into(), role: Role::User };
        assert_eq!(handler.my_profile(&identity).await.unwrap().id, alumni.id);
    }

    #[tokio::test]
    async fn create_checks_nim_user_and_single_profile() {
        let repos = repos();
        let handler = handler(&repos);
        let uid = user(&repos, "joko").await;
        handler.create(payload("1501", Some(uid.clone()), "Informatika", 2019)).await.unwrap();

        let same_nim = handler.create(payload("1501", None, "Informatika", 2019)).await;
        assert!(matches!(same_nim, Err(AppError::Conflict(_))));

        let second_profile = handler.create(payload("1502", Some(uid), "Informatika", 2019)).await;
        assert!(matches!(second_profile, Err(AppError::Conflict(msg)) if msg.contains("already has")));

        let ghost = handler.create(payload("1503", Some(RecordId::Seq(404)), "Informatika", 2019)).await;
        assert!(matches!(ghost, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn graduation_before_cohort_is_rejected() {
        let repos = repos();
        let result = handler(&repos).create(payload("1501", None, "Informatika", 2010)).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn my_profile_without_link_is_not_found() {
        let repos = repos();
        let identity = Identity { id: RecordId::Seq(5), username: "nobody".into(), role: Role::User };
        assert!(matches!(handler(&repos).my_profile(&identity).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_trashes_jobs_before_removing_the_profile() {
        let repos = repos();
        let handler = handler(&repos);
        let alumni = handler.create(payload("1501", None, "Informatika", 2019)).await.unwrap();
        let first = repos.employment.create(&job(&alumni.id, "Bank A")).await.unwrap();
        let second = repos.employment.create(&job(&alumni.id, "Bank B")).await.unwrap();
        repos.employment.soft_delete(&second.id).await.unwrap();

        let report = handler.delete(&alumni.id).await.unwrap();
        assert_eq!(report.affected, vec![first.id.clone()]);
        assert!(matches!(handler.get(&alumni.id).await, Err(AppError::NotFound(_))));

        let trashed = repos.employment.list_deleted(None).await.unwrap();
        assert_eq!(trashed.len(), 2);
        assert!(trashed.iter().all(|r| r.alumni.is_none()));
    }

    #[tokio::test]
    async fn partial_cascade_keeps_the_profile() {
        let now = Utc::now();
        let profile = Alumni {
            id: RecordId::Key("al1".into()),
            user_id: None,
            nim: "1501".into(),
            nama: "Rudi".into(),
            jurusan: "Informatika".into(),
            angkatan: 2015,
            tahun_lulus: 2019,
            email: "rudi@example.com".into(),
            no_telepon: None,
            alamat: None,
            created_at: now,
            updated_at: now,
            user: None,
        };

        let mut alumni = MockAlumniRepository::new();
        alumni.expect_get_by_id().returning(move |_| Ok(profile.clone()));
        alumni.expect_delete().never();

        let mut employment = MockEmploymentRepository::new();
        employment.expect_soft_delete_by_owner().returning(|_| {
            Ok(BatchReport {
                affected: vec![RecordId::Key("job1".into())],
                failed: vec![BatchFailure { id: RecordId::Key("job2".into()), reason: "503".into() }],
            })
        });

        let handler = AlumniHandler::new(Arc::new(alumni), Arc::new(MockUserRepository::new()), Arc::new(employment));
        let result = handler.delete(&RecordId::Key("al1".into())).await;
        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn stats_group_by_year_and_department() {
        let repos = repos();
        let handler = handler(&repos);
        handler.create(payload("1", None, "Informatika", 2020)).await.unwrap();
        handler.create(payload("2", None, "Informatika", 2019)).await.unwrap();
        handler.create(payload("3", None, "Sipil", 2020)).await.unwrap();

        let by_year = handler.stats_by_year().await.unwrap();
        assert_eq!(
            by_year,
            vec![
                CountBucket { key: "2019".into(), total: 1 },
                CountBucket { key: "2020".into(), total: 2 },
            ]
        );

        let by_department = handler.stats_by_department().await.unwrap();
        assert_eq!(by_department[0], CountBucket { key: "Informatika".into(), total: 2 });
        assert_eq!(by_department[1], CountBucket { key: "Sipil".into(), total: 1 });
    }
}
