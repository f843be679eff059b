use chrono::NaiveDate;

use alumni_records::{
    db::{deadline::Deadlines, factory::{Repositories, RepositoryFactory}},
    entities::{
        alumni::{Alumni, AlumniFields},
        employment::{EmploymentFields, EmploymentRecord, Visibility, EMPLOYMENT_SORT_FIELDS},
        ids::RecordId,
        pagination::PaginationRequest,
        token::Identity,
        user::{Role, UserFields},
    },
    errors::AppError,
    use_cases::employment::EmploymentHandler,
};

fn repos() -> Repositories {
    RepositoryFactory::memory(Deadlines::default())
}

fn handler(repos: &Repositories) -> EmploymentHandler {
    EmploymentHandler::new(repos.employment.clone(), repos.alumni.clone())
}

fn caller(id: i64, role: Role) -> Identity {
    Identity { id: RecordId::Seq(id), username: format!("user{id}"), role }
}

async fn alumni_for(repos: &Repositories, user_id: Option<i64>, nim: &str) -> Alumni {
    repos
        .alumni
        .create(&AlumniFields {
            user_id: user_id.map(RecordId::Seq),
            nim: nim.into(),
            nama: format!("Alumni {nim}"),
            jurusan: "Informatika".into(),
            angkatan: 2016,
            tahun_lulus: 2020,
            email: format!("{nim}@alumni.test"),
            no_telepon: None,
            alamat: None,
        })
        .await
        .unwrap()
}

fn job(alumni_id: &RecordId, company: &str) -> EmploymentFields {
    EmploymentFields {
        alumni_id: alumni_id.clone(),
        nama_perusahaan: company.into(),
        posisi_jabatan: "Engineer".into(),
        bidang_industri: "Technology".into(),
        lokasi_kerja: "Jakarta".into(),
        gaji_range: Some("10-15jt".into()),
        tanggal_mulai_kerja: NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
        tanggal_selesai_kerja: None,
        status_pekerjaan: "aktif".into(),
        deskripsi_pekerjaan: Some("Backend services".into()),
    }
}

async fn create_job(repos: &Repositories, alumni_id: &RecordId, company: &str) -> EmploymentRecord {
    repos.employment.create(&job(alumni_id, company)).await.unwrap()
}

fn ids(records: &[EmploymentRecord]) -> Vec<RecordId> {
    records.iter().map(|r| r.id.clone()).collect()
}

#[actix_rt::test]
async fn hard_delete_requires_a_prior_soft_delete() {
    let repos = repos();
    let alumni = alumni_for(&repos, None, "1001").await;
    let record = create_job(&repos, &alumni.id, "Acme Corp").await;

    let err = repos.employment.hard_delete(&record.id).await.unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));
    assert!(repos.employment.get_by_id(&record.id).await.is_ok());

    repos.employment.soft_delete(&record.id).await.unwrap();
    repos.employment.hard_delete(&record.id).await.unwrap();

    assert!(matches!(repos.employment.get_by_id(&record.id).await, Err(AppError::NotFound(_))));
    assert!(repos.employment.list_deleted(None).await.unwrap().is_empty());
}

#[actix_rt::test]
async fn trashed_records_only_show_up_in_the_trash() {
    let repos = repos();
    let alumni = alumni_for(&repos, Some(4), "1002").await;
    let kept = create_job(&repos, &alumni.id, "Acme Corp").await;
    let trashed = create_job(&repos, &alumni.id, "Globex").await;

    repos.employment.soft_delete(&trashed.id).await.unwrap();

    let active = repos.employment.list().await.unwrap();
    assert_eq!(ids(&active), vec![kept.id.clone()]);

    let query = PaginationRequest::default().normalize(EMPLOYMENT_SORT_FIELDS);
    let page = repos.employment.list_paged(&query, Visibility::Active).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(ids(&page.items), vec![kept.id.clone()]);

    let trash = repos.employment.list_paged(&query, Visibility::Trashed).await.unwrap();
    assert_eq!(ids(&trash.items), vec![trashed.id.clone()]);

    let deleted = repos.employment.list_deleted(None).await.unwrap();
    assert_eq!(ids(&deleted), vec![trashed.id.clone()]);
    assert!(deleted[0].deleted_at.is_some());

    let owned = repos.employment.list_deleted(Some(RecordId::Seq(4))).await.unwrap();
    assert_eq!(owned.len(), 1);
    assert!(repos.employment.list_deleted(Some(RecordId::Seq(5))).await.unwrap().is_empty());

    assert_eq!(repos.employment.count_active().await.unwrap(), 1);
    assert!(matches!(repos.employment.get_by_id(&trashed.id).await, Err(AppError::NotFound(_))));
}

#[actix_rt::test]
async fn restore_brings_back_the_same_record() {
    let repos = repos();
    let alumni = alumni_for(&repos, None, "1003").await;
    let before = create_job(&repos, &alumni.id, "Initech").await;

    repos.employment.soft_delete(&before.id).await.unwrap();
    let err = repos.employment.soft_delete(&before.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    repos.employment.restore(&before.id).await.unwrap();
    let after = repos.employment.get_by_id(&before.id).await.unwrap();
    assert_eq!(after.fields(), before.fields());
    assert_eq!(after.id, before.id);
    assert!(after.deleted_at.is_none());
    assert_eq!(after.alumni, before.alumni);

    let err = repos.employment.restore(&before.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[actix_rt::test]
async fn updates_never_touch_trashed_records() {
    let repos = repos();
    let alumni = alumni_for(&repos, None, "1004").await;
    let record = create_job(&repos, &alumni.id, "Hooli").await;
    repos.employment.soft_delete(&record.id).await.unwrap();

    let err = repos.employment.update(&record.id, &job(&alumni.id, "Pied Piper")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let deleted = repos.employment.list_deleted(None).await.unwrap();
    assert_eq!(deleted[0].nama_perusahaan, "Hooli");
}

#[actix_rt::test]
async fn pages_cover_every_record_exactly_once() {
    let repos = repos();
    let alumni = alumni_for(&repos, None, "1005").await;
    for i in 0..23 {
        create_job(&repos, &alumni.id, &format!("Company {i:02}")).await;
    }
    let handler = handler(&repos);

    let mut seen = Vec::new();
    for page in 1..=3 {
        let request = PaginationRequest { page: Some(page), limit: Some(10), ..Default::default() };
        let response = handler.list(&request).await.unwrap();
        assert_eq!(response.total_data, 23);
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.has_next, page < 3);
        assert_eq!(response.has_previous, page > 1);
        seen.extend(response.data.into_iter().map(|r| r.id.to_string()));
    }
    assert_eq!(seen.len(), 23);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 23);

    let beyond = handler
        .list(&PaginationRequest { page: Some(4), limit: Some(10), ..Default::default() })
        .await
        .unwrap();
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.total_data, 23);

    for i in 23..250 {
        create_job(&repos, &alumni.id, &format!("Company {i:03}")).await;
    }
    let mut seen = Vec::new();
    for page in 1..=2 {
        let request = PaginationRequest { page: Some(page), limit: Some(200), ..Default::default() };
        let response = handler.list(&request).await.unwrap();
        assert_eq!(response.per_page, 200);
        assert_eq!(response.total_data, 250);
        assert_eq!(response.total_pages, 2);
        seen.extend(response.data.into_iter().map(|r| r.id.to_string()));
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 250);

    let far = handler
        .list(&PaginationRequest { page: Some(i64::MAX), limit: Some(10), ..Default::default() })
        .await
        .unwrap();
    assert!(far.data.is_empty());
    assert_eq!(far.total_data, 250);
    assert!(!far.has_next);
}

#[actix_rt::test]
async fn search_matches_company_case_insensitively() {
    let repos = repos();
    let alumni = alumni_for(&repos, None, "1006").await;
    for _ in 0..3 {
        create_job(&repos, &alumni.id, "Acme Corp").await;
    }
    for i in 0..7 {
        create_job(&repos, &alumni.id, &format!("Other {i}")).await;
    }

    let request = PaginationRequest {
        page: Some(1),
        limit: Some(10),
        search: Some("acme".into()),
        ..Default::default()
    };
    let response = handler(&repos).list(&request).await.unwrap();
    assert_eq!(response.data.len(), 3);
    assert_eq!(response.total_data, 3);
    assert_eq!(response.total_pages, 1);
    assert!(response.data.iter().all(|r| r.nama_perusahaan == "Acme Corp"));
}

#[actix_rt::test]
async fn owner_trashes_and_admin_purges() {
    let repos = repos();
    let handler = handler(&repos);
    let alumni = alumni_for(&repos, Some(7), "1007").await;
    let record = create_job(&repos, &alumni.id, "Acme Corp").await;

    let stranger = caller(8, Role::User);
    let err = handler.soft_delete(&stranger, &record.id).await.unwrap_err();
    assert!(matches!(err, AppError::ForbiddenAccess));

    let owner = caller(7, Role::User);
    handler.soft_delete(&owner, &record.id).await.unwrap();

    let err = handler.soft_delete(&owner, &record.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let admin = caller(1, Role::Admin);
    let owner_trash = handler.trash(&owner, &PaginationRequest::default()).await.unwrap();
    assert_eq!(owner_trash.total_data, 1);
    let stranger_trash = handler.trash(&stranger, &PaginationRequest::default()).await.unwrap();
    assert_eq!(stranger_trash.total_data, 0);
    let admin_trash = handler.trash(&admin, &PaginationRequest::default()).await.unwrap();
    assert_eq!(admin_trash.total_data, 1);

    handler.hard_delete(&record.id).await.unwrap();
    assert!(matches!(handler.get(&record.id).await, Err(AppError::NotFound(_))));
}

#[actix_rt::test]
async fn bulk_soft_delete_skips_records_already_trashed() {
    let repos = repos();
    let alumni = alumni_for(&repos, None, "1008").await;
    let other = alumni_for(&repos, None, "1009").await;
    let first = create_job(&repos, &alumni.id, "Acme Corp").await;
    let second = create_job(&repos, &alumni.id, "Globex").await;
    let untouched = create_job(&repos, &other.id, "Initech").await;
    repos.employment.soft_delete(&first.id).await.unwrap();

    let report = repos.employment.soft_delete_by_owner(&alumni.id).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.affected, vec![second.id.clone()]);

    let again = repos.employment.soft_delete_by_owner(&alumni.id).await.unwrap();
    assert!(again.affected.is_empty());

    assert_eq!(ids(&repos.employment.list().await.unwrap()), vec![untouched.id]);
}

#[actix_rt::test]
async fn duplicate_email_allows_a_single_account() {
    let repos = repos();
    let fields = |username: &str| UserFields {
        username: username.into(),
        email: "same@alumni.test".into(),
        password_hash: "$argon2id$placeholder".into(),
        role: Role::User,
        is_active: true,
    };

    let first = repos.users.create(&fields("first")).await;
    let second = repos.users.create(&fields("second")).await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert_eq!(repos.users.count().await.unwrap(), 1);
}

#[actix_rt::test]
async fn company_count_is_per_distinct_alumni() {
    let repos = repos();
    let a = alumni_for(&repos, None, "1010").await;
    let b = alumni_for(&repos, None, "1011").await;
    create_job(&repos, &a.id, "Acme Corp").await;
    create_job(&repos, &a.id, "Acme Corp").await;
    let trashed = create_job(&repos, &b.id, "Acme Corp").await;
    repos.employment.soft_delete(&trashed.id).await.unwrap();

    let handler = handler(&repos);
    assert_eq!(handler.alumni_count_by_company(" Acme Corp ").await.unwrap(), 1);
    assert_eq!(handler.alumni_count_by_company("Nowhere").await.unwrap(), 0);
    assert!(matches!(handler.alumni_count_by_company("  ").await, Err(AppError::InvalidInput(_))));
}
