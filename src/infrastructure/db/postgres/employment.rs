use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, QueryBuilder};
use tracing::info;

use super::{push_search, push_window};
use crate::{
    entities::{
        alumni::AlumniSummary,
        employment::{BatchReport, EmploymentFields, EmploymentRecord, Visibility},
        ids::RecordId,
        pagination::{Page, PageQuery},
    },
    errors::AppError,
    repositories::employment::EmploymentRepository,
};

const EMPLOYMENT_SELECT: &str = r#"
    SELECT e.id, e.alumni_id, e.nama_perusahaan, e.posisi_jabatan, e.bidang_industri, e.lokasi_kerja,
           e.gaji_range, e.tanggal_mulai_kerja, e.tanggal_selesai_kerja, e.status_pekerjaan,
           e.deskripsi_pekerjaan, e.deleted_at, e.created_at, e.updated_at,
           a.id AS a_id, a.user_id AS a_user_id, a.nim AS a_nim, a.nama AS a_nama,
           a.jurusan AS a_jurusan, a.angkatan AS a_angkatan, a.tahun_lulus AS a_tahun_lulus,
           a.email AS a_email
    FROM employment_records e
    LEFT JOIN alumni a ON a.id = e.alumni_id
"#;

const SEARCH_COLUMNS: [&str; 4] = ["e.nama_perusahaan", "e.posisi_jabatan", "e.bidang_industri", "e.lokasi_kerja"];

#[derive(sqlx::FromRow)]
struct EmploymentRow {
    id: i64,
    alumni_id: i64,
    nama_perusahaan: String,
    posisi_jabatan: String,
    bidang_industri: String,
    lokasi_kerja: String,
    gaji_range: Option<String>,
    tanggal_mulai_kerja: NaiveDate,
    tanggal_selesai_kerja: Option<NaiveDate>,
    status_pekerjaan: String,
    deskripsi_pekerjaan: Option<String>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    a_id: Option<i64>,
    a_user_id: Option<i64>,
    a_nim: Option<String>,
    a_nama: Option<String>,
    a_jurusan: Option<String>,
    a_angkatan: Option<i32>,
    a_tahun_lulus: Option<i32>,
    a_email: Option<String>,
}

impl EmploymentRow {
    fn alumni(&mut self) -> Option<AlumniSummary> {
        Some(AlumniSummary {
            id: RecordId::Seq(self.a_id?),
            user_id: self.a_user_id.map(RecordId::Seq),
            nim: self.a_nim.take()?,
            nama: self.a_nama.take()?,
            jurusan: self.a_jurusan.take()?,
            angkatan: self.a_angkatan?,
            tahun_lulus: self.a_tahun_lulus?,
            email: self.a_email.take()?,
        })
    }
}

impl From<EmploymentRow> for EmploymentRecord {
    fn from(mut row: EmploymentRow) -> Self {
        let alumni = row.alumni();
        EmploymentRecord {
            id: RecordId::Seq(row.id),
            alumni_id: RecordId::Seq(row.alumni_id),
            nama_perusahaan: row.nama_perusahaan,
            posisi_jabatan: row.posisi_jabatan,
            bidang_industri: row.bidang_industri,
            lokasi_kerja: row.lokasi_kerja,
            gaji_range: row.gaji_range,
            tanggal_mulai_kerja: row.tanggal_mulai_kerja,
            tanggal_selesai_kerja: row.tanggal_selesai_kerja,
            status_pekerjaan: row.status_pekerjaan,
            deskripsi_pekerjaan: row.deskripsi_pekerjaan,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            alumni,
        }
    }
}

fn visibility_filter(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Active => "e.deleted_at IS NULL",
        Visibility::Trashed => "e.deleted_at IS NOT NULL",
    }
}

#[derive(Clone)]
pub struct PgEmploymentRepo {
    pool: PgPool,
}

impl PgEmploymentRepo {
    pub fn new(pool: PgPool) -> Self {
        PgEmploymentRepo { pool }
    }

    async fn exists(&self, id: i64) -> Result<bool, AppError> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM employment_records WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }

    async fn fetch_many(&self, filter: &str, value: i64) -> Result<Vec<EmploymentRecord>, AppError> {
        let sql = format!("{EMPLOYMENT_SELECT} WHERE {filter} ORDER BY e.created_at DESC, e.id DESC");
        let rows = sqlx::query_as::<_, EmploymentRow>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(EmploymentRecord::from).collect())
    }
}

#[async_trait]
impl EmploymentRepository for PgEmploymentRepo {
    async fn list(&self) -> Result<Vec<EmploymentRecord>, AppError> {
        let sql = format!("{EMPLOYMENT_SELECT} WHERE e.deleted_at IS NULL ORDER BY e.created_at DESC, e.id DESC");
        let rows = sqlx::query_as::<_, EmploymentRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(EmploymentRecord::from).collect())
    }

    async fn list_paged(&self, query: &PageQuery, visibility: Visibility) -> Result<Page<EmploymentRecord>, AppError> {
        let filter = visibility_filter(visibility);

        let mut count = QueryBuilder::new(format!("SELECT COUNT(*) FROM employment_records e WHERE {filter}"));
        push_search(&mut count, query, &SEARCH_COLUMNS);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(format!("{EMPLOYMENT_SELECT} WHERE {filter}"));
        push_search(&mut select, query, &SEARCH_COLUMNS);
        push_window(&mut select, query, "e");
        let rows: Vec<EmploymentRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page { items: rows.into_iter().map(EmploymentRecord::from).collect(), total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<EmploymentRecord, AppError> {
        let sql = format!("{EMPLOYMENT_SELECT} WHERE e.id = $1 AND e.deleted_at IS NULL");
        sqlx::query_as::<_, EmploymentRow>(&sql)
            .bind(id.as_seq()?)
            .fetch_optional(&self.pool)
            .await?
            .map(EmploymentRecord::from)
            .ok_or_else(|| AppError::NotFound("Employment record not found".into()))
    }

    async fn list_by_alumni(&self, alumni_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        self.fetch_many("e.alumni_id = $1 AND e.deleted_at IS NULL", alumni_id.as_seq()?)
            .await
    }

    async fn list_by_user(&self, user_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        self.fetch_many("a.user_id = $1 AND e.deleted_at IS NULL", user_id.as_seq()?)
            .await
    }

    async fn create(&self, record: &EmploymentFields) -> Result<EmploymentRecord, AppError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO employment_records (
                alumni_id, nama_perusahaan, posisi_jabatan, bidang_industri, lokasi_kerja,
                gaji_range, tanggal_mulai_kerja, tanggal_selesai_kerja, status_pekerjaan, deskripsi_pekerjaan
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(record.alumni_id.as_seq()?)
        .bind(&record.nama_perusahaan)
        .bind(&record.posisi_jabatan)
        .bind(&record.bidang_industri)
        .bind(&record.lokasi_kerja)
        .bind(&record.gaji_range)
        .bind(record.tanggal_mulai_kerja)
        .bind(record.tanggal_selesai_kerja)
        .bind(&record.status_pekerjaan)
        .bind(&record.deskripsi_pekerjaan)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(&RecordId::Seq(id)).await
    }

    async fn update(&self, id: &RecordId, record: &EmploymentFields) -> Result<EmploymentRecord, AppError> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE employment_records SET
                alumni_id = $1,
                nama_perusahaan = $2,
                posisi_jabatan = $3,
                bidang_industri = $4,
                lokasi_kerja = $5,
                gaji_range = $6,
                tanggal_mulai_kerja = $7,
                tanggal_selesai_kerja = $8,
                status_pekerjaan = $9,
                deskripsi_pekerjaan = $10,
                updated_at = NOW()
            WHERE id = $11 AND deleted_at IS NULL
            RETURNING id
            "#,
        )
        .bind(record.alumni_id.as_seq()?)
        .bind(&record.nama_perusahaan)
        .bind(&record.posisi_jabatan)
        .bind(&record.bidang_industri)
        .bind(&record.lokasi_kerja)
        .bind(&record.gaji_range)
        .bind(record.tanggal_mulai_kerja)
        .bind(record.tanggal_selesai_kerja)
        .bind(&record.status_pekerjaan)
        .bind(&record.deskripsi_pekerjaan)
        .bind(id.as_seq()?)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.get_by_id(&RecordId::Seq(id)).await,
            None => Err(AppError::NotFound("Employment record not found".into())),
        }
    }

    async fn soft_delete(&self, id: &RecordId) -> Result<(), AppError> {
        let seq = id.as_seq()?;
        let result = sqlx::query(
            "UPDATE employment_records SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(seq)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return if self.exists(seq).await? {
                Err(AppError::Conflict("Employment record is already in the trash".into()))
            } else {
                Err(AppError::NotFound("Employment record not found".into()))
            };
        }
        Ok(())
    }

    async fn soft_delete_by_owner(&self, alumni_id: &RecordId) -> Result<BatchReport, AppError> {
        // A single statement trashes the whole batch or nothing, so `failed` stays empty.
        let affected: Vec<i64> = sqlx::query_scalar(
            "UPDATE employment_records SET deleted_at = NOW(), updated_at = NOW() \
             WHERE alumni_id = $1 AND deleted_at IS NULL RETURNING id",
        )
        .bind(alumni_id.as_seq()?)
        .fetch_all(&self.pool)
        .await?;

        info!(alumni_id = %alumni_id, trashed = affected.len(), "Trashed employment records of alumni");

        Ok(BatchReport {
            affected: affected.into_iter().map(RecordId::Seq).collect(),
            failed: Vec::new(),
        })
    }

    async fn restore(&self, id: &RecordId) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE employment_records SET deleted_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id.as_seq()?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("No trashed employment record with that id".into()));
        }
        Ok(())
    }

    async fn hard_delete(&self, id: &RecordId) -> Result<(), AppError> {
        let seq = id.as_seq()?;
        let result = sqlx::query("DELETE FROM employment_records WHERE id = $1 AND deleted_at IS NOT NULL")
            .bind(seq)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return if self.exists(seq).await? {
                Err(AppError::PreconditionFailed(
                    "Employment record must be in the trash before permanent deletion".into(),
                ))
            } else {
                Err(AppError::NotFound("Employment record not found".into()))
            };
        }
        Ok(())
    }

    async fn list_deleted(&self, owner: Option<RecordId>) -> Result<Vec<EmploymentRecord>, AppError> {
        let mut select = QueryBuilder::new(format!("{EMPLOYMENT_SELECT} WHERE e.deleted_at IS NOT NULL"));
        if let Some(owner) = owner {
            select.push(" AND a.user_id = ").push_bind(owner.as_seq()?);
        }
        select.push(" ORDER BY e.deleted_at DESC, e.id DESC");

        let rows: Vec<EmploymentRow> = select.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(EmploymentRecord::from).collect())
    }

    async fn count_active(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employment_records WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_alumni_by_company(&self, company: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT alumni_id) FROM employment_records \
             WHERE nama_perusahaan = $1 AND deleted_at IS NULL",
        )
        .bind(company)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
