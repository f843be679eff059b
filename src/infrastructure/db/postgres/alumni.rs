use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};

use super::{push_search, push_window};
use crate::{
    entities::{
        alumni::{Alumni, AlumniFields},
        ids::RecordId,
        pagination::{Page, PageQuery},
        user::{Role, UserSummary},
    },
    errors::AppError,
    repositories::alumni::AlumniRepository,
};

const ALUMNI_SELECT: &str = r#"
    SELECT a.id, a.user_id, a.nim, a.nama, a.jurusan, a.angkatan, a.tahun_lulus, a.email,
           a.no_telepon, a.alamat, a.created_at, a.updated_at,
           u.id AS u_id, u.username AS u_username, u.email AS u_email, u.role AS u_role
    FROM alumni a
    LEFT JOIN users u ON u.id = a.user_id
"#;

const SEARCH_COLUMNS: [&str; 4] = ["a.nim", "a.nama", "a.jurusan", "a.email"];

#[derive(sqlx::FromRow)]
struct AlumniRow {
    id: i64,
    user_id: Option<i64>,
    nim: String,
    nama: String,
    jurusan: String,
    angkatan: i32,
    tahun_lulus: i32,
    email: String,
    no_telepon: Option<String>,
    alamat: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    u_id: Option<i64>,
    u_username: Option<String>,
    u_email: Option<String>,
    u_role: Option<String>,
}

impl From<AlumniRow> for Alumni {
    fn from(row: AlumniRow) -> Self {
        let user = match (row.u_id, row.u_username, row.u_email) {
            (Some(id), Some(username), Some(email)) => Some(UserSummary {
                id: RecordId::Seq(id),
                username,
                email,
                role: Role::parse_or_default(row.u_role.as_deref()),
            }),
            _ => None,
        };

        Alumni {
            id: RecordId::Seq(row.id),
            user_id: row.user_id.map(RecordId::Seq),
            nim: row.nim,
            nama: row.nama,
            jurusan: row.jurusan,
            angkatan: row.angkatan,
            tahun_lulus: row.tahun_lulus,
            email: row.email,
            no_telepon: row.no_telepon,
            alamat: row.alamat,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user,
        }
    }
}

fn conflict_message(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => {
            AppError::Conflict("Alumni NIM already exists or the user already has a profile".into())
        }
        other => other,
    }
}

fn owner_seq(fields: &AlumniFields) -> Result<Option<i64>, AppError> {
    fields.user_id.as_ref().map(RecordId::as_seq).transpose()
}

#[derive(Clone)]
pub struct PgAlumniRepo {
    pool: PgPool,
}

impl PgAlumniRepo {
    pub fn new(pool: PgPool) -> Self {
        PgAlumniRepo { pool }
    }
}

#[async_trait]
impl AlumniRepository for PgAlumniRepo {
    async fn list(&self) -> Result<Vec<Alumni>, AppError> {
        let sql = format!("{ALUMNI_SELECT} ORDER BY a.id DESC");
        let rows = sqlx::query_as::<_, AlumniRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Alumni::from).collect())
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Alumni>, AppError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM alumni a WHERE TRUE");
        push_search(&mut count, query, &SEARCH_COLUMNS);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(format!("{ALUMNI_SELECT} WHERE TRUE"));
        push_search(&mut select, query, &SEARCH_COLUMNS);
        push_window(&mut select, query, "a");
        let rows: Vec<AlumniRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page { items: rows.into_iter().map(Alumni::from).collect(), total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Alumni, AppError> {
        let sql = format!("{ALUMNI_SELECT} WHERE a.id = $1");
        sqlx::query_as::<_, AlumniRow>(&sql)
            .bind(id.as_seq()?)
            .fetch_optional(&self.pool)
            .await?
            .map(Alumni::from)
            .ok_or_else(|| AppError::NotFound("Alumni not found".into()))
    }

    async fn get_by_user_id(&self, user_id: &RecordId) -> Result<Option<Alumni>, AppError> {
        let sql = format!("{ALUMNI_SELECT} WHERE a.user_id = $1");
        let row = sqlx::query_as::<_, AlumniRow>(&sql)
            .bind(user_id.as_seq()?)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Alumni::from))
    }

    async fn get_by_nim(&self, nim: &str) -> Result<Option<Alumni>, AppError> {
        let sql = format!("{ALUMNI_SELECT} WHERE a.nim = $1");
        let row = sqlx::query_as::<_, AlumniRow>(&sql)
            .bind(nim)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Alumni::from))
    }

    async fn create(&self, alumni: &AlumniFields) -> Result<Alumni, AppError> {
        let inserted_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO alumni (user_id, nim, nama, jurusan, angkatan, tahun_lulus, email, no_telepon, alamat)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(owner_seq(alumni)?)
        .bind(&alumni.nim)
        .bind(&alumni.nama)
        .bind(&alumni.jurusan)
        .bind(alumni.angkatan)
        .bind(alumni.tahun_lulus)
        .bind(&alumni.email)
        .bind(&alumni.no_telepon)
        .bind(&alumni.alamat)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_message)?;

        self.get_by_id(&RecordId::Seq(inserted_id)).await
    }

    async fn update(&self, id: &RecordId, alumni: &AlumniFields) -> Result<Alumni, AppError> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE alumni SET
                user_id = $1,
                nim = $2,
                nama = $3,
                jurusan = $4,
                angkatan = $5,
                tahun_lulus = $6,
                email = $7,
                no_telepon = $8,
                alamat = $9,
                updated_at = NOW()
            WHERE id = $10
            RETURNING id
            "#,
        )
        .bind(owner_seq(alumni)?)
        .bind(&alumni.nim)
        .bind(&alumni.nama)
        .bind(&alumni.jurusan)
        .bind(alumni.angkatan)
        .bind(alumni.tahun_lulus)
        .bind(&alumni.email)
        .bind(&alumni.no_telepon)
        .bind(&alumni.alamat)
        .bind(id.as_seq()?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_message)?;

        match updated {
            Some(id) => self.get_by_id(&RecordId::Seq(id)).await,
            None => Err(AppError::NotFound("Alumni not found".into())),
        }
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM alumni WHERE id = $1")
            .bind(id.as_seq()?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Alumni not found".into()));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM alumni")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
