use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};

use super::{push_search, push_window};
use crate::{
    entities::{
        ids::RecordId,
        pagination::{Page, PageQuery},
        student::{Student, StudentFields},
    },
    errors::AppError,
    repositories::student::StudentRepository,
};

const STUDENT_COLUMNS: &str = "s.id, s.nim, s.nama, s.jurusan, s.angkatan, s.email, s.created_at, s.updated_at";
const SEARCH_COLUMNS: [&str; 4] = ["s.nim", "s.nama", "s.jurusan", "s.email"];

#[derive(sqlx::FromRow)]
struct StudentRow {
    id: i64,
    nim: String,
    nama: String,
    jurusan: String,
    angkatan: i32,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: RecordId::Seq(row.id),
            nim: row.nim,
            nama: row.nama,
            jurusan: row.jurusan,
            angkatan: row.angkatan,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn conflict_message(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => AppError::Conflict("Student NIM or email already exists".into()),
        other => other,
    }
}

#[derive(Clone)]
pub struct PgStudentRepo {
    pool: PgPool,
}

impl PgStudentRepo {
    pub fn new(pool: PgPool) -> Self {
        PgStudentRepo { pool }
    }
}

#[async_trait]
impl StudentRepository for PgStudentRepo {
    async fn list(&self) -> Result<Vec<Student>, AppError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students s ORDER BY s.id DESC");
        let rows = sqlx::query_as::<_, StudentRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Student::from).collect())
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Student>, AppError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM students s WHERE TRUE");
        push_search(&mut count, query, &SEARCH_COLUMNS);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(format!("SELECT {STUDENT_COLUMNS} FROM students s WHERE TRUE"));
        push_search(&mut select, query, &SEARCH_COLUMNS);
        push_window(&mut select, query, "s");
        let rows: Vec<StudentRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page { items: rows.into_iter().map(Student::from).collect(), total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Student, AppError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students s WHERE s.id = $1");
        sqlx::query_as::<_, StudentRow>(&sql)
            .bind(id.as_seq()?)
            .fetch_optional(&self.pool)
            .await?
            .map(Student::from)
            .ok_or_else(|| AppError::NotFound("Student not found".into()))
    }

    async fn get_by_nim(&self, nim: &str) -> Result<Option<Student>, AppError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students s WHERE s.nim = $1");
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(nim)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Student::from))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Student>, AppError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students s WHERE LOWER(s.email) = LOWER($1)");
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Student::from))
    }

    async fn create(&self, student: &StudentFields) -> Result<Student, AppError> {
        let sql = format!(
            "INSERT INTO students AS s (nim, nama, jurusan, angkatan, email) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {STUDENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(&student.nim)
            .bind(&student.nama)
            .bind(&student.jurusan)
            .bind(student.angkatan)
            .bind(&student.email)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_message)?;
        Ok(row.into())
    }

    async fn update(&self, id: &RecordId, student: &StudentFields) -> Result<Student, AppError> {
        let sql = format!(
            "UPDATE students AS s SET nim = $1, nama = $2, jurusan = $3, angkatan = $4, email = $5, \
             updated_at = NOW() WHERE s.id = $6 RETURNING {STUDENT_COLUMNS}"
        );
        sqlx::query_as::<_, StudentRow>(&sql)
            .bind(&student.nim)
            .bind(&student.nama)
            .bind(&student.jurusan)
            .bind(student.angkatan)
            .bind(&student.email)
            .bind(id.as_seq()?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conflict_message)?
            .map(Student::from)
            .ok_or_else(|| AppError::NotFound("Student not found".into()))
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id.as_seq()?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Student not found".into()));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
