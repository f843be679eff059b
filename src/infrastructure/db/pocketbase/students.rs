use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{all_of, eq, parse_timestamp, reword, search_clause, PocketBaseClient, STUDENTS};
use crate::{
    entities::{
        ids::RecordId,
        pagination::{Page, PageQuery},
        student::{Student, StudentFields},
    },
    errors::AppError,
    repositories::student::StudentRepository,
};

const NOT_FOUND: &str = "Student not found";
const DUPLICATE: &str = "Student NIM or email already exists";

#[derive(Debug, Deserialize)]
struct StudentRecord {
    id: String,
    nim: String,
    nama: String,
    jurusan: String,
    angkatan: i32,
    email: String,
    created: String,
    updated: String,
}

impl TryFrom<StudentRecord> for Student {
    type Error = AppError;

    fn try_from(record: StudentRecord) -> Result<Self, Self::Error> {
        Ok(Student {
            id: RecordId::Key(record.id),
            nim: record.nim,
            nama: record.nama,
            jurusan: record.jurusan,
            angkatan: record.angkatan,
            email: record.email,
            created_at: parse_timestamp(&record.created)?,
            updated_at: parse_timestamp(&record.updated)?,
        })
    }
}

#[derive(Serialize)]
struct StudentBody<'a> {
    nim: &'a str,
    nama: &'a str,
    jurusan: &'a str,
    angkatan: i32,
    email: String,
}

impl<'a> From<&'a StudentFields> for StudentBody<'a> {
    fn from(fields: &'a StudentFields) -> Self {
        StudentBody {
            nim: &fields.nim,
            nama: &fields.nama,
            jurusan: &fields.jurusan,
            angkatan: fields.angkatan,
            email: fields.email.to_lowercase(),
        }
    }
}

fn convert(records: Vec<StudentRecord>) -> Result<Vec<Student>, AppError> {
    records.into_iter().map(Student::try_from).collect()
}

#[derive(Clone)]
pub struct PbStudentRepo {
    client: PocketBaseClient,
}

impl PbStudentRepo {
    pub fn new(client: PocketBaseClient) -> Self {
        PbStudentRepo { client }
    }

    async fn find_by(&self, field: &str, value: &str) -> Result<Option<Student>, AppError> {
        self.client
            .first::<StudentRecord>(STUDENTS, eq(field, value))
            .await?
            .map(Student::try_from)
            .transpose()
    }
}

#[async_trait]
impl StudentRepository for PbStudentRepo {
    async fn list(&self) -> Result<Vec<Student>, AppError> {
        convert(self.client.list_all(STUDENTS, None, "-created").await?)
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Student>, AppError> {
        let filter = all_of(search_clause(query, &["nim", "nama", "jurusan", "email"]));
        let (items, total) = self
            .client
            .list_window::<StudentRecord>(STUDENTS, query, filter)
            .await?;
        Ok(Page { items: convert(items)?, total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Student, AppError> {
        self.client
            .get::<StudentRecord>(STUDENTS, &id.to_string())
            .await?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?
            .try_into()
    }

    async fn get_by_nim(&self, nim: &str) -> Result<Option<Student>, AppError> {
        self.find_by("nim", nim).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Student>, AppError> {
        self.find_by("email", &email.trim().to_lowercase()).await
    }

    async fn create(&self, student: &StudentFields) -> Result<Student, AppError> {
        self.client
            .create::<StudentRecord, _>(STUDENTS, &StudentBody::from(student))
            .await
            .map_err(reword(NOT_FOUND, DUPLICATE))?
            .try_into()
    }

    async fn update(&self, id: &RecordId, student: &StudentFields) -> Result<Student, AppError> {
        self.client
            .update::<StudentRecord, _>(STUDENTS, &id.to_string(), &StudentBody::from(student))
            .await
            .map_err(reword(NOT_FOUND, DUPLICATE))?
            .try_into()
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        self.client
            .delete(STUDENTS, &id.to_string())
            .await
            .map_err(reword(NOT_FOUND, DUPLICATE))
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.client.count(STUDENTS, None).await
    }
}
