use async_trait::async_trait;
use bson::doc;
use futures::TryStreamExt;
use mongodb::{options::ReturnDocument, Collection};
use serde::{Deserialize, Serialize};

use super::{conflict_as, sort_doc, with_search, MongoStore, STUDENTS};
use crate::{
    entities::{
        ids::RecordId,
        pagination::{Page, PageQuery},
        student::{Student, StudentFields},
    },
    errors::AppError,
    repositories::student::StudentRepository,
};

const DUPLICATE_STUDENT: &str = "Student NIM or email already exists";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StudentDoc {
    #[serde(rename = "_id")]
    id: i64,
    nim: String,
    nama: String,
    jurusan: String,
    angkatan: i32,
    email: String,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl From<StudentDoc> for Student {
    fn from(doc: StudentDoc) -> Self {
        Student {
            id: RecordId::Seq(doc.id),
            nim: doc.nim,
            nama: doc.nama,
            jurusan: doc.jurusan,
            angkatan: doc.angkatan,
            email: doc.email,
            created_at: doc.created_at.to_chrono(),
            updated_at: doc.updated_at.to_chrono(),
        }
    }
}

#[derive(Clone)]
pub struct MongoStudentRepo {
    store: MongoStore,
}

impl MongoStudentRepo {
    pub fn new(store: MongoStore) -> Self {
        MongoStudentRepo { store }
    }

    fn students(&self) -> Collection<StudentDoc> {
        self.store.collection(STUDENTS)
    }
}

#[async_trait]
impl StudentRepository for MongoStudentRepo {
    async fn list(&self) -> Result<Vec<Student>, AppError> {
        let docs: Vec<StudentDoc> = self
            .students()
            .find(doc! {})
            .sort(doc! { "_id": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs.into_iter().map(Student::from).collect())
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Student>, AppError> {
        let filter = with_search(doc! {}, query, &["nim", "nama", "jurusan", "email"]);
        let total = self.students().count_documents(filter.clone()).await? as i64;

        let docs: Vec<StudentDoc> = self
            .students()
            .find(filter)
            .sort(sort_doc(query))
            .skip(query.offset() as u64)
            .limit(query.limit)
            .await?
            .try_collect()
            .await?;

        Ok(Page { items: docs.into_iter().map(Student::from).collect(), total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Student, AppError> {
        self.students()
            .find_one(doc! { "_id": id.as_seq()? })
            .await?
            .map(Student::from)
            .ok_or_else(|| AppError::NotFound("Student not found".into()))
    }

    async fn get_by_nim(&self, nim: &str) -> Result<Option<Student>, AppError> {
        Ok(self.students().find_one(doc! { "nim": nim }).await?.map(Student::from))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Student>, AppError> {
        let found = self
            .students()
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?;
        Ok(found.map(Student::from))
    }

    async fn create(&self, student: &StudentFields) -> Result<Student, AppError> {
        let now = bson::DateTime::now();
        let doc = StudentDoc {
            id: self.store.next_id(STUDENTS).await?,
            nim: student.nim.clone(),
            nama: student.nama.clone(),
            jurusan: student.jurusan.clone(),
            angkatan: student.angkatan,
            email: student.email.to_lowercase(),
            created_at: now,
            updated_at: now,
        };

        self.students()
            .insert_one(&doc)
            .await
            .map_err(conflict_as(DUPLICATE_STUDENT))?;
        Ok(doc.into())
    }

    async fn update(&self, id: &RecordId, student: &StudentFields) -> Result<Student, AppError> {
        let update = doc! {
            "$set": {
                "nim": student.nim.as_str(),
                "nama": student.nama.as_str(),
                "jurusan": student.jurusan.as_str(),
                "angkatan": student.angkatan,
                "email": student.email.to_lowercase(),
                "updated_at": bson::DateTime::now(),
            }
        };

        self.students()
            .find_one_and_update(doc! { "_id": id.as_seq()? }, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(conflict_as(DUPLICATE_STUDENT))?
            .map(Student::from)
            .ok_or_else(|| AppError::NotFound("Student not found".into()))
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        let result = self.students().delete_one(doc! { "_id": id.as_seq()? }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound("Student not found".into()));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.students().count_documents(doc! {}).await? as i64)
    }
}
