use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use super::{collect, conflict_as, join_one, users::UserDoc, window_stages, with_search, MongoStore, ALUMNI, USERS};
use crate::{
    entities::{
        alumni::{Alumni, AlumniFields, AlumniSummary},
        ids::RecordId,
        pagination::{Page, PageQuery},
    },
    errors::AppError,
    repositories::alumni::AlumniRepository,
};

const DUPLICATE_ALUMNI: &str = "Alumni NIM already exists or the user already has a profile";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct AlumniDoc {
    #[serde(rename = "_id")]
    pub id: i64,
    pub user_id: Option<i64>,
    pub nim: String,
    pub nama: String,
    pub jurusan: String,
    pub angkatan: i32,
    pub tahun_lulus: i32,
    pub email: String,
    pub no_telepon: Option<String>,
    pub alamat: Option<String>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
    /// Filled by `$lookup`; never stored.
    #[serde(default, skip_serializing)]
    pub user: Option<UserDoc>,
}

impl AlumniDoc {
    pub fn summary(self) -> AlumniSummary {
        AlumniSummary {
            id: RecordId::Seq(self.id),
            user_id: self.user_id.map(RecordId::Seq),
            nim: self.nim,
            nama: self.nama,
            jurusan: self.jurusan,
            angkatan: self.angkatan,
            tahun_lulus: self.tahun_lulus,
            email: self.email,
        }
    }
}

impl From<AlumniDoc> for Alumni {
    fn from(doc: AlumniDoc) -> Self {
        Alumni {
            id: RecordId::Seq(doc.id),
            user_id: doc.user_id.map(RecordId::Seq),
            nim: doc.nim,
            nama: doc.nama,
            jurusan: doc.jurusan,
            angkatan: doc.angkatan,
            tahun_lulus: doc.tahun_lulus,
            email: doc.email,
            no_telepon: doc.no_telepon,
            alamat: doc.alamat,
            created_at: doc.created_at.to_chrono(),
            updated_at: doc.updated_at.to_chrono(),
            user: doc.user.map(UserDoc::summary),
        }
    }
}

fn owner_seq(fields: &AlumniFields) -> Result<Option<i64>, AppError> {
    fields.user_id.as_ref().map(RecordId::as_seq).transpose()
}

#[derive(Clone)]
pub struct MongoAlumniRepo {
    store: MongoStore,
}

impl MongoAlumniRepo {
    pub fn new(store: MongoStore) -> Self {
        MongoAlumniRepo { store }
    }

    fn alumni(&self) -> Collection<AlumniDoc> {
        self.store.collection(ALUMNI)
    }

    /// Runs `stages` and joins each result with its owning user.
    async fn joined(&self, mut stages: Vec<Document>) -> Result<Vec<Alumni>, AppError> {
        stages.extend(join_one(USERS, "user_id", "user"));
        let cursor = self.store.collection::<Document>(ALUMNI).aggregate(stages).await?;
        let docs: Vec<AlumniDoc> = collect(cursor).await?;
        Ok(docs.into_iter().map(Alumni::from).collect())
    }

    async fn find_joined(&self, filter: Document) -> Result<Option<Alumni>, AppError> {
        let mut found = self
            .joined(vec![doc! { "$match": filter }, doc! { "$limit": 1 }])
            .await?;
        Ok(found.pop())
    }
}

#[async_trait]
impl AlumniRepository for MongoAlumniRepo {
    async fn list(&self) -> Result<Vec<Alumni>, AppError> {
        self.joined(vec![doc! { "$sort": { "_id": -1 } }]).await
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Alumni>, AppError> {
        let filter = with_search(doc! {}, query, &["nim", "nama", "jurusan", "email"]);
        let total = self.alumni().count_documents(filter.clone()).await? as i64;
        let items = self.joined(window_stages(filter, query)).await?;
        Ok(Page { items, total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Alumni, AppError> {
        self.find_joined(doc! { "_id": id.as_seq()? })
            .await?
            .ok_or_else(|| AppError::NotFound("Alumni not found".into()))
    }

    async fn get_by_user_id(&self, user_id: &RecordId) -> Result<Option<Alumni>, AppError> {
        self.find_joined(doc! { "user_id": user_id.as_seq()? }).await
    }

    async fn get_by_nim(&self, nim: &str) -> Result<Option<Alumni>, AppError> {
        self.find_joined(doc! { "nim": nim }).await
    }

    async fn create(&self, alumni: &AlumniFields) -> Result<Alumni, AppError> {
        let now = bson::DateTime::now();
        let doc = AlumniDoc {
            id: self.store.next_id(ALUMNI).await?,
            user_id: owner_seq(alumni)?,
            nim: alumni.nim.clone(),
            nama: alumni.nama.clone(),
            jurusan: alumni.jurusan.clone(),
            angkatan: alumni.angkatan,
            tahun_lulus: alumni.tahun_lulus,
            email: alumni.email.clone(),
            no_telepon: alumni.no_telepon.clone(),
            alamat: alumni.alamat.clone(),
            created_at: now,
            updated_at: now,
            user: None,
        };

        self.alumni()
            .insert_one(&doc)
            .await
            .map_err(conflict_as(DUPLICATE_ALUMNI))?;
        self.get_by_id(&RecordId::Seq(doc.id)).await
    }

    async fn update(&self, id: &RecordId, alumni: &AlumniFields) -> Result<Alumni, AppError> {
        let update = doc! {
            "$set": {
                "user_id": owner_seq(alumni)?,
                "nim": alumni.nim.as_str(),
                "nama": alumni.nama.as_str(),
                "jurusan": alumni.jurusan.as_str(),
                "angkatan": alumni.angkatan,
                "tahun_lulus": alumni.tahun_lulus,
                "email": alumni.email.as_str(),
                "no_telepon": alumni.no_telepon.clone(),
                "alamat": alumni.alamat.clone(),
                "updated_at": bson::DateTime::now(),
            }
        };

        let result = self
            .alumni()
            .update_one(doc! { "_id": id.as_seq()? }, update)
            .await
            .map_err(conflict_as(DUPLICATE_ALUMNI))?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Alumni not found".into()));
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        let result = self.alumni().delete_one(doc! { "_id": id.as_seq()? }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound("Alumni not found".into()));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.alumni().count_documents(doc! {}).await? as i64)
    }
}
