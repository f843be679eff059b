use async_trait::async_trait;
use bson::{doc, Bson, Document};
use chrono::NaiveDate;
use futures::TryStreamExt;
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{alumni::AlumniDoc, collect, join_one, window_stages, with_search, MongoStore, ALUMNI, EMPLOYMENT};
use crate::{
    entities::{
        employment::{BatchFailure, BatchReport, EmploymentFields, EmploymentRecord, Visibility},
        ids::RecordId,
        pagination::{Page, PageQuery},
    },
    errors::AppError,
    repositories::employment::EmploymentRepository,
};

const SEARCH_FIELDS: [&str; 4] = ["nama_perusahaan", "posisi_jabatan", "bidang_industri", "lokasi_kerja"];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmploymentDoc {
    #[serde(rename = "_id")]
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
    deleted_at: Option<bson::DateTime>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
    #[serde(default, skip_serializing)]
    alumni: Option<AlumniDoc>,
}

impl From<EmploymentDoc> for EmploymentRecord {
    fn from(doc: EmploymentDoc) -> Self {
        EmploymentRecord {
            id: RecordId::Seq(doc.id),
            alumni_id: RecordId::Seq(doc.alumni_id),
            nama_perusahaan: doc.nama_perusahaan,
            posisi_jabatan: doc.posisi_jabatan,
            bidang_industri: doc.bidang_industri,
            lokasi_kerja: doc.lokasi_kerja,
            gaji_range: doc.gaji_range,
            tanggal_mulai_kerja: doc.tanggal_mulai_kerja,
            tanggal_selesai_kerja: doc.tanggal_selesai_kerja,
            status_pekerjaan: doc.status_pekerjaan,
            deskripsi_pekerjaan: doc.deskripsi_pekerjaan,
            deleted_at: doc.deleted_at.map(bson::DateTime::to_chrono),
            created_at: doc.created_at.to_chrono(),
            updated_at: doc.updated_at.to_chrono(),
            alumni: doc.alumni.map(AlumniDoc::summary),
        }
    }
}

fn active() -> Document {
    doc! { "deleted_at": Bson::Null }
}

fn trashed() -> Document {
    doc! { "deleted_at": { "$ne": Bson::Null } }
}

fn newest_first() -> Document {
    doc! { "$sort": { "created_at": -1, "_id": -1 } }
}

/// Date columns are stored as `YYYY-MM-DD` strings so they sort lexically.
fn date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

#[derive(Clone)]
pub struct MongoEmploymentRepo {
    store: MongoStore,
}

impl MongoEmploymentRepo {
    pub fn new(store: MongoStore) -> Self {
        MongoEmploymentRepo { store }
    }

    fn records(&self) -> Collection<EmploymentDoc> {
        self.store.collection(EMPLOYMENT)
    }

    async fn joined(&self, mut stages: Vec<Document>) -> Result<Vec<EmploymentRecord>, AppError> {
        stages.extend(join_one(ALUMNI, "alumni_id", "alumni"));
        let cursor = self.store.collection::<Document>(EMPLOYMENT).aggregate(stages).await?;
        let docs: Vec<EmploymentDoc> = collect(cursor).await?;
        Ok(docs.into_iter().map(EmploymentRecord::from).collect())
    }

    async fn exists(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.records().count_documents(doc! { "_id": id }).limit(1).await? > 0)
    }

    /// Id of the alumni profile linked to `user_id`, if any.
    async fn alumni_of(&self, user_id: &RecordId) -> Result<Option<i64>, AppError> {
        let found = self
            .store
            .collection::<Document>(ALUMNI)
            .find_one(doc! { "user_id": user_id.as_seq()? })
            .projection(doc! { "_id": 1 })
            .await?;
        Ok(found.and_then(|d| d.get_i64("_id").ok()))
    }

    async fn active_ids_of(&self, alumni_id: i64) -> Result<Vec<i64>, AppError> {
        let mut filter = active();
        filter.insert("alumni_id", alumni_id);
        let docs: Vec<Document> = self
            .store
            .collection::<Document>(EMPLOYMENT)
            .find(filter)
            .projection(doc! { "_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs.iter().filter_map(|d| d.get_i64("_id").ok()).collect())
    }
}

#[async_trait]
impl EmploymentRepository for MongoEmploymentRepo {
    async fn list(&self) -> Result<Vec<EmploymentRecord>, AppError> {
        self.joined(vec![doc! { "$match": active() }, newest_first()]).await
    }

    async fn list_paged(&self, query: &PageQuery, visibility: Visibility) -> Result<Page<EmploymentRecord>, AppError> {
        let base = match visibility {
            Visibility::Active => active(),
            Visibility::Trashed => trashed(),
        };
        let filter = with_search(base, query, &SEARCH_FIELDS);
        let total = self.records().count_documents(filter.clone()).await? as i64;
        let items = self.joined(window_stages(filter, query)).await?;
        Ok(Page { items, total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<EmploymentRecord, AppError> {
        let mut filter = active();
        filter.insert("_id", id.as_seq()?);
        self.joined(vec![doc! { "$match": filter }, doc! { "$limit": 1 }])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound("Employment record not found".into()))
    }

    async fn list_by_alumni(&self, alumni_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        let mut filter = active();
        filter.insert("alumni_id", alumni_id.as_seq()?);
        self.joined(vec![doc! { "$match": filter }, newest_first()]).await
    }

    async fn list_by_user(&self, user_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        match self.alumni_of(user_id).await? {
            Some(alumni_id) => self.list_by_alumni(&RecordId::Seq(alumni_id)).await,
            None => Ok(Vec::new()),
        }
    }

    async fn create(&self, record: &EmploymentFields) -> Result<EmploymentRecord, AppError> {
        let now = bson::DateTime::now();
        let doc = EmploymentDoc {
            id: self.store.next_id(EMPLOYMENT).await?,
            alumni_id: record.alumni_id.as_seq()?,
            nama_perusahaan: record.nama_perusahaan.clone(),
            posisi_jabatan: record.posisi_jabatan.clone(),
            bidang_industri: record.bidang_industri.clone(),
            lokasi_kerja: record.lokasi_kerja.clone(),
            gaji_range: record.gaji_range.clone(),
            tanggal_mulai_kerja: record.tanggal_mulai_kerja,
            tanggal_selesai_kerja: record.tanggal_selesai_kerja,
            status_pekerjaan: record.status_pekerjaan.clone(),
            deskripsi_pekerjaan: record.deskripsi_pekerjaan.clone(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
            alumni: None,
        };

        self.records().insert_one(&doc).await?;
        self.get_by_id(&RecordId::Seq(doc.id)).await
    }

    async fn update(&self, id: &RecordId, record: &EmploymentFields) -> Result<EmploymentRecord, AppError> {
        let mut filter = active();
        filter.insert("_id", id.as_seq()?);
        let update = doc! {
            "$set": {
                "alumni_id": record.alumni_id.as_seq()?,
                "nama_perusahaan": record.nama_perusahaan.as_str(),
                "posisi_jabatan": record.posisi_jabatan.as_str(),
                "bidang_industri": record.bidang_industri.as_str(),
                "lokasi_kerja": record.lokasi_kerja.as_str(),
                "gaji_range": record.gaji_range.clone(),
                "tanggal_mulai_kerja": date(record.tanggal_mulai_kerja),
                "tanggal_selesai_kerja": record.tanggal_selesai_kerja.map(date),
                "status_pekerjaan": record.status_pekerjaan.as_str(),
                "deskripsi_pekerjaan": record.deskripsi_pekerjaan.clone(),
                "updated_at": bson::DateTime::now(),
            }
        };

        let result = self.records().update_one(filter, update).await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Employment record not found".into()));
        }
        self.get_by_id(id).await
    }

    async fn soft_delete(&self, id: &RecordId) -> Result<(), AppError> {
        let seq = id.as_seq()?;
        let mut filter = active();
        filter.insert("_id", seq);
        let now = bson::DateTime::now();

        let result = self
            .records()
            .update_one(filter, doc! { "$set": { "deleted_at": now, "updated_at": now } })
            .await?;

        if result.matched_count == 0 {
            return if self.exists(seq).await? {
                Err(AppError::Conflict("Employment record is already in the trash".into()))
            } else {
                Err(AppError::NotFound("Employment record not found".into()))
            };
        }
        Ok(())
    }

    async fn soft_delete_by_owner(&self, alumni_id: &RecordId) -> Result<BatchReport, AppError> {
        let ids = self.active_ids_of(alumni_id.as_seq()?).await?;
        let mut report = BatchReport::default();

        for id in ids {
            let mut filter = active();
            filter.insert("_id", id);
            let now = bson::DateTime::now();

            match self
                .records()
                .update_one(filter, doc! { "$set": { "deleted_at": now, "updated_at": now } })
                .await
            {
                Ok(result) if result.modified_count > 0 => report.affected.push(RecordId::Seq(id)),
                // Trashed by someone else since the scan.
                Ok(_) => {}
                Err(e) => {
                    warn!(employment_id = id, error = %e, "Failed to trash employment record");
                    report.failed.push(BatchFailure { id: RecordId::Seq(id), reason: e.to_string() });
                }
            }
        }

        info!(
            alumni_id = %alumni_id,
            trashed = report.affected.len(),
            failed = report.failed.len(),
            "Trashed employment records of alumni"
        );
        Ok(report)
    }

    async fn restore(&self, id: &RecordId) -> Result<(), AppError> {
        let mut filter = trashed();
        filter.insert("_id", id.as_seq()?);

        let result = self
            .records()
            .update_one(
                filter,
                doc! { "$set": { "deleted_at": Bson::Null, "updated_at": bson::DateTime::now() } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound("No trashed employment record with that id".into()));
        }
        Ok(())
    }

    async fn hard_delete(&self, id: &RecordId) -> Result<(), AppError> {
        let seq = id.as_seq()?;
        let mut filter = trashed();
        filter.insert("_id", seq);

        let result = self.records().delete_one(filter).await?;
        if result.deleted_count == 0 {
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
        let mut filter = trashed();
        if let Some(owner) = owner {
            match self.alumni_of(&owner).await? {
                Some(alumni_id) => {
                    filter.insert("alumni_id", alumni_id);
                }
                None => return Ok(Vec::new()),
            }
        }

        self.joined(vec![
            doc! { "$match": filter },
            doc! { "$sort": { "deleted_at": -1, "_id": -1 } },
        ])
        .await
    }

    async fn count_active(&self) -> Result<i64, AppError> {
        Ok(self.records().count_documents(active()).await? as i64)
    }

    async fn count_alumni_by_company(&self, company: &str) -> Result<i64, AppError> {
        let mut filter = active();
        filter.insert("nama_perusahaan", company);
        let distinct = self.records().distinct("alumni_id", filter).await?;
        Ok(distinct.len() as i64)
    }
}
