use std::time::Duration;

use bson::{doc, Bson, Document};
use mongodb::{
    options::{ClientOptions, IndexOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::entities::pagination::PageQuery;
use crate::errors::AppError;

mod alumni;
mod employment;
mod students;
mod users;

pub use alumni::MongoAlumniRepo;
pub use employment::MongoEmploymentRepo;
pub use students::MongoStudentRepo;
pub use users::MongoUserRepo;

const USERS: &str = "users";
const STUDENTS: &str = "students";
const ALUMNI: &str = "alumni";
const EMPLOYMENT: &str = "employment_records";
const COUNTERS: &str = "counters";

/// Shared handle on the document database. Every collection keys its
/// documents by an `i64` `_id` drawn from the `counters` collection, so ids
/// look the same as the relational backend's.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str, timeout: Duration) -> Result<Self, AppError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options)?;
        let store = MongoStore { db: client.database(database), client };

        store.ping().await?;
        store.ensure_indexes().await?;
        info!(database, "Document database connection established.");
        Ok(store)
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| AppError::Unavailable(format!("Document database ping failed: {e}")))
    }

    async fn ensure_indexes(&self) -> Result<(), AppError> {
        let unique = |keys: Document| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };

        let users = self.collection::<Document>(USERS);
        users.create_index(unique(doc! { "username": 1 })).await?;
        users.create_index(unique(doc! { "email": 1 })).await?;

        let students = self.collection::<Document>(STUDENTS);
        students.create_index(unique(doc! { "nim": 1 })).await?;
        students.create_index(unique(doc! { "email": 1 })).await?;

        let alumni = self.collection::<Document>(ALUMNI);
        alumni.create_index(unique(doc! { "nim": 1 })).await?;
        // Unlinked profiles store a null user_id, which must not collide.
        alumni
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1 })
                    .options(
                        IndexOptions::builder()
                            .unique(true)
                            .partial_filter_expression(doc! { "user_id": { "$type": "long" } })
                            .build(),
                    )
                    .build(),
            )
            .await?;

        let employment = self.collection::<Document>(EMPLOYMENT);
        employment
            .create_index(IndexModel::builder().keys(doc! { "alumni_id": 1, "deleted_at": 1 }).build())
            .await?;

        Ok(())
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection::<T>(name)
    }

    /// Next sequential id for `collection`.
    async fn next_id(&self, collection: &str) -> Result<i64, AppError> {
        let counter = self
            .collection::<Document>(COUNTERS)
            .find_one_and_update(doc! { "_id": collection }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("Counter for {collection} was not created")))?;

        counter
            .get_i64("seq")
            .map_err(|e| AppError::InternalError(format!("Malformed counter for {collection}: {e}")))
    }

    pub fn users(&self) -> MongoUserRepo {
        MongoUserRepo::new(self.clone())
    }

    pub fn students(&self) -> MongoStudentRepo {
        MongoStudentRepo::new(self.clone())
    }

    pub fn alumni(&self) -> MongoAlumniRepo {
        MongoAlumniRepo::new(self.clone())
    }

    pub fn employment(&self) -> MongoEmploymentRepo {
        MongoEmploymentRepo::new(self.clone())
    }
}

/// Adds a case-insensitive `$or` of substring matches to `filter` when the
/// query carries a search term.
fn with_search(mut filter: Document, query: &PageQuery, fields: &[&str]) -> Document {
    if let Some(term) = query.search.as_deref() {
        let pattern = regex::escape(term);
        let clauses: Vec<Bson> = fields
            .iter()
            .map(|field| Bson::Document(doc! { *field: { "$regex": pattern.clone(), "$options": "i" } }))
            .collect();
        filter.insert("$or", clauses);
    }
    filter
}

fn field_name(field: &str) -> &str {
    if field == "id" { "_id" } else { field }
}

/// Requested order with `_id` ascending as the tie-breaker.
fn sort_doc(query: &PageQuery) -> Document {
    let direction = if query.sort.direction.is_desc() { -1 } else { 1 };
    let field = field_name(query.sort.field);
    if field == "_id" {
        doc! { "_id": direction }
    } else {
        doc! { field: direction, "_id": 1 }
    }
}

/// `$match`/`$sort`/`$skip`/`$limit` stages for one page.
fn window_stages(filter: Document, query: &PageQuery) -> Vec<Document> {
    vec![
        doc! { "$match": filter },
        doc! { "$sort": sort_doc(query) },
        doc! { "$skip": query.offset() },
        doc! { "$limit": query.limit },
    ]
}

/// `$lookup` of a single referenced document, kept as `None` when the
/// reference dangles.
fn join_one(from: &str, local: &str, alias: &str) -> [Document; 2] {
    [
        doc! { "$lookup": { "from": from, "localField": local, "foreignField": "_id", "as": alias } },
        doc! { "$unwind": { "path": format!("${alias}"), "preserveNullAndEmptyArrays": true } },
    ]
}

/// Replaces the driver's duplicate-key detail with a message naming the clash.
fn conflict_as(message: &'static str) -> impl Fn(mongodb::error::Error) -> AppError {
    move |err| match AppError::from(err) {
        AppError::Conflict(_) => AppError::Conflict(message.into()),
        other => other,
    }
}

async fn collect<T: DeserializeOwned>(mut cursor: mongodb::Cursor<Document>) -> Result<Vec<T>, AppError> {
    use futures::TryStreamExt;

    let mut items = Vec::new();
    while let Some(document) = cursor.try_next().await? {
        items.push(bson::from_document(document)?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{employment::EMPLOYMENT_SORT_FIELDS, pagination::PaginationRequest};

    fn query(search: Option<&str>, sort_by: &str, order: &str) -> PageQuery {
        PaginationRequest {
            page: Some(3),
            limit: Some(20),
            search: search.map(str::to_string),
            sort_by: Some(sort_by.into()),
            sort_order: Some(order.into()),
        }
        .normalize(EMPLOYMENT_SORT_FIELDS)
    }

    #[test]
    fn search_term_is_escaped_into_case_insensitive_regex() {
        let filter = with_search(doc! { "deleted_at": Bson::Null }, &query(Some("c++"), "id", "asc"), &["a", "b"]);
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);
        let first = clauses[0].as_document().unwrap().get_document("a").unwrap();
        assert_eq!(first.get_str("$regex").unwrap(), "c\\+\\+");
        assert_eq!(first.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn no_search_leaves_filter_untouched() {
        let filter = with_search(doc! {}, &query(None, "id", "asc"), &["a"]);
        assert!(filter.is_empty());
    }

    #[test]
    fn sort_maps_id_and_adds_tie_breaker() {
        assert_eq!(sort_doc(&query(None, "id", "desc")), doc! { "_id": -1 });
        assert_eq!(
            sort_doc(&query(None, "nama_perusahaan", "asc")),
            doc! { "nama_perusahaan": 1, "_id": 1 }
        );
    }

    #[test]
    fn window_skips_previous_pages() {
        let stages = window_stages(doc! {}, &query(None, "id", "asc"));
        assert_eq!(stages[2], doc! { "$skip": 40_i64 });
        assert_eq!(stages[3], doc! { "$limit": 20_i64 });
    }
}
