use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::{header::AUTHORIZATION, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::entities::pagination::PageQuery;
use crate::errors::AppError;

mod alumni;
mod employment;
mod students;
mod users;

pub use alumni::PbAlumniRepo;
pub use employment::PbEmploymentRepo;
pub use students::PbStudentRepo;
pub use users::PbUserRepo;

const USERS: &str = "users";
const STUDENTS: &str = "mahasiswas";
const ALUMNI: &str = "alumnis";
const EMPLOYMENT: &str = "pekerjaan_alumnis";

/// Largest page the service hands out in one response.
const MAX_PER_PAGE: i64 = 500;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResult<T> {
    items: Vec<T>,
    total_items: i64,
    total_pages: i64,
}

#[derive(Debug, Clone, Default)]
struct ListParams {
    page: i64,
    per_page: i64,
    filter: Option<String>,
    sort: Option<String>,
}

impl ListParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.max(1).to_string()),
            ("perPage", self.per_page.clamp(1, MAX_PER_PAGE).to_string()),
        ];
        if let Some(filter) = &self.filter {
            pairs.push(("filter", filter.clone()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        pairs
    }
}

/// Thin client over the hosted records service's collection API.
#[derive(Clone)]
pub struct PocketBaseClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl PocketBaseClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| AppError::InternalError(format!("Invalid records service URL {base_url}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder().timeout(timeout).build()?;
        info!(url = %base, "Records service client configured.");
        Ok(PocketBaseClient { http, base, token })
    }

    pub async fn health(&self) -> Result<(), AppError> {
        let url = self.join("api/health")?;
        self.send(self.request(Method::GET, url)).await.map(|_| ())
    }

    pub fn users(&self) -> PbUserRepo {
        PbUserRepo::new(self.clone())
    }

    pub fn students(&self) -> PbStudentRepo {
        PbStudentRepo::new(self.clone())
    }

    pub fn alumni(&self) -> PbAlumniRepo {
        PbAlumniRepo::new(self.clone())
    }

    pub fn employment(&self) -> PbEmploymentRepo {
        PbEmploymentRepo::new(self.clone())
    }

    fn join(&self, path: &str) -> Result<Url, AppError> {
        self.base
            .join(path)
            .map_err(|e| AppError::InternalError(format!("Cannot build records service URL: {e}")))
    }

    fn records_url(&self, collection: &str, id: Option<&str>) -> Result<Url, AppError> {
        match id {
            Some(id) => self.join(&format!(
                "api/collections/{collection}/records/{}",
                urlencoding::encode(id)
            )),
            None => self.join(&format!("api/collections/{collection}/records")),
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AppError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(%status, body = %body, "Records service returned an error");
        Err(classify(status, &body))
    }

    async fn list<T: DeserializeOwned>(&self, collection: &str, params: &ListParams) -> Result<ListResult<T>, AppError> {
        let url = self.records_url(collection, None)?;
        let response = self
            .send(self.request(Method::GET, url).query(&params.query_pairs()))
            .await?;
        Ok(response.json().await?)
    }

    /// Every record matching `filter`, fetched page by page.
    async fn list_all<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Option<String>,
        sort: &str,
    ) -> Result<Vec<T>, AppError> {
        let mut params = ListParams {
            page: 1,
            per_page: MAX_PER_PAGE,
            filter,
            sort: Some(sort.to_string()),
        };
        let mut items = Vec::new();

        loop {
            let page: ListResult<T> = self.list(collection, &params).await?;
            let exhausted = page.items.is_empty() || params.page >= page.total_pages;
            items.extend(page.items);
            if exhausted {
                return Ok(items);
            }
            params.page += 1;
        }
    }

    /// The caller's page and the filtered total. A page larger than one
    /// response allows is stitched together from consecutive service pages.
    async fn list_window<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &PageQuery,
        filter: Option<String>,
    ) -> Result<(Vec<T>, i64), AppError> {
        if query.limit <= MAX_PER_PAGE {
            let page: ListResult<T> = self.list(collection, &page_params(query, filter)).await?;
            return Ok((page.items, page.total_items));
        }

        let (first_page, mut skip) = window_start(query);
        let wanted = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let mut params = ListParams {
            page: first_page,
            per_page: MAX_PER_PAGE,
            filter,
            sort: Some(sort_param(query)),
        };
        let mut items = Vec::new();

        loop {
            let page: ListResult<T> = self.list(collection, &params).await?;
            let exhausted = page.items.is_empty() || params.page >= page.total_pages;
            items.extend(page.items.into_iter().skip(skip));
            skip = 0;
            if exhausted || items.len() >= wanted {
                items.truncate(wanted);
                return Ok((items, page.total_items));
            }
            params.page += 1;
        }
    }

    async fn first<T: DeserializeOwned>(&self, collection: &str, filter: String) -> Result<Option<T>, AppError> {
        let params = ListParams { page: 1, per_page: 1, filter: Some(filter), sort: None };
        let page: ListResult<T> = self.list(collection, &params).await?;
        Ok(page.items.into_iter().next())
    }

    async fn count(&self, collection: &str, filter: Option<String>) -> Result<i64, AppError> {
        let params = ListParams { page: 1, per_page: 1, filter, sort: None };
        let page: ListResult<serde_json::Value> = self.list(collection, &params).await?;
        Ok(page.total_items)
    }

    /// `Ok(None)` when the record does not exist.
    async fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError> {
        let url = self.records_url(collection, Some(id))?;
        match self.send(self.request(Method::GET, url)).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(&self, collection: &str, body: &B) -> Result<T, AppError> {
        let url = self.records_url(collection, None)?;
        let response = self.send(self.request(Method::POST, url).json(body)).await?;
        Ok(response.json().await?)
    }

    async fn update<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let url = self.records_url(collection, Some(id))?;
        let response = self.send(self.request(Method::PATCH, url).json(body)).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let url = self.records_url(collection, Some(id))?;
        self.send(self.request(Method::DELETE, url)).await.map(|_| ())
    }
}

/// Maps a failed response onto the shared error taxonomy.
fn classify(status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::NOT_FOUND => AppError::NotFound("Record not found".into()),
        StatusCode::BAD_REQUEST if body.contains("validation_not_unique") => {
            AppError::Conflict("Record violates a unique constraint".into())
        }
        StatusCode::BAD_REQUEST => AppError::InvalidInput(format!("Records service rejected the request: {body}")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::InternalError(format!("Records service refused the configured token ({status})"))
        }
        StatusCode::TOO_MANY_REQUESTS => AppError::Unavailable("Records service is rate limiting".into()),
        s if s.is_server_error() => AppError::Unavailable(format!("Records service failed with {s}")),
        s => AppError::InternalError(format!("Unexpected records service status {s}: {body}")),
    }
}

/// Rewords the generic not-found and unique-violation errors for one collection.
fn reword(not_found: &'static str, conflict: &'static str) -> impl Fn(AppError) -> AppError {
    move |err| match err {
        AppError::NotFound(_) => AppError::NotFound(not_found.into()),
        AppError::Conflict(_) => AppError::Conflict(conflict.into()),
        other => other,
    }
}

/// Quoted filter literal.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn eq(field: &str, value: &str) -> String {
    format!("{field} = {}", quote(value))
}

/// Joins clauses with `&&`; `None` when there is nothing to filter on.
fn all_of(clauses: impl IntoIterator<Item = String>) -> Option<String> {
    let clauses: Vec<String> = clauses.into_iter().map(|c| format!("({c})")).collect();
    if clauses.is_empty() { None } else { Some(clauses.join(" && ")) }
}

fn any_id(ids: &[String]) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    Some(ids.iter().map(|id| eq("id", id)).collect::<Vec<_>>().join(" || "))
}

/// `%term%` with LIKE wildcards in the term escaped. The service leaves a
/// value that already carries `%` unwrapped and matches it with `ESCAPE '\'`.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Case-insensitive substring match of the search term over `fields`.
fn search_clause(query: &PageQuery, fields: &[&str]) -> Option<String> {
    let pattern = quote(&like_pattern(query.search.as_deref()?));
    Some(
        fields
            .iter()
            .map(|field| format!("{field} ~ {pattern}"))
            .collect::<Vec<_>>()
            .join(" || "),
    )
}

/// The service's own `created` column stands in for both `id` and `created_at`.
fn sort_param(query: &PageQuery) -> String {
    let field = match query.sort.field {
        "id" | "created_at" => "created",
        other => other,
    };
    let prefix = if query.sort.direction.is_desc() { "-" } else { "" };
    format!("{prefix}{field},id")
}

/// First service page of a caller window and how many of its leading items
/// fall before the window.
fn window_start(query: &PageQuery) -> (i64, usize) {
    let offset = query.offset();
    let skip = usize::try_from(offset % MAX_PER_PAGE).unwrap_or(0);
    (offset / MAX_PER_PAGE + 1, skip)
}

fn page_params(query: &PageQuery, filter: Option<String>) -> ListParams {
    ListParams {
        page: query.page,
        per_page: query.limit,
        filter,
        sort: Some(sort_param(query)),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| AppError::InternalError(format!("Malformed timestamp {raw:?}: {e}")))
}

/// Empty strings are how the service represents unset datetime fields.
fn parse_optional_timestamp(raw: &str) -> Result<Option<DateTime<Utc>>, AppError> {
    if raw.is_empty() { Ok(None) } else { parse_timestamp(raw).map(Some) }
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| AppError::InternalError(format!("Malformed date {raw:?}: {e}")))
}

fn parse_optional_date(raw: &str) -> Result<Option<NaiveDate>, AppError> {
    if raw.is_empty() { Ok(None) } else { parse_date(raw).map(Some) }
}

fn format_date(value: NaiveDate) -> String {
    format!("{} 00:00:00.000Z", value.format("%Y-%m-%d"))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
