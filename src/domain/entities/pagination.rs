use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const DEFAULT_SORT_FIELD: &str = "id";

/// Raw listing parameters as they arrive on the query string.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PaginationRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Lenient parse: anything that is not `desc` sorts ascending.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "desc" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn is_desc(&self) -> bool {
        matches!(self, SortDirection::Desc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    /// Always one of the entity's whitelisted column names.
    pub field: &'static str,
    pub direction: SortDirection,
}

/// Normalized listing parameters handed to the persistence adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub sort: SortSpec,
}

impl PageQuery {
    /// Saturates instead of overflowing, so an absurd page is simply empty.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Lowercased search term, if any.
    pub fn needle(&self) -> Option<String> {
        self.search.as_ref().map(|s| s.to_lowercase())
    }
}

impl PaginationRequest {
    pub fn normalize(&self, sortable: &[&'static str]) -> PageQuery {
        let page = match self.page {
            Some(p) if p >= 1 => p,
            _ => DEFAULT_PAGE,
        };
        let limit = match self.limit {
            Some(l) if l >= 1 => l,
            _ => DEFAULT_LIMIT,
        };

        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let requested = self
            .sort_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SORT_FIELD);

        let sort = match sortable.iter().copied().find(|f| f.eq_ignore_ascii_case(requested)) {
            Some(field) => SortSpec {
                field,
                direction: SortDirection::parse_lenient(self.sort_order.as_deref()),
            },
            None => {
                tracing::debug!(requested, "unknown sort field, falling back to id ascending");
                SortSpec { field: DEFAULT_SORT_FIELD, direction: SortDirection::Asc }
            }
        };

        PageQuery { page, limit, search, sort }
    }
}

/// A window of records plus the size of the whole filtered set.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct PaginationResponse<T> {
    pub data: Vec<T>,
    pub current_page: i64,
    pub per_page: i64,
    pub total_data: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page: Option<i64>,
    pub previous_page: Option<i64>,
}

impl<T> PaginationResponse<T> {
    pub fn new(page: Page<T>, query: &PageQuery) -> Self {
        let total_pages = if page.total <= 0 {
            0
        } else {
            page.total / query.limit + i64::from(page.total % query.limit != 0)
        };
        let has_next = query.page < total_pages;
        let has_previous = query.page > 1;

        PaginationResponse {
            data: page.items,
            current_page: query.page,
            per_page: query.limit,
            total_data: page.total,
            total_pages,
            has_next,
            has_previous,
            next_page: has_next.then(|| query.page + 1),
            previous_page: has_previous.then(|| query.page - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["id", "nama", "created_at"];

    #[test]
    fn defaults_apply_to_empty_request() {
        let q = PaginationRequest::default().normalize(FIELDS);
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 10);
        assert_eq!(q.offset(), 0);
        assert_eq!(q.sort, SortSpec { field: "id", direction: SortDirection::Asc });
        assert!(q.search.is_none());
    }

    #[test]
    fn out_of_range_values_are_corrected() {
        let q = PaginationRequest { page: Some(0), limit: Some(-5), ..Default::default() }.normalize(FIELDS);
        assert_eq!((q.page, q.limit), (1, 10));

        let q = PaginationRequest { page: Some(3), limit: Some(5_000), ..Default::default() }.normalize(FIELDS);
        assert_eq!((q.page, q.limit), (3, 5_000));
        assert_eq!(q.offset(), 10_000);
    }

    #[test]
    fn huge_page_saturates_offset() {
        let q = PaginationRequest { page: Some(i64::MAX), limit: Some(10), ..Default::default() }.normalize(FIELDS);
        assert_eq!(q.page, i64::MAX);
        assert_eq!(q.offset(), i64::MAX);

        let resp = PaginationResponse::<i32>::new(Page { items: vec![], total: 5 }, &q);
        assert_eq!(resp.total_pages, 1);
        assert!(!resp.has_next);
        assert_eq!(resp.next_page, None);
    }

    #[test]
    fn huge_limit_keeps_page_maths_exact() {
        let q = PaginationRequest { limit: Some(i64::MAX), ..Default::default() }.normalize(FIELDS);
        let resp = PaginationResponse::new(Page { items: vec![1, 2, 3], total: 3 }, &q);
        assert_eq!(resp.per_page, i64::MAX);
        assert_eq!(resp.total_pages, 1);
    }

    #[test]
    fn unknown_sort_field_falls_back_to_id_ascending() {
        let q = PaginationRequest {
            sort_by: Some("password_hash; --".into()),
            sort_order: Some("DESC".into()),
            ..Default::default()
        }
        .normalize(FIELDS);
        assert_eq!(q.sort, SortSpec { field: "id", direction: SortDirection::Asc });
    }

    #[test]
    fn known_sort_field_keeps_direction() {
        let q = PaginationRequest {
            sort_by: Some("NAMA".into()),
            sort_order: Some("desc".into()),
            ..Default::default()
        }
        .normalize(FIELDS);
        assert_eq!(q.sort, SortSpec { field: "nama", direction: SortDirection::Desc });
    }

    #[test]
    fn blank_search_is_no_filter() {
        let q = PaginationRequest { search: Some("   ".into()), ..Default::default() }.normalize(FIELDS);
        assert!(q.search.is_none());
    }

    #[test]
    fn page_metadata() {
        let q = PaginationRequest { page: Some(2), limit: Some(4), ..Default::default() }.normalize(FIELDS);
        let resp = PaginationResponse::new(Page { items: vec![1, 2, 3, 4], total: 10 }, &q);
        assert_eq!(resp.total_pages, 3);
        assert!(resp.has_next && resp.has_previous);
        assert_eq!(resp.next_page, Some(3));
        assert_eq!(resp.previous_page, Some(1));

        let empty = PaginationResponse::<i32>::new(Page { items: vec![], total: 0 }, &q);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }
}
