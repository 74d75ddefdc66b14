use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, Order,
    PaginatorTrait, QueryFilter, QuerySelect, Select,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use utoipa::ToSchema;

/// Normalized page/limit pair for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Clamps `page` to >= 1 and `limit` to 1..=max_limit, using `default_limit` when absent.
    ///
    /// `page` is also capped so the row offset always fits a signed 64-bit bind value.
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: u64, max_limit: u64) -> Self {
        let max_limit = max_limit.max(1);
        let max_page = (i64::MAX as u64 / max_limit).max(1);
        let page = page
            .filter(|p| *p >= 1)
            .map(|p| (p as u64).min(max_page))
            .unwrap_or(1);
        let limit = limit
            .map(|l| l.clamp(1, max_limit as i64) as u64)
            .unwrap_or_else(|| default_limit.clamp(1, max_limit));
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Pagination block of every list response
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_count: u64,
    pub limit: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(request: &PageRequest, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(request.limit);
        Self {
            current_page: request.page,
            total_pages,
            total_count,
            limit: request.limit,
            has_next_page: request.page < total_pages,
            has_prev_page: request.page > 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `asc` (any case) sorts ascending; anything else, including absence, falls back to `default`.
    pub fn parse(raw: Option<&str>, default: SortDirection) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "asc" => SortDirection::Asc,
            Some(s) if s == "desc" => SortDirection::Desc,
            Some(_) => SortDirection::Desc,
            None => default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn order(&self) -> Order {
        match self {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

/// Effective sort echoed back to clients
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sorting {
    pub sort_by: String,
    pub sort_order: String,
}

impl Sorting {
    pub fn new(sort_by: impl ToString, direction: SortDirection) -> Self {
        Self {
            sort_by: sort_by.to_string(),
            sort_order: direction.as_str().to_string(),
        }
    }
}

/// Parses an allow-listed sort column, falling back to `default` for unknown names.
pub fn parse_sort_field<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|s| T::from_str(s.trim()).ok()).unwrap_or(default)
}

const LIKE_ESCAPE: char = '\\';

/// Escapes LIKE wildcards so `term` only matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// `lower(column) LIKE '%term%' ESCAPE '\'`, lowercasing the term.
///
/// Behaves the same on PostgreSQL and SQLite, unlike `ILIKE`.
pub fn contains_ci<C: ColumnTrait>(column: C, term: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column.as_column_ref())))
        .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

/// Helper for building OR-ed free text search conditions
#[derive(Default)]
pub struct SearchBuilder {
    conditions: Vec<SimpleExpr>,
}

impl SearchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a case-insensitive substring match
    pub fn add_like<C: ColumnTrait>(mut self, column: C, term: &str) -> Self {
        self.conditions.push(contains_ci(column, term));
        self
    }

    /// Build the final condition; `None` when no column was added
    pub fn build(self) -> Option<Condition> {
        if self.conditions.is_empty() {
            None
        } else {
            Some(
                self.conditions
                    .into_iter()
                    .fold(Condition::any(), |acc, cond| acc.add(cond)),
            )
        }
    }
}

/// Trimmed non-empty search term
pub fn search_term(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Runs the count and the page query for `select`.
pub async fn fetch_page<E, C>(
    select: Select<E>,
    db: &C,
    page: &PageRequest,
) -> Result<(Vec<E::Model>, u64), DbErr>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync + 'static,
    C: ConnectionTrait,
{
    let total = select.clone().count(db).await?;
    let items = select
        .offset(page.offset())
        .limit(page.limit)
        .all(db)
        .await?;
    Ok((items, total))
}

/// Counts rows of `E` grouped by the foreign key `column`, restricted to `ids`.
pub async fn count_grouped<E, C>(
    db: &C,
    column: E::Column,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, u64>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let ids: BTreeSet<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Option<i32>, i64)> = E::find()
        .select_only()
        .column(column)
        .column_as(Expr::cust("COUNT(*)"), "count")
        .filter(column.is_in(ids))
        .group_by(column)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(id, count)| id.map(|id| (id, count.max(0) as u64)))
        .collect())
}

/// Loads the rows whose `column` is in `ids` and indexes them with `key`.
pub async fn find_by_ids<E, C, F>(
    db: &C,
    column: E::Column,
    ids: impl IntoIterator<Item = i32>,
    key: F,
) -> Result<HashMap<i32, E::Model>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
    F: Fn(&E::Model) -> i32,
{
    let ids: BTreeSet<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = E::find().filter(column.is_in(ids)).all(db).await?;
    Ok(rows.into_iter().map(|row| (key(&row), row)).collect())
}
