use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;

/// Page/limit query parameters. Both optional: with neither set the full
/// list is returned.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct PaginationParams {
    /// 1-indexed page number.
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self { page, limit }
    }

    /// SQL OFFSET for the effective limit, so page boundaries stay stable when
    /// the requested limit is capped.
    pub fn offset(&self) -> Option<i64> {
        let limit = self.effective_limit()?;
        Some((self.effective_page() - 1) * limit)
    }

    pub fn effective_limit(&self) -> Option<i64> {
        match self.limit {
            Some(limit) => Some(limit.clamp(1, Self::MAX_LIMIT)),
            None if self.page.is_some() => Some(Self::DEFAULT_LIMIT),
            None => None,
        }
    }

    pub fn effective_page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, limit: i64, total_items: i64) -> Self {
        let total_pages = if limit > 0 { (total_items + limit - 1) / limit } else { 1 };

        Self {
            data,
            page,
            limit,
            total_items,
            total_pages,
        }
    }

    /// Wraps a query result; an unpaginated query is one page holding everything.
    pub fn from_query(data: Vec<T>, params: &PaginationParams, total_items: i64) -> Self {
        match params.effective_limit() {
            Some(limit) => Self::new(data, params.effective_page(), limit, total_items),
            None => {
                let limit = total_items.max(data.len() as i64);
                Self::new(data, 1, limit, total_items)
            }
        }
    }
}
