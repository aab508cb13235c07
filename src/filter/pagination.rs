use serde::Serialize;

use super::params::RequestParams;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total_count: i64,
    pub current_page: i64,
    pub per_page: i64,
    pub total_pages: i64,
    pub from: i64,
    pub to: i64,
}

impl Pagination {
    /// `limit` is clamped to `[1, max_limit]`. When `page` is present the offset is
    /// derived from it using the clamped limit; otherwise `offset` is read directly.
    pub fn from_params(params: &RequestParams, default_limit: i64, max_limit: i64) -> Self {
        let max_limit = max_limit.max(1);
        let limit = params.int("limit").unwrap_or(default_limit).clamp(1, max_limit);

        let offset = if params.contains("page") {
            let page = params.int("page").unwrap_or(1).max(1);
            (page - 1).saturating_mul(limit)
        } else {
            params.int("offset").unwrap_or(0)
        };

        Self { limit, offset: offset.max(0) }
    }

    pub fn meta(&self, total_count: i64) -> PageMeta {
        PageMeta {
            total_count,
            current_page: (self.offset / self.limit).saturating_add(1),
            per_page: self.limit,
            total_pages: total_count.saturating_add(self.limit - 1) / self.limit,
            from: self.offset.saturating_add(1),
            to: self.offset.saturating_add(self.limit).min(total_count),
        }
    }
}
