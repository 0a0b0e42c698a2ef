//! Pagination helpers.
//!
//! List requests carry a 1-based `page` and a `limit`; both are clamped
//! here so a single oversized request cannot pull the whole collection.

use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use org_domain::{SortKey, SortOrder};
use org_store::{Direction, Sort};

/// A normalized page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: usize,

    /// Items per page, after clamping.
    pub limit: usize,
}

impl PageRequest {
    /// Normalize raw request values against the configured bounds.
    ///
    /// Page 0 becomes page 1. A zero limit falls back to the default page
    /// size; anything above the maximum is clamped down to it.
    pub fn new(page: u32, limit: u32, config: &ServiceConfig) -> Self {
        let page = (page as usize).max(1);
        let limit = if limit == 0 {
            config.default_page_size
        } else {
            (limit as usize).min(config.max_page_size)
        };

        Self { page, limit }
    }

    /// Number of documents to skip.
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.limit
    }
}

/// Pagination block returned inside listing envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-based page that was served.
    pub current_page: usize,

    /// Total pages at this limit.
    pub total_pages: usize,

    /// Total matching documents before windowing.
    pub total_count: usize,

    /// Items per page.
    pub limit: usize,

    /// Whether a later page exists.
    pub has_next: bool,

    /// Whether an earlier page exists.
    pub has_prev: bool,
}

impl PageInfo {
    /// Compute the pagination block for a page of a `total`-sized result.
    pub fn compute(request: &PageRequest, total: usize) -> Self {
        let total_pages = total.div_ceil(request.limit.max(1));

        Self {
            current_page: request.page,
            total_pages,
            total_count: total,
            limit: request.limit,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

/// Translate a request sort into a store sort.
///
/// `org_id` is appended as a tiebreaker so equal keys page deterministically.
pub fn sort_for(key: SortKey, order: SortOrder) -> Sort {
    let direction = match order {
        SortOrder::Asc => Direction::Asc,
        SortOrder::Desc => Direction::Desc,
    };

    Sort::by(key.as_str(), direction).then("org_id", Direction::Asc)
}
