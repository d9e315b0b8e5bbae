//! Page-based pagination.

use serde::{Deserialize, Serialize};

/// A 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 20;

    /// Builds a page request; a missing or non-positive page or limit falls
    /// back to the default.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page
            .filter(|p| *p >= 1)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(Self::DEFAULT_PAGE);
        let limit = limit
            .filter(|l| *l >= 1)
            .and_then(|l| u32::try_from(l).ok())
            .unwrap_or(Self::DEFAULT_LIMIT);
        Self { page, limit }
    }

    /// Builds a page request from raw query values. Anything that is not
    /// an integer counts as missing.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let number = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<i64>().ok());
        Self::new(number(page), number(limit))
    }

    /// Same as [`parse`](Self::parse) with a different default limit.
    pub fn parse_with_default_limit(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: u32,
    ) -> Self {
        let mut request = Self::parse(page, None);
        request.limit = limit
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .and_then(|l| u32::try_from(l).ok())
            .unwrap_or(default_limit.max(1));
        request
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Pagination block returned with every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: u64) -> Self {
        let limit = u64::from(request.limit());
        let total_pages = total_items.div_ceil(limit);
        Self {
            current_page: request.page(),
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            total_items,
            items_per_page: request.limit(),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            pagination: Pagination::new(request, total_items),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
