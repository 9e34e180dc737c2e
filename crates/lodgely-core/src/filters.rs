//! # Filters
//!
//! Paging and sorting parameters for list endpoints, and the pagination
//! metadata returned alongside a page of results.
//!
//! Sort values are matched against a safelist before they are spliced into
//! SQL, so `sort_column()` can only ever produce a known column name.

use serde::{Deserialize, Serialize};

use crate::validator::{Validator, permitted_value};

pub const MAX_PAGE: u64 = 10_000_000;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Paging/sorting request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: u64,
    pub page_size: u64,
    pub sort: String,
    pub sort_safelist: Vec<&'static str>,
}

impl Filters {
    /// Validate page bounds and the sort value.
    pub fn validate(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(
            self.page <= MAX_PAGE,
            "page",
            "must be a maximum of 10 million",
        );
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(
            self.page_size <= MAX_PAGE_SIZE,
            "page_size",
            "must be a maximum of 100",
        );
        v.check(
            permitted_value(&self.sort.as_str(), &self.sort_safelist),
            "sort",
            "invalid sort value",
        );
    }

    /// Column name to sort by. Never returns a value outside the safelist.
    #[must_use]
    pub fn sort_column(&self) -> &'static str {
        let requested = self.sort.as_str();
        let column = self
            .sort_safelist
            .iter()
            .find(|safe| **safe == requested)
            .or_else(|| self.sort_safelist.first())
            .copied()
            .unwrap_or("id");
        column.trim_start_matches('-')
    }

    /// `DESC` for a leading `-`, otherwise `ASC`.
    #[must_use]
    pub fn sort_direction(&self) -> &'static str {
        if self.sort.starts_with('-') {
            "DESC"
        } else {
            "ASC"
        }
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.page_size
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// Pagination summary. All zero when the result set is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero", default)]
    pub current_page: u64,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub page_size: u64,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub first_page: u64,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub last_page: u64,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub total_records: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl Metadata {
    #[must_use]
    pub fn calculate(total_records: u64, page: u64, page_size: u64) -> Self {
        if total_records == 0 || page_size == 0 {
            return Self::default();
        }
        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: total_records.div_ceil(page_size),
            total_records,
        }
    }
}
