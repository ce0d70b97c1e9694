//! Per-view filter/pagination state machine.
//!
//! Any filter change resets the view to page 1. Page requests are clamped
//! to `[1, total_pages]`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::query::filter::is_all_sentinel;

use super::search::Searchable;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    search_term: String,
    enum_filters: BTreeMap<String, String>,
    page: usize,
    page_size: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// The visible slice of a filtered row set.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlice<'a, T> {
    pub rows: Vec<&'a T>,
    pub page: usize,
    pub page_size: usize,
    pub filtered_count: usize,
    pub total_pages: usize,
}

impl FilterState {
    pub fn new(page_size: usize) -> Self {
        Self {
            search_term: String::new(),
            enum_filters: BTreeMap::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.default_page_size)
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn enum_filters(&self) -> &BTreeMap<String, String> {
        &self.enum_filters
    }

    /// Enum filters that actually constrain rows (the `"all"` sentinel
    /// removed).
    pub fn active_enum_filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.enum_filters
            .iter()
            .filter(|(_, v)| !is_all_sentinel(v))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_string();
        self.page = 1;
    }

    pub fn set_enum_filter(&mut self, key: &str, value: &str) {
        self.enum_filters.insert(key.to_string(), value.to_string());
        self.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.search_term.clear();
        self.enum_filters.clear();
        self.page = 1;
    }

    /// Move to `page`, clamped to `[1, total_pages]`. An empty result set
    /// still has page 1.
    pub fn set_page(&mut self, page: usize, total_pages: usize) {
        self.page = page.clamp(1, total_pages.max(1));
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn total_pages(&self, filtered_count: usize) -> usize {
        total_pages(filtered_count, self.page_size)
    }

    pub fn has_search(&self) -> bool {
        !self.search_term.trim().is_empty()
    }

    /// Case-insensitive substring search plus case-insensitive enum
    /// equality.
    pub fn matches<T: Searchable>(&self, row: &T) -> bool {
        let term = self.search_term.trim().to_lowercase();
        if !term.is_empty()
            && !row
                .search_fields()
                .iter()
                .any(|f| f.to_lowercase().contains(&term))
        {
            return false;
        }
        self.active_enum_filters().all(|(key, expected)| {
            row.enum_field(key)
                .map(|actual| actual.trim().eq_ignore_ascii_case(expected.trim()))
                .unwrap_or(false)
        })
    }

    /// Rows matching the current filters, in input order.
    pub fn filter<'a, T: Searchable>(&self, rows: &'a [T]) -> Vec<&'a T> {
        rows.iter().filter(|row| self.matches(*row)).collect()
    }

    /// Filter, then slice out the current page.
    ///
    /// If the filtered set shrank below the current page, the last page is
    /// shown; the state itself is not modified.
    pub fn apply<'a, T: Searchable>(&self, rows: &'a [T]) -> PageSlice<'a, T> {
        let filtered = self.filter(rows);
        let filtered_count = filtered.len();
        let total_pages = self.total_pages(filtered_count);
        let page = self.page.clamp(1, total_pages.max(1));
        let start = (page - 1) * self.page_size;
        let rows = filtered
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect();
        PageSlice {
            rows,
            page,
            page_size: self.page_size,
            filtered_count,
            total_pages,
        }
    }
}

/// `ceil(count / page_size)`.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    (count + page_size - 1) / page_size
}
