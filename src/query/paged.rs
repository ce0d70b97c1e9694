//! One paging interface over client-side slicing and server-side windows.
//!
//! Server mode issues a count query plus a `limit/offset` page query and
//! pushes enum filters down as equality predicates on the lowercase wire
//! value. Client mode fetches the whole filtered set once, past the table's
//! default limit, and applies search, enum filters and the page window
//! locally. Views with free-text search must use client mode.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::pagination::search::Searchable;
use crate::pagination::state::{total_pages, FilterState};

use super::client::{decode_rows, TabularBackend};
use super::request::QueryRequest;
use super::service::DataService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    Client,
    #[default]
    Server,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone)]
pub struct PagedQuery {
    request: QueryRequest,
    mode: PaginationMode,
}

impl PagedQuery {
    pub fn new(request: QueryRequest, mode: PaginationMode) -> Self {
        Self { request, mode }
    }

    pub fn server(request: QueryRequest) -> Self {
        Self::new(request, PaginationMode::Server)
    }

    pub fn client(request: QueryRequest) -> Self {
        Self::new(request, PaginationMode::Client)
    }

    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    /// Fetch the page `state` points at.
    ///
    /// The returned page number is clamped to the available pages; the
    /// caller may feed it back with `FilterState::set_page`.
    pub async fn fetch<T, B>(&self, service: &DataService<B>, state: &FilterState) -> Result<Page<T>>
    where
        T: DeserializeOwned + Searchable,
        B: TabularBackend,
    {
        match self.mode {
            PaginationMode::Server => self.fetch_server(service, state).await,
            PaginationMode::Client => self.fetch_client(service, state).await,
        }
    }

    async fn fetch_server<T, B>(&self, service: &DataService<B>, state: &FilterState) -> Result<Page<T>>
    where
        T: DeserializeOwned,
        B: TabularBackend,
    {
        if state.has_search() {
            return Err(ApiError::validation(
                "search",
                "free-text search requires client-side pagination",
            ));
        }

        let mut request = self.request.clone();
        // Stored enum values are lowercase wire names.
        for (key, value) in state.active_enum_filters() {
            request = request.eq(key, value.trim().to_lowercase())?;
        }

        let total_count = service.count(&request).await?;
        let total_pages = total_pages(total_count, state.page_size());
        let page = state.page().clamp(1, total_pages.max(1));

        let rows = if total_count == 0 {
            Vec::new()
        } else {
            service.fetch(&request.page(page, state.page_size())).await?
        };

        Ok(Page {
            rows,
            page,
            page_size: state.page_size(),
            total_count,
            total_pages,
        })
    }

    async fn fetch_client<T, B>(&self, service: &DataService<B>, state: &FilterState) -> Result<Page<T>>
    where
        T: DeserializeOwned + Searchable,
        B: TabularBackend,
    {
        let rows = service.fetch_rows(&self.request.without_window()).await?;
        let records: Vec<T> = decode_rows(rows.as_ref().clone())?;
        let filtered: Vec<T> = records.into_iter().filter(|r| state.matches(r)).collect();

        let total_count = filtered.len();
        let total_pages = total_pages(total_count, state.page_size());
        let page = state.page().clamp(1, total_pages.max(1));
        let rows = filtered
            .into_iter()
            .skip((page - 1) * state.page_size())
            .take(state.page_size())
            .collect();

        Ok(Page {
            rows,
            page,
            page_size: state.page_size(),
            total_count,
            total_pages,
        })
    }
}
