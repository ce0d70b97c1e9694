//! Python bindings for report tooling.
//!
//! Every function takes and returns JSON strings so callers need no
//! knowledge of the Rust types.

use std::collections::BTreeMap;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use serde_json::{json, Value};

use crate::aggregation::{self, SeverityCounts};
use crate::error::ApiError;
use crate::export::{self, CsvColumn};
use crate::init_logger;
use crate::pagination::FilterState;
use crate::query::models::{DailyCost, Recommendation};

fn to_py_err(e: ApiError) -> PyErr {
    PyValueError::new_err(e.user_message())
}

fn parse<T: serde::de::DeserializeOwned>(field: &str, json: &str) -> PyResult<T> {
    serde_json::from_str(json).map_err(|e| to_py_err(ApiError::validation(field, e.to_string())))
}

fn render<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| to_py_err(ApiError::from(e)))
}

/// Roll daily cost rows up by month (or by account and month).
#[pyfunction]
#[pyo3(signature = (rows, by_account=false))]
fn monthly_rollup(rows: String, by_account: bool) -> PyResult<String> {
    init_logger();
    let rows: Vec<DailyCost> = parse("rows", &rows)?;
    let summary = if by_account {
        aggregation::monthly_rollup_by_account(&rows)
    } else {
        aggregation::monthly_rollup(&rows)
    };
    render(&summary)
}

/// Keep the highest-savings recommendation per (type, service).
#[pyfunction]
fn dedupe_recommendations(recommendations: String) -> PyResult<String> {
    init_logger();
    let recs: Vec<Recommendation> = parse("recommendations", &recommendations)?;
    render(&aggregation::dedupe_recommendations(&recs))
}

#[pyfunction]
#[pyo3(signature = (critical=0, high=0, medium=0, low=0))]
fn security_score(critical: u64, high: u64, medium: u64, low: u64) -> u32 {
    aggregation::security_score(&SeverityCounts::new(critical, high, medium, low))
}

/// Export rows as CSV. `columns` is a list of (header, field path) pairs;
/// without it every top-level key becomes a column.
#[pyfunction]
#[pyo3(signature = (rows, columns=None))]
fn export_csv(rows: String, columns: Option<Vec<(String, String)>>) -> PyResult<String> {
    init_logger();
    let rows: Vec<Value> = parse("rows", &rows)?;
    let columns = match columns {
        Some(cols) => cols
            .iter()
            .map(|(header, field)| CsvColumn::new(header, field))
            .collect(),
        None => export::infer_columns(&rows),
    };
    export::export_csv(&columns, &rows).map_err(to_py_err)
}

/// Filter and slice a JSON array the way a client-paginated view does.
#[pyfunction]
#[pyo3(signature = (rows, page=1, page_size=10, search_term=None, enum_filters=None))]
fn paginate(
    rows: String,
    page: usize,
    page_size: usize,
    search_term: Option<String>,
    enum_filters: Option<String>,
) -> PyResult<String> {
    let rows: Vec<Value> = parse("rows", &rows)?;
    let mut state = FilterState::new(page_size);
    if let Some(term) = search_term {
        state.set_search_term(&term);
    }
    if let Some(filters) = enum_filters {
        let filters: BTreeMap<String, String> = parse("enum_filters", &filters)?;
        for (key, value) in &filters {
            state.set_enum_filter(key, value);
        }
    }
    let total = state.total_pages(state.filter(&rows).len());
    state.set_page(page, total);

    let slice = state.apply(&rows);
    render(&json!({
        "rows": slice.rows,
        "page": slice.page,
        "pageSize": slice.page_size,
        "totalCount": slice.filtered_count,
        "totalPages": slice.total_pages,
    }))
}

/// Python module definition
#[pymodule]
fn evo_uds_core(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(monthly_rollup, m)?)?;
    m.add_function(wrap_pyfunction!(dedupe_recommendations, m)?)?;
    m.add_function(wrap_pyfunction!(security_score, m)?)?;
    m.add_function(wrap_pyfunction!(export_csv, m)?)?;
    m.add_function(wrap_pyfunction!(paginate, m)?)?;
    Ok(())
}
