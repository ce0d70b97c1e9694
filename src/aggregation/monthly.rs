//! Monthly cost rollups.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate};
use serde::Serialize;

use crate::query::models::DailyCost;

/// Account key for rows without an account column.
pub const UNASSIGNED_ACCOUNT: &str = "unassigned";

/// Costs accumulated over one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    /// `YYYY-MM`
    pub month: String,
    pub account_id: Option<String>,
    pub total_cost: f64,
    pub credits: f64,
    pub net_cost: f64,
    /// Number of contributing rows.
    pub days: u32,
    pub service_breakdown: BTreeMap<String, f64>,
}

impl MonthlySummary {
    fn new(month: String, account_id: Option<String>) -> Self {
        Self {
            month,
            account_id,
            total_cost: 0.0,
            credits: 0.0,
            net_cost: 0.0,
            days: 0,
            service_breakdown: BTreeMap::new(),
        }
    }

    fn add(&mut self, row: &DailyCost) {
        self.total_cost += row.cost;
        self.credits += row.credits;
        self.net_cost = self.total_cost - self.credits;
        self.days += 1;
        *self.service_breakdown.entry(row.service.clone()).or_insert(0.0) += row.cost;
    }

    /// Services by cost, most expensive first.
    pub fn top_services(&self, n: usize) -> Vec<(&str, f64)> {
        let mut services: Vec<(&str, f64)> = self
            .service_breakdown
            .iter()
            .map(|(name, cost)| (name.as_str(), *cost))
            .collect();
        services.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        services.truncate(n);
        services
    }
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp into its `YYYY-MM` key.
pub fn month_key(date: &str) -> Option<String> {
    let date = date.trim();
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(date).ok().map(|dt| dt.date_naive()))?;
    Some(day.format("%Y-%m").to_string())
}

/// Group rows by month.
///
/// Rows with an unparseable date are skipped.
pub fn monthly_rollup(rows: &[DailyCost]) -> BTreeMap<String, MonthlySummary> {
    let mut months: BTreeMap<String, MonthlySummary> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in rows {
        let Some(month) = month_key(&row.date) else {
            skipped += 1;
            continue;
        };
        months
            .entry(month.clone())
            .or_insert_with(|| MonthlySummary::new(month, None))
            .add(row);
    }
    if skipped > 0 {
        log::warn!("ROLLUP_SKIPPED_ROWS reason=unparseable_date count={}", skipped);
    }
    months
}

/// Group rows by account and month, keyed `<account>_<YYYY-MM>`.
pub fn monthly_rollup_by_account(rows: &[DailyCost]) -> BTreeMap<String, MonthlySummary> {
    let mut buckets: BTreeMap<String, MonthlySummary> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in rows {
        let Some(month) = month_key(&row.date) else {
            skipped += 1;
            continue;
        };
        let account = row
            .aws_account_id
            .clone()
            .unwrap_or_else(|| UNASSIGNED_ACCOUNT.to_string());
        let key = format!("{}_{}", account, month);
        buckets
            .entry(key)
            .or_insert_with(|| MonthlySummary::new(month, Some(account)))
            .add(row);
    }
    if skipped > 0 {
        log::warn!("ROLLUP_SKIPPED_ROWS reason=unparseable_date count={}", skipped);
    }
    buckets
}

/// Total cost per service over all rows, most expensive first.
pub fn service_totals(rows: &[DailyCost]) -> Vec<(String, f64)> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for row in rows {
        *totals.entry(row.service.as_str()).or_insert(0.0) += row.cost;
    }
    let mut totals: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(service, cost)| (service.to_string(), cost))
        .collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals
}
