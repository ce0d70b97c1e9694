//! Period-over-period trends.
//!
//! Periods are ordered by recency, latest first. The delta is
//! `latest - previous`; for cost and finding counts a negative delta is an
//! improvement.

use std::collections::BTreeMap;

use serde::Serialize;

use super::monthly::MonthlySummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Decreasing,
    Increasing,
    Flat,
}

impl TrendDirection {
    /// For lower-is-better metrics.
    pub fn is_improving(&self) -> bool {
        matches!(self, TrendDirection::Decreasing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub latest: f64,
    pub previous: f64,
    pub delta: f64,
    pub direction: TrendDirection,
}

impl Trend {
    /// Relative change in percent; `None` when the previous value is zero.
    pub fn percent_change(&self) -> Option<f64> {
        if self.previous == 0.0 {
            None
        } else {
            Some(self.delta / self.previous.abs() * 100.0)
        }
    }

    pub fn is_improving(&self) -> bool {
        self.direction.is_improving()
    }
}

pub fn trend_between(latest: f64, previous: f64) -> Trend {
    let delta = latest - previous;
    let direction = if delta < 0.0 {
        TrendDirection::Decreasing
    } else if delta > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Flat
    };
    Trend {
        latest,
        previous,
        delta,
        direction,
    }
}

/// Trend between the two most recent periods; `None` with fewer than two.
pub fn trend_for<T, F>(periods: &[T], metric: F) -> Option<Trend>
where
    F: Fn(&T) -> f64,
{
    match periods {
        [latest, previous, ..] => Some(trend_between(metric(latest), metric(previous))),
        _ => None,
    }
}

/// Net-cost trend between the last two months of a rollup.
pub fn monthly_cost_trend(months: &BTreeMap<String, MonthlySummary>) -> Option<Trend> {
    let recent: Vec<&MonthlySummary> = months.values().rev().take(2).collect();
    trend_for(&recent, |m| m.net_cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::monthly::monthly_rollup;
    use crate::query::models::DailyCost;

    struct Period {
        count: u32,
    }

    #[test]
    fn test_negative_delta_is_decreasing() {
        let periods = [Period { count: 5 }, Period { count: 8 }];
        let trend = trend_for(&periods, |p| p.count as f64).unwrap();
        assert_eq!(trend.delta, -3.0);
        assert_eq!(trend.direction, TrendDirection::Decreasing);
        assert!(trend.is_improving());
    }

    #[test]
    fn test_positive_and_flat() {
        assert_eq!(trend_between(9.0, 4.0).direction, TrendDirection::Increasing);
        assert!(!trend_between(9.0, 4.0).is_improving());
        assert_eq!(trend_between(4.0, 4.0).direction, TrendDirection::Flat);
    }

    #[test]
    fn test_needs_two_periods() {
        let one = [Period { count: 5 }];
        assert!(trend_for(&one, |p| p.count as f64).is_none());
        assert!(trend_for(&[] as &[Period], |p| p.count as f64).is_none());
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(trend_between(75.0, 100.0).percent_change(), Some(-25.0));
        assert_eq!(trend_between(5.0, 0.0).percent_change(), None);
    }

    #[test]
    fn test_monthly_cost_trend_uses_latest_months() {
        let row = |date: &str, cost: f64| DailyCost {
            aws_account_id: None,
            date: date.to_string(),
            service: "EC2".to_string(),
            cost,
            credits: 0.0,
        };
        let months = monthly_rollup(&[
            row("2024-01-03", 50.0),
            row("2024-02-03", 40.0),
            row("2024-03-03", 30.0),
        ]);
        let trend = monthly_cost_trend(&months).unwrap();
        assert_eq!((trend.latest, trend.previous), (30.0, 40.0));
        assert!(trend.is_improving());
    }
}
