//! Domain rows returned by the tabular endpoint.
//!
//! Every row carries `organization_id`. Account columns are optional
//! because "all accounts" views return rows from several accounts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ApiError;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ApiError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lowered = s.trim().to_lowercase();
                match lowered.as_str() {
                    $($text $(| $alias)* => Ok($name::$variant),)+
                    _ => Err(ApiError::validation(
                        stringify!($name),
                        format!("unknown value '{}'", s),
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_enum! {
    /// Ordinal severity; variants are declared lowest first so `Ord` matches
    /// urgency.
    Severity {
        Info => "info" | "informational",
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

string_enum! {
    /// Lifecycle of a finding, anomaly, drift or recommendation.
    FindingStatus {
        Open => "open" | "new" | "active" | "pending",
        InProgress => "in_progress" | "in-progress" | "investigating",
        Resolved => "resolved" | "fixed" | "implemented" | "closed",
        Dismissed => "dismissed" | "ignored" | "suppressed",
    }
}

string_enum! {
    /// Lifecycle of a server-side scan job.
    ScanStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

string_enum! {
    TicketPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent" | "critical",
    }
}

string_enum! {
    TicketStatus {
        Open => "open",
        InProgress => "in_progress" | "in-progress",
        Resolved => "resolved",
        Closed => "closed",
    }
}

impl ScanStatus {
    /// Rows in these states keep the poller alive.
    pub fn is_active(&self) -> bool {
        matches!(self, ScanStatus::Pending | ScanStatus::Running)
    }
}

impl FindingStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, FindingStatus::Open | FindingStatus::InProgress)
    }
}

/// A detected security issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub organization_id: String,
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub severity: Severity,
    pub status: FindingStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A cost optimization or RI/Savings Plan recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub organization_id: String,
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(rename = "type", alias = "recommendation_type")]
    pub recommendation_type: String,
    #[serde(alias = "service_name")]
    pub service: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "potential_savings")]
    pub monthly_savings: f64,
    #[serde(default = "default_open")]
    pub status: FindingStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A predicted incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub organization_id: String,
    #[serde(default)]
    pub cloud_account_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub probability: f64,
    #[serde(default = "default_open")]
    pub status: FindingStatus,
    #[serde(default)]
    pub predicted_at: Option<DateTime<Utc>>,
}

/// A configuration drift between declared and live resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftRecord {
    pub id: String,
    pub organization_id: String,
    #[serde(default)]
    pub cloud_account_id: Option<String>,
    pub resource_id: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub drift_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub severity: Severity,
    #[serde(default = "default_open")]
    pub status: FindingStatus,
    #[serde(default)]
    pub detected_at: Option<DateTime<Utc>>,
}

/// A remediation ticket, optionally linked to a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    #[serde(default)]
    pub finding_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One service's cost for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCost {
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(alias = "cost_date")]
    pub date: String,
    #[serde(alias = "service_name")]
    pub service: String,
    #[serde(alias = "total_cost")]
    pub cost: f64,
    #[serde(default)]
    pub credits: f64,
}

/// A security scan run and its finding counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScan {
    pub id: String,
    pub organization_id: String,
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(default)]
    pub scan_type: Option<String>,
    pub status: ScanStatus,
    #[serde(default)]
    pub findings_count: u64,
    #[serde(default)]
    pub critical_count: u64,
    #[serde(default)]
    pub high_count: u64,
    #[serde(default)]
    pub medium_count: u64,
    #[serde(default)]
    pub low_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

fn default_open() -> FindingStatus {
    FindingStatus::Open
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_severity_ordinal() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low > Severity::Info);
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_finding_decodes() {
        let finding: Finding = serde_json::from_value(json!({
            "id": "f-1",
            "organization_id": "org-1",
            "aws_account_id": "123456789012",
            "resource_id": "sg-123",
            "service": "EC2",
            "description": "Security group open to the world",
            "severity": "High",
            "status": "open",
            "created_at": "2024-01-05T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(finding.severity, Severity::High);
        assert!(finding.status.is_open());
        assert!(finding.created_at.is_some());
    }

    #[test]
    fn test_recommendation_type_field() {
        let rec: Recommendation = serde_json::from_value(json!({
            "id": "r-1",
            "organization_id": "org-1",
            "type": "rightsizing",
            "service_name": "EC2",
            "monthly_savings": 12.5
        }))
        .unwrap();
        assert_eq!(rec.recommendation_type, "rightsizing");
        assert_eq!(rec.service, "EC2");
        assert_eq!(rec.status, FindingStatus::Open);

        let back = serde_json::to_value(&rec).unwrap();
        assert_eq!(back["type"], "rightsizing");
    }

    #[test]
    fn test_scan_status_active() {
        assert!(ScanStatus::Running.is_active());
        assert!(ScanStatus::Pending.is_active());
        assert!(!ScanStatus::Failed.is_active());
        assert_eq!(
            serde_json::to_value(ScanStatus::Completed).unwrap(),
            json!("completed")
        );
    }
}
