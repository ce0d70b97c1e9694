//! Known resource collections and the entity tags reads depend on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Entity types used for declarative cache invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTag {
    Findings,
    Scans,
    Costs,
    Recommendations,
    Anomalies,
    Drift,
    Incidents,
    Tickets,
    Accounts,
    Notifications,
    Organizations,
}

/// A named table on the tabular endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Findings,
    SecurityScans,
    DailyCosts,
    CostRecommendations,
    RiSpRecommendations,
    CostAnomalies,
    DriftDetections,
    PredictedIncidents,
    RemediationTickets,
    AwsCredentials,
    AzureCredentials,
    NotificationSettings,
    Organizations,
}

impl Table {
    pub const ALL: [Table; 13] = [
        Table::Findings,
        Table::SecurityScans,
        Table::DailyCosts,
        Table::CostRecommendations,
        Table::RiSpRecommendations,
        Table::CostAnomalies,
        Table::DriftDetections,
        Table::PredictedIncidents,
        Table::RemediationTickets,
        Table::AwsCredentials,
        Table::AzureCredentials,
        Table::NotificationSettings,
        Table::Organizations,
    ];

    /// Look up a table by its wire name.
    pub fn from_name(name: &str) -> Result<Self, ApiError> {
        name.trim().parse()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Table::Findings => "findings",
            Table::SecurityScans => "security_scans",
            Table::DailyCosts => "daily_costs",
            Table::CostRecommendations => "cost_recommendations",
            Table::RiSpRecommendations => "ri_sp_recommendations",
            Table::CostAnomalies => "cost_anomalies",
            Table::DriftDetections => "drift_detections",
            Table::PredictedIncidents => "predicted_incidents",
            Table::RemediationTickets => "remediation_tickets",
            Table::AwsCredentials => "aws_credentials",
            Table::AzureCredentials => "azure_credentials",
            Table::NotificationSettings => "notification_settings",
            Table::Organizations => "organizations",
        }
    }

    /// Every table except the organization directory is partitioned by
    /// `organization_id`.
    pub fn is_tenant_scoped(&self) -> bool {
        !matches!(self, Table::Organizations)
    }

    /// Column holding the account partition, if the table has one.
    pub fn account_column(&self) -> Option<&'static str> {
        match self {
            Table::Findings
            | Table::SecurityScans
            | Table::DailyCosts
            | Table::CostRecommendations
            | Table::RiSpRecommendations
            | Table::CostAnomalies => Some("aws_account_id"),
            Table::DriftDetections | Table::PredictedIncidents | Table::RemediationTickets => {
                Some("cloud_account_id")
            }
            Table::AwsCredentials
            | Table::AzureCredentials
            | Table::NotificationSettings
            | Table::Organizations => None,
        }
    }

    /// Row cap applied when a request sets no explicit limit.
    ///
    /// `None` means unbounded: cost rows feed rollups and must be complete.
    pub fn default_limit(&self) -> Option<usize> {
        match self {
            Table::DailyCosts => None,
            Table::AwsCredentials | Table::AzureCredentials | Table::Organizations => None,
            Table::NotificationSettings => Some(1),
            Table::SecurityScans | Table::PredictedIncidents => Some(50),
            Table::Findings
            | Table::CostRecommendations
            | Table::RiSpRecommendations
            | Table::CostAnomalies
            | Table::DriftDetections
            | Table::RemediationTickets => Some(100),
        }
    }

    pub fn tag(&self) -> EntityTag {
        match self {
            Table::Findings => EntityTag::Findings,
            Table::SecurityScans => EntityTag::Scans,
            Table::DailyCosts => EntityTag::Costs,
            Table::CostRecommendations | Table::RiSpRecommendations => EntityTag::Recommendations,
            Table::CostAnomalies => EntityTag::Anomalies,
            Table::DriftDetections => EntityTag::Drift,
            Table::PredictedIncidents => EntityTag::Incidents,
            Table::RemediationTickets => EntityTag::Tickets,
            Table::AwsCredentials | Table::AzureCredentials => EntityTag::Accounts,
            Table::NotificationSettings => EntityTag::Notifications,
            Table::Organizations => EntityTag::Organizations,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = ApiError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| ApiError::validation("table", format!("unknown table '{}'", name)))
    }
}

impl Serialize for Table {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(table.name().parse::<Table>().unwrap(), table);
        }
    }

    #[test]
    fn test_unknown_table() {
        let err = Table::from_name("users_secret").unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(Table::from_name(" findings ").unwrap(), Table::Findings);
    }

    #[test]
    fn test_scoping() {
        assert!(Table::Findings.is_tenant_scoped());
        assert!(!Table::Organizations.is_tenant_scoped());
        assert_eq!(Table::DriftDetections.account_column(), Some("cloud_account_id"));
        assert_eq!(Table::DailyCosts.default_limit(), None);
        assert_eq!(Table::Findings.default_limit(), Some(100));
    }
}
