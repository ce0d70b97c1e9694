//! Named server-side functions and their routes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::query::table::EntityTag;

/// Prefix of deployed function names: `evo-uds-v3-<stage>-<function>`.
pub const FUNCTION_NAME_PREFIX: &str = "evo-uds-v3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RemoteFunction {
    // Analysis jobs
    DetectAnomalies,
    DriftDetection,
    CostOptimization,
    RiSpAnalyzer,
    PredictIncidents,
    SecurityScan,
    ComplianceScan,
    GeneratePdfReport,

    // Cloud credentials
    SaveAwsCredentials,
    ListAwsCredentials,
    ValidateAwsCredentials,
    DeleteAwsCredentials,
    SaveAzureCredentials,
    ListAzureCredentials,
    ValidateAzureCredentials,

    // Reads served by functions
    FetchDailyCosts,
    ListSecurityScans,
    DashboardMetrics,
    ExecutiveDashboard,
    ListOrganizations,
    ListUsers,
    ValidateLicense,
}

impl RemoteFunction {
    pub const ALL: [RemoteFunction; 22] = [
        RemoteFunction::DetectAnomalies,
        RemoteFunction::DriftDetection,
        RemoteFunction::CostOptimization,
        RemoteFunction::RiSpAnalyzer,
        RemoteFunction::PredictIncidents,
        RemoteFunction::SecurityScan,
        RemoteFunction::ComplianceScan,
        RemoteFunction::GeneratePdfReport,
        RemoteFunction::SaveAwsCredentials,
        RemoteFunction::ListAwsCredentials,
        RemoteFunction::ValidateAwsCredentials,
        RemoteFunction::DeleteAwsCredentials,
        RemoteFunction::SaveAzureCredentials,
        RemoteFunction::ListAzureCredentials,
        RemoteFunction::ValidateAzureCredentials,
        RemoteFunction::FetchDailyCosts,
        RemoteFunction::ListSecurityScans,
        RemoteFunction::DashboardMetrics,
        RemoteFunction::ExecutiveDashboard,
        RemoteFunction::ListOrganizations,
        RemoteFunction::ListUsers,
        RemoteFunction::ValidateLicense,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RemoteFunction::DetectAnomalies => "detect-anomalies",
            RemoteFunction::DriftDetection => "drift-detection",
            RemoteFunction::CostOptimization => "cost-optimization",
            RemoteFunction::RiSpAnalyzer => "ri-sp-analyzer",
            RemoteFunction::PredictIncidents => "predict-incidents",
            RemoteFunction::SecurityScan => "security-scan",
            RemoteFunction::ComplianceScan => "compliance-scan",
            RemoteFunction::GeneratePdfReport => "generate-pdf-report",
            RemoteFunction::SaveAwsCredentials => "save-aws-credentials",
            RemoteFunction::ListAwsCredentials => "list-aws-credentials",
            RemoteFunction::ValidateAwsCredentials => "validate-aws-credentials",
            RemoteFunction::DeleteAwsCredentials => "delete-aws-credentials",
            RemoteFunction::SaveAzureCredentials => "save-azure-credentials",
            RemoteFunction::ListAzureCredentials => "list-azure-credentials",
            RemoteFunction::ValidateAzureCredentials => "validate-azure-credentials",
            RemoteFunction::FetchDailyCosts => "fetch-daily-costs",
            RemoteFunction::ListSecurityScans => "list-security-scans",
            RemoteFunction::DashboardMetrics => "dashboard-metrics",
            RemoteFunction::ExecutiveDashboard => "executive-dashboard",
            RemoteFunction::ListOrganizations => "list-organizations",
            RemoteFunction::ListUsers => "list-users",
            RemoteFunction::ValidateLicense => "validate-license",
        }
    }

    /// HTTP route (always `POST`) on the API gateway.
    pub fn route(&self) -> &'static str {
        match self {
            RemoteFunction::DetectAnomalies => "/api/costs/anomalies/detect",
            RemoteFunction::DriftDetection => "/api/security/drift",
            RemoteFunction::CostOptimization => "/api/costs/optimization",
            RemoteFunction::RiSpAnalyzer => "/api/costs/ri-sp",
            RemoteFunction::PredictIncidents => "/api/incidents/predict",
            RemoteFunction::SecurityScan => "/api/security/scan",
            RemoteFunction::ComplianceScan => "/api/security/compliance",
            RemoteFunction::GeneratePdfReport => "/api/reports/pdf",
            RemoteFunction::SaveAwsCredentials => "/api/aws/credentials",
            RemoteFunction::ListAwsCredentials => "/api/aws/credentials/list",
            RemoteFunction::ValidateAwsCredentials => "/api/aws/credentials/validate",
            RemoteFunction::DeleteAwsCredentials => "/api/aws/credentials/delete",
            RemoteFunction::SaveAzureCredentials => "/api/azure/credentials",
            RemoteFunction::ListAzureCredentials => "/api/azure/credentials/list",
            RemoteFunction::ValidateAzureCredentials => "/api/azure/credentials/validate",
            RemoteFunction::FetchDailyCosts => "/api/costs/daily",
            RemoteFunction::ListSecurityScans => "/api/security/scans",
            RemoteFunction::DashboardMetrics => "/api/dashboard/metrics",
            RemoteFunction::ExecutiveDashboard => "/api/dashboard/executive",
            RemoteFunction::ListOrganizations => "/api/organizations",
            RemoteFunction::ListUsers => "/api/users",
            RemoteFunction::ValidateLicense => "/api/licenses/validate",
        }
    }

    /// Every registered function needs a bearer token; the login and
    /// token-refresh flows are not part of this registry.
    pub fn requires_auth(&self) -> bool {
        true
    }

    /// Long-running analysis jobs (as opposed to CRUD-style calls).
    pub fn is_job(&self) -> bool {
        matches!(
            self,
            RemoteFunction::DetectAnomalies
                | RemoteFunction::DriftDetection
                | RemoteFunction::CostOptimization
                | RemoteFunction::RiSpAnalyzer
                | RemoteFunction::PredictIncidents
                | RemoteFunction::SecurityScan
                | RemoteFunction::ComplianceScan
                | RemoteFunction::GeneratePdfReport
        )
    }

    /// Entity types whose cached reads are stale once the call succeeds.
    pub fn affects(&self) -> BTreeSet<EntityTag> {
        let tags: &[EntityTag] = match self {
            RemoteFunction::DetectAnomalies => &[EntityTag::Anomalies],
            RemoteFunction::DriftDetection => &[EntityTag::Drift],
            RemoteFunction::CostOptimization => &[EntityTag::Recommendations],
            RemoteFunction::RiSpAnalyzer => &[EntityTag::Recommendations],
            RemoteFunction::PredictIncidents => &[EntityTag::Incidents],
            RemoteFunction::SecurityScan | RemoteFunction::ComplianceScan => {
                &[EntityTag::Scans, EntityTag::Findings]
            }
            RemoteFunction::SaveAwsCredentials
            | RemoteFunction::DeleteAwsCredentials
            | RemoteFunction::SaveAzureCredentials => &[EntityTag::Accounts],
            RemoteFunction::FetchDailyCosts => &[EntityTag::Costs],
            _ => &[],
        };
        tags.iter().copied().collect()
    }

    /// Deployed function name for a stage, e.g. `evo-uds-v3-prod-security-scan`.
    pub fn lambda_name(&self, stage: &str) -> String {
        format!("{}-{}-{}", FUNCTION_NAME_PREFIX, stage, self.name())
    }
}

impl fmt::Display for RemoteFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RemoteFunction {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        RemoteFunction::ALL
            .iter()
            .find(|f| f.name() == name)
            .copied()
            .ok_or_else(|| ApiError::validation("function", format!("unknown function '{}'", name)))
    }
}

impl Serialize for RemoteFunction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for f in RemoteFunction::ALL {
            assert_eq!(f.name().parse::<RemoteFunction>().unwrap(), f);
        }
        assert!("register".parse::<RemoteFunction>().is_err());
    }

    #[test]
    fn test_routes_are_unique_api_paths() {
        let routes: BTreeSet<&str> = RemoteFunction::ALL.iter().map(|f| f.route()).collect();
        assert_eq!(routes.len(), RemoteFunction::ALL.len());
        assert!(routes.iter().all(|r| r.starts_with("/api/")));
    }

    #[test]
    fn test_scan_affects_scans_and_findings() {
        let tags = RemoteFunction::SecurityScan.affects();
        assert!(tags.contains(&EntityTag::Scans));
        assert!(tags.contains(&EntityTag::Findings));
        assert!(RemoteFunction::ListUsers.affects().is_empty());
    }

    #[test]
    fn test_lambda_name() {
        assert_eq!(
            RemoteFunction::DetectAnomalies.lambda_name("prod"),
            "evo-uds-v3-prod-detect-anomalies"
        );
    }
}
