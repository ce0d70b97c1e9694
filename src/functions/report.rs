//! Partial-success scan responses.
//!
//! A scan that could not run some checks for lack of IAM permissions still
//! succeeds; the failed checks arrive in an embedded `permissionErrors`
//! list next to the results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionIssue {
    #[serde(default)]
    pub check: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub missing_permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub results: Value,
    pub permission_errors: Vec<PermissionIssue>,
}

impl ScanReport {
    /// Split a job payload into results and permission issues.
    ///
    /// A payload without `permissionErrors` is a clean run; malformed issue
    /// entries are dropped rather than failing the whole report.
    pub fn from_payload(mut payload: Value) -> Self {
        let issues = match payload.as_object_mut() {
            Some(map) => map
                .remove("permissionErrors")
                .or_else(|| map.remove("permission_errors")),
            None => None,
        };

        let permission_errors = match issues {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<PermissionIssue>(item) {
                    Ok(issue) => Some(issue),
                    Err(e) => {
                        log::warn!("PERMISSION_ISSUE_MALFORMED error={}", e);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        let results = match payload {
            Value::Object(mut map) if map.contains_key("results") => {
                map.remove("results").unwrap_or(Value::Null)
            }
            other => other,
        };

        Self {
            results,
            permission_errors,
        }
    }

    pub fn has_permission_errors(&self) -> bool {
        !self.permission_errors.is_empty()
    }

    /// Every missing permission across all failed checks, deduplicated.
    pub fn missing_permissions(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .permission_errors
            .iter()
            .flat_map(|issue| issue.missing_permissions.iter().cloned())
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_success() {
        let report = ScanReport::from_payload(json!({
            "results": {"findings": 12},
            "permissionErrors": [
                {"check": "s3-public-access", "service": "s3", "missingPermissions": ["s3:GetBucketPolicy"]},
                {"check": "iam-mfa", "service": "iam", "missingPermissions": ["iam:ListMFADevices", "s3:GetBucketPolicy"]}
            ]
        }));
        assert!(report.has_permission_errors());
        assert_eq!(report.results["findings"], 12);
        assert_eq!(
            report.missing_permissions(),
            vec!["iam:ListMFADevices".to_string(), "s3:GetBucketPolicy".to_string()]
        );
    }

    #[test]
    fn test_clean_run_keeps_payload() {
        let report = ScanReport::from_payload(json!({"score": 91}));
        assert!(!report.has_permission_errors());
        assert_eq!(report.results, json!({"score": 91}));
    }

    #[test]
    fn test_malformed_issue_dropped() {
        let report = ScanReport::from_payload(json!({
            "results": [],
            "permissionErrors": [42, {"check": "ec2", "service": "ec2"}]
        }));
        assert_eq!(report.permission_errors.len(), 1);
    }
}
