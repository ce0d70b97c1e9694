//! Credential and onboarding field checks.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, Result};

/// Length limits for an STS external id.
pub const EXTERNAL_ID_MIN_LEN: usize = 2;
pub const EXTERNAL_ID_MAX_LEN: usize = 1224;

lazy_static! {
    /// `arn:<partition>:iam::<account>:role/<optional path>/<name>`
    static ref ROLE_ARN_PATTERN: Regex = Regex::new(
        r"^arn:aws(-cn|-us-gov)?:iam::(\d{12}):role/([\w+=,.@-]+/)*[\w+=,.@-]{1,64}$"
    ).unwrap();

    static ref ACCOUNT_ID_PATTERN: Regex = Regex::new(r"^\d{12}$").unwrap();

    static ref EXTERNAL_ID_PATTERN: Regex = Regex::new(r"^[\w+=,.@:/-]+$").unwrap();

    /// Azure tenant/subscription/client ids are GUIDs.
    static ref GUID_PATTERN: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    ).unwrap();
}

/// Reject empty or whitespace-only values.
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(field, format!("{} is required", field)));
    }
    Ok(())
}

pub fn validate_aws_account_id(account_id: &str) -> Result<()> {
    require_non_empty("aws_account_id", account_id)?;
    if !ACCOUNT_ID_PATTERN.is_match(account_id.trim()) {
        return Err(ApiError::validation(
            "aws_account_id",
            "AWS account id must be exactly 12 digits",
        ));
    }
    Ok(())
}

/// Validate an IAM role ARN and return the account id embedded in it.
pub fn validate_role_arn(arn: &str) -> Result<String> {
    require_non_empty("role_arn", arn)?;
    let arn = arn.trim();
    match ROLE_ARN_PATTERN.captures(arn) {
        Some(caps) => Ok(caps[2].to_string()),
        None => {
            log::debug!("VALIDATION_FAILED field=role_arn value={}", arn);
            Err(ApiError::validation(
                "role_arn",
                "role ARN must look like arn:aws:iam::123456789012:role/RoleName",
            ))
        }
    }
}

/// Validate a role ARN and check it belongs to `account_id`.
pub fn validate_role_for_account(arn: &str, account_id: &str) -> Result<()> {
    validate_aws_account_id(account_id)?;
    let arn_account = validate_role_arn(arn)?;
    if arn_account != account_id.trim() {
        return Err(ApiError::validation(
            "role_arn",
            format!("role ARN belongs to account {}, expected {}", arn_account, account_id.trim()),
        ));
    }
    Ok(())
}

pub fn validate_external_id(external_id: &str) -> Result<()> {
    let len = external_id.chars().count();
    if !(EXTERNAL_ID_MIN_LEN..=EXTERNAL_ID_MAX_LEN).contains(&len) {
        return Err(ApiError::validation(
            "external_id",
            format!(
                "external id must be {}-{} characters",
                EXTERNAL_ID_MIN_LEN, EXTERNAL_ID_MAX_LEN
            ),
        ));
    }
    if !EXTERNAL_ID_PATTERN.is_match(external_id) {
        return Err(ApiError::validation(
            "external_id",
            "external id may only contain letters, digits and +=,.@:/-",
        ));
    }
    Ok(())
}

/// Validate an Azure tenant, subscription or client id.
pub fn validate_azure_guid(field: &str, value: &str) -> Result<()> {
    require_non_empty(field, value)?;
    if !GUID_PATTERN.is_match(value.trim()) {
        return Err(ApiError::validation(field, format!("{} must be a GUID", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_arn() {
        assert_eq!(
            validate_role_arn("arn:aws:iam::123456789012:role/EvoReadOnly").unwrap(),
            "123456789012"
        );
        assert!(validate_role_arn("arn:aws:iam::123456789012:role/path/to/EvoRole").is_ok());
        assert!(validate_role_arn("arn:aws-us-gov:iam::123456789012:role/Evo").is_ok());
        assert!(validate_role_arn("arn:aws:iam::12345:role/Evo").is_err());
        assert!(validate_role_arn("arn:aws:iam::123456789012:user/alice").is_err());
        assert!(validate_role_arn("").is_err());
    }

    #[test]
    fn test_role_for_account() {
        let arn = "arn:aws:iam::123456789012:role/Evo";
        assert!(validate_role_for_account(arn, "123456789012").is_ok());
        let err = validate_role_for_account(arn, "210987654321").unwrap_err();
        assert!(err.to_string().contains("expected 210987654321"));
    }

    #[test]
    fn test_account_id() {
        assert!(validate_aws_account_id("123456789012").is_ok());
        assert!(validate_aws_account_id("12345678901a").is_err());
        assert!(validate_aws_account_id("1234567890123").is_err());
    }

    #[test]
    fn test_external_id() {
        assert!(validate_external_id("evo-2f1c9a7e4b").is_ok());
        assert!(validate_external_id("a").is_err());
        assert!(validate_external_id("has space").is_err());
        assert!(validate_external_id(&"x".repeat(EXTERNAL_ID_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn test_azure_guid() {
        assert!(validate_azure_guid("tenant_id", "3f2504e0-4f89-11d3-9a0c-0305e82c3301").is_ok());
        assert!(validate_azure_guid("tenant_id", "not-a-guid").is_err());
    }

    #[test]
    fn test_require_non_empty() {
        let err = require_non_empty("title", " ").unwrap_err();
        assert_eq!(err.user_message(), "title is required");
    }
}
