//! Error taxonomy for query, invoke and validation failures.
//!
//! Every fallible operation in the crate returns [`Result`]. The wire
//! protocol still speaks `{data, error}` envelopes; [`ApiError::from_envelope`]
//! is the single place where that pair becomes a sum type.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors surfaced to callers of the query client and function invoker.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Network failure or timeout before a response was received.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Missing or insufficient permissions.
    #[error("Authorization error ({service}): {message}")]
    Authorization {
        service: String,
        message: String,
        missing_permissions: Vec<String>,
    },

    /// The remote side ran but reported a business failure.
    #[error("{0}")]
    Domain(String),

    /// Input rejected locally, before any network call.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Payload did not match the expected row shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Output (CSV, report body) could not be produced.
    #[error("Encode error: {0}")]
    Encode(String),

    /// A guarded save was superseded while it was in flight.
    #[error("Operation superseded: {0}")]
    Stale(String),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn authorization(service: &str, missing_permissions: Vec<String>) -> Self {
        let message = if missing_permissions.is_empty() {
            "insufficient permissions".to_string()
        } else {
            format!("missing permissions: {}", missing_permissions.join(", "))
        };
        ApiError::Authorization {
            service: service.to_string(),
            message,
            missing_permissions,
        }
    }

    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "transport",
            ApiError::Authorization { .. } => "authorization",
            ApiError::Domain(_) => "domain",
            ApiError::Validation { .. } => "validation",
            ApiError::Decode(_) => "decode",
            ApiError::Encode(_) => "encode",
            ApiError::Stale(_) => "stale",
        }
    }

    /// Only transport failures are worth re-triggering unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// Text for the user-visible notification.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Authorization {
                service,
                missing_permissions,
                ..
            } if !missing_permissions.is_empty() => format!(
                "{} requires additional permissions: {}",
                service,
                missing_permissions.join(", ")
            ),
            ApiError::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Convert a wire `{data, error}` envelope into a `Result`.
    ///
    /// A non-null `error` wins over `data`. A missing or null `data` is an
    /// empty list, never an error.
    pub fn from_envelope(envelope: Value) -> Result<Value> {
        let mut envelope = match envelope {
            Value::Object(map) => map,
            other => return Ok(other),
        };

        match envelope.remove("error") {
            None | Some(Value::Null) => {}
            Some(err) => return Err(ApiError::from_error_value(err)),
        }

        Ok(match envelope.remove("data") {
            None | Some(Value::Null) => Value::Array(Vec::new()),
            Some(data) => data,
        })
    }

    /// Classify an `error` payload returned by the backend.
    pub fn from_error_value(err: Value) -> Self {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct WireError {
            #[serde(default)]
            kind: Option<String>,
            #[serde(default, alias = "error")]
            message: Option<String>,
            #[serde(default)]
            service: Option<String>,
            #[serde(default)]
            missing_permissions: Vec<String>,
        }

        match err {
            Value::String(message) => ApiError::Domain(message),
            Value::Object(_) => match serde_json::from_value::<WireError>(err.clone()) {
                Ok(wire) => {
                    let is_auth = wire.kind.as_deref() == Some("authorization")
                        || !wire.missing_permissions.is_empty();
                    if is_auth {
                        let mut e = ApiError::authorization(
                            wire.service.as_deref().unwrap_or("unknown"),
                            wire.missing_permissions,
                        );
                        if let (ApiError::Authorization { message, .. }, Some(m)) =
                            (&mut e, wire.message)
                        {
                            *message = m;
                        }
                        e
                    } else {
                        ApiError::Domain(wire.message.unwrap_or_else(|| err.to_string()))
                    }
                }
                Err(_) => ApiError::Domain(err.to_string()),
            },
            other => ApiError::Domain(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}
