//! Structured logging utilities.
//!
//! Provides context-aware logging with org, account and request id included
//! in every log message.

use std::fmt;

/// Logging context for one scoped request.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub org: String,
    pub account: Option<String>,
    pub request_id: Option<String>,
}

impl LogContext {
    pub fn new(org: &str) -> Self {
        Self {
            org: org.to_string(),
            account: None,
            request_id: None,
        }
    }

    pub fn with_account(&self, account: Option<&str>) -> Self {
        Self {
            account: account.map(|a| a.to_string()),
            ..self.clone()
        }
    }

    pub fn with_request(&self, request_id: &str) -> Self {
        Self {
            request_id: Some(request_id.to_string()),
            ..self.clone()
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[org={}]", self.org)?;
        if let Some(account) = &self.account {
            write!(f, " [account={}]", account)?;
        }
        if let Some(rid) = &self.request_id {
            write!(f, " [req={}]", rid)?;
        }
        Ok(())
    }
}

/// Log an info message with context.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::info!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a warning message with context.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::warn!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log an error message with context.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::error!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a debug message with context.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::debug!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}
