//! Scan status polling.
//!
//! While any `security_scans` row of the scope is pending or running, the
//! poller re-reads the table every `poll_interval`. Reads bypass the cache.
//! Failed polls are counted; a successful poll resets the count.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::context::scope::ScopeContext;
use crate::error::ApiError;
use crate::query::client::TabularBackend;
use crate::query::models::SecurityScan;
use crate::query::request::QueryRequest;
use crate::query::service::DataService;
use crate::query::table::{EntityTag, Table};

/// How a polling run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// No scan is active any more; the last snapshot read.
    Settled(Vec<SecurityScan>),
    /// Too many consecutive failed polls; the last error.
    GaveUp(ApiError),
}

#[derive(Debug, Clone)]
pub struct ScanPoller {
    interval: Duration,
    max_errors: u32,
}

impl ScanPoller {
    pub fn new(interval: Duration, max_errors: u32) -> Self {
        Self {
            interval,
            max_errors: max_errors.max(1),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.poll_interval, config.max_poll_errors)
    }

    /// Poll until every scan of `scope` has finished.
    ///
    /// On settling, cached scan and finding reads of the tenant are
    /// invalidated.
    pub async fn wait_until_settled<B: TabularBackend>(
        &self,
        service: &DataService<B>,
        scope: &ScopeContext,
    ) -> PollOutcome {
        let request = match QueryRequest::scoped(Table::SecurityScans, scope) {
            Ok(request) => request.order("created_at", false),
            Err(e) => return PollOutcome::GaveUp(e),
        };
        let ctx = scope.log_context();
        let mut consecutive_errors = 0u32;
        let mut polls = 0u32;

        loop {
            polls += 1;
            match service.client().select::<SecurityScan>(&request).await {
                Ok(scans) => {
                    consecutive_errors = 0;
                    let active = scans.iter().filter(|s| s.status.is_active()).count();
                    if active == 0 {
                        let tags = BTreeSet::from([EntityTag::Scans, EntityTag::Findings]);
                        service.invalidate(&scope.tenant, &tags);
                        crate::log_info!(ctx, "POLL_SETTLED", polls = polls, scans = scans.len());
                        return PollOutcome::Settled(scans);
                    }
                    crate::log_debug!(ctx, "POLL_ACTIVE", polls = polls, active = active);
                }
                Err(e) => {
                    consecutive_errors += 1;
                    crate::log_warn!(
                        ctx,
                        "POLL_FAILED",
                        attempt = consecutive_errors,
                        max = self.max_errors,
                        error = e.to_string()
                    );
                    if consecutive_errors >= self.max_errors {
                        crate::log_error!(ctx, "POLL_GAVE_UP", polls = polls);
                        return PollOutcome::GaveUp(e);
                    }
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
