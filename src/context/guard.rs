//! External-id guard for in-flight saves.
//!
//! Account onboarding generates an external id that the cloud role trust
//! policy must carry. The id can be regenerated while a save is awaiting
//! its round trip; a save that captured the old id must not commit.

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{ApiError, Result};

/// Snapshot of the guarded id taken when a save starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    external_id: String,
    generation: u64,
}

impl SaveTicket {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }
}

#[derive(Debug)]
struct GuardState {
    external_id: String,
    generation: u64,
}

/// Shared holder of the current external id.
#[derive(Debug, Clone)]
pub struct SaveGuard {
    state: Arc<RwLock<GuardState>>,
}

impl Default for SaveGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveGuard {
    pub fn new() -> Self {
        Self::with_external_id(&generate_external_id())
    }

    pub fn with_external_id(external_id: &str) -> Self {
        Self {
            state: Arc::new(RwLock::new(GuardState {
                external_id: external_id.to_string(),
                generation: 0,
            })),
        }
    }

    pub fn external_id(&self) -> String {
        self.state.read().external_id.clone()
    }

    /// Replace the external id, invalidating every outstanding ticket.
    pub fn regenerate(&self) -> String {
        let mut state = self.state.write();
        state.external_id = generate_external_id();
        state.generation += 1;
        log::info!(
            "EXTERNAL_ID_REGENERATED generation={}",
            state.generation
        );
        state.external_id.clone()
    }

    pub fn ticket(&self) -> SaveTicket {
        let state = self.state.read();
        SaveTicket {
            external_id: state.external_id.clone(),
            generation: state.generation,
        }
    }

    pub fn is_current(&self, ticket: &SaveTicket) -> bool {
        let state = self.state.read();
        state.generation == ticket.generation && state.external_id == ticket.external_id
    }

    /// Run `save` under `ticket`.
    ///
    /// The ticket is checked before the save is issued and again after it
    /// resolves; either check failing yields `ApiError::Stale` and the
    /// result is discarded.
    pub async fn commit<T, F>(&self, ticket: &SaveTicket, save: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if !self.is_current(ticket) {
            log::warn!("GUARDED_SAVE_SKIPPED reason=stale_before_send");
            return Err(ApiError::Stale("external id changed before save".to_string()));
        }

        let value = save.await?;

        if !self.is_current(ticket) {
            log::warn!("GUARDED_SAVE_DISCARDED reason=stale_after_send");
            return Err(ApiError::Stale("external id changed during save".to_string()));
        }

        Ok(value)
    }
}

fn generate_external_id() -> String {
    format!("evo-{}", Uuid::new_v4().simple())
}
