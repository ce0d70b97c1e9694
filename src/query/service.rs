//! Cached reads and tag-invalidating writes over a [`QueryClient`].

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::scope::TenantId;
use crate::error::Result;

use super::cache::{CachedValue, QueryCache, QueryKey};
use super::client::{decode_rows, QueryClient, TabularBackend};
use super::mutation::{Mutation, MutationKind};
use super::request::QueryRequest;
use super::table::EntityTag;

pub struct DataService<B> {
    client: QueryClient<B>,
    cache: QueryCache,
}

impl<B: TabularBackend> DataService<B> {
    pub fn new(client: QueryClient<B>, cache: QueryCache) -> Self {
        Self { client, cache }
    }

    /// Uncached access, for polling.
    pub fn client(&self) -> &QueryClient<B> {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Read through the cache and decode into `T`.
    ///
    /// A read overlapping an invalidation of its tenant returns its rows but
    /// does not cache them.
    pub async fn fetch<T: DeserializeOwned>(&self, request: &QueryRequest) -> Result<Vec<T>> {
        let rows = self.fetch_rows(request).await?;
        decode_rows(rows.as_ref().clone())
    }

    pub async fn fetch_rows(&self, request: &QueryRequest) -> Result<Arc<Vec<Value>>> {
        let key = QueryKey::for_select(request);
        if let Some(CachedValue::Rows(rows)) = self.cache.get(&key) {
            return Ok(rows);
        }
        let generation = self.cache.generation(request.tenant());
        let rows = Arc::new(self.client.select_rows(request).await?);
        self.cache.put_if_current(
            key,
            request.tags().clone(),
            CachedValue::Rows(rows.clone()),
            generation,
        );
        Ok(rows)
    }

    pub async fn count(&self, request: &QueryRequest) -> Result<usize> {
        let key = QueryKey::for_count(request);
        if let Some(CachedValue::Count(count)) = self.cache.get(&key) {
            return Ok(count);
        }
        let generation = self.cache.generation(request.tenant());
        let count = self.client.count(request).await?;
        self.cache
            .put_if_current(key, request.tags().clone(), CachedValue::Count(count), generation);
        Ok(count)
    }

    /// Run a write, then invalidate every cached read it affects.
    ///
    /// Failed writes invalidate nothing.
    pub async fn apply(&self, mutation: Mutation) -> Result<Vec<Value>> {
        let rows = match mutation.kind() {
            MutationKind::Insert { scope, row } => {
                self.client.insert(scope, mutation.table(), row).await?
            }
            MutationKind::Update { target, patch } => self.client.update(target, patch).await?,
            MutationKind::Delete { target } => self.client.delete(target).await?,
        };
        self.cache.invalidate_tags(mutation.tenant(), mutation.affects());
        Ok(rows)
    }

    /// Invalidate reads after an out-of-band change, e.g. a finished job.
    pub fn invalidate(&self, tenant: &TenantId, tags: &BTreeSet<EntityTag>) -> usize {
        if tags.is_empty() {
            return 0;
        }
        self.cache.invalidate_tags(tenant, tags)
    }
}
