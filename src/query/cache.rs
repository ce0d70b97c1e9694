//! Read-query cache with tag-based invalidation.
//!
//! Each cached read records the entity tags it depends on. Mutations and
//! completed jobs declare the tags they affect; invalidation drops every
//! entry of that tenant sharing a tag, so no call site keeps its own list
//! of keys.
//!
//! Invalidation also bumps a per-tenant generation. A read that started
//! before an invalidation must not store its result afterwards, so reads
//! capture the generation up front and store through `put_if_current`.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::ClientConfig;
use crate::context::scope::TenantId;

use super::request::QueryRequest;
use super::table::EntityTag;

/// Cache TTL - 5 minutes
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Composite key of a read: tenant, table, predicates (account included),
/// order and window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    tenant: Option<TenantId>,
    canonical: String,
}

impl QueryKey {
    pub fn for_select(request: &QueryRequest) -> Self {
        Self::build(request, "select")
    }

    pub fn for_count(request: &QueryRequest) -> Self {
        Self::build(&request.count_request(), "count")
    }

    fn build(request: &QueryRequest, action: &str) -> Self {
        // serde_json maps are sorted, so this rendering is stable.
        Self {
            tenant: request.tenant().cloned(),
            canonical: request.to_wire(action).to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Short digest of the key for log lines.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.canonical.as_bytes());
        hex::encode(&digest[..6])
    }
}

/// Cached payload of a read.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Rows(Arc<Vec<Value>>),
    Count(usize),
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    tags: BTreeSet<EntityTag>,
    stored_at: Instant,
}

/// Hit/miss counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    generations: RwLock<HashMap<TenantId, u64>>,
    epoch: AtomicU64,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generations: RwLock::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.cache_ttl)
    }

    pub fn get(&self, key: &QueryKey) -> Option<CachedValue> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() <= self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("CACHE_HIT key={}", key.fingerprint());
                Some(entry.value.clone())
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                log::debug!("CACHE_EXPIRED key={}", key.fingerprint());
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                log::debug!("CACHE_MISS key={}", key.fingerprint());
                None
            }
        }
    }

    pub fn put(&self, key: QueryKey, tags: BTreeSet<EntityTag>, value: CachedValue) {
        self.entries.write().insert(
            key,
            CacheEntry {
                value,
                tags,
                stored_at: Instant::now(),
            },
        );
    }

    /// Invalidation generation seen by reads for `tenant`.
    ///
    /// Changes whenever entries of `tenant` (or the whole cache) may have
    /// been dropped.
    pub fn generation(&self, tenant: Option<&TenantId>) -> u64 {
        let epoch = self.epoch.load(Ordering::Acquire);
        let tenant_generation = tenant
            .and_then(|t| self.generations.read().get(t).copied())
            .unwrap_or(0);
        epoch + tenant_generation
    }

    /// Store `value` unless the key's tenant was invalidated after
    /// `generation` was read.
    ///
    /// Returns whether the value was stored.
    pub fn put_if_current(
        &self,
        key: QueryKey,
        tags: BTreeSet<EntityTag>,
        value: CachedValue,
        generation: u64,
    ) -> bool {
        let mut entries = self.entries.write();
        if self.generation(key.tenant.as_ref()) != generation {
            log::debug!("CACHE_PUT_SKIPPED key={} reason=invalidated", key.fingerprint());
            return false;
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                tags,
                stored_at: Instant::now(),
            },
        );
        true
    }

    fn bump_generation(&self, tenant: &TenantId) {
        *self.generations.write().entry(tenant.clone()).or_insert(0) += 1;
    }

    /// Drop every entry of `tenant` depending on any of `tags`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_tags(&self, tenant: &TenantId, tags: &BTreeSet<EntityTag>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, entry| {
            let same_tenant = key.tenant.as_ref() == Some(tenant);
            !(same_tenant && !entry.tags.is_disjoint(tags))
        });
        self.bump_generation(tenant);
        let removed = before - entries.len();
        log::info!(
            "CACHE_INVALIDATED org={} tags={:?} removed={}",
            tenant,
            tags,
            removed
        );
        removed
    }

    /// Drop everything cached for `tenant` (e.g. on account switch or logout).
    pub fn invalidate_tenant(&self, tenant: &TenantId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.tenant.as_ref() != Some(tenant));
        self.bump_generation(tenant);
        before - entries.len()
    }

    /// Remove expired entries.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
        before - entries.len()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.clear();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        log::info!("CACHE_CLEARED");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::scope::ScopeContext;
    use crate::query::table::Table;

    fn request(tenant: &str, table: Table) -> QueryRequest {
        QueryRequest::scoped(table, &ScopeContext::from_ids(tenant, None).unwrap()).unwrap()
    }

    fn rows() -> CachedValue {
        CachedValue::Rows(Arc::new(vec![Value::from(1)]))
    }

    #[test]
    fn test_key_includes_filters_and_window() {
        let base = request("org-1", Table::Findings);
        let page1 = QueryKey::for_select(&base.clone().page(1, 10));
        let page2 = QueryKey::for_select(&base.clone().page(2, 10));
        let filtered = QueryKey::for_select(&base.clone().eq("status", "open").unwrap());
        assert_ne!(page1, page2);
        assert_ne!(page1, QueryKey::for_select(&base));
        assert_ne!(filtered, QueryKey::for_select(&base));
        assert_eq!(page1.fingerprint().len(), 12);
    }

    #[test]
    fn test_count_key_ignores_window() {
        let base = request("org-1", Table::Findings);
        assert_eq!(
            QueryKey::for_count(&base.clone().page(1, 10)),
            QueryKey::for_count(&base.page(5, 10))
        );
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = QueryCache::default();
        let key = QueryKey::for_select(&request("org-1", Table::Findings));
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), BTreeSet::from([EntityTag::Findings]), rows());
        assert!(cache.get(&key).is_some());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_put_after_invalidation_is_skipped() {
        let cache = QueryCache::default();
        let key = QueryKey::for_select(&request("org-1", Table::Findings));
        let tenant = TenantId::new("org-1").unwrap();
        let other = TenantId::new("org-2").unwrap();

        let generation = cache.generation(Some(&tenant));
        cache.invalidate_tags(&other, &BTreeSet::from([EntityTag::Findings]));
        assert_eq!(cache.generation(Some(&tenant)), generation);

        cache.invalidate_tags(&tenant, &BTreeSet::from([EntityTag::Findings]));
        assert!(!cache.put_if_current(key.clone(), BTreeSet::from([EntityTag::Findings]), rows(), generation));
        assert!(cache.get(&key).is_none());

        let fresh = cache.generation(Some(&tenant));
        assert!(cache.put_if_current(key.clone(), BTreeSet::from([EntityTag::Findings]), rows(), fresh));
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn test_clear_advances_every_generation() {
        let cache = QueryCache::default();
        let tenant = TenantId::new("org-1").unwrap();
        let scoped = cache.generation(Some(&tenant));
        let global = cache.generation(None);
        cache.clear();
        assert_ne!(cache.generation(Some(&tenant)), scoped);
        assert_ne!(cache.generation(None), global);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = QueryCache::new(Duration::from_secs(0));
        let key = QueryKey::for_select(&request("org-1", Table::Findings));
        cache.put(key.clone(), BTreeSet::new(), rows());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.purge_expired(), 1);
    }

    #[test]
    fn test_invalidate_by_tag_is_tenant_local() {
        let cache = QueryCache::default();
        let findings_1 = QueryKey::for_select(&request("org-1", Table::Findings));
        let tickets_1 = QueryKey::for_select(&request("org-1", Table::RemediationTickets));
        let findings_2 = QueryKey::for_select(&request("org-2", Table::Findings));
        cache.put(findings_1.clone(), BTreeSet::from([EntityTag::Findings]), rows());
        cache.put(tickets_1.clone(), BTreeSet::from([EntityTag::Tickets]), rows());
        cache.put(findings_2.clone(), BTreeSet::from([EntityTag::Findings]), rows());

        let tenant = TenantId::new("org-1").unwrap();
        let removed = cache.invalidate_tags(&tenant, &BTreeSet::from([EntityTag::Findings]));
        assert_eq!(removed, 1);
        assert!(cache.get(&findings_1).is_none());
        assert!(cache.get(&tickets_1).is_some());
        assert!(cache.get(&findings_2).is_some());
    }
}
