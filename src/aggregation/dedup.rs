//! Recommendation deduplication.
//!
//! Recommendations are unique per `(type, service)`. Among duplicates the
//! one with the larger `monthly_savings` wins; on a tie the first seen is
//! kept. Output follows the first occurrence of each key.

use std::collections::HashMap;
use std::hash::Hash;

use crate::query::models::Recommendation;

/// Keep one item per key, choosing with `prefer(candidate, kept)`.
pub fn dedupe_by_key<T, K, KF, P>(items: &[T], key: KF, prefer: P) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    KF: Fn(&T) -> K,
    P: Fn(&T, &T) -> bool,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut kept: Vec<T> = Vec::new();
    for item in items {
        match slots.get(&key(item)) {
            Some(&slot) => {
                if prefer(item, &kept[slot]) {
                    kept[slot] = item.clone();
                }
            }
            None => {
                slots.insert(key(item), kept.len());
                kept.push(item.clone());
            }
        }
    }
    kept
}

pub fn recommendation_key(rec: &Recommendation) -> (String, String) {
    (rec.recommendation_type.clone(), rec.service.clone())
}

pub fn dedupe_recommendations(recs: &[Recommendation]) -> Vec<Recommendation> {
    let deduped = dedupe_by_key(recs, recommendation_key, |candidate, kept| {
        candidate.monthly_savings > kept.monthly_savings
    });
    if deduped.len() < recs.len() {
        log::debug!(
            "RECOMMENDATIONS_DEDUPED before={} after={}",
            recs.len(),
            deduped.len()
        );
    }
    deduped
}

pub fn total_monthly_savings(recs: &[Recommendation]) -> f64 {
    recs.iter().map(|r| r.monthly_savings).sum()
}
