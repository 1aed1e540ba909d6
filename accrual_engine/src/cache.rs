//! Process-wide read cache of reward rules.
//!
//! The cache mirrors the committed state of the `rewards` table. It is populated once at startup and only ever
//! appended to after a new rule has been committed to the database. Rules are never updated or removed.
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use crate::db_types::RewardRule;

#[derive(Debug, Clone, Default)]
pub struct RewardCache {
    rules: Arc<RwLock<HashMap<String, RewardRule>>>,
}

impl RewardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents of the cache with the given rules.
    pub fn load<I: IntoIterator<Item = RewardRule>>(&self, rules: I) {
        let mut lock = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        lock.clear();
        lock.extend(rules.into_iter().map(|r| (r.match_key.clone(), r)));
    }

    /// Inserts a committed rule. Returns false if a rule with the same match string was already cached, in which
    /// case the cached rule is kept.
    pub fn insert(&self, rule: RewardRule) -> bool {
        let mut lock = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        if lock.contains_key(&rule.match_key) {
            return false;
        }
        lock.insert(rule.match_key.clone(), rule);
        true
    }

    /// A point-in-time copy of every cached rule.
    pub fn snapshot(&self) -> Vec<RewardRule> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
