//! Per-client admission control.
//!
//! Each client identity (typically the remote IP address) owns an independent token bucket. A bucket starts full,
//! holds at most `burst` tokens and is refilled continuously at `rate` tokens per second. Every admitted request
//! consumes one token.
//!
//! Buckets are created lazily on the first request from an identity, and are never evicted.
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::*;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Too many requests. Retry in {} seconds", .retry_after.as_secs())]
pub struct RateLimited {
    /// Advisory cool-down that callers should wait before trying again.
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionConfig {
    /// Tokens added to a bucket per second.
    pub rate: f64,
    /// Bucket capacity.
    pub burst: u32,
    pub retry_after: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self { rate: 50.0, burst: 5, retry_after: Duration::from_secs(60) }
    }
}

#[derive(Debug, Clone, Copy)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: u32, now: Instant) -> Self {
        Self { tokens: f64::from(capacity), last_refill: now }
    }

    fn try_take(&mut self, now: Instant, rate: f64, capacity: u32) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(f64::from(capacity));
        self.last_refill = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
pub struct AdmissionController {
    config: AdmissionConfig,
    buckets: DashMap<String, TokenBucket>,
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(AdmissionConfig::default())
    }
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Self {
        Self { config, buckets: DashMap::new() }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Attempts to consume one token from the bucket belonging to `identity`.
    pub fn allow(&self, identity: &str) -> Result<(), RateLimited> {
        self.allow_at(identity, Instant::now())
    }

    pub(crate) fn allow_at(&self, identity: &str, now: Instant) -> Result<(), RateLimited> {
        let AdmissionConfig { rate, burst, retry_after } = self.config;
        // The entry holds the shard lock, so concurrent first requests from one identity share a single bucket
        let mut bucket = self.buckets.entry(identity.to_string()).or_insert_with(|| {
            trace!("🚦️ New token bucket for {identity}");
            TokenBucket::full(burst, now)
        });
        if bucket.try_take(now, rate, burst) {
            Ok(())
        } else {
            debug!("🚦️ Request from {identity} was rate limited");
            Err(RateLimited { retry_after })
        }
    }

    /// The number of identities that currently own a bucket.
    pub fn tracked_identities(&self) -> usize {
        self.buckets.len()
    }
}
