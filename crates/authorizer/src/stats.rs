//! Counters for authorization decisions

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by every clone of an authorizer
#[derive(Debug, Default)]
pub struct AuthorizerStats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    authority_checks: AtomicU64,
    grants: AtomicU64,
    denials: AtomicU64,
    credential_renewals: AtomicU64,
}

impl AuthorizerStats {
    pub const fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            authority_checks: AtomicU64::new(0),
            grants: AtomicU64::new(0),
            denials: AtomicU64::new(0),
            credential_renewals: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_authority_check(&self) {
        self.authority_checks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_verdict(&self, allowed: bool) {
        if allowed {
            self.grants.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denials.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_credential_renewal(&self) {
        self.credential_renewals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            authority_checks: self.authority_checks.load(Ordering::Relaxed),
            grants: self.grants.load(Ordering::Relaxed),
            denials: self.denials.load(Ordering::Relaxed),
            credential_renewals: self.credential_renewals.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.authority_checks.store(0, Ordering::Relaxed);
        self.grants.store(0, Ordering::Relaxed);
        self.denials.store(0, Ordering::Relaxed);
        self.credential_renewals.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`AuthorizerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Round trips to the authority, retries included
    pub authority_checks: u64,
    /// Authority answers of "allowed"
    pub grants: u64,
    /// Authority answers of "not allowed"
    pub denials: u64,
    pub credential_renewals: u64,
}

impl StatsSnapshot {
    /// Share of checks answered from the cache, as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            (self.cache_hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} hit_rate={:.1}% authority_checks={} grants={} denials={} credential_renewals={}",
            self.cache_hits,
            self.cache_misses,
            self.hit_rate(),
            self.authority_checks,
            self.grants,
            self.denials,
            self.credential_renewals
        )
    }
}
