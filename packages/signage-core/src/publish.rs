//! Publish versions: the "content changed, re-fetch" signal for players.
//!
//! Each tenant has one version number, held in process memory only. Players
//! remember the last version they saw and re-fetch the full content list
//! whenever the value differs. A restart resets every tenant to "never
//! published", which players also read as a change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::tenant::TenantId;
use crate::utils::now_millis;

/// Source of strictly increasing version numbers.
///
/// Values track wall-clock milliseconds but never repeat or go backwards:
/// two calls within the same millisecond (or across a clock step back)
/// still yield distinct, increasing values.
#[derive(Debug, Default)]
pub struct VersionClock {
    last: AtomicU64,
}

impl VersionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next version.
    pub fn next(&self) -> u64 {
        let now = now_millis();
        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now.max(prev.saturating_add(1));
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Per-tenant publish versions.
///
/// `bump` and `read` touch only the tenant's own map entry; the version is
/// assigned while that entry is held, so concurrent bumps for one tenant
/// are stored in the order their versions were drawn.
pub struct PublishTracker {
    versions: DashMap<TenantId, u64>,
    clock: Arc<VersionClock>,
}

impl PublishTracker {
    pub fn new(clock: Arc<VersionClock>) -> Self {
        Self {
            versions: DashMap::new(),
            clock,
        }
    }

    /// Moves the tenant to a fresh version and returns it.
    pub fn bump(&self, tenant: &TenantId) -> u64 {
        let mut entry = self.versions.entry(tenant.clone()).or_insert(0);
        let version = self.clock.next();
        *entry = version;
        log::debug!("[Publish] {} -> {}", tenant, version);
        version
    }

    /// Returns the tenant's current version, or `0` if it never published.
    pub fn read(&self, tenant: &TenantId) -> u64 {
        self.versions.get(tenant).map(|v| *v).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(s: &str) -> TenantId {
        TenantId::parse(s).unwrap()
    }

    #[test]
    fn clock_is_strictly_increasing() {
        let clock = VersionClock::new();
        let mut last = 0;
        for _ in 0..10_000 {
            let v = clock.next();
            assert!(v > last);
            last = v;
        }
    }

    #[test]
    fn clock_tracks_wall_time() {
        let clock = VersionClock::new();
        assert!(clock.next() >= now_millis() - 1000);
    }

    #[test]
    fn never_published_reads_zero() {
        let tracker = PublishTracker::new(Arc::new(VersionClock::new()));
        assert_eq!(tracker.read(&tid("beta")), 0);
        // Reading does not create an entry.
        assert_eq!(tracker.read(&tid("beta")), 0);
    }

    #[test]
    fn bump_is_visible_and_increasing() {
        let tracker = PublishTracker::new(Arc::new(VersionClock::new()));
        let acme = tid("acme");
        let first = tracker.bump(&acme);
        assert!(first > 0);
        assert_eq!(tracker.read(&acme), first);
        let second = tracker.bump(&acme);
        assert!(second > first);
        assert_eq!(tracker.read(&acme), second);
    }

    #[test]
    fn tenants_are_independent() {
        let tracker = PublishTracker::new(Arc::new(VersionClock::new()));
        tracker.bump(&tid("acme"));
        assert_eq!(tracker.read(&tid("beta")), 0);
    }

    #[test]
    fn concurrent_bumps_never_move_backwards() {
        let tracker = Arc::new(PublishTracker::new(Arc::new(VersionClock::new())));
        let acme = tid("acme");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let acme = acme.clone();
                std::thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..500 {
                        tracker.bump(&acme);
                        let seen = tracker.read(&acme);
                        assert!(seen >= last);
                        last = seen;
                    }
                    last
                })
            })
            .collect();

        let max_seen = handles.into_iter().map(|h| h.join().unwrap()).max();
        assert_eq!(max_seen, Some(tracker.read(&acme)));
    }
}
