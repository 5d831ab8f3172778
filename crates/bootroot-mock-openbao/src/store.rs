//! Versioned secret store state machine
//!
//! Each `(service, item)` key owns two independent counters:
//!
//! - `version` in `[1, ∞)`, default 1, overwritten by `set_version`
//! - `pending_failures` in `[0, ∞)`, default 0, overwritten by `fail_next`
//!   and decremented once per read while positive
//!
//! Keys that were never touched behave exactly like keys at their defaults,
//! so the map only holds entries a control call has written. `reset` drops
//! the whole keyspace.

use std::collections::HashMap;
use std::num::{NonZeroU32, NonZeroU64};

use tracing::{debug, info, warn};

use crate::item::SecretKey;

/// Counters for a single `(service, item)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemState {
    /// Version rendered into successful reads.
    pub version: NonZeroU64,
    /// Reads that will still fail before one succeeds.
    pub pending_failures: u32,
}

impl Default for ItemState {
    fn default() -> Self {
        Self {
            version: NonZeroU64::MIN,
            pending_failures: 0,
        }
    }
}

/// Result of a read attempt against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// An injected fault consumed this read. `remaining` is the count left
    /// after the decrement.
    InjectedFailure {
        /// Failures still armed.
        remaining: u32,
    },
    /// The read succeeds at this version.
    Serve {
        /// Version to render.
        version: NonZeroU64,
    },
}

/// In-memory counters for every key the control API has touched.
#[derive(Debug, Default)]
pub struct SecretStore {
    entries: HashMap<SecretKey, ItemState>,
}

impl SecretStore {
    /// Empty store; every key reads at its defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counters for `key`, defaults included.
    pub fn state(&self, key: &SecretKey) -> ItemState {
        self.entries.get(key).copied().unwrap_or_default()
    }

    /// Overwrite the version counter. Pending failures are left alone.
    pub fn set_version(&mut self, key: SecretKey, version: NonZeroU64) {
        info!(key = %key, version = version.get(), "set secret version");
        self.entries.entry(key).or_default().version = version;
    }

    /// Overwrite the pending-failure counter. A second call replaces any
    /// count still outstanding from the first.
    pub fn fail_next(&mut self, key: SecretKey, count: NonZeroU32) {
        info!(key = %key, count = count.get(), "armed injected failures");
        self.entries.entry(key).or_default().pending_failures = count.get();
    }

    /// Perform one read transition.
    ///
    /// A positive failure count is decremented exactly once and the read
    /// fails; otherwise the read is served at the current version and no
    /// counter changes.
    pub fn read(&mut self, key: &SecretKey) -> ReadOutcome {
        match self.entries.get_mut(key) {
            Some(state) if state.pending_failures > 0 => {
                state.pending_failures -= 1;
                warn!(
                    key = %key,
                    remaining = state.pending_failures,
                    "serving injected failure"
                );
                ReadOutcome::InjectedFailure {
                    remaining: state.pending_failures,
                }
            }
            Some(state) => {
                debug!(key = %key, version = state.version.get(), "serving secret");
                ReadOutcome::Serve {
                    version: state.version,
                }
            }
            None => {
                debug!(key = %key, "serving default secret");
                ReadOutcome::Serve {
                    version: NonZeroU64::MIN,
                }
            }
        }
    }

    /// Clear every counter back to defaults.
    pub fn reset(&mut self) {
        info!(cleared = self.entries.len(), "reset secret store");
        self.entries.clear();
    }

    /// Number of keys holding non-default history.
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::SecretItem;
    use proptest::prelude::*;

    fn key(service: &str, item: SecretItem) -> SecretKey {
        SecretKey::new(service, item)
    }

    fn v(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    fn c(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_untouched_key_serves_version_one() {
        let mut store = SecretStore::new();
        let outcome = store.read(&key("api", SecretItem::SecretId));
        assert_eq!(outcome, ReadOutcome::Serve { version: v(1) });
        assert_eq!(store.tracked_keys(), 0);
    }

    #[test]
    fn test_set_version_is_direct_overwrite() {
        let mut store = SecretStore::new();
        let k = key("api", SecretItem::Trust);
        store.set_version(k.clone(), v(7));
        assert_eq!(store.read(&k), ReadOutcome::Serve { version: v(7) });
        store.set_version(k.clone(), v(3));
        assert_eq!(store.read(&k), ReadOutcome::Serve { version: v(3) });
    }

    #[test]
    fn test_fail_next_counts_down_then_serves() {
        let mut store = SecretStore::new();
        let k = key("api", SecretItem::Eab);
        store.fail_next(k.clone(), c(2));

        assert_eq!(
            store.read(&k),
            ReadOutcome::InjectedFailure { remaining: 1 }
        );
        assert_eq!(
            store.read(&k),
            ReadOutcome::InjectedFailure { remaining: 0 }
        );
        assert_eq!(store.read(&k), ReadOutcome::Serve { version: v(1) });
        assert_eq!(store.state(&k).pending_failures, 0);
    }

    #[test]
    fn test_fail_next_overwrites_outstanding_count() {
        let mut store = SecretStore::new();
        let k = key("api", SecretItem::SecretId);
        store.fail_next(k.clone(), c(5));
        store.read(&k);
        store.fail_next(k.clone(), c(1));

        assert_eq!(
            store.read(&k),
            ReadOutcome::InjectedFailure { remaining: 0 }
        );
        assert!(matches!(store.read(&k), ReadOutcome::Serve { .. }));
    }

    #[test]
    fn test_failures_are_scoped_to_one_key() {
        let mut store = SecretStore::new();
        store.fail_next(key("api", SecretItem::Eab), c(1));

        assert!(matches!(
            store.read(&key("api", SecretItem::Trust)),
            ReadOutcome::Serve { .. }
        ));
        assert!(matches!(
            store.read(&key("web", SecretItem::Eab)),
            ReadOutcome::Serve { .. }
        ));
        assert!(matches!(
            store.read(&key("api", SecretItem::Eab)),
            ReadOutcome::InjectedFailure { .. }
        ));
    }

    #[test]
    fn test_version_survives_injected_failures() {
        let mut store = SecretStore::new();
        let k = key("api", SecretItem::HttpResponderHmac);
        store.set_version(k.clone(), v(4));
        store.fail_next(k.clone(), c(1));
        store.read(&k);
        assert_eq!(store.read(&k), ReadOutcome::Serve { version: v(4) });
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = SecretStore::new();
        let a = key("api", SecretItem::Trust);
        let b = key("web", SecretItem::SecretId);
        store.set_version(a.clone(), v(9));
        store.fail_next(b.clone(), c(3));

        store.reset();

        assert_eq!(store.tracked_keys(), 0);
        assert_eq!(store.read(&a), ReadOutcome::Serve { version: v(1) });
        assert_eq!(store.read(&b), ReadOutcome::Serve { version: v(1) });
    }

    proptest! {
        #[test]
        fn prop_exactly_n_failures_then_success(n in 1u32..50, version in 1u64..1_000) {
            let mut store = SecretStore::new();
            let k = key("svc", SecretItem::Trust);
            store.set_version(k.clone(), v(version));
            store.fail_next(k.clone(), c(n));

            for expected_remaining in (0..n).rev() {
                prop_assert_eq!(
                    store.read(&k),
                    ReadOutcome::InjectedFailure { remaining: expected_remaining }
                );
            }
            prop_assert_eq!(store.read(&k), ReadOutcome::Serve { version: v(version) });
            prop_assert_eq!(store.read(&k), ReadOutcome::Serve { version: v(version) });
        }
    }
}
