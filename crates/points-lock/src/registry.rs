use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{LockError, LockResult};

/// When unreferenced entries leave the registry table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Remove an entry on the release that drops its count to zero.
    #[default]
    Immediate,
    /// Keep zero-count entries resident until [`KeyedLockRegistry::sweep`].
    Deferred,
}

/// One table entry: the key's mutex and the number of holders plus waiters.
struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    refs: usize,
}

impl Slot {
    fn is_idle(&self) -> bool {
        self.refs == 0 && self.mutex.try_lock().is_ok()
    }
}

/// Registry of per-key async mutexes.
///
/// `acquire` for two different keys only contends on the table mutex, which
/// is held for a map lookup and never across an `.await`. `acquire` for the
/// same key waits on that key's mutex, which grants in request order.
pub struct KeyedLockRegistry<K> {
    slots: Mutex<HashMap<K, Slot>>,
    policy: CleanupPolicy,
}

impl<K> KeyedLockRegistry<K>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync,
{
    pub fn new(policy: CleanupPolicy) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    /// Wait until `key` is exclusively held by the caller.
    ///
    /// Dropping the returned future before it completes withdraws the request
    /// without ever granting it.
    pub async fn acquire(&self, key: K) -> KeyGuard<'_, K> {
        let (mutex, lease) = self.checkout(key);
        let permit = mutex.lock_owned().await;
        debug!(key = ?lease.key, "key lock granted");
        KeyGuard {
            _permit: permit,
            lease,
        }
    }

    /// Like [`acquire`](Self::acquire), giving up after `bound`.
    pub async fn acquire_timeout(&self, key: K, bound: Duration) -> LockResult<KeyGuard<'_, K>> {
        match tokio::time::timeout(bound, self.acquire(key.clone())).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                debug!(key = ?key, bound_ms = bound.as_millis() as u64, "key lock wait timed out");
                Err(LockError::Timeout { waited: bound })
            }
        }
    }

    /// Take `key` only if nobody holds or waits for it right now.
    pub fn try_acquire(&self, key: K) -> Option<KeyGuard<'_, K>> {
        let (mutex, lease) = self.checkout(key);
        let permit = mutex.try_lock_owned().ok()?;
        Some(KeyGuard {
            _permit: permit,
            lease,
        })
    }

    /// Number of entries resident in the table.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Holders plus waiters currently referencing `key`, if it is resident.
    pub fn ref_count(&self, key: &K) -> Option<usize> {
        self.table().get(key).map(|slot| slot.refs)
    }

    /// Remove every unreferenced, unlocked entry. Returns how many were removed.
    ///
    /// With [`CleanupPolicy::Immediate`] this normally finds nothing.
    pub fn sweep(&self) -> usize {
        let mut slots = self.table();
        let before = slots.len();
        slots.retain(|_, slot| !slot.is_idle());
        let removed = before - slots.len();
        if removed > 0 {
            debug!(removed, resident = slots.len(), "swept idle key locks");
        }
        removed
    }

    /// Get-or-create the entry for `key` and take a reference on it.
    fn checkout(&self, key: K) -> (Arc<AsyncMutex<()>>, Lease<'_, K>) {
        let mut slots = self.table();
        let slot = slots.entry(key.clone()).or_insert_with(|| Slot {
            mutex: Arc::new(AsyncMutex::new(())),
            refs: 0,
        });
        slot.refs += 1;
        let mutex = Arc::clone(&slot.mutex);
        drop(slots);
        (mutex, Lease { registry: self, key })
    }

    /// Drop one reference on `key`, removing the entry when it becomes idle.
    fn release_ref(&self, key: &K) {
        let mut slots = self.table();
        let Some(slot) = slots.get_mut(key) else {
            panic!("key lock reference count underflow for {key:?}: no entry");
        };
        assert!(slot.refs > 0, "key lock reference count underflow for {key:?}");
        slot.refs -= 1;
        debug!(key = ?key, refs = slot.refs, "key lock released");
        if self.policy == CleanupPolicy::Immediate && slot.is_idle() {
            slots.remove(key);
            debug!(key = ?key, "removed idle key lock");
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<K, Slot>> {
        // Every mutation leaves the map consistent before anything can panic,
        // so a poisoned table is still usable.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K> Default for KeyedLockRegistry<K>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync,
{
    fn default() -> Self {
        Self::new(CleanupPolicy::default())
    }
}

impl<K> fmt::Debug for KeyedLockRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resident = self.slots.lock().map(|s| s.len()).unwrap_or_default();
        f.debug_struct("KeyedLockRegistry")
            .field("policy", &self.policy)
            .field("resident", &resident)
            .finish()
    }
}

/// A counted reference on a table entry, returned to the registry on drop.
struct Lease<'a, K>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync,
{
    registry: &'a KeyedLockRegistry<K>,
    key: K,
}

impl<K> Drop for Lease<'_, K>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync,
{
    fn drop(&mut self) {
        self.registry.release_ref(&self.key);
    }
}

/// Exclusive ownership of one key. Dropping it releases the key.
pub struct KeyGuard<'a, K>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync,
{
    // Field order matters: the mutex is unlocked before the reference is
    // returned, so the entry is idle by the time `release_ref` inspects it.
    _permit: OwnedMutexGuard<()>,
    lease: Lease<'a, K>,
}

impl<K> KeyGuard<'_, K>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync,
{
    pub fn key(&self) -> &K {
        &self.lease.key
    }
}

impl<K> fmt::Debug for KeyGuard<'_, K>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.lease.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn wait_for_refs(reg: &KeyedLockRegistry<u64>, key: u64, refs: usize) {
        while reg.ref_count(&key) != Some(refs) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn same_key_shares_one_entry() {
        let reg = Arc::new(KeyedLockRegistry::<u64>::new(CleanupPolicy::Immediate));
        let held = reg.acquire(1).await;
        assert_eq!(held.key(), &1);

        let waiter = {
            let reg = Arc::clone(&reg);
            tokio::spawn(async move {
                let _g = reg.acquire(1).await;
            })
        };
        wait_for_refs(&reg, 1, 2).await;
        assert_eq!(reg.len(), 1);

        drop(held);
        waiter.await.unwrap();
        assert_eq!(reg.len(), 0);
    }

    #[tokio::test]
    async fn waiters_are_granted_in_request_order() {
        let reg = Arc::new(KeyedLockRegistry::<u64>::default());
        let order = Arc::new(Mutex::new(Vec::new()));
        let held = reg.acquire(7).await;

        let mut tasks = Vec::new();
        for i in 0..5usize {
            let reg2 = Arc::clone(&reg);
            let order = Arc::clone(&order);
            tasks.push(tokio::spawn(async move {
                let _g = reg2.acquire(7).await;
                order.lock().unwrap().push(i);
            }));
            wait_for_refs(&reg, 7, i + 2).await;
        }

        drop(held);
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(reg.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_withdraws_waiter() {
        let reg = KeyedLockRegistry::<u64>::default();
        let held = reg.acquire(3).await;

        let err = reg
            .acquire_timeout(3, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LockError::Timeout {
                waited: Duration::from_millis(20)
            }
        );
        assert_eq!(reg.ref_count(&3), Some(1));

        drop(held);
        assert!(reg.is_empty());
        let again = reg.acquire_timeout(3, Duration::from_millis(20)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn aborted_waiter_restores_count() {
        let reg = Arc::new(KeyedLockRegistry::<u64>::default());
        let held = reg.acquire(4).await;

        let waiter = {
            let reg = Arc::clone(&reg);
            tokio::spawn(async move {
                let _g = reg.acquire(4).await;
            })
        };
        wait_for_refs(&reg, 4, 2).await;
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(reg.ref_count(&4), Some(1));

        drop(held);
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn try_acquire_fails_while_held() {
        let reg = KeyedLockRegistry::<u64>::default();
        let held = reg.try_acquire(5).expect("free key");
        assert!(reg.try_acquire(5).is_none());
        assert_eq!(reg.ref_count(&5), Some(1));
        assert!(reg.try_acquire(6).is_some());
        drop(held);
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn immediate_policy_bounds_table() {
        let reg = KeyedLockRegistry::<u64>::new(CleanupPolicy::Immediate);
        for key in 0..500 {
            let _g = reg.acquire(key).await;
        }
        assert_eq!(reg.len(), 0);
        assert_eq!(reg.sweep(), 0);
    }

    #[tokio::test]
    async fn deferred_policy_waits_for_sweep() {
        let reg = KeyedLockRegistry::<u64>::new(CleanupPolicy::Deferred);
        for key in 0..100 {
            let _g = reg.acquire(key).await;
        }
        assert_eq!(reg.len(), 100);

        let held = reg.acquire(1_000).await;
        assert_eq!(reg.sweep(), 100);
        assert_eq!(reg.len(), 1);

        drop(held);
        assert_eq!(reg.sweep(), 1);
        assert!(reg.is_empty());
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn releasing_unreferenced_key_panics() {
        let reg = KeyedLockRegistry::<u64>::default();
        reg.release_ref(&1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn holders_are_exclusive_per_key() {
        const KEYS: usize = 4;
        let reg = Arc::new(KeyedLockRegistry::<u64>::default());
        let inside: Arc<Vec<AtomicUsize>> =
            Arc::new((0..KEYS).map(|_| AtomicUsize::new(0)).collect());

        let mut tasks = Vec::new();
        for i in 0..200usize {
            let reg = Arc::clone(&reg);
            let inside = Arc::clone(&inside);
            tasks.push(tokio::spawn(async move {
                let key = i % KEYS;
                let _g = reg.acquire(key as u64).await;
                assert_eq!(inside[key].fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                inside[key].fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert!(reg.is_empty());
    }
}
