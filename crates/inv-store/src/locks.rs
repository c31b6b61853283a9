//! Per-key mutual exclusion for read-modify-write cycles.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Table<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// A table of async locks keyed by `K`.
///
/// Entries are created on first use and dropped again once nobody holds or
/// waits for them, so the table only ever contains keys that are in flight.
/// Different keys never contend.
pub struct KeyedLocks<K> {
    table: Table<K>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &K) -> KeyGuard<K> {
        let slot = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(key.clone()).or_default())
        };
        // Built before waiting so a cancelled wait still prunes the entry.
        let mut pending = KeyGuard {
            key: key.clone(),
            table: Arc::clone(&self.table),
            guard: None,
        };
        pending.guard = Some(slot.lock_owned().await);
        pending
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for KeyedLocks<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self
            .table
            .lock()
            .map(|t| t.len())
            .unwrap_or_else(|e| e.into_inner().len());
        f.debug_struct("KeyedLocks").field("active", &active).finish()
    }
}

/// Exclusive access to one key; released on drop.
///
/// While `guard` is `None` the key is still being waited for.
pub struct KeyGuard<K: Eq + Hash> {
    key: K,
    table: Table<K>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Release while holding the table lock: waiters clone the slot under
        // the same lock, so a count of one means the table's copy is the last.
        drop(self.guard.take());
        let idle = table
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1);
        if idle {
            table.remove(&self.key);
        }
    }
}
