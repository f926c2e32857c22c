//! Per-key async mutexes for work that must not interleave within this process.
//!
//! Entries are held weakly; a key's mutex lives only while some caller holds or
//! waits on it. Lock order is session, then token, then record key. Every lock a
//! write path needs is taken before its transaction begins.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub struct KeyedLocks<K> {
    inner: Mutex<HashMap<K, Weak<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.retain(|_, w| w.strong_count() > 0);
            match map.get(&key).and_then(Weak::upgrade) {
                Some(m) => m,
                None => {
                    let m = Arc::new(AsyncMutex::new(()));
                    map.insert(key, Arc::downgrade(&m));
                    m
                }
            }
        };
        mutex.lock_owned().await
    }

    #[cfg(test)]
    fn live_keys(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.values().filter(|w| w.strong_count() > 0).count()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Enrollment, capacity, token issuance and session close.
pub static SESSION_LOCKS: Lazy<KeyedLocks<i64>> = Lazy::new(KeyedLocks::new);

/// Scans against one token.
pub static TOKEN_LOCKS: Lazy<KeyedLocks<i64>> = Lazy::new(KeyedLocks::new);

/// Writes to one (member, session, date) attendance record.
pub static RECORD_LOCKS: Lazy<KeyedLocks<(i64, i64, NaiveDate)>> = Lazy::new(KeyedLocks::new);
