//! Per-key lock table: one `tokio::sync::Mutex` per VM name or deployment
//! name, giving mutual exclusion per resource instead of one global lock.
//! Keys are created lazily and never removed — the table's steady-state
//! size is bounded by the number of VM/deployment names ever seen, which
//! is acceptable for a single-host control plane.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct LockTable {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Acquires the lock for `key`, blocking until any concurrent holder
    /// releases it. The returned guard releases the lock on drop.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        self.entry(key).lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let table = LockTable::new();
        let a = table.lock("vm-a").await;
        let b = table.lock("vm-b").await;
        drop(a);
        drop(b);
    }

    #[tokio::test]
    async fn same_key_serialises() {
        let table = Arc::new(LockTable::new());
        let guard = table.lock("vm-a").await;

        let table2 = table.clone();
        let waiter = tokio::spawn(async move {
            let _guard = table2.lock("vm-a").await;
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }
}
