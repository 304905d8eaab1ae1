//! Striped async locks for read-modify-write on blobs.
//!
//! List values (chat log, trade journals) are rewritten whole, so two
//! concurrent appends in this process would lose one update. Each key hashes
//! to one of a fixed set of mutexes; holding it across the read and the write
//! serializes mutations of that key. Other processes are not covered.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::{Mutex, MutexGuard};

const DEFAULT_STRIPES: usize = 64;

/// A fixed pool of mutexes indexed by key hash.
#[derive(Debug)]
pub struct StripedLocks {
    stripes: Box<[Mutex<()>]>,
}

impl Default for StripedLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}

impl StripedLocks {
    /// Create a pool with `stripes` mutexes (at least one).
    #[must_use]
    pub fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Lock the stripe that `key` maps to.
    pub async fn lock<K: Hash + ?Sized>(&self, key: &K) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        #[allow(clippy::cast_possible_truncation)] // Only the low bits pick a stripe
        let index = hasher.finish() as usize % self.stripes.len();

        // index < len by construction
        let stripe = self
            .stripes
            .get(index)
            .unwrap_or_else(|| unreachable!("stripe index out of range"));
        stripe.lock().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(StripedLocks::new(4));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("user:1").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap_or_default();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_stripes_is_clamped() {
        let locks = StripedLocks::new(0);
        assert_eq!(locks.stripes.len(), 1);
    }
}
