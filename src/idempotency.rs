//! A process-local cache that deduplicates retried write requests.
//!
//! When a client retries a write after an ambiguous failure (e.g. a timeout
//! before the response arrived), the `idempotency-key` header lets the
//! server replay the response it already produced instead of recording the
//! transaction twice. Entries expire after [RESPONSE_EXPIRY].
//!
//! This cache is best effort: it lives in process memory, so a restart
//! forgets all entries and a retry after a restart may create a duplicate.
//! It must be treated as a cache, never as the source of truth.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::transaction::Transaction;

/// The request header carrying the client-supplied idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// How long a recorded response is replayed for before it is evicted.
pub const RESPONSE_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Maps client-supplied idempotency keys to the transaction produced by the
/// first successful write under that key.
#[derive(Debug, Clone, Default)]
pub struct IdempotencyCache {
    responses: Arc<Mutex<HashMap<String, Transaction>>>,
    key_guards: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl IdempotencyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The response recorded for `key`, if one was stored and has not
    /// expired.
    ///
    /// # Panics
    /// Panics if the cache lock is poisoned.
    pub fn lookup(&self, key: &str) -> Option<Transaction> {
        self.responses.lock().unwrap().get(key).cloned()
    }

    /// Record `response` under `key` and schedule its eviction after
    /// [RESPONSE_EXPIRY].
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Panics
    /// Panics if the cache lock is poisoned.
    pub fn store(&self, key: String, response: Transaction) {
        self.store_with_expiry(key, response, RESPONSE_EXPIRY);
    }

    /// Record `response` under `key` with a caller-chosen time to live.
    pub fn store_with_expiry(&self, key: String, response: Transaction, time_to_live: Duration) {
        self.responses
            .lock()
            .unwrap()
            .insert(key.clone(), response);

        let responses = Arc::clone(&self.responses);
        let key_guards = Arc::clone(&self.key_guards);
        // The eviction task is simply dropped if the runtime shuts down
        // before the timer fires.
        tokio::spawn(async move {
            tokio::time::sleep(time_to_live).await;
            responses.lock().unwrap().remove(&key);
            key_guards.lock().unwrap().remove(&key);
        });
    }

    /// Acquire the mutual-exclusion guard for `key`.
    ///
    /// Holding the guard from cache lookup through the database write and
    /// [IdempotencyCache::store] ensures that two concurrent first uses of
    /// the same key cannot both reach the write path; the second caller
    /// waits and then sees the cached response.
    ///
    /// # Panics
    /// Panics if the cache lock is poisoned.
    pub async fn key_guard(&self, key: &str) -> OwnedMutexGuard<()> {
        let guard = {
            let mut key_guards = self.key_guards.lock().unwrap();
            Arc::clone(
                key_guards
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        guard.lock_owned().await
    }
}

#[cfg(test)]
mod idempotency_cache_tests {
    use std::time::Duration;

    use crate::transaction::{Amount, Transaction, TransactionStatus, TransactionType};

    use super::IdempotencyCache;

    fn test_transaction(id: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            amount: Amount::from_cents(1000),
            category: "Groceries".to_string(),
            kind: TransactionType::Expense,
            status: TransactionStatus::Completed,
            description: "test".to_string(),
            date: 0,
        }
    }

    #[tokio::test]
    async fn lookup_returns_stored_response() {
        let cache = IdempotencyCache::new();
        let transaction = test_transaction("a");

        cache.store("key-1".to_string(), transaction.clone());

        assert_eq!(cache.lookup("key-1"), Some(transaction));
    }

    #[tokio::test]
    async fn lookup_returns_none_for_unknown_key() {
        let cache = IdempotencyCache::new();

        assert_eq!(cache.lookup("never-stored"), None);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_interfere() {
        let cache = IdempotencyCache::new();
        let first = test_transaction("a");
        let second = test_transaction("b");

        cache.store("key-1".to_string(), first.clone());
        cache.store("key-2".to_string(), second.clone());

        assert_eq!(cache.lookup("key-1"), Some(first));
        assert_eq!(cache.lookup("key-2"), Some(second));
    }

    #[tokio::test]
    async fn entries_are_evicted_after_expiry() {
        let cache = IdempotencyCache::new();

        cache.store_with_expiry(
            "short-lived".to_string(),
            test_transaction("a"),
            Duration::from_millis(20),
        );

        assert!(cache.lookup("short-lived").is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.lookup("short-lived"), None);
    }

    #[tokio::test]
    async fn key_guard_blocks_second_acquisition_until_released() {
        let cache = IdempotencyCache::new();

        let guard = cache.key_guard("contended").await;

        let second_attempt =
            tokio::time::timeout(Duration::from_millis(50), cache.key_guard("contended")).await;
        assert!(
            second_attempt.is_err(),
            "second acquisition should wait while the guard is held"
        );

        drop(guard);

        tokio::time::timeout(Duration::from_millis(50), cache.key_guard("contended"))
            .await
            .expect("guard should be available after release");
    }

    #[tokio::test]
    async fn guards_for_distinct_keys_are_independent() {
        let cache = IdempotencyCache::new();

        let _held = cache.key_guard("key-1").await;

        tokio::time::timeout(Duration::from_millis(50), cache.key_guard("key-2"))
            .await
            .expect("a different key should not contend");
    }
}
