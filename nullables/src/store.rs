//! Nullable store — thread-safe in-memory storage for testing.

use idv_store::{
    RecordStore, SessionStore, StoreError, UserVerificationRecord, VerificationSession,
};
use idv_types::{Timestamp, UserId, VerificationProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An in-memory record + session store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullStore {
    records: Mutex<HashMap<UserId, UserVerificationRecord>>,
    sessions: Mutex<HashMap<UserId, VerificationSession>>,
    record_writes: AtomicU32,
    /// Countdown to an injected session write failure; 0 means disarmed.
    failing_session_write: AtomicU32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            record_writes: AtomicU32::new(0),
            failing_session_write: AtomicU32::new(0),
        }
    }

    /// Seed a record without counting it as a write.
    pub fn insert_record(&self, record: UserVerificationRecord) {
        lock(&self.records).insert(record.user_id.clone(), record);
    }

    /// Number of record writes (full puts and provider assignments).
    pub fn record_writes(&self) -> u32 {
        self.record_writes.load(Ordering::SeqCst)
    }

    pub fn record_count(&self) -> usize {
        lock(&self.records).len()
    }

    /// Make the `nth` session write from now fail (1 is the next one).
    pub fn fail_session_write(&self, nth: u32) {
        self.failing_session_write.store(nth, Ordering::SeqCst);
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for NullStore {
    fn get_record(&self, user: &UserId) -> Result<Option<UserVerificationRecord>, StoreError> {
        Ok(lock(&self.records).get(user).cloned())
    }

    fn put_record(&self, record: &UserVerificationRecord) -> Result<(), StoreError> {
        lock(&self.records).insert(record.user_id.clone(), record.clone());
        self.record_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn assign_provider_if_unset(
        &self,
        user: &UserId,
        provider: VerificationProvider,
        now: Timestamp,
    ) -> Result<VerificationProvider, StoreError> {
        let mut records = lock(&self.records);
        let record = records
            .entry(user.clone())
            .or_insert_with(|| UserVerificationRecord::new(user.clone(), now));
        if let Some(existing) = record.provider {
            return Ok(existing);
        }
        record.provider = Some(provider);
        self.record_writes.fetch_add(1, Ordering::SeqCst);
        Ok(provider)
    }
}

impl SessionStore for NullStore {
    fn get_session(&self, user: &UserId) -> Result<Option<VerificationSession>, StoreError> {
        Ok(lock(&self.sessions).get(user).cloned())
    }

    fn put_session(&self, session: &VerificationSession) -> Result<(), StoreError> {
        let fails_now = self
            .failing_session_write
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok_and(|remaining| remaining == 1);
        if fails_now {
            return Err(StoreError::Backend("injected session write failure".to_string()));
        }
        lock(&self.sessions).insert(session.user_id.clone(), session.clone());
        Ok(())
    }
}
