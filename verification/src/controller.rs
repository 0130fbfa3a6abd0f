//! Verification session controller — runs one provider-hosted attempt from
//! creation to its terminal callback and reconciles the result into the
//! user's verification record.
//!
//! Lifecycle per user:
//!
//! ```text
//! idle -> session_created -> awaiting_callback -> { verified | unverified | in_review }
//!   ^            |                   |
//!   +------------+---- cancel/error -+
//! ```
//!
//! The record is written only on a definitive result, so an abandoned or
//! cancelled attempt can never upgrade or downgrade a user.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use idv_store::{RecordStore, SessionStore, UserVerificationRecord, VerificationSession};
use idv_types::{
    Clock, Feature, NormalizedVerificationStatus, RawProviderStatus, SessionState, UserId,
    VerificationParams, VerificationProvider,
};
use idv_utils::stats::StatsSnapshot;
use idv_utils::{format_duration, StatsCounter};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::gate::{AccessDecision, AccessGate};
use crate::normalizer::{is_terminal, normalize};
use crate::provider::{ProviderClient, ProviderClientFactory, ProviderError};
use crate::selector::{ProviderSelector, UserProfile};
use crate::VerificationError;

const STAT_STARTED: &str = "sessions_started";
const STAT_REJECTED: &str = "sessions_rejected";
const STAT_PROVIDER_FAILURES: &str = "provider_failures";
const STAT_COMPLETED: &str = "callbacks_completed";
const STAT_REPLAYED: &str = "callbacks_replayed";
const STAT_CANCELLED: &str = "callbacks_cancelled";
const STAT_ERRORED: &str = "callbacks_errored";

const STAT_NAMES: &[&str] = &[
    STAT_STARTED,
    STAT_REJECTED,
    STAT_PROVIDER_FAILURES,
    STAT_COMPLETED,
    STAT_REPLAYED,
    STAT_CANCELLED,
    STAT_ERRORED,
];

/// Result of a terminal `on_complete` callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// The session reached a terminal state. `record_updated` is false when
    /// the record already held this exact status.
    Applied {
        status: NormalizedVerificationStatus,
        record_updated: bool,
    },
    /// Duplicate delivery of a callback already applied; nothing was written.
    Replayed,
}

/// Result of polling the provider for the current session's status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "poll", rename_all = "snake_case")]
pub enum PollOutcome {
    /// The provider reported a terminal status, applied like a callback.
    Completed { result: CallbackOutcome },
    /// The attempt is still open on the provider side.
    Pending { raw: Option<RawProviderStatus> },
}

/// What status displays and the access gate read about a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationStatusView {
    pub user_id: UserId,
    pub provider: Option<VerificationProvider>,
    pub status: NormalizedVerificationStatus,
    /// A live session is waiting on the provider.
    pub verifying: bool,
    pub session_state: Option<SessionState>,
}

/// Drives verification sessions for all users.
///
/// Shared behind an `Arc`; every dependency is injected so tests can swap
/// stores, clock, and provider clients.
pub struct VerificationSessionController {
    records: Arc<dyn RecordStore>,
    sessions: Arc<dyn SessionStore>,
    providers: Arc<dyn ProviderClientFactory>,
    clock: Arc<dyn Clock>,
    params: VerificationParams,
    selector: ProviderSelector,
    gate: AccessGate,
    /// Users with a `start_session` currently talking to a provider.
    starting: Mutex<HashSet<UserId>>,
    /// Serializes one user's session/record read-modify-write.
    user_locks: UserLocks,
    stats: StatsCounter,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a user's slot in `starting` until dropped.
struct StartReservation<'a> {
    starting: &'a Mutex<HashSet<UserId>>,
    user: UserId,
}

impl Drop for StartReservation<'_> {
    fn drop(&mut self) {
        lock(self.starting).remove(&self.user);
    }
}

/// Per-user exclusion. Users never wait on each other.
#[derive(Default)]
struct UserLocks {
    held: Mutex<HashSet<UserId>>,
    released: Condvar,
}

impl UserLocks {
    fn acquire(&self, user: &UserId) -> UserGuard<'_> {
        let mut held = lock(&self.held);
        while held.contains(user) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(user.clone());
        UserGuard {
            locks: self,
            user: user.clone(),
        }
    }
}

struct UserGuard<'a> {
    locks: &'a UserLocks,
    user: UserId,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        lock(&self.locks.held).remove(&self.user);
        self.locks.released.notify_all();
    }
}

impl VerificationSessionController {
    pub fn new(
        records: Arc<dyn RecordStore>,
        sessions: Arc<dyn SessionStore>,
        providers: Arc<dyn ProviderClientFactory>,
        clock: Arc<dyn Clock>,
        params: VerificationParams,
    ) -> Self {
        Self {
            records,
            sessions,
            providers,
            clock,
            params,
            selector: ProviderSelector,
            gate: AccessGate,
            starting: Mutex::new(HashSet::new()),
            user_locks: UserLocks::default(),
            stats: StatsCounter::new(STAT_NAMES),
        }
    }

    pub fn params(&self) -> &VerificationParams {
        &self.params
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Create a provider-hosted session for the user's selected provider.
    ///
    /// Rejects with [`VerificationError::DuplicateSessionRejected`] while a
    /// previous session is still in flight and younger than the TTL, or while
    /// another start for the same user is talking to the provider.
    pub async fn start_session(
        &self,
        profile: &UserProfile,
    ) -> Result<VerificationSession, VerificationError> {
        let user = &profile.user_id;
        let now = self.clock.now();
        let provider = self.selector.select(self.records.as_ref(), profile, now)?;

        let _reservation = self.reserve_start(user)?;

        if let Some(existing) = self.sessions.get_session(user)? {
            if existing.is_live(self.params.session_ttl_secs, now) {
                let age_secs = existing.created_at.elapsed_since(now);
                self.stats.increment(STAT_REJECTED);
                warn!(
                    %user,
                    state = %existing.state,
                    age = %format_duration(age_secs),
                    "rejected duplicate verification session"
                );
                return Err(VerificationError::DuplicateSessionRejected {
                    user: user.clone(),
                    age_secs,
                });
            }
        }

        let client = self.client(provider)?;
        let external = match timeout(self.params.provider_timeout(), client.create_session(user)).await
        {
            Ok(Ok(external)) => external,
            Ok(Err(e)) => return Err(self.provider_unavailable(provider, e)),
            Err(_) => return Err(self.provider_unavailable(provider, ProviderError::Timeout)),
        };

        let session = VerificationSession::new(
            user.clone(),
            provider,
            external.external_session_id,
            self.clock.now(),
        );
        self.sessions.put_session(&session)?;
        self.stats.increment(STAT_STARTED);
        info!(
            %user,
            %provider,
            session = %session.external_session_id,
            "verification session created"
        );
        Ok(session)
    }

    /// Hand the session to the provider's client flow.
    ///
    /// Moves the session to `awaiting_callback` and returns the three hooks
    /// the client flow reports through. Launching an already-launched
    /// session again returns fresh hooks without another transition.
    pub fn launch_client_flow(
        &self,
        session: &VerificationSession,
    ) -> Result<FlowCallbacks<'_>, VerificationError> {
        let _guard = self.user_locks.acquire(&session.user_id);
        let now = self.clock.now();
        let mut current = self.current_session(&session.user_id, &session.external_session_id)?;

        if !current.is_live(self.params.session_ttl_secs, now) {
            return Err(VerificationError::SessionNotFound(format!(
                "session {} is {} and can no longer be launched",
                current.external_session_id, current.state
            )));
        }
        if current.state == SessionState::SessionCreated {
            current.state = SessionState::AwaitingCallback;
            self.sessions.put_session(&current)?;
            debug!(user = %current.user_id, session = %current.external_session_id, "client flow launched");
        }

        Ok(FlowCallbacks {
            controller: self,
            user_id: current.user_id,
            provider: current.provider,
            external_session_id: current.external_session_id,
        })
    }

    /// Return a session whose client flow never launched to idle, so the
    /// user can start again without waiting out the TTL.
    pub fn abandon_session(&self, session: &VerificationSession) -> Result<(), VerificationError> {
        let state = self.end_attempt(&session.user_id, &session.external_session_id)?;
        debug!(user = %session.user_id, session = %session.external_session_id, %state, "unlaunched session released");
        Ok(())
    }

    /// Hooks for a session whose callback arrives out of band (webhook or a
    /// client reporting back over HTTP).
    pub fn callbacks(
        &self,
        user: &UserId,
        external_session_id: &str,
    ) -> Result<FlowCallbacks<'_>, VerificationError> {
        let session = self.current_session(user, external_session_id)?;
        Ok(FlowCallbacks {
            controller: self,
            user_id: session.user_id,
            provider: session.provider,
            external_session_id: session.external_session_id,
        })
    }

    /// Normalized status, provider, and whether a session is in flight.
    pub fn get_status(&self, user: &UserId) -> Result<VerificationStatusView, VerificationError> {
        let record = self.records.get_record(user)?;
        let session = self.sessions.get_session(user)?;
        let now = self.clock.now();

        Ok(VerificationStatusView {
            user_id: user.clone(),
            provider: record.as_ref().and_then(|r| r.provider),
            status: record.map(|r| r.normalized_status).unwrap_or_default(),
            verifying: session
                .as_ref()
                .is_some_and(|s| s.is_live(self.params.session_ttl_secs, now)),
            session_state: session.map(|s| s.state),
        })
    }

    /// Access decision for `feature` from the user's current status.
    pub fn check_access(
        &self,
        user: &UserId,
        feature: Feature,
    ) -> Result<AccessDecision, VerificationError> {
        let view = self.get_status(user)?;
        Ok(self
            .gate
            .check(feature, view.status, view.verifying, view.provider))
    }

    /// Ask the provider for the current session's status and apply it if terminal.
    pub async fn poll_status(&self, user: &UserId) -> Result<PollOutcome, VerificationError> {
        let session = self.sessions.get_session(user)?.ok_or_else(|| {
            VerificationError::SessionNotFound(format!("no verification session for user {user}"))
        })?;
        let client = self.client(session.provider)?;

        let fetch = client.fetch_status(user, &session.external_session_id);
        let raw = match timeout(self.params.provider_timeout(), fetch).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(self.provider_unavailable(session.provider, e)),
            Err(_) => {
                return Err(self.provider_unavailable(session.provider, ProviderError::Timeout))
            }
        };

        if is_terminal(session.provider, raw.as_ref().map(RawProviderStatus::as_str)) {
            let result = self.complete(user, &session.external_session_id, raw)?;
            Ok(PollOutcome::Completed { result })
        } else {
            debug!(%user, raw = ?raw, "polled status is not terminal");
            Ok(PollOutcome::Pending { raw })
        }
    }

    fn reserve_start(&self, user: &UserId) -> Result<StartReservation<'_>, VerificationError> {
        if !lock(&self.starting).insert(user.clone()) {
            self.stats.increment(STAT_REJECTED);
            warn!(%user, "rejected concurrent verification start");
            return Err(VerificationError::DuplicateSessionRejected {
                user: user.clone(),
                age_secs: 0,
            });
        }
        Ok(StartReservation {
            starting: &self.starting,
            user: user.clone(),
        })
    }

    fn client(
        &self,
        provider: VerificationProvider,
    ) -> Result<Arc<dyn ProviderClient>, VerificationError> {
        let client = self.providers.client_for(provider).map_err(|e| {
            error!(%provider, error = %e, "no usable client for selected provider");
            e
        })?;
        if client.provider() != provider {
            error!(%provider, got = %client.provider(), "provider client registered under the wrong provider");
            return Err(VerificationError::InvalidProviderConfig(format!(
                "client for {provider} reports provider {}",
                client.provider()
            )));
        }
        Ok(client)
    }

    fn provider_unavailable(
        &self,
        provider: VerificationProvider,
        cause: ProviderError,
    ) -> VerificationError {
        self.stats.increment(STAT_PROVIDER_FAILURES);
        warn!(%provider, error = %cause, "verification provider call failed");
        VerificationError::ProviderUnavailable {
            provider,
            reason: cause.to_string(),
        }
    }

    fn current_session(
        &self,
        user: &UserId,
        external_session_id: &str,
    ) -> Result<VerificationSession, VerificationError> {
        self.sessions
            .get_session(user)?
            .filter(|s| s.external_session_id == external_session_id)
            .ok_or_else(|| {
                VerificationError::SessionNotFound(format!(
                    "session {external_session_id} is not the current session of user {user}"
                ))
            })
    }

    fn complete(
        &self,
        user: &UserId,
        external_session_id: &str,
        raw: Option<RawProviderStatus>,
    ) -> Result<CallbackOutcome, VerificationError> {
        match self.apply_terminal(user, external_session_id, raw) {
            Err(VerificationError::CallbackReplay(session)) => {
                self.stats.increment(STAT_REPLAYED);
                debug!(%user, %session, "ignoring replayed terminal callback");
                Ok(CallbackOutcome::Replayed)
            }
            other => other,
        }
    }

    fn apply_terminal(
        &self,
        user: &UserId,
        external_session_id: &str,
        raw: Option<RawProviderStatus>,
    ) -> Result<CallbackOutcome, VerificationError> {
        let _guard = self.user_locks.acquire(user);
        let mut session = self.current_session(user, external_session_id)?;
        let status = normalize(session.provider, raw.as_ref().map(RawProviderStatus::as_str));
        let terminal_state = SessionState::from(status);
        let now = self.clock.now();

        let record = self
            .records
            .get_record(user)?
            .unwrap_or_else(|| UserVerificationRecord::new(user.clone(), now));
        let record_current = record.reflects(status, raw.as_ref());

        if record_current && session.terminal_callback_received && session.state == terminal_state {
            return Err(VerificationError::CallbackReplay(
                external_session_id.to_string(),
            ));
        }

        if !record_current {
            let previous = record.normalized_status;
            let updated = UserVerificationRecord {
                provider: record.provider.or(Some(session.provider)),
                normalized_status: status,
                last_raw_status: raw.clone(),
                last_updated_at: now,
                ..record
            };
            self.records.put_record(&updated)?;
            info!(
                %user,
                provider = %session.provider,
                raw = raw.as_ref().map(RawProviderStatus::as_str).unwrap_or("<none>"),
                from = %previous,
                to = %status,
                "verification status updated"
            );
        }

        session.state = terminal_state;
        session.terminal_callback_received = true;
        self.sessions.put_session(&session)?;
        self.stats.increment(STAT_COMPLETED);

        Ok(CallbackOutcome::Applied {
            status,
            record_updated: !record_current,
        })
    }

    fn end_attempt(
        &self,
        user: &UserId,
        external_session_id: &str,
    ) -> Result<SessionState, VerificationError> {
        let _guard = self.user_locks.acquire(user);
        let mut session = self.current_session(user, external_session_id)?;
        // A cancel racing a completed result must not undo it.
        if session.state.is_in_flight() {
            session.state = SessionState::Idle;
            self.sessions.put_session(&session)?;
        }
        Ok(session.state)
    }
}

/// Terminal callback hooks bound to one session.
pub struct FlowCallbacks<'a> {
    controller: &'a VerificationSessionController,
    user_id: UserId,
    provider: VerificationProvider,
    external_session_id: String,
}

impl FlowCallbacks<'_> {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn provider(&self) -> VerificationProvider {
        self.provider
    }

    /// Link token or inquiry id the client flow is opened with.
    pub fn external_session_id(&self) -> &str {
        &self.external_session_id
    }

    /// The provider finished the attempt with `raw` as its terminal status.
    ///
    /// Safe to call more than once: a duplicate delivery is reported as
    /// [`CallbackOutcome::Replayed`] and writes nothing.
    pub fn on_complete(&self, raw: Option<&str>) -> Result<CallbackOutcome, VerificationError> {
        self.controller.complete(
            &self.user_id,
            &self.external_session_id,
            raw.map(RawProviderStatus::new),
        )
    }

    /// The user closed the flow. The verification record is left untouched.
    pub fn on_cancel(&self) -> Result<(), VerificationError> {
        let state = self
            .controller
            .end_attempt(&self.user_id, &self.external_session_id)?;
        self.controller.stats.increment(STAT_CANCELLED);
        info!(user = %self.user_id, provider = %self.provider, %state, "verification flow cancelled");
        Ok(())
    }

    /// The client flow failed. Logged; the verification record is left untouched.
    pub fn on_error(&self, err: &str) -> Result<(), VerificationError> {
        let state = self
            .controller
            .end_attempt(&self.user_id, &self.external_session_id)?;
        self.controller.stats.increment(STAT_ERRORED);
        warn!(
            user = %self.user_id,
            provider = %self.provider,
            %state,
            error = err,
            "verification flow reported an error"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ExternalSession, ProviderRegistry};
    use async_trait::async_trait;
    use idv_store::StoreError;
    use idv_types::Timestamp;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

    // ── Test doubles ────────────────────────────────────────────────────

    #[derive(Default)]
    struct MemStore {
        records: Mutex<HashMap<UserId, UserVerificationRecord>>,
        sessions: Mutex<HashMap<UserId, VerificationSession>>,
    }

    impl RecordStore for MemStore {
        fn get_record(&self, user: &UserId) -> Result<Option<UserVerificationRecord>, StoreError> {
            Ok(self.records.lock().unwrap().get(user).cloned())
        }

        fn put_record(&self, record: &UserVerificationRecord) -> Result<(), StoreError> {
            self.records
                .lock()
                .unwrap()
                .insert(record.user_id.clone(), record.clone());
            Ok(())
        }

        fn assign_provider_if_unset(
            &self,
            user: &UserId,
            provider: VerificationProvider,
            now: Timestamp,
        ) -> Result<VerificationProvider, StoreError> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .entry(user.clone())
                .or_insert_with(|| UserVerificationRecord::new(user.clone(), now));
            Ok(*record.provider.get_or_insert(provider))
        }
    }

    impl SessionStore for MemStore {
        fn get_session(&self, user: &UserId) -> Result<Option<VerificationSession>, StoreError> {
            Ok(self.sessions.lock().unwrap().get(user).cloned())
        }

        fn put_session(&self, session: &VerificationSession) -> Result<(), StoreError> {
            self.sessions
                .lock()
                .unwrap()
                .insert(session.user_id.clone(), session.clone());
            Ok(())
        }
    }

    struct TestClock(AtomicU64);

    impl TestClock {
        fn advance(&self, secs: u64) {
            self.0.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Timestamp {
            Timestamp::new(self.0.load(Ordering::SeqCst))
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Ok,
        Fail,
        Hang,
    }

    struct FakeProvider {
        provider: VerificationProvider,
        mode: Mutex<Mode>,
        created: AtomicU32,
        status: Mutex<Option<String>>,
    }

    impl FakeProvider {
        fn new(provider: VerificationProvider) -> Arc<Self> {
            Arc::new(Self {
                provider,
                mode: Mutex::new(Mode::Ok),
                created: AtomicU32::new(0),
                status: Mutex::new(None),
            })
        }

        fn set_mode(&self, mode: Mode) {
            *self.mode.lock().unwrap() = mode;
        }
    }

    #[async_trait]
    impl ProviderClient for FakeProvider {
        fn provider(&self) -> VerificationProvider {
            self.provider
        }

        async fn create_session(&self, _user: &UserId) -> Result<ExternalSession, ProviderError> {
            let mode = *self.mode.lock().unwrap();
            tokio::task::yield_now().await;
            match mode {
                Mode::Ok => {
                    let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(ExternalSession {
                        external_session_id: format!("{}-{n}", self.provider),
                    })
                }
                Mode::Fail => Err(ProviderError::Status(503)),
                Mode::Hang => std::future::pending().await,
            }
        }

        async fn fetch_status(
            &self,
            _user: &UserId,
            _external_session_id: &str,
        ) -> Result<Option<RawProviderStatus>, ProviderError> {
            Ok(self.status.lock().unwrap().as_deref().map(RawProviderStatus::new))
        }
    }

    struct Harness {
        controller: VerificationSessionController,
        store: Arc<MemStore>,
        clock: Arc<TestClock>,
        plaid: Arc<FakeProvider>,
        persona: Arc<FakeProvider>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemStore::default());
        let clock = Arc::new(TestClock(AtomicU64::new(1_000)));
        let plaid = FakeProvider::new(VerificationProvider::Plaid);
        let persona = FakeProvider::new(VerificationProvider::Persona);
        let registry = ProviderRegistry::new()
            .with(plaid.clone())
            .with(persona.clone());
        let params = VerificationParams {
            session_ttl_secs: 300,
            provider_timeout_secs: 1,
        };
        let controller = VerificationSessionController::new(
            store.clone(),
            store.clone(),
            Arc::new(registry),
            clock.clone(),
            params,
        );
        Harness {
            controller,
            store,
            clock,
            plaid,
            persona,
        }
    }

    fn profile(id: &str, phone: &str) -> UserProfile {
        UserProfile::new(UserId::new(id).unwrap(), Some(phone.to_string()))
    }

    fn record(h: &Harness, id: &str) -> UserVerificationRecord {
        h.store
            .get_record(&UserId::new(id).unwrap())
            .unwrap()
            .unwrap()
    }

    // ── start_session ───────────────────────────────────────────────────

    #[tokio::test]
    async fn start_routes_by_phone_and_persists_provider() {
        let h = harness();
        let session = h
            .controller
            .start_session(&profile("ana", "+54 9 11 5555 0000"))
            .await
            .unwrap();

        assert_eq!(session.provider, VerificationProvider::Persona);
        assert_eq!(session.state, SessionState::SessionCreated);
        assert_eq!(session.external_session_id, "persona-1");
        assert_eq!(record(&h, "ana").provider, Some(VerificationProvider::Persona));
        assert_eq!(h.plaid.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn live_session_blocks_a_second_start() {
        let h = harness();
        let user = profile("bo", "+1 212 555 0101");
        let first = h.controller.start_session(&user).await.unwrap();
        h.controller.launch_client_flow(&first).unwrap();
        h.clock.advance(30);

        let err = h.controller.start_session(&user).await.unwrap_err();
        match err {
            VerificationError::DuplicateSessionRejected { age_secs, .. } => assert_eq!(age_secs, 30),
            other => panic!("expected duplicate rejection, got {other:?}"),
        }
        assert_eq!(h.plaid.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_session_does_not_block() {
        let h = harness();
        let user = profile("cy", "+1 212 555 0102");
        let first = h.controller.start_session(&user).await.unwrap();
        h.controller.launch_client_flow(&first).unwrap();
        h.clock.advance(301);

        let second = h.controller.start_session(&user).await.unwrap();
        assert_ne!(second.external_session_id, first.external_session_id);
        assert_eq!(h.plaid.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_starts_create_one_external_session() {
        let h = harness();
        let user = profile("di", "+52 55 1234 5678");
        let (a, b) = tokio::join!(
            h.controller.start_session(&user),
            h.controller.start_session(&user)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(h.persona.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_failure_is_retryable_and_leaves_no_session() {
        let h = harness();
        let user = profile("ed", "+1 305 555 0199");
        h.plaid.set_mode(Mode::Fail);

        let err = h.controller.start_session(&user).await.unwrap_err();
        assert!(matches!(err, VerificationError::ProviderUnavailable { .. }));
        assert!(err.is_retryable());
        assert!(h.store.get_session(&user.user_id).unwrap().is_none());

        h.plaid.set_mode(Mode::Ok);
        assert!(h.controller.start_session(&user).await.is_ok());
    }

    #[tokio::test]
    async fn provider_timeout_is_bounded() {
        let h = harness();
        h.persona.set_mode(Mode::Hang);
        let err = h
            .controller
            .start_session(&profile("fi", "+57 300 123 4567"))
            .await
            .unwrap_err();
        match err {
            VerificationError::ProviderUnavailable { reason, .. } => {
                assert_eq!(reason, ProviderError::Timeout.to_string())
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfigured_provider_fails_fast() {
        let store = Arc::new(MemStore::default());
        let registry = ProviderRegistry::new().with(FakeProvider::new(VerificationProvider::Plaid));
        let controller = VerificationSessionController::new(
            store.clone(),
            store,
            Arc::new(registry),
            Arc::new(TestClock(AtomicU64::new(0))),
            VerificationParams::defaults(),
        );
        let err = controller
            .start_session(&profile("gu", "+56 9 8765 4321"))
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::InvalidProviderConfig(_)));
        assert!(!err.is_retryable());
    }

    // ── callbacks ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn complete_twice_only_writes_once() {
        let h = harness();
        let session = h
            .controller
            .start_session(&profile("hu", "+1 415 555 0110"))
            .await
            .unwrap();
        let hooks = h.controller.launch_client_flow(&session).unwrap();
        h.clock.advance(10);

        let first = hooks.on_complete(Some("success")).unwrap();
        assert_eq!(
            first,
            CallbackOutcome::Applied {
                status: NormalizedVerificationStatus::Verified,
                record_updated: true
            }
        );
        let written_at = record(&h, "hu").last_updated_at;
        assert_eq!(written_at, Timestamp::new(1_010));

        h.clock.advance(10);
        let second = hooks.on_complete(Some("success")).unwrap();
        assert_eq!(second, CallbackOutcome::Replayed);
        assert_eq!(record(&h, "hu").last_updated_at, written_at);
        assert_eq!(h.controller.stats().0["callbacks_replayed"], 1);
    }

    #[tokio::test]
    async fn cancel_never_downgrades_a_verified_user() {
        let h = harness();
        let user = profile("io", "+1 415 555 0111");
        let session = h.controller.start_session(&user).await.unwrap();
        h.controller
            .launch_client_flow(&session)
            .unwrap()
            .on_complete(Some("approved"))
            .unwrap();

        let retry = h.controller.start_session(&user).await.unwrap();
        let hooks = h.controller.launch_client_flow(&retry).unwrap();
        hooks.on_cancel().unwrap();

        let rec = record(&h, "io");
        assert_eq!(rec.normalized_status, NormalizedVerificationStatus::Verified);
        assert_eq!(rec.last_raw_status, Some("approved".into()));
        let view = h.controller.get_status(&user.user_id).unwrap();
        assert_eq!(view.session_state, Some(SessionState::Idle));
        assert!(!view.verifying);
    }

    #[tokio::test]
    async fn error_returns_to_idle_and_allows_immediate_retry() {
        let h = harness();
        let user = profile("ju", "+51 912 345 678");
        let session = h.controller.start_session(&user).await.unwrap();
        h.controller
            .launch_client_flow(&session)
            .unwrap()
            .on_error("sdk failed to load")
            .unwrap();

        assert_eq!(
            record(&h, "ju").normalized_status,
            NormalizedVerificationStatus::Unverified
        );
        assert_eq!(record(&h, "ju").last_raw_status, None);
        assert!(h.controller.start_session(&user).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_after_completion_keeps_terminal_state() {
        let h = harness();
        let session = h
            .controller
            .start_session(&profile("ka", "+1 415 555 0112"))
            .await
            .unwrap();
        let hooks = h.controller.launch_client_flow(&session).unwrap();
        hooks.on_complete(Some("pending_review")).unwrap();
        hooks.on_cancel().unwrap();

        let view = h.controller.get_status(&session.user_id).unwrap();
        assert_eq!(view.session_state, Some(SessionState::InReview));
        assert_eq!(view.status, NormalizedVerificationStatus::InReview);
    }

    #[tokio::test]
    async fn decline_after_review_reverts_to_unverified() {
        let h = harness();
        let session = h
            .controller
            .start_session(&profile("lu", "+55 11 91234 5678"))
            .await
            .unwrap();
        let hooks = h.controller.launch_client_flow(&session).unwrap();
        hooks.on_complete(Some("pending_review")).unwrap();
        let outcome = hooks.on_complete(Some("declined")).unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Applied {
                status: NormalizedVerificationStatus::Unverified,
                record_updated: true
            }
        );
        assert_eq!(record(&h, "lu").last_raw_status, Some("declined".into()));
    }

    #[tokio::test]
    async fn callbacks_for_superseded_sessions_are_rejected() {
        let h = harness();
        let user = profile("mo", "+1 415 555 0113");
        let first = h.controller.start_session(&user).await.unwrap();
        h.controller.launch_client_flow(&first).unwrap().on_cancel().unwrap();
        let _second = h.controller.start_session(&user).await.unwrap();

        let err = h
            .controller
            .callbacks(&user.user_id, &first.external_session_id)
            .err()
            .unwrap();
        assert!(matches!(err, VerificationError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn expired_session_cannot_be_launched() {
        let h = harness();
        let session = h
            .controller
            .start_session(&profile("nu", "+1 415 555 0114"))
            .await
            .unwrap();
        h.clock.advance(400);
        assert!(matches!(
            h.controller.launch_client_flow(&session).err().unwrap(),
            VerificationError::SessionNotFound(_)
        ));
    }

    // ── polling and access ──────────────────────────────────────────────

    #[tokio::test]
    async fn polling_applies_only_terminal_statuses() {
        let h = harness();
        let user = profile("ol", "+593 99 123 4567");
        let session = h.controller.start_session(&user).await.unwrap();
        h.controller.launch_client_flow(&session).unwrap();

        *h.persona.status.lock().unwrap() = Some("created".into());
        let pending = h.controller.poll_status(&user.user_id).await.unwrap();
        assert_eq!(pending, PollOutcome::Pending { raw: Some("created".into()) });
        assert_eq!(record(&h, "ol").last_raw_status, None);

        *h.persona.status.lock().unwrap() = Some("completed".into());
        let done = h.controller.poll_status(&user.user_id).await.unwrap();
        assert_eq!(
            done,
            PollOutcome::Completed {
                result: CallbackOutcome::Applied {
                    status: NormalizedVerificationStatus::Verified,
                    record_updated: true
                }
            }
        );
    }

    #[tokio::test]
    async fn access_follows_status_and_redirects_to_selected_provider() {
        let h = harness();
        let user = profile("pa", "+52 33 1234 5678");
        let session = h.controller.start_session(&user).await.unwrap();
        let hooks = h.controller.launch_client_flow(&session).unwrap();

        let denied = h.controller.check_access(&user.user_id, Feature::Send).unwrap();
        assert_eq!(
            denied,
            AccessDecision::Denied {
                feature: Feature::Send,
                reason: crate::gate::DenialReason::VerificationRequired,
                verifying: true,
                redirect: Some(VerificationProvider::Persona),
            }
        );

        hooks.on_complete(Some("completed")).unwrap();
        assert!(h
            .controller
            .check_access(&user.user_id, Feature::BankTransfer)
            .unwrap()
            .is_granted());
    }

    #[tokio::test]
    async fn abandoned_session_does_not_block_a_retry() {
        let h = harness();
        let user = profile("ma", "+1 415 555 0140");
        let session = h.controller.start_session(&user).await.unwrap();
        assert!(matches!(
            h.controller.start_session(&user).await,
            Err(VerificationError::DuplicateSessionRejected { .. })
        ));

        h.controller.abandon_session(&session).unwrap();
        let view = h.controller.get_status(&user.user_id).unwrap();
        assert_eq!(view.session_state, Some(SessionState::Idle));
        assert!(!view.verifying);
        assert!(h.controller.start_session(&user).await.is_ok());
    }

    #[tokio::test]
    async fn one_users_lock_does_not_block_another() {
        let h = harness();
        let held_user = profile("na", "+1 415 555 0150");
        let other = profile("nb", "+1 415 555 0151");
        h.controller.start_session(&held_user).await.unwrap();
        let other_session = h.controller.start_session(&other).await.unwrap();

        let held = h.controller.user_locks.acquire(&held_user.user_id);
        let outcome = h
            .controller
            .launch_client_flow(&other_session)
            .unwrap()
            .on_complete(Some("success"))
            .unwrap();
        assert!(matches!(outcome, CallbackOutcome::Applied { .. }));

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                let _same = h.controller.user_locks.acquire(&held_user.user_id);
                tx.send(()).unwrap();
            });
            assert!(rx.recv_timeout(std::time::Duration::from_millis(50)).is_err());
            drop(held);
            assert!(rx.recv_timeout(std::time::Duration::from_secs(5)).is_ok());
        });
    }

    #[test]
    fn unknown_user_reads_as_unverified() {
        let h = harness();
        let view = h.controller.get_status(&UserId::new("nobody").unwrap()).unwrap();
        assert_eq!(view.status, NormalizedVerificationStatus::Unverified);
        assert_eq!(view.provider, None);
        assert!(!view.verifying);
    }
}
