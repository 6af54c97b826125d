//! Auth orchestrator.
//!
//! Owns the session token and the current-user snapshot. Nothing else in
//! the crate writes either; other components read them through
//! [`Auth::token`] and [`Auth::current_user`] and observe transitions at
//! [`AuthState::PATH`].
//!
//! ```text
//!   Unknown ──hydrate──▶ Anonymous ◀──logout / 401──┐
//!      │                    │                        │
//!      └──hydrate──▶ Authenticated ◀──login──────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shortsns_api::{ApiError, CreateUser, IdentityLogin, UpdateUser, User, UserId};
use tracing::{debug, info, warn};

use crate::backend::AccountApi;
use crate::session::{SessionError, SessionStore};
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    /// Before [`Auth::hydrate`] has settled. Views must not render
    /// signed-in or signed-out affordances yet.
    #[default]
    Unknown,
    Anonymous,
    Authenticated,
}

/// Published at `auth/state` on every transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub phase: AuthPhase,
    pub user: Option<User>,
    /// A login, refresh or profile update is on the wire.
    pub busy: bool,
    /// Message of the last failed operation, cleared by the next success.
    pub error: Option<String>,
}

impl AuthState {
    pub const PATH: &'static str = "auth/state";
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("not signed in")]
    NotAuthenticated,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AuthError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AuthError::Api(e) if e.is_unauthorized())
    }
}

#[derive(Default)]
struct Inner {
    phase: AuthPhase,
    token: Option<String>,
    user: Option<User>,
    /// Open network calls.
    busy: usize,
}

impl Inner {
    fn snapshot(&self, error: Option<String>) -> AuthState {
        AuthState {
            phase: self.phase,
            user: self.user.clone(),
            busy: self.busy > 0,
            error,
        }
    }
}

pub struct Auth<A> {
    api: A,
    session: Arc<dyn SessionStore>,
    store: Arc<StateStore>,
    inner: Mutex<Inner>,
}

impl<A: AccountApi> Auth<A> {
    pub fn new(api: A, session: Arc<dyn SessionStore>, store: Arc<StateStore>) -> Self {
        store.set(AuthState::PATH, AuthState::default());
        Self { api, session, store, inner: Mutex::new(Inner::default()) }
    }

    pub fn phase(&self) -> AuthPhase {
        self.lock().phase
    }

    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    /// Last published state.
    pub fn state(&self) -> AuthState {
        self.store.read::<AuthState>(AuthState::PATH).unwrap_or_default()
    }

    /// Reconcile the stored token with the server.
    ///
    /// A token the server does not accept for any reason is discarded and
    /// the phase settles at `Anonymous`. Never fails.
    pub async fn hydrate(&self) -> AuthPhase {
        let stored = match self.session.get() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "session store unreadable, starting signed out");
                None
            }
        };
        let Some(token) = stored else {
            self.settle(None, |inner| {
                inner.phase = AuthPhase::Anonymous;
                inner.token = None;
                inner.user = None;
            });
            return AuthPhase::Anonymous;
        };

        self.begin();
        match self.api.me(&token).await {
            Ok(user) => {
                info!(user_id = user.user_id, "session restored");
                self.end(None, |inner| {
                    if superseded(inner, &token) {
                        return inner.phase;
                    }
                    inner.phase = AuthPhase::Authenticated;
                    inner.token = Some(token);
                    inner.user = Some(user);
                    inner.phase
                })
            }
            Err(e) => {
                warn!(error = %e, "stored session rejected, clearing");
                self.end(None, |inner| {
                    if superseded(inner, &token) {
                        return inner.phase;
                    }
                    self.clear_session_if(&token);
                    inner.phase = AuthPhase::Anonymous;
                    inner.token = None;
                    inner.user = None;
                    inner.phase
                })
            }
        }
    }

    /// Sign in with an assertion from the external identity provider.
    ///
    /// The token is stored only once the profile fetch with it succeeded.
    /// On failure phase, token and user are left as they were.
    pub async fn login_with_identity_assertion(
        &self,
        assertion: &str,
        email: &str,
        display_name: &str,
    ) -> Result<User, AuthError> {
        let login = IdentityLogin {
            id_token: assertion.to_string(),
            email: email.to_string(),
            display_name: display_name.to_string(),
        };
        self.begin();
        let token = self.api.identity_login(&login).await;
        self.finish_login(token).await
    }

    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.begin();
        let token = self.api.password_login(email, password).await;
        self.finish_login(token).await
    }

    /// Create the account, then sign in with its credentials.
    pub async fn register(&self, account: &CreateUser) -> Result<User, AuthError> {
        self.begin();
        if let Err(e) = self.api.create_user(account).await {
            warn!(error = %e, "registration failed");
            self.end(Some(e.to_string()), |_| ());
            return Err(e.into());
        }
        info!(username = %account.username, "account created");
        let token = self.api.password_login(&account.user_mail, &account.password).await;
        self.finish_login(token).await
    }

    /// Local only. Always succeeds.
    pub fn logout(&self) {
        self.clear_session();
        self.settle(None, |inner| {
            inner.phase = AuthPhase::Anonymous;
            inner.token = None;
            inner.user = None;
        });
        info!("signed out");
    }

    /// Re-fetch the current user.
    ///
    /// A 401 signs out like a failed hydrate. Other errors keep the
    /// current state.
    pub async fn refresh_user(&self) -> Result<User, AuthError> {
        let token = self.token().ok_or(AuthError::NotAuthenticated)?;
        self.begin();
        match self.api.me(&token).await {
            Ok(user) => {
                self.end(None, |inner| {
                    if inner.token.as_deref() == Some(token.as_str()) {
                        inner.user = Some(user.clone());
                    }
                });
                Ok(user)
            }
            Err(e) if e.is_unauthorized() => {
                warn!("session rejected on refresh, signing out");
                self.end(None, |inner| self.revoke(inner, &token));
                Err(e.into())
            }
            Err(e) => {
                warn!(error = %e, "refresh failed");
                self.end(Some(e.to_string()), |_| ());
                Err(e.into())
            }
        }
    }

    /// Send a partial update and adopt the server's copy of the user.
    pub async fn update_profile(&self, patch: &UpdateUser) -> Result<User, AuthError> {
        let (token, id) = self.signed_in()?;
        if patch.is_empty() {
            return self.current_user().ok_or(AuthError::NotAuthenticated);
        }
        self.begin();
        match self.api.update_user(id, patch, &token).await {
            Ok(user) => {
                self.end(None, |inner| {
                    if inner.token.as_deref() == Some(token.as_str()) {
                        inner.user = Some(user.clone());
                    }
                });
                Ok(user)
            }
            Err(e) => {
                self.end(Some(e.to_string()), |_| ());
                Err(e.into())
            }
        }
    }

    /// Sign out because the server answered 401 to a request made with
    /// `token`. Ignored when the session has moved on since. Returns
    /// whether the session was dropped.
    pub fn invalidate(&self, token: &str) -> bool {
        let state = {
            let mut inner = self.lock();
            if !self.revoke(&mut inner, token) {
                return false;
            }
            inner.snapshot(None)
        };
        warn!("session rejected by server, signed out");
        self.store.set(AuthState::PATH, state);
        true
    }

    fn signed_in(&self) -> Result<(String, UserId), AuthError> {
        let inner = self.lock();
        match (inner.phase, &inner.token, &inner.user) {
            (AuthPhase::Authenticated, Some(token), Some(user)) => Ok((token.clone(), user.user_id)),
            _ => Err(AuthError::NotAuthenticated),
        }
    }

    async fn finish_login(&self, token: Result<String, ApiError>) -> Result<User, AuthError> {
        let outcome = match token {
            Ok(token) => self.adopt(token).await,
            Err(e) => Err(e.into()),
        };
        match outcome {
            Ok((token, user)) => {
                info!(user_id = user.user_id, "signed in");
                let out = user.clone();
                self.end(None, |inner| {
                    inner.phase = AuthPhase::Authenticated;
                    inner.token = Some(token);
                    inner.user = Some(user);
                });
                Ok(out)
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                self.end(Some(e.to_string()), |_| ());
                Err(e)
            }
        }
    }

    async fn adopt(&self, token: String) -> Result<(String, User), AuthError> {
        let user = self.api.me(&token).await?;
        self.session.save(&token)?;
        Ok((token, user))
    }

    /// Drop the session if it still is `token`.
    fn revoke(&self, inner: &mut Inner, token: &str) -> bool {
        if inner.token.as_deref() != Some(token) {
            return false;
        }
        self.clear_session_if(token);
        inner.phase = AuthPhase::Anonymous;
        inner.token = None;
        inner.user = None;
        true
    }

    /// Clear the stored token unless a login has already replaced it.
    fn clear_session_if(&self, token: &str) {
        match self.session.get() {
            Ok(Some(stored)) if stored != token => debug!("stored session replaced, keeping it"),
            _ => self.clear_session(),
        }
    }

    fn clear_session(&self) {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "failed to clear stored session");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) {
        self.settle(None, |inner| inner.busy += 1);
    }

    fn end<R>(&self, error: Option<String>, f: impl FnOnce(&mut Inner) -> R) -> R {
        self.settle(error, |inner| {
            inner.busy = inner.busy.saturating_sub(1);
            f(inner)
        })
    }

    /// Mutate under the lock, then publish with the lock released.
    fn settle<R>(&self, error: Option<String>, f: impl FnOnce(&mut Inner) -> R) -> R {
        let (out, state) = {
            let mut inner = self.lock();
            let out = f(&mut inner);
            (out, inner.snapshot(error))
        };
        self.store.set(AuthState::PATH, state);
        out
    }
}

/// A login finished while a request made with `token` was pending.
fn superseded(inner: &Inner, token: &str) -> bool {
    inner.token.as_deref().is_some_and(|t| t != token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn alice() -> User {
        User {
            user_id: 1,
            username: "alice".into(),
            user_name: "Alice".into(),
            user_mail: "alice@example.com".into(),
            user_rank: "bronze".into(),
            ..Default::default()
        }
    }

    /// Accounts keyed by token. `me` answers 401 for unknown tokens, or
    /// a 500 while `broken` is set. A `me` for the gated token waits for
    /// the gate first.
    #[derive(Default)]
    struct FakeAccounts {
        sessions: Mutex<HashMap<String, User>>,
        me_calls: AtomicUsize,
        broken: Mutex<bool>,
        gate: Mutex<Option<(String, Arc<Notify>)>>,
    }

    impl FakeAccounts {
        fn with_session(token: &str, user: User) -> Self {
            let fake = Self::default();
            fake.sessions.lock().unwrap().insert(token.into(), user);
            fake
        }

        fn revoke(&self, token: &str) {
            self.sessions.lock().unwrap().remove(token);
        }

        fn gated(self, token: &str, gate: Arc<Notify>) -> Self {
            *self.gate.lock().unwrap() = Some((token.into(), gate));
            self
        }
    }

    #[async_trait]
    impl AccountApi for FakeAccounts {
        async fn me(&self, token: &str) -> Result<User, ApiError> {
            self.me_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.lock().unwrap().clone().filter(|(t, _)| t == token);
            if let Some((_, gate)) = gate {
                gate.notified().await;
            }
            if *self.broken.lock().unwrap() {
                return Err(ApiError::Server { status: 500, message: "boom".into() });
            }
            self.sessions
                .lock()
                .unwrap()
                .get(token)
                .cloned()
                .ok_or(ApiError::Unauthorized { message: "Invalid token.".into() })
        }

        async fn password_login(&self, email: &str, password: &str) -> Result<String, ApiError> {
            if password != "pw" {
                return Err(ApiError::Validation {
                    status: 400,
                    errors: serde_json::json!({ "non_field_errors": ["Unable to log in."] }),
                });
            }
            let token = format!("tok-{}", email);
            let user = User { user_mail: email.to_string(), ..alice() };
            self.sessions.lock().unwrap().insert(token.clone(), user);
            Ok(token)
        }

        async fn identity_login(&self, login: &IdentityLogin) -> Result<String, ApiError> {
            if login.id_token != "good-assertion" {
                return Err(ApiError::Server { status: 400, message: "bad assertion".into() });
            }
            self.password_login(&login.email, "pw").await
        }

        async fn create_user(&self, user: &CreateUser) -> Result<User, ApiError> {
            Ok(User { username: user.username.clone(), user_mail: user.user_mail.clone(), ..alice() })
        }

        async fn update_user(&self, id: UserId, patch: &UpdateUser, _token: &str) -> Result<User, ApiError> {
            Ok(User {
                user_id: id,
                user_bio: patch.user_bio.clone().unwrap_or_default(),
                // Derived server-side.
                user_rank: "silver".into(),
                ..alice()
            })
        }
    }

    fn setup(api: FakeAccounts, session: MemorySessionStore) -> (Auth<FakeAccounts>, Arc<MemorySessionStore>, Arc<StateStore>) {
        let session = Arc::new(session);
        let store = Arc::new(StateStore::new());
        let auth = Auth::new(api, session.clone(), store.clone());
        (auth, session, store)
    }

    #[tokio::test]
    async fn unknown_until_hydrated() {
        let (auth, _, store) = setup(FakeAccounts::default(), MemorySessionStore::new());
        assert_eq!(auth.phase(), AuthPhase::Unknown);
        assert_eq!(store.read::<AuthState>(AuthState::PATH).unwrap().phase, AuthPhase::Unknown);

        assert_eq!(auth.hydrate().await, AuthPhase::Anonymous);
        assert_eq!(auth.state().phase, AuthPhase::Anonymous);
        assert_eq!(auth.api.me_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hydrate_is_idempotent() {
        let (auth, session, _) = setup(
            FakeAccounts::with_session("tok", alice()),
            MemorySessionStore::with_token("tok"),
        );

        assert_eq!(auth.hydrate().await, AuthPhase::Authenticated);
        let first = auth.current_user();
        assert_eq!(auth.hydrate().await, AuthPhase::Authenticated);

        assert_eq!(auth.current_user(), first);
        assert_eq!(first.unwrap().user_id, 1);
        assert_eq!(auth.api.me_calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.get().unwrap(), Some("tok".to_string()));
    }

    #[tokio::test]
    async fn hydrate_with_rejected_token_clears_it() {
        let (auth, session, _) = setup(FakeAccounts::default(), MemorySessionStore::with_token("stale"));

        assert_eq!(auth.hydrate().await, AuthPhase::Anonymous);
        assert_eq!(session.get().unwrap(), None);
        assert!(auth.token().is_none());
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn password_login_stores_token() {
        let (auth, session, _) = setup(FakeAccounts::default(), MemorySessionStore::new());
        auth.hydrate().await;

        let user = auth.login_with_password("alice@example.com", "pw").await.unwrap();
        assert_eq!(user.user_mail, "alice@example.com");
        assert_eq!(auth.phase(), AuthPhase::Authenticated);
        assert_eq!(session.get().unwrap(), Some("tok-alice@example.com".to_string()));

        let state = auth.state();
        assert!(!state.busy);
        assert!(state.error.is_none());
        assert_eq!(state.user, Some(user));
    }

    #[tokio::test]
    async fn failed_login_leaves_state_unchanged() {
        let (auth, session, _) = setup(
            FakeAccounts::with_session("tok", alice()),
            MemorySessionStore::with_token("tok"),
        );
        auth.hydrate().await;

        let err = auth.login_with_password("bob@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::Api(ApiError::Validation { status: 400, .. })));

        assert_eq!(auth.phase(), AuthPhase::Authenticated);
        assert_eq!(auth.token().as_deref(), Some("tok"));
        assert_eq!(auth.current_user().unwrap().user_mail, "alice@example.com");
        assert_eq!(session.get().unwrap(), Some("tok".to_string()));

        let state = auth.state();
        assert_eq!(state.phase, AuthPhase::Authenticated);
        assert!(state.error.is_some());
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn identity_login() {
        let (auth, session, _) = setup(FakeAccounts::default(), MemorySessionStore::new());
        auth.hydrate().await;

        let err = auth.login_with_identity_assertion("forged", "a@x.io", "A").await.unwrap_err();
        assert!(matches!(err, AuthError::Api(_)));
        assert_eq!(auth.phase(), AuthPhase::Anonymous);
        assert_eq!(session.get().unwrap(), None);

        auth.login_with_identity_assertion("good-assertion", "a@x.io", "A").await.unwrap();
        assert_eq!(auth.phase(), AuthPhase::Authenticated);
        assert_eq!(session.get().unwrap(), Some("tok-a@x.io".to_string()));
    }

    #[tokio::test]
    async fn register_then_signs_in() {
        let (auth, _, _) = setup(FakeAccounts::default(), MemorySessionStore::new());
        let account = CreateUser {
            username: "carol".into(),
            user_name: "Carol".into(),
            user_mail: "carol@example.com".into(),
            password: "pw".into(),
            user_url: None,
            user_bio: None,
        };

        let user = auth.register(&account).await.unwrap();
        assert_eq!(user.user_mail, "carol@example.com");
        assert_eq!(auth.token().as_deref(), Some("tok-carol@example.com"));
    }

    #[tokio::test]
    async fn busy_is_published_around_login() {
        let (auth, _, store) = setup(FakeAccounts::default(), MemorySessionStore::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_c = seen.clone();
        store.subscribe(AuthState::PATH, move |_, v| {
            let state = v.downcast_ref::<AuthState>().unwrap();
            seen_c.lock().unwrap().push((state.phase, state.busy));
        });

        auth.login_with_password("alice@example.com", "pw").await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(AuthPhase::Unknown, true), (AuthPhase::Authenticated, false)]
        );
    }

    #[tokio::test]
    async fn logout_is_local_and_unconditional() {
        let (auth, session, _) = setup(
            FakeAccounts::with_session("tok", alice()),
            MemorySessionStore::with_token("tok"),
        );
        auth.hydrate().await;
        *auth.api.broken.lock().unwrap() = true;

        auth.logout();
        assert_eq!(auth.phase(), AuthPhase::Anonymous);
        assert_eq!(session.get().unwrap(), None);
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn refresh_unauthorized_demotes() {
        let (auth, session, _) = setup(
            FakeAccounts::with_session("tok", alice()),
            MemorySessionStore::with_token("tok"),
        );
        auth.hydrate().await;
        auth.api.revoke("tok");

        let err = auth.refresh_user().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(auth.phase(), AuthPhase::Anonymous);
        assert_eq!(session.get().unwrap(), None);
        assert!(auth.token().is_none());
    }

    #[tokio::test]
    async fn refresh_other_error_keeps_session() {
        let (auth, session, _) = setup(
            FakeAccounts::with_session("tok", alice()),
            MemorySessionStore::with_token("tok"),
        );
        auth.hydrate().await;
        *auth.api.broken.lock().unwrap() = true;

        let err = auth.refresh_user().await.unwrap_err();
        assert!(matches!(err, AuthError::Api(ApiError::Server { status: 500, .. })));
        assert_eq!(auth.phase(), AuthPhase::Authenticated);
        assert_eq!(session.get().unwrap(), Some("tok".to_string()));
        assert_eq!(auth.state().error.as_deref(), Some("HTTP 500: boom"));
    }

    #[tokio::test]
    async fn refresh_requires_session() {
        let (auth, _, _) = setup(FakeAccounts::default(), MemorySessionStore::new());
        auth.hydrate().await;
        assert!(matches!(auth.refresh_user().await, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn update_profile_adopts_server_copy() {
        let (auth, _, _) = setup(FakeAccounts::default(), MemorySessionStore::new());
        let patch = UpdateUser { user_bio: Some("hello".into()), ..Default::default() };
        assert!(matches!(auth.update_profile(&patch).await, Err(AuthError::NotAuthenticated)));

        auth.login_with_password("alice@example.com", "pw").await.unwrap();
        let user = auth.update_profile(&patch).await.unwrap();
        assert_eq!(user.user_bio, "hello");
        assert_eq!(user.user_rank, "silver");
        assert_eq!(auth.current_user(), Some(user));
    }

    #[tokio::test]
    async fn invalidate_ignores_stale_tokens() {
        let (auth, session, _) = setup(
            FakeAccounts::with_session("tok", alice()),
            MemorySessionStore::with_token("tok"),
        );
        auth.hydrate().await;

        assert!(!auth.invalidate("old"));
        assert_eq!(auth.phase(), AuthPhase::Authenticated);

        assert!(auth.invalidate("tok"));
        assert_eq!(auth.phase(), AuthPhase::Anonymous);
        assert_eq!(session.get().unwrap(), None);
    }

    #[tokio::test]
    async fn rejected_hydrate_keeps_login_that_finished_first() {
        let gate = Arc::new(Notify::new());
        let (auth, session, _) = setup(
            FakeAccounts::default().gated("old", gate.clone()),
            MemorySessionStore::with_token("old"),
        );

        let (phase, login) = tokio::join!(auth.hydrate(), async {
            let user = auth.login_with_password("bob@example.com", "pw").await;
            gate.notify_one();
            user
        });

        assert_eq!(login.unwrap().user_mail, "bob@example.com");
        assert_eq!(phase, AuthPhase::Authenticated);
        assert_eq!(auth.token().as_deref(), Some("tok-bob@example.com"));
        assert_eq!(session.get().unwrap().as_deref(), Some("tok-bob@example.com"));
        assert!(!auth.state().busy);
    }

    #[tokio::test]
    async fn restored_hydrate_does_not_override_newer_login() {
        let gate = Arc::new(Notify::new());
        let (auth, session, _) = setup(
            FakeAccounts::with_session("old", alice()).gated("old", gate.clone()),
            MemorySessionStore::with_token("old"),
        );

        let (phase, _) = tokio::join!(auth.hydrate(), async {
            auth.login_with_password("bob@example.com", "pw").await.unwrap();
            gate.notify_one();
        });

        assert_eq!(phase, AuthPhase::Authenticated);
        assert_eq!(auth.current_user().unwrap().user_mail, "bob@example.com");
        assert_eq!(session.get().unwrap().as_deref(), Some("tok-bob@example.com"));
    }
}
