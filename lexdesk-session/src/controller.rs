/// Session/auth controller
///
/// The controller mirrors the hosted auth service's current session and owns
/// everything derived from it: the signed-in user's profile, their
/// organization memberships and the active membership that scopes every
/// resource query.
///
/// # States
///
/// ```text
///             start()
///  Loading ─────────────┬──> Unauthenticated   (no session)
///     ^                 └──> Authenticated     (profile + memberships loaded)
///     │
///     └── auth event with a session for a different user
/// ```
///
/// An auth event without a session always moves to `Unauthenticated` and
/// clears the profile, memberships and active membership.
///
/// # Convergence
///
/// Every transition takes a generation number. Dependent-data loads are
/// serialized behind a lock, and a load whose generation has been superseded
/// is skipped or its result discarded, so concurrent notifications converge
/// on the state of the latest one.
///
/// # Example
///
/// ```no_run
/// use lexdesk_session::controller::AuthController;
/// use lexdesk_shared::backend::{Backend, MemoryBackend};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
/// let auth = AuthController::new(backend);
/// auth.start().await;
///
/// auth.sign_in("ana@example.com", "secret123").await?;
/// let snapshot = auth.wait_for(|s| !s.is_loading()).await;
/// println!("Active organization: {:?}", snapshot.active_organization_id());
///
/// auth.shutdown().await;
/// # Ok(())
/// # }
/// ```

use lexdesk_shared::backend::{
    select_as, select_one_as, AuthApi, AuthError, AuthEvent, AuthEventKind, AuthUser, Backend,
    Query, Session, SignUpOutcome,
};
use lexdesk_shared::models::{Organization, OrganizationMembership, Profile};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Coarse authentication state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Session or dependent records are being fetched
    Loading,
    Unauthenticated,
    Authenticated,
}

/// Consistent view of the controller state
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    pub status: AuthStatus,

    pub session: Option<Session>,

    pub user: Option<AuthUser>,

    pub profile: Option<Profile>,

    /// Every membership of the user, in the order the backend returned them
    pub memberships: Vec<OrganizationMembership>,

    /// Membership whose organization scopes resource queries
    pub active_membership: Option<OrganizationMembership>,
}

impl AuthSnapshot {
    fn loading() -> Self {
        AuthSnapshot {
            status: AuthStatus::Loading,
            session: None,
            user: None,
            profile: None,
            memberships: Vec::new(),
            active_membership: None,
        }
    }

    fn unauthenticated() -> Self {
        AuthSnapshot {
            status: AuthStatus::Unauthenticated,
            ..AuthSnapshot::loading()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == AuthStatus::Loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }

    /// Organization id of the active membership
    pub fn active_organization_id(&self) -> Option<Uuid> {
        self.active_membership.as_ref().map(|m| m.organization_id)
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        AuthSnapshot::loading()
    }
}

/// Session/auth controller
///
/// Create with [`AuthController::new`], then call [`AuthController::start`]
/// once. State is published through a watch channel; read it with
/// [`AuthController::snapshot`] or observe it with
/// [`AuthController::subscribe`] / [`AuthController::changes`].
pub struct AuthController {
    backend: Arc<dyn Backend>,

    state: watch::Sender<AuthSnapshot>,

    /// Generation of the latest transition
    generation: AtomicU64,

    /// Serializes dependent-data loads
    load_lock: tokio::sync::Mutex<()>,

    /// Cancels the current listener; replaced on every start
    shutdown_token: Mutex<CancellationToken>,

    listener: Mutex<Option<JoinHandle<()>>>,
}

impl AuthController {
    /// Creates a controller in the `Loading` state
    pub fn new(backend: Arc<dyn Backend>) -> Arc<Self> {
        let (state, _) = watch::channel(AuthSnapshot::loading());

        Arc::new(AuthController {
            backend,
            state,
            generation: AtomicU64::new(0),
            load_lock: tokio::sync::Mutex::new(()),
            shutdown_token: Mutex::new(CancellationToken::new()),
            listener: Mutex::new(None),
        })
    }

    /// Backend handle shared with the resource stores
    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    /// Performs the initial session load and spawns the auth-event listener
    ///
    /// The listener is subscribed before the session is fetched so that no
    /// notification emitted in between is lost.
    /// Each start gets a fresh cancellation token, so a controller can be
    /// started again after [`AuthController::shutdown`].
    pub async fn start(self: &Arc<Self>) {
        tracing::info!("Auth controller starting");

        let events = self.backend.subscribe();

        let session = match self.backend.get_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Failed to retrieve session");
                None
            }
        };
        self.apply_session(session, AuthEventKind::InitialSession).await;

        let controller = Arc::downgrade(self);
        let token = CancellationToken::new();
        let previous_token = std::mem::replace(
            &mut *self
                .shutdown_token
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
            token.clone(),
        );
        previous_token.cancel();
        let handle = tokio::spawn(listen_loop(controller, events, token));

        let previous = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            tracing::warn!("Auth controller started twice, replacing listener");
            previous.abort();
        }
    }

    /// Stops the auth-event listener
    pub async fn shutdown(&self) {
        tracing::info!("Auth controller shutting down");
        self.shutdown_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .cancel();

        let handle = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Auth listener ended abnormally");
            }
        }
    }

    /// Re-reads the current session from the backend and re-runs the
    /// transition for it
    pub async fn reload(&self) {
        match self.backend.get_session().await {
            Ok(session) => self.apply_session(session, AuthEventKind::UserUpdated).await,
            Err(e) => tracing::error!(error = %e, "Failed to retrieve session"),
        }
    }

    /// Password sign-in
    ///
    /// The resulting state change arrives through the auth-event listener.
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.backend.sign_in_with_password(email, password).await
    }

    /// Registers a new user with `full_name` metadata
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        self.backend.sign_up(email, password, full_name).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.backend.sign_out().await
    }

    /// Makes `membership` the active one; local state only
    pub fn set_active_organization(&self, membership: OrganizationMembership) {
        tracing::info!(
            organization_id = %membership.organization_id,
            "Switching active organization"
        );
        self.state.send_modify(|s| s.active_membership = Some(membership));
    }

    /// Activates the membership matching `selector` (organization id, slug
    /// or name); returns it, or `None` when the user has no such membership
    pub fn select_organization(&self, selector: &str) -> Option<OrganizationMembership> {
        let membership = self
            .state
            .borrow()
            .memberships
            .iter()
            .find(|m| m.matches_selector(selector))
            .cloned()?;

        self.set_active_organization(membership.clone());
        Some(membership)
    }

    /// Current state
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> AuthStatus {
        self.state.borrow().status
    }

    /// Organization id of the active membership
    pub fn active_organization_id(&self) -> Option<Uuid> {
        self.state.borrow().active_organization_id()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// Stream of snapshots, starting with the current one
    pub fn changes(&self) -> WatchStream<AuthSnapshot> {
        WatchStream::new(self.state.subscribe())
    }

    /// Waits until the state satisfies `predicate` and returns that state
    pub async fn wait_for<F>(&self, mut predicate: F) -> AuthSnapshot
    where
        F: FnMut(&AuthSnapshot) -> bool,
    {
        let mut rx = self.state.subscribe();
        let result = rx.wait_for(|s| predicate(s)).await.map(|s| s.clone());
        match result {
            Ok(snapshot) => snapshot,
            // Sender lives in `self`
            Err(_) => self.snapshot(),
        }
    }

    async fn handle_event(&self, event: AuthEvent) {
        tracing::debug!(event = %event.kind, "Auth event received");
        self.apply_session(event.session, event.kind).await;
    }

    /// Runs the transition for a new session value
    async fn apply_session(&self, session: Option<Session>, kind: AuthEventKind) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(session) = session else {
            self.publish(generation, |s| *s = AuthSnapshot::unauthenticated());
            tracing::info!(event = %kind, "Signed out");
            return;
        };

        let user = session.user.clone();

        // A refreshed token for the signed-in user reloads without leaving
        // the authenticated state.
        let quiet = {
            let current = self.state.borrow();
            current.is_authenticated()
                && current.user_id() == Some(user.id)
                && matches!(kind, AuthEventKind::TokenRefreshed | AuthEventKind::UserUpdated)
        };

        self.publish(generation, |s| {
            if !quiet {
                s.status = AuthStatus::Loading;
            }
            if s.user_id() != Some(user.id) {
                s.profile = None;
                s.memberships.clear();
                s.active_membership = None;
            }
            s.session = Some(session.clone());
            s.user = Some(user.clone());
        });

        let _guard = self.load_lock.lock().await;
        if self.is_superseded(generation) {
            tracing::debug!(generation, "Skipping superseded load");
            return;
        }

        let (profile, memberships) = self.load_user_data(user.id).await;

        let applied = self.publish(generation, move |s| {
            s.active_membership = choose_active(s.active_membership.as_ref(), &memberships);
            s.profile = profile;
            s.memberships = memberships;
            s.status = AuthStatus::Authenticated;
        });

        if applied {
            tracing::info!(user_id = %user.id, event = %kind, "Authenticated");
        } else {
            tracing::debug!(generation, "Discarding superseded load");
        }
    }

    /// Fetches the profile and memberships of `user_id`
    ///
    /// Errors are logged and yield empty data.
    async fn load_user_data(&self, user_id: Uuid) -> (Option<Profile>, Vec<OrganizationMembership>) {
        let profile_query = Query::table(Profile::TABLE).eq("id", user_id);
        let memberships_query = Query::table(OrganizationMembership::TABLE)
            .embed("organization", Organization::TABLE, "organization_id")
            .eq("user_id", user_id);

        let (profile, memberships) = tokio::join!(
            select_one_as::<Profile, _>(self.backend.as_ref(), &profile_query),
            select_as::<OrganizationMembership, _>(self.backend.as_ref(), &memberships_query),
        );

        let profile = profile.unwrap_or_else(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load profile");
            None
        });

        let memberships = memberships.unwrap_or_else(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load memberships");
            Vec::new()
        });

        tracing::debug!(
            user_id = %user_id,
            has_profile = profile.is_some(),
            memberships = memberships.len(),
            "Loaded user data"
        );

        (profile, memberships)
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// Applies `modify` unless `generation` has been superseded; returns
    /// whether it was applied
    fn publish<F>(&self, generation: u64, modify: F) -> bool
    where
        F: FnOnce(&mut AuthSnapshot),
    {
        self.state.send_if_modified(|state| {
            if self.is_superseded(generation) {
                return false;
            }
            modify(state);
            true
        })
    }
}

/// Keeps the active membership when it is still present, else falls back to
/// the first one
fn choose_active(
    current: Option<&OrganizationMembership>,
    memberships: &[OrganizationMembership],
) -> Option<OrganizationMembership> {
    current
        .and_then(|active| memberships.iter().find(|m| m.id == active.id))
        .or_else(|| memberships.first())
        .cloned()
}

async fn listen_loop(
    controller: Weak<AuthController>,
    mut events: broadcast::Receiver<AuthEvent>,
    shutdown_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                tracing::debug!("Auth listener stopped");
                break;
            }
            received = events.recv() => {
                let Some(controller) = controller.upgrade() else {
                    break;
                };

                match received {
                    Ok(event) => controller.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth listener lagged, resyncing session");
                        controller.reload().await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("Auth event channel closed");
                        break;
                    }
                }
            }
        }
    }
}
