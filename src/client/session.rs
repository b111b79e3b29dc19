use tokio::{sync::watch, task::JoinHandle};

use super::gateway::{Gateway, GatewayError, GatewayState, Identity};
use crate::models::Role;

/// Screen
///
/// Every screen a route can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Catalog,
    Search,
    AdminDashboard,
    AdminBooks,
}

/// SessionState
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Identity or role lookup still in flight.
    Resolving,
    Authenticated { identity: Identity, role: Role },
    Anonymous,
}

impl SessionState {
    pub fn role(&self) -> Option<Role> {
        match self {
            SessionState::Authenticated { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Login is always reachable; catalog screens need a session; admin
    /// screens need the admin role. Nothing but login is reachable while
    /// the session is still resolving.
    pub fn can_access(&self, screen: Screen) -> bool {
        match screen {
            Screen::Login => true,
            Screen::Catalog | Screen::Search => self.role().is_some(),
            Screen::AdminDashboard | Screen::AdminBooks => self.role() == Some(Role::Admin),
        }
    }
}

/// Resolves the role of a (possibly absent) identity.
///
/// A missing role row, or a failed lookup, leaves the user a plain `User`.
async fn resolve(gateway: &dyn Gateway, identity: Option<Identity>) -> SessionState {
    let Some(identity) = identity else {
        return SessionState::Anonymous;
    };

    let role = match gateway.fetch_role(identity.user_id).await {
        Ok(role) => role.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(user_id = %identity.user_id, "role lookup failed, assuming user: {}", e);
            Role::User
        }
    };

    tracing::debug!(user_id = %identity.user_id, ?role, "session resolved");
    SessionState::Authenticated { identity, role }
}

/// SessionGuard
///
/// Owns the session for the lifetime of the app shell. Establishing it reads
/// the current identity and subscribes to provider session changes; each
/// change re-resolves the role. Dropping the guard ends the subscription.
pub struct SessionGuard {
    gateway: GatewayState,
    state: watch::Receiver<SessionState>,
    listener: JoinHandle<()>,
}

impl SessionGuard {
    /// establish
    ///
    /// Starts in `Resolving` and returns immediately; resolution runs on a
    /// background task. Must be called within a Tokio runtime.
    pub fn establish(gateway: GatewayState) -> Self {
        let (tx, rx) = watch::channel(SessionState::Resolving);

        // Subscribe before reading the current identity so a change landing
        // in between is not lost.
        let mut changes = gateway.on_identity_change();
        let task_gateway = gateway.clone();

        let listener = tokio::spawn(async move {
            let identity = task_gateway.current_identity().await;
            tx.send_replace(resolve(task_gateway.as_ref(), identity).await);

            while let Some(identity) = changes.next().await {
                tx.send_replace(resolve(task_gateway.as_ref(), identity).await);
            }
        });

        Self {
            gateway,
            state: rx,
            listener,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every state the guard moves through.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Waits until the session is no longer `Resolving`.
    pub async fn resolved(&self) -> SessionState {
        let mut rx = self.state.clone();
        match rx
            .wait_for(|state| !matches!(state, SessionState::Resolving))
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    pub fn can_access(&self, screen: Screen) -> bool {
        self.state.borrow().can_access(screen)
    }

    /// Signs out through the gateway. The state moves to `Anonymous` when
    /// the provider reports the change, not here.
    pub async fn sign_out(&self) -> Result<(), GatewayError> {
        self.gateway.sign_out().await
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
