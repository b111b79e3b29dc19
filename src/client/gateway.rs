use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::models::{Book, BookInput, ReadRequest, Role};

/// Identity
///
/// A signed-in user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: Option<String>,
    /// Bearer token for calls that need the caller's identity.
    pub access_token: String,
}

/// GatewayError
///
/// Everything that can go wrong talking to the backend. None of these are
/// retried; callers either swallow them (reads, deletes) or show an alert.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("not signed in")]
    Unauthenticated,

    #[error("{0}")]
    Backend(String),
}

/// Gateway
///
/// The backend collaborator every screen depends on: table reads and writes
/// on `books`, the single-row role lookup, and the auth session.
#[async_trait]
pub trait Gateway: Send + Sync {
    // --- Table Operations ---
    async fn read(&self, request: &ReadRequest) -> Result<Vec<Book>, GatewayError>;
    async fn insert(&self, record: &BookInput) -> Result<Book, GatewayError>;
    // Overwrites every editable field of the book keyed by `id`.
    async fn update(&self, id: Uuid, record: &BookInput) -> Result<Book, GatewayError>;
    async fn delete(&self, id: Uuid) -> Result<(), GatewayError>;
    // `None` when the user has no role row.
    async fn fetch_role(&self, user_id: Uuid) -> Result<Option<Role>, GatewayError>;

    // --- Auth Session ---
    async fn current_identity(&self) -> Option<Identity>;
    /// Subscribes to provider-pushed session changes. Dropping the returned
    /// handle unsubscribes.
    fn on_identity_change(&self) -> IdentitySubscription;
    async fn sign_out(&self) -> Result<(), GatewayError>;
}

/// GatewayState
///
/// The shared handle screens hold on to.
pub type GatewayState = Arc<dyn Gateway>;

/// IdentitySubscription
///
/// Receiving end of the auth provider's session-change stream.
pub struct IdentitySubscription {
    rx: watch::Receiver<Option<Identity>>,
}

impl IdentitySubscription {
    /// Waits for the next session change and returns the new identity
    /// (`None` = signed out). Returns `None` once the provider is gone.
    ///
    /// Changes that land while nobody is waiting are coalesced; the caller
    /// always sees the latest session.
    pub async fn next(&mut self) -> Option<Option<Identity>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// IdentityChannel
///
/// Sending side of the session-change stream, shared by gateway implementations.
#[derive(Clone)]
pub struct IdentityChannel {
    tx: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for IdentityChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityChannel {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Stores the new session and wakes every subscriber.
    pub fn publish(&self, identity: Option<Identity>) {
        self.tx.send_replace(identity);
    }

    pub fn subscribe(&self) -> IdentitySubscription {
        IdentitySubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }
}
