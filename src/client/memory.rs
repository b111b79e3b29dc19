use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::gateway::{Gateway, GatewayError, Identity, IdentityChannel, IdentitySubscription};
use crate::models::{Book, BookInput, ReadRequest, Role, SortField};

/// GatewayCall
///
/// One recorded gateway interaction, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Read(ReadRequest),
    Insert(BookInput),
    Update(Uuid, BookInput),
    Delete(Uuid),
    FetchRole(Uuid),
    SignOut,
}

/// InMemoryGateway
///
/// A `Gateway` backed by a plain vector. It evaluates filters and ordering the
/// same way the server does, records every call, and can be switched into a
/// failing mode to exercise error paths.
#[derive(Default)]
pub struct InMemoryGateway {
    books: Mutex<Vec<Book>>,
    roles: Mutex<HashMap<Uuid, Role>>,
    calls: Mutex<Vec<GatewayCall>>,
    failing: AtomicBool,
    identity: IdentityChannel,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(id: Uuid) -> GatewayError {
    GatewayError::Status {
        status: 404,
        message: format!("book {id} not found"),
    }
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_books(books: Vec<Book>) -> Self {
        let gateway = Self::new();
        *lock(&gateway.books) = books;
        gateway
    }

    /// Current table contents, in insertion order.
    pub fn books(&self) -> Vec<Book> {
        lock(&self.books).clone()
    }

    pub fn set_role(&self, user_id: Uuid, role: Role) {
        lock(&self.roles).insert(user_id, role);
    }

    /// When set, every table operation and role lookup returns an error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Simulates the auth provider reporting a new session.
    pub fn sign_in(&self, identity: Identity) {
        self.identity.publish(Some(identity));
    }

    /// Simulates the session expiring on the provider side.
    pub fn expire_session(&self) {
        self.identity.publish(None);
    }

    pub fn identity_subscribers(&self) -> usize {
        self.identity.subscribers()
    }

    fn record(&self, call: GatewayCall) -> Result<(), GatewayError> {
        lock(&self.calls).push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Backend("backend unavailable".to_string()));
        }
        Ok(())
    }
}

fn apply(book: &mut Book, input: &BookInput) {
    book.title = input.title.clone();
    book.author = input.author.clone();
    book.isbn = input.isbn.clone();
    book.category = input.category;
    book.status = input.status;
    book.description = input.description.clone();
    book.image_url = input.image_url.clone();
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn read(&self, request: &ReadRequest) -> Result<Vec<Book>, GatewayError> {
        self.record(GatewayCall::Read(request.clone()))?;

        let mut books: Vec<Book> = lock(&self.books)
            .iter()
            .filter(|book| request.filter.matches(book))
            .cloned()
            .collect();

        let order = request.order;
        books.sort_by(|a, b| {
            let ordering = match order.field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::Title => a.title.cmp(&b.title),
                SortField::Author => a.author.cmp(&b.author),
            };
            if order.ascending { ordering } else { ordering.reverse() }
        });

        Ok(books)
    }

    async fn insert(&self, record: &BookInput) -> Result<Book, GatewayError> {
        self.record(GatewayCall::Insert(record.clone()))?;

        let now = Utc::now();
        let mut book = Book {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            ..Book::default()
        };
        apply(&mut book, record);
        lock(&self.books).push(book.clone());
        Ok(book)
    }

    async fn update(&self, id: Uuid, record: &BookInput) -> Result<Book, GatewayError> {
        self.record(GatewayCall::Update(id, record.clone()))?;

        let mut books = lock(&self.books);
        let book = books
            .iter_mut()
            .find(|book| book.id == id)
            .ok_or_else(|| not_found(id))?;
        apply(book, record);
        book.updated_at = Utc::now();
        Ok(book.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), GatewayError> {
        self.record(GatewayCall::Delete(id))?;

        let mut books = lock(&self.books);
        let before = books.len();
        books.retain(|book| book.id != id);
        if books.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn fetch_role(&self, user_id: Uuid) -> Result<Option<Role>, GatewayError> {
        self.record(GatewayCall::FetchRole(user_id))?;
        Ok(lock(&self.roles).get(&user_id).copied())
    }

    async fn current_identity(&self) -> Option<Identity> {
        self.identity.current()
    }

    fn on_identity_change(&self) -> IdentitySubscription {
        self.identity.subscribe()
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        self.record(GatewayCall::SignOut)?;
        self.identity.publish(None);
        Ok(())
    }
}
