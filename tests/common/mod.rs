#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use library_catalog::{
    AppState,
    auth::{Claims, SUPABASE_AUDIENCE},
    config::{AppConfig, Env},
    models::{Book, BookInput, BookStatus, Category, ReadRequest, Role, SortField},
    repository::Repository,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::SystemTime,
};
use uuid::Uuid;

// --- Mock Repository ---

/// In-process repository. Behaves like the Postgres one for filtering and
/// ordering, and counts writes so tests can assert none happened.
#[derive(Default)]
pub struct MockRepository {
    pub books: Mutex<Vec<Book>>,
    pub roles: Mutex<HashMap<Uuid, Role>>,
    pub writes: AtomicUsize,
    pub fail_role_lookup: bool,
}

impl MockRepository {
    pub fn with_books(books: Vec<Book>) -> Self {
        Self {
            books: Mutex::new(books),
            ..Self::default()
        }
    }

    pub fn with_role(self, user_id: Uuid, role: Role) -> Self {
        self.roles.lock().unwrap().insert(user_id, role);
        self
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

fn apply(book: &mut Book, input: BookInput) {
    book.title = input.title;
    book.author = input.author;
    book.isbn = input.isbn;
    book.category = input.category;
    book.status = input.status;
    book.description = input.description;
    book.image_url = input.image_url;
}

#[async_trait]
impl Repository for MockRepository {
    async fn list_books(&self, request: &ReadRequest) -> Result<Vec<Book>, sqlx::Error> {
        let mut books: Vec<Book> = self
            .books
            .lock()
            .unwrap()
            .iter()
            .filter(|b| request.filter.matches(b))
            .cloned()
            .collect();
        books.sort_by(|a, b| {
            let ordering = match request.order.field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::Title => a.title.cmp(&b.title),
                SortField::Author => a.author.cmp(&b.author),
            };
            if request.order.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        Ok(books)
    }

    async fn get_book(&self, id: Uuid) -> Result<Option<Book>, sqlx::Error> {
        Ok(self.books.lock().unwrap().iter().find(|b| b.id == id).cloned())
    }

    async fn create_book(&self, input: BookInput) -> Result<Book, sqlx::Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut book = Book {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ..Book::default()
        };
        apply(&mut book, input);
        self.books.lock().unwrap().push(book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: Uuid, input: BookInput) -> Result<Option<Book>, sqlx::Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut books = self.books.lock().unwrap();
        Ok(books.iter_mut().find(|b| b.id == id).map(|book| {
            apply(book, input);
            book.updated_at = Utc::now();
            book.clone()
        }))
    }

    async fn delete_book(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut books = self.books.lock().unwrap();
        let before = books.len();
        books.retain(|b| b.id != id);
        Ok(books.len() < before)
    }

    async fn get_role(&self, user_id: Uuid) -> Result<Option<Role>, sqlx::Error> {
        if self.fail_role_lookup {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.roles.lock().unwrap().get(&user_id).copied())
    }
}

// --- Fixtures ---

pub const ADMIN_ID: Uuid = Uuid::from_u128(0xad);
pub const PATRON_ID: Uuid = Uuid::from_u128(0x42);
pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

/// A book created `age_days` before a fixed reference date.
pub fn book(title: &str, author: &str, category: Category, age_days: i64) -> Book {
    let reference = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let created_at = reference - Duration::days(age_days);
    Book {
        id: Uuid::new_v4(),
        title: title.to_string(),
        author: author.to_string(),
        isbn: None,
        category,
        status: BookStatus::Available,
        description: None,
        image_url: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn input(title: &str, author: &str, category: Category) -> BookInput {
    BookInput {
        title: title.to_string(),
        author: author.to_string(),
        category,
        ..BookInput::default()
    }
}

/// A small catalog spanning every sort key and two categories.
pub fn shelf() -> Vec<Book> {
    vec![
        book("The Rust Programming Language", "Klabnik", Category::Technical, 30),
        book("Zero to Production", "Palmieri", Category::Technical, 5),
        book("Kafka on the Shore", "Murakami", Category::Novel, 10),
        book("Atomic Habits", "Clear", Category::SelfHelp, 1),
        book("Programming Rust", "Blandy", Category::Technical, 20),
    ]
}

pub fn test_state(repo: MockRepository, env: Env) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };
    AppState {
        repo: Arc::new(repo),
        config,
    }
}

/// A Supabase-shaped access token signed with `TEST_JWT_SECRET`.
pub fn mint_token(user_id: Uuid, audience: &str, exp_offset_secs: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        aud: audience.to_string(),
        iat: now as usize,
        exp: (now + exp_offset_secs) as usize,
        email: Some("reader@example.com".to_string()),
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

pub fn valid_token(user_id: Uuid) -> String {
    mint_token(user_id, SUPABASE_AUDIENCE, 3600)
}
