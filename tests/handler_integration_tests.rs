mod common;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use common::{ADMIN_ID, MockRepository, PATRON_ID, input, shelf, test_state};
use library_catalog::{
    auth::AuthUser,
    config::Env,
    error::ApiError,
    extract::JsonBody,
    handlers,
    models::{BookQuery, BookStatus, Category, Role, SortField},
};
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- Test Utilities ---

fn admin_user() -> AuthUser {
    AuthUser {
        id: ADMIN_ID,
        email: Some("admin@example.com".to_string()),
        role: Role::Admin,
    }
}

fn patron() -> AuthUser {
    AuthUser {
        id: PATRON_ID,
        email: None,
        role: Role::User,
    }
}

fn state_with(repo: Arc<MockRepository>) -> library_catalog::AppState {
    let mut state = test_state(MockRepository::default(), Env::Local);
    state.repo = repo;
    state
}

// --- Public Handlers ---

#[test]
async fn test_list_books_filters_by_category_and_sorts_by_title() {
    let state = test_state(MockRepository::with_books(shelf()), Env::Local);

    let query = BookQuery {
        category: Some(Category::Technical),
        sort: Some(SortField::Title),
        ..BookQuery::default()
    };
    let Json(books) = handlers::list_books(State(state), Query(query)).await.unwrap();

    let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Programming Rust",
            "The Rust Programming Language",
            "Zero to Production"
        ]
    );
}

#[test]
async fn test_list_books_defaults_to_newest_first() {
    let state = test_state(MockRepository::with_books(shelf()), Env::Local);

    let Json(books) = handlers::list_books(State(state), Query(BookQuery::default()))
        .await
        .unwrap();

    assert_eq!(books.len(), 5);
    assert!(books.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    assert_eq!(books[0].title, "Atomic Habits");
}

#[test]
async fn test_list_books_search_matches_author_case_insensitively() {
    let state = test_state(MockRepository::with_books(shelf()), Env::Local);

    let query = BookQuery {
        q: Some("MURAKAMI".to_string()),
        ..BookQuery::default()
    };
    let Json(books) = handlers::list_books(State(state), Query(query)).await.unwrap();

    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Kafka on the Shore");
}

#[test]
async fn test_get_book_not_found() {
    let state = test_state(MockRepository::default(), Env::Local);

    let result = handlers::get_book(State(state), Path(Uuid::new_v4())).await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test]
async fn test_get_me_reports_role() {
    let Json(profile) = handlers::get_me(admin_user()).await;

    assert_eq!(profile.id, ADMIN_ID);
    assert_eq!(profile.email.as_deref(), Some("admin@example.com"));
    assert_eq!(profile.role, Role::Admin);
}

// --- Admin Handlers ---

#[test]
async fn test_create_book_as_admin_returns_created() {
    let repo = Arc::new(MockRepository::default());
    let state = state_with(repo.clone());

    let (status, Json(book)) = handlers::create_book(
        admin_user(),
        State(state),
        JsonBody(input("Clean Code", "Martin", Category::Technical)),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book.title, "Clean Code");
    assert_eq!(book.status, BookStatus::Available);
    assert_eq!(repo.books.lock().unwrap().len(), 1);
}

#[test]
async fn test_create_book_forbidden_for_patron_without_touching_repository() {
    let repo = Arc::new(MockRepository::default());
    let state = state_with(repo.clone());

    let result = handlers::create_book(
        patron(),
        State(state),
        JsonBody(input("Clean Code", "Martin", Category::Technical)),
    )
    .await;

    assert!(matches!(result, Err(ApiError::Forbidden(_))));
    assert_eq!(repo.write_count(), 0);
}

#[test]
async fn test_create_book_rejects_blank_title() {
    let repo = Arc::new(MockRepository::default());
    let state = state_with(repo.clone());

    let result = handlers::create_book(
        admin_user(),
        State(state),
        JsonBody(input("   ", "Martin", Category::Technical)),
    )
    .await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert_eq!(repo.write_count(), 0);
}

#[test]
async fn test_update_book_overwrites_every_field() {
    let books = shelf();
    let target = books[2].clone();
    let repo = Arc::new(MockRepository::with_books(books));
    let state = state_with(repo.clone());

    let mut payload = input("Norwegian Wood", "Murakami", Category::Novel);
    payload.status = BookStatus::Borrowed;
    payload.isbn = Some("978-4062748681".to_string());

    let Json(updated) =
        handlers::update_book(admin_user(), State(state), Path(target.id), JsonBody(payload))
            .await
            .unwrap();

    assert_eq!(updated.id, target.id);
    assert_eq!(updated.title, "Norwegian Wood");
    assert_eq!(updated.status, BookStatus::Borrowed);
    assert_eq!(updated.isbn.as_deref(), Some("978-4062748681"));
    assert_eq!(updated.created_at, target.created_at);
}

#[test]
async fn test_update_book_not_found() {
    let state = test_state(MockRepository::default(), Env::Local);

    let result = handlers::update_book(
        admin_user(),
        State(state),
        Path(Uuid::new_v4()),
        JsonBody(input("Title", "Author", Category::History)),
    )
    .await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test]
async fn test_delete_book_removes_only_that_book() {
    let books = shelf();
    let target = books[0].id;
    let repo = Arc::new(MockRepository::with_books(books));
    let state = state_with(repo.clone());

    let status = handlers::delete_book(admin_user(), State(state), Path(target))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::NO_CONTENT);
    let remaining = repo.books.lock().unwrap();
    assert_eq!(remaining.len(), 4);
    assert!(remaining.iter().all(|b| b.id != target));
}

#[test]
async fn test_delete_book_not_found() {
    let state = test_state(MockRepository::default(), Env::Local);

    let result = handlers::delete_book(admin_user(), State(state), Path(Uuid::new_v4())).await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test]
async fn test_delete_book_forbidden_for_patron() {
    let repo = Arc::new(MockRepository::with_books(shelf()));
    let state = state_with(repo.clone());
    let target = repo.books.lock().unwrap()[0].id;

    let result = handlers::delete_book(patron(), State(state), Path(target)).await;

    assert!(matches!(result, Err(ApiError::Forbidden(_))));
    assert_eq!(repo.books.lock().unwrap().len(), 5);
}
