use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Admin Router Module
///
/// Catalog management for users with the 'admin' role. The router is wrapped
/// in the auth middleware; each handler additionally checks `role == admin`
/// and answers 403 otherwise.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/books
        // Creates a book. Title, author and category are validated server-side.
        .route("/books", post(handlers::create_book))
        // PUT/DELETE /admin/books/{id}
        // Full-field overwrite, or irreversible delete.
        .route(
            "/books/{id}",
            put(handlers::update_book).delete(handlers::delete_book),
        )
}
