use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Unauthenticated, read-only endpoints: the catalog listing/search that
/// backs both the patron home page and the `/search?q=` page.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /books?category=...&q=...&sort=...&ascending=...
        // Category is an exact match, `q` a case-insensitive title/author substring.
        .route("/books", get(handlers::list_books))
        // GET /books/{id}
        // Detail view behind a catalog card.
        .route("/books/{id}", get(handlers::get_book))
}
