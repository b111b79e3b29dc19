use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Endpoints for any signed-in user. The router is wrapped in the auth
/// middleware, so handlers here always receive a validated `AuthUser`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's id and role; the client session guard reads the role from here.
        .route("/me", get(handlers::get_me))
}
