use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::JsonBody,
    models::{Book, BookInput, BookQuery, ReadRequest, UserProfile},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

/// Admin routes sit behind authentication only; the role check lives here.
fn require_admin(user: &AuthUser) -> ApiResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        tracing::warn!("non-admin {} attempted an admin action", user.id);
        Err(ApiError::Forbidden("admin role required".to_string()))
    }
}

// --- Public Handlers ---

/// list_books
///
/// [Public Route] Lists books matching the category/search criteria, ordered
/// by one of `created_at` (newest first by default), `title` or `author`.
#[utoipa::path(
    get,
    path = "/books",
    params(BookQuery),
    responses(
        (status = 200, description = "Filtered books", body = [Book])
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> ApiResult<Json<Vec<Book>>> {
    let request = ReadRequest::from(query);
    tracing::debug!(?request, "listing books");
    let books = state.repo.list_books(&request).await?;
    Ok(Json(books))
}

/// get_book
///
/// [Public Route] A single book by id.
#[utoipa::path(
    get,
    path = "/books/{id}",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Found", body = Book),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Book>> {
    state
        .repo
        .get_book(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("book {id}")))
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's id and resolved role.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_me(AuthUser { id, email, role }: AuthUser) -> Json<UserProfile> {
    Json(UserProfile { id, email, role })
}

// --- Admin Handlers ---

/// create_book
///
/// [Admin Route] Inserts a book. The payload is validated here even though
/// the admin form checks the same fields, since other clients may call the API.
#[utoipa::path(
    post,
    path = "/admin/books",
    request_body = BookInput,
    responses(
        (status = 201, description = "Created", body = Book),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_book(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<BookInput>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    require_admin(&user)?;
    payload.validate()?;

    let book = state.repo.create_book(payload).await?;
    tracing::info!(book_id = %book.id, admin = %user.id, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// update_book
///
/// [Admin Route] Overwrites every editable field of an existing book.
#[utoipa::path(
    put,
    path = "/admin/books/{id}",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = BookInput,
    responses(
        (status = 200, description = "Updated", body = Book),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_book(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<BookInput>,
) -> ApiResult<Json<Book>> {
    require_admin(&user)?;
    payload.validate()?;

    let book = state
        .repo
        .update_book(id, payload)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("book {id}")))?;
    tracing::info!(book_id = %id, admin = %user.id, "book updated");
    Ok(Json(book))
}

/// delete_book
///
/// [Admin Route] Permanently removes a book.
#[utoipa::path(
    delete,
    path = "/admin/books/{id}",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_book(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&user)?;

    if state.repo.delete_book(id).await? {
        tracing::info!(book_id = %id, admin = %user.id, "book deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("book {id}")))
    }
}
