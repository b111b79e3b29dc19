use crate::models::{Book, BookInput, ReadRequest, Role};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

const BOOK_COLUMNS: &str = "id, title, author, isbn, category, status, description, image_url, created_at, updated_at";

/// Repository Trait
///
/// Persistence contract for the catalog. Handlers only ever talk to this trait,
/// so tests swap in an in-process implementation.
///
/// **Send + Sync + async_trait** are required to share `Arc<dyn Repository>`
/// across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Book Retrieval ---
    // Filtered, ordered listing. Filtering and ordering happen in SQL.
    async fn list_books(&self, request: &ReadRequest) -> Result<Vec<Book>, sqlx::Error>;
    async fn get_book(&self, id: Uuid) -> Result<Option<Book>, sqlx::Error>;

    // --- Administrative Writes ---
    async fn create_book(&self, input: BookInput) -> Result<Book, sqlx::Error>;
    // Full-field overwrite. `None` when no row has this id.
    async fn update_book(&self, id: Uuid, input: BookInput) -> Result<Option<Book>, sqlx::Error>;
    // Hard delete. `false` when no row has this id.
    async fn delete_book(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    // --- Roles ---
    // Single-row lookup in `public.users`. `None` when the user has no role row.
    async fn get_role(&self, user_id: Uuid) -> Result<Option<Role>, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Escapes LIKE metacharacters so the search term is matched literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// PostgresRepository
///
/// `Repository` backed by the managed Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_books
    ///
    /// Builds the statement with `QueryBuilder` so every user-supplied value is
    /// bound, never interpolated. The ORDER BY column comes from a closed enum.
    async fn list_books(&self, request: &ReadRequest) -> Result<Vec<Book>, sqlx::Error> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE true"));

        if let Some(category) = request.filter.category {
            builder.push(" AND category = ");
            builder.push_bind(category);
        }

        if let Some(term) = &request.filter.search {
            let pattern = like_pattern(term);
            builder.push(" AND (title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR author ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY ");
        builder.push(request.order.field.column());
        builder.push(if request.order.ascending { " ASC" } else { " DESC" });

        builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await
    }

    async fn get_book(&self, id: Uuid) -> Result<Option<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// create_book
    ///
    /// The database assigns `id`, `created_at` and `updated_at`.
    async fn create_book(&self, input: BookInput) -> Result<Book, sqlx::Error> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, isbn, category, status, description, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(input.title)
        .bind(input.author)
        .bind(input.isbn)
        .bind(input.category)
        .bind(input.status)
        .bind(input.description)
        .bind(input.image_url)
        .fetch_one(&self.pool)
        .await
    }

    /// update_book
    ///
    /// Overwrites every editable column and stamps `updated_at`.
    async fn update_book(&self, id: Uuid, input: BookInput) -> Result<Option<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET title = $2,
                author = $3,
                isbn = $4,
                category = $5,
                status = $6,
                description = $7,
                image_url = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.title)
        .bind(input.author)
        .bind(input.isbn)
        .bind(input.category)
        .bind(input.status)
        .bind(input.description)
        .bind(input.image_url)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_book(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_role(&self, user_id: Uuid) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }
}
