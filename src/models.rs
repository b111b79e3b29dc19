use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use sqlx::{
    Decode, Encode, FromRow, Postgres, Type,
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Enumerated Columns ---

/// Maps a string-backed enum onto a Postgres TEXT column.
///
/// The column holds the same value serde uses on the wire, so a row that
/// somehow carries an unknown value fails to decode instead of leaking through.
macro_rules! text_column {
    ($ty:ty) => {
        impl Type<Postgres> for $ty {
            fn type_info() -> PgTypeInfo {
                <String as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let raw = <&'r str as Decode<'r, Postgres>>::decode(value)?;
                raw.parse().map_err(|e: String| e.into())
            }
        }

        impl<'q> Encode<'q, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
                <&str as Encode<'q, Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Category
///
/// The fixed shelf classification of a book. The stored and serialized value
/// is the Japanese label shown to patrons.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[ts(export)]
pub enum Category {
    #[default]
    #[serde(rename = "小説")]
    Novel,
    #[serde(rename = "技術書")]
    Technical,
    #[serde(rename = "ビジネス")]
    Business,
    #[serde(rename = "歴史")]
    History,
    #[serde(rename = "自己啓発")]
    SelfHelp,
}

impl Category {
    /// Every category, in the order the catalog filter bar lists them.
    pub const ALL: [Category; 5] = [
        Category::Novel,
        Category::Technical,
        Category::Business,
        Category::History,
        Category::SelfHelp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Novel => "小説",
            Category::Technical => "技術書",
            Category::Business => "ビジネス",
            Category::History => "歴史",
            Category::SelfHelp => "自己啓発",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

text_column!(Category);

/// BookStatus
///
/// Circulation status of a physical copy. Borrowing workflows outside this
/// service may flip it between `available` and `borrowed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BookStatus {
    #[default]
    Available,
    Borrowed,
    Maintenance,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Borrowed => "borrowed",
            BookStatus::Maintenance => "maintenance",
        }
    }

    /// The badge text shown next to a book.
    pub fn label(&self) -> &'static str {
        match self {
            BookStatus::Available => "貸出可能",
            BookStatus::Borrowed => "貸出中",
            BookStatus::Maintenance => "修理中",
        }
    }
}

impl FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(BookStatus::Available),
            "borrowed" => Ok(BookStatus::Borrowed),
            "maintenance" => Ok(BookStatus::Maintenance),
            other => Err(format!("unknown book status: {other}")),
        }
    }
}

text_column!(BookStatus);

/// Role
///
/// Permission level attached to an identity. A missing role row means `User`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

text_column!(Role);

// --- Core Records (Mapped to Database) ---

/// Book
///
/// A catalog record from the `public.books` table. `id`, `created_at` and
/// `updated_at` are assigned by the database and never written by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category: Category,
    pub status: BookStatus,
    pub description: Option<String>,
    /// Cover image URI, rendered as-is by the catalog cards.
    pub image_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// BookInput
///
/// Every editable field of a book. Used as the body of both insert and update:
/// an update overwrites all of these columns.
///
/// The category and status are typed, so a missing or unknown value is rejected
/// while the body is being deserialized (400 through `JsonBody`). Title and
/// author are checked by `validate()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct BookInput {
    #[validate(custom(function = "not_blank", message = "title is required"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "author is required"))]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub status: BookStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// MissingField
///
/// A required draft field that is still empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Title,
    Author,
    Category,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissingField::Title => "title",
            MissingField::Author => "author",
            MissingField::Category => "category",
        })
    }
}

/// BookDraft
///
/// The in-memory copy of a book being edited in the admin form. Unlike a
/// persisted `Book`, the category may be unset while the draft is open.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BookDraft {
    /// Present when editing an existing book; decides update vs insert.
    pub id: Option<Uuid>,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: Option<Category>,
    pub status: BookStatus,
    pub description: String,
    pub image_url: String,
}

impl BookDraft {
    /// Draft seeded from an existing record.
    pub fn from_book(book: &Book) -> Self {
        Self {
            id: Some(book.id),
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone().unwrap_or_default(),
            category: Some(book.category),
            status: book.status,
            description: book.description.clone().unwrap_or_default(),
            image_url: book.image_url.clone().unwrap_or_default(),
        }
    }

    pub fn missing_fields(&self) -> Vec<MissingField> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push(MissingField::Title);
        }
        if self.author.trim().is_empty() {
            missing.push(MissingField::Author);
        }
        if self.category.is_none() {
            missing.push(MissingField::Category);
        }
        missing
    }

    /// Converts the draft into a write payload, or lists what is missing.
    ///
    /// Blank optional text fields are sent as `None` so the column is cleared.
    pub fn to_input(&self) -> Result<BookInput, Vec<MissingField>> {
        let missing = self.missing_fields();
        let category = match self.category {
            Some(category) if missing.is_empty() => category,
            _ => return Err(missing),
        };

        Ok(BookInput {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            isbn: non_blank(&self.isbn),
            category,
            status: self.status,
            description: non_blank(&self.description),
            image_url: non_blank(&self.image_url),
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// --- Read Criteria ---

/// SortField
///
/// Columns the catalog can be ordered by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SortField {
    #[default]
    CreatedAt,
    Title,
    Author,
}

impl SortField {
    /// Column name; only ever one of these three literals reaches the SQL text.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Title => "title",
            SortField::Author => "author",
        }
    }

    /// Direction used when the caller does not say: newest first, A to Z otherwise.
    pub fn default_ascending(&self) -> bool {
        !matches!(self, SortField::CreatedAt)
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(SortField::CreatedAt),
            "title" => Ok(SortField::Title),
            "author" => Ok(SortField::Author),
            other => Err(format!("unknown sort field: {other}")),
        }
    }
}

/// Order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Order {
    pub field: SortField,
    pub ascending: bool,
}

impl Default for Order {
    fn default() -> Self {
        SortKey::default().order()
    }
}

/// SortKey
///
/// The three orderings offered by the catalog; exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Newest,
    TitleAsc,
    AuthorAsc,
}

impl SortKey {
    pub fn order(&self) -> Order {
        match self {
            SortKey::Newest => Order {
                field: SortField::CreatedAt,
                ascending: false,
            },
            SortKey::TitleAsc => Order {
                field: SortField::Title,
                ascending: true,
            },
            SortKey::AuthorAsc => Order {
                field: SortField::Author,
                ascending: true,
            },
        }
    }
}

/// BookFilter
///
/// `category` is an exact match; `search` is a case-insensitive substring
/// match against title OR author. `None` means unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BookFilter {
    pub category: Option<Category>,
    pub search: Option<String>,
}

impl BookFilter {
    /// The filter predicate, as evaluated by the backend.
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(category) = self.category {
            if book.category != category {
                return false;
            }
        }
        match &self.search {
            Some(term) => {
                let needle = term.to_lowercase();
                book.title.to_lowercase().contains(&needle)
                    || book.author.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// ReadRequest
///
/// One read against the `books` table: filter plus ordering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReadRequest {
    pub filter: BookFilter,
    pub order: Order,
}

/// Deserializes an optional query value, treating an empty string as absent.
///
/// The catalog forms submit `category=` for "all categories".
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

/// BookQuery
///
/// Query parameters accepted by `GET /books`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
pub struct BookQuery {
    /// Exact category match; empty or absent means every category.
    #[serde(default, deserialize_with = "empty_as_none")]
    #[param(value_type = Option<String>)]
    pub category: Option<Category>,
    /// Case-insensitive substring matched against title or author.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub q: Option<String>,
    /// `created_at` (default), `title` or `author`.
    #[serde(default, deserialize_with = "empty_as_none")]
    #[param(value_type = Option<String>)]
    pub sort: Option<SortField>,
    /// Defaults to descending for `created_at`, ascending otherwise.
    pub ascending: Option<bool>,
}

impl From<BookQuery> for ReadRequest {
    fn from(query: BookQuery) -> Self {
        let field = query.sort.unwrap_or_default();
        ReadRequest {
            filter: BookFilter {
                category: query.category,
                search: query.q,
            },
            order: Order {
                field,
                ascending: query.ascending.unwrap_or(field.default_ascending()),
            },
        }
    }
}

// --- Profile & Summary Schemas (Output) ---

/// UserProfile
///
/// Output schema for `GET /me`: the resolved identity of the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
}

/// CatalogSummary
///
/// Counters shown above the catalog grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CatalogSummary {
    pub total: usize,
    pub available: usize,
    pub borrowed: usize,
}

impl CatalogSummary {
    pub fn of(books: &[Book]) -> Self {
        Self {
            total: books.len(),
            available: books
                .iter()
                .filter(|b| b.status == BookStatus::Available)
                .count(),
            borrowed: books
                .iter()
                .filter(|b| b.status == BookStatus::Borrowed)
                .count(),
        }
    }
}
