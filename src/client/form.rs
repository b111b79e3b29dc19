use thiserror::Error;

use super::gateway::{Gateway, GatewayError};
use crate::models::{Book, BookDraft, MissingField};

/// Alert raised when the backend rejects a save.
pub const SAVE_FAILED_ALERT: &str = "保存中にエラーが発生しました。";

/// FormError
#[derive(Debug, Error)]
pub enum FormError {
    #[error("the form is not open")]
    Closed,

    /// Required fields are empty. No backend call was made.
    #[error("required fields missing: {}", list(.0))]
    Invalid(Vec<MissingField>),

    #[error("save failed: {0}")]
    Gateway(#[from] GatewayError),
}

fn list(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// EditForm
///
/// The admin modal for creating or editing one book. While open it owns a
/// `BookDraft`; whether submitting inserts or updates follows from the
/// draft's `id`.
#[derive(Debug, Default)]
pub struct EditForm {
    draft: BookDraft,
    open: bool,
    submitting: bool,
    alert: Option<String>,
}

impl EditForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an empty draft. Status starts at `available`.
    pub fn open_create(&mut self) {
        self.draft = BookDraft::default();
        self.alert = None;
        self.open = true;
    }

    /// Opens a draft seeded from `book`; submitting updates that book.
    pub fn open_edit(&mut self, book: &Book) {
        self.draft = BookDraft::from_book(book);
        self.alert = None;
        self.open = true;
    }

    /// Closes without saving; the draft is discarded.
    pub fn close(&mut self) {
        self.open = false;
        self.draft = BookDraft::default();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_editing(&self) -> bool {
        self.draft.id.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn draft(&self) -> &BookDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut BookDraft {
        &mut self.draft
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// submit
    ///
    /// Validates the draft and, only if it is complete, writes it through
    /// `gateway`. Success closes the form. Failure keeps it open with the
    /// draft intact and raises the save alert.
    pub async fn submit(&mut self, gateway: &dyn Gateway) -> Result<Book, FormError> {
        if !self.open {
            return Err(FormError::Closed);
        }
        let input = self.draft.to_input().map_err(FormError::Invalid)?;

        self.submitting = true;
        let result = match self.draft.id {
            Some(id) => gateway.update(id, &input).await,
            None => gateway.insert(&input).await,
        };
        self.submitting = false;

        match result {
            Ok(book) => {
                tracing::info!(book_id = %book.id, "book saved");
                self.close();
                self.alert = None;
                Ok(book)
            }
            Err(e) => {
                tracing::error!("failed to save book: {}", e);
                self.alert = Some(SAVE_FAILED_ALERT.to_string());
                Err(e.into())
            }
        }
    }
}
