use uuid::Uuid;

use super::{
    form::{EditForm, FormError},
    gateway::GatewayState,
    list::{Criteria, DeleteOutcome, ListScreen},
};
use crate::models::Book;

/// AdminBooksScreen
///
/// The `/admin/books` management screen: the full catalog (newest first by
/// default) plus the create/edit modal. A successful save re-reads the list
/// so it reflects whatever the backend stored.
pub struct AdminBooksScreen {
    list: ListScreen,
    form: EditForm,
}

impl AdminBooksScreen {
    pub fn new(gateway: GatewayState) -> Self {
        Self {
            list: ListScreen::new(gateway, Criteria::default()),
            form: EditForm::new(),
        }
    }

    pub async fn mount(&self) {
        self.list.refresh().await;
    }

    pub fn list(&self) -> &ListScreen {
        &self.list
    }

    pub fn form(&self) -> &EditForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut EditForm {
        &mut self.form
    }

    pub fn open_create(&mut self) {
        self.form.open_create();
    }

    /// Opens the form on a book from the current list. Returns `false` when
    /// no listed book has that id.
    pub fn open_edit(&mut self, id: Uuid) -> bool {
        match self.list.books().iter().find(|book| book.id == id) {
            Some(book) => {
                self.form.open_edit(book);
                true
            }
            None => false,
        }
    }

    pub async fn submit_form(&mut self) -> Result<Book, FormError> {
        let book = self.form.submit(self.list.gateway().as_ref()).await?;
        self.list.refresh().await;
        Ok(book)
    }

    pub async fn delete_book(&self, id: Uuid, confirm: impl FnOnce() -> bool) -> DeleteOutcome {
        self.list.delete(id, confirm).await
    }
}
