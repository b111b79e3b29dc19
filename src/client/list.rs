use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use super::gateway::GatewayState;
use crate::models::{Book, BookFilter, CatalogSummary, Category, ReadRequest, SortKey};

/// Criteria
///
/// What the user asked to see: a category (or all), a search term (blank
/// means none) and one of the three orderings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Criteria {
    pub category: Option<Category>,
    pub search: String,
    pub sort: SortKey,
}

impl Criteria {
    /// Criteria of the `/search?q=` screen.
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: term.into(),
            ..Self::default()
        }
    }

    pub fn to_request(&self) -> ReadRequest {
        let term = self.search.trim();
        ReadRequest {
            filter: BookFilter {
                category: self.category,
                search: (!term.is_empty()).then(|| term.to_string()),
            },
            order: self.sort.order(),
        }
    }
}

/// DeleteOutcome
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The confirmation was declined; nothing was sent.
    Cancelled,
    Deleted,
    /// The backend refused or was unreachable. Already logged.
    Failed,
}

#[derive(Debug, Default)]
struct ListState {
    criteria: Criteria,
    books: Vec<Book>,
    loading: bool,
    /// Sequence number of the most recently issued read.
    latest: u64,
    /// Books confirmed deleted since the last applied read. A read issued
    /// before the delete may still carry them.
    deleted: HashSet<Uuid>,
}

/// ListScreen
///
/// Holds the catalog list and keeps it in sync with the criteria. Every
/// criteria change issues a fresh read; only the response to the newest read
/// is ever applied, so a slow earlier response cannot overwrite a later one.
/// Nor can it bring back a book whose delete was confirmed while it was in
/// flight.
///
/// The state lock is never held across an await.
pub struct ListScreen {
    gateway: GatewayState,
    state: Mutex<ListState>,
}

impl ListScreen {
    /// A screen that has not loaded yet. Call [`ListScreen::refresh`] to mount it.
    pub fn new(gateway: GatewayState, criteria: Criteria) -> Self {
        Self {
            gateway,
            state: Mutex::new(ListState {
                criteria,
                loading: true,
                ..ListState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn gateway(&self) -> &GatewayState {
        &self.gateway
    }

    pub fn criteria(&self) -> Criteria {
        self.state().criteria.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// The last applied result, even while a newer read is in flight.
    pub fn books(&self) -> Vec<Book> {
        self.state().books.clone()
    }

    /// What the screen renders: `None` while loading, the list otherwise.
    /// An empty list is the "no matching books" state.
    pub fn visible_books(&self) -> Option<Vec<Book>> {
        let state = self.state();
        (!state.loading).then(|| state.books.clone())
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary::of(&self.state().books)
    }

    /// refresh
    ///
    /// Reads with the current criteria. A failed read is logged and leaves
    /// the previous list in place.
    pub async fn refresh(&self) {
        let (seq, request) = {
            let mut state = self.state();
            state.latest += 1;
            state.loading = true;
            (state.latest, state.criteria.to_request())
        };

        let result = self.gateway.read(&request).await;

        let mut state = self.state();
        if seq != state.latest {
            tracing::debug!(seq, latest = state.latest, "discarding superseded read");
            return;
        }
        let deleted = std::mem::take(&mut state.deleted);
        match result {
            Ok(mut books) => {
                books.retain(|book| !deleted.contains(&book.id));
                state.books = books;
            }
            Err(e) => tracing::error!("failed to load books: {}", e),
        }
        state.loading = false;
    }

    /// Replaces the criteria, re-reading only if they actually changed.
    pub async fn set_criteria(&self, criteria: Criteria) {
        {
            let mut state = self.state();
            if state.criteria == criteria {
                return;
            }
            state.criteria = criteria;
        }
        self.refresh().await;
    }

    pub async fn set_category(&self, category: Option<Category>) {
        let criteria = Criteria {
            category,
            ..self.criteria()
        };
        self.set_criteria(criteria).await;
    }

    pub async fn set_search(&self, term: impl Into<String>) {
        let criteria = Criteria {
            search: term.into(),
            ..self.criteria()
        };
        self.set_criteria(criteria).await;
    }

    pub async fn set_sort(&self, sort: SortKey) {
        let criteria = Criteria {
            sort,
            ..self.criteria()
        };
        self.set_criteria(criteria).await;
    }

    /// delete
    ///
    /// Asks `confirm` first; only a confirmed delete reaches the backend. On
    /// success the book is dropped from the local list without a re-read.
    pub async fn delete(&self, id: Uuid, confirm: impl FnOnce() -> bool) -> DeleteOutcome {
        if !confirm() {
            return DeleteOutcome::Cancelled;
        }

        match self.gateway.delete(id).await {
            Ok(()) => {
                let mut state = self.state();
                state.books.retain(|book| book.id != id);
                state.deleted.insert(id);
                drop(state);
                tracing::info!(book_id = %id, "book deleted");
                DeleteOutcome::Deleted
            }
            Err(e) => {
                tracing::error!(book_id = %id, "failed to delete book: {}", e);
                DeleteOutcome::Failed
            }
        }
    }
}
