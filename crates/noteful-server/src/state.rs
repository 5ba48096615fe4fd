use std::sync::Arc;

use noteful_core::{FolderStore, NoteStore, TagStore, UserStore};
use noteful_storage::SqliteStore;

/// Shared application state: one handle per collection, each behind its store
/// trait. Handlers never see the concrete backend, and there is no hidden
/// registry; whoever builds the router decides which stores it gets.
pub struct AppState {
    pub notes: Arc<dyn NoteStore>,
    pub folders: Arc<dyn FolderStore>,
    pub tags: Arc<dyn TagStore>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self {
            notes: store.clone(),
            folders: store.clone(),
            tags: store.clone(),
            users: store,
        }
    }
}
