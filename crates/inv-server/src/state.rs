use std::sync::Arc;

use inv_store::{ItemStore, QueryView};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<ItemStore>,
    pub query: QueryView,
}

impl AppState {
    pub fn new(store: Arc<ItemStore>) -> Self {
        let query = QueryView::new(Arc::clone(&store));
        Self { store, query }
    }
}
