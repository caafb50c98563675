//! Shared router state.

use crate::services::object_storage::ObjectStorageService;
use axum::extract::FromRef;
use std::sync::Arc;

/// State handed to every handler. Cloned per request, so everything in here is
/// either `Arc`ed or a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub app_name: Arc<str>,
    pub storage: ObjectStorageService,
}

impl AppState {
    pub fn new(app_name: impl Into<Arc<str>>, storage: ObjectStorageService) -> Self {
        Self {
            app_name: app_name.into(),
            storage,
        }
    }
}

impl FromRef<AppState> for ObjectStorageService {
    fn from_ref(state: &AppState) -> Self {
        state.storage.clone()
    }
}
