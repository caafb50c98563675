//! Defines routes for the document question-answering API.
//!
//! ## Structure
//! - `GET    /` — banner
//! - `GET    /api/v1/health/` — liveness
//! - `POST   /api/v1/chat/` — echo chat
//! - **Document endpoints**
//!   - `POST   /api/v1/documents/upload` — multipart upload (`file` field)
//!   - `GET    /api/v1/documents/` — list documents, newest first
//!   - `DELETE /api/v1/documents/{document_id}` — delete every object of a document
//!   - `GET    /api/v1/documents/{document_id}/url` — presigned download URL
//!
//! Collection routes answer both with and without the trailing slash.

use crate::{
    handlers::{
        chat_handlers::chat,
        document_handlers::{delete_document, document_url, list_documents, upload_document},
        health_handlers::{health_check, root},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub const API_PREFIX: &str = "/api/v1";

/// Largest accepted request body (uploads are buffered in memory).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build and return the router for the whole API.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .nest(API_PREFIX, api_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/", get(health_check))
        .route("/chat", post(chat))
        .route("/chat/", post(chat))
        .route("/documents", get(list_documents))
        .route("/documents/", get(list_documents))
        .route("/documents/upload", post(upload_document))
        .route("/documents/{document_id}", delete(delete_document))
        .route("/documents/{document_id}/url", get(document_url))
}

/// Full router over an in-memory bucket, wrapped in an `axum-test` server.
#[cfg(test)]
pub fn test_server(
    bucket: std::sync::Arc<crate::services::memory_bucket::MemoryBucket>,
) -> axum_test::TestServer {
    use crate::{config::StorageConfig, services::object_storage::ObjectStorageService};

    let config = StorageConfig {
        account_id: Some("test-account".into()),
        access_key_id: Some("test-key".into()),
        secret_access_key: Some("test-secret".into()),
        bucket_name: Some("test-bucket".into()),
        public_base_url: Some("https://files.example.com".into()),
        endpoint_url: None,
    };
    let storage =
        ObjectStorageService::with_client(&config, bucket).expect("valid storage config");
    let app = routes().with_state(AppState::new("Test RAG API", storage));

    axum_test::TestServer::new(app.into_make_service()).expect("Failed to create test server")
}
