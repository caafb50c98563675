//! HTTP handlers for document upload, listing, deletion and temporary links.
//!
//! Every document lives under `documents/<document_id>/<sanitized filename>`
//! in the bucket; the document id is just that key segment.

use crate::{
    errors::AppError,
    models::{
        requests::PresignQuery,
        responses::{
            DocumentInfo, DocumentListResponse, DocumentUploadResponse, DocumentUrlResponse,
            MessageResponse,
        },
    },
    services::object_storage::{
        DEFAULT_PRESIGN_EXPIRY, MAX_KEYS_PER_PAGE, ObjectStorageService, StoredObject,
        UploadRequest,
    },
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};
use bytes::Bytes;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub const DOCUMENTS_PREFIX: &str = "documents";
const FILE_FIELD: &str = "file";

struct IncomingFile {
    filename: String,
    content_type: Option<String>,
    content: Bytes,
}

fn document_prefix(document_id: &Uuid) -> String {
    format!("{}/{}", DOCUMENTS_PREFIX, document_id)
}

/// Ids are generated UUIDs; any other path segment names no document.
fn parse_document_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("Document not found"))
}

/// Keys under `documents/`, excluding look-alikes such as `documents-archive/`.
fn is_document_key(key: &str) -> bool {
    key.strip_prefix(DOCUMENTS_PREFIX)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Second key segment, i.e. the `<document_id>` in `documents/<document_id>/...`.
fn document_id_of(key: &str) -> String {
    key.split('/').nth(1).unwrap_or_default().to_string()
}

impl From<StoredObject> for DocumentInfo {
    fn from(obj: StoredObject) -> Self {
        Self {
            id: document_id_of(&obj.key),
            filename: obj.filename().to_string(),
            size: Some(obj.size),
            last_modified: obj.last_modified,
            url: obj.url,
        }
    }
}

/// Pull the `file` part out of the form, ignoring any other fields.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<IncomingFile>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let content = field.bytes().await?;
        return Ok(Some(IncomingFile {
            filename,
            content_type,
            content,
        }));
    }
    Ok(None)
}

/// `POST /api/v1/documents/upload` — multipart upload of a single `file`.
pub async fn upload_document(
    State(storage): State<ObjectStorageService>,
    mut multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>, AppError> {
    let file = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| AppError::bad_request("multipart field `file` is required"))?;

    let document_id = Uuid::new_v4();
    let prefix = document_prefix(&document_id);
    let key = storage.build_key(&file.filename, Some(prefix.as_str()));

    let result = storage
        .upload(
            UploadRequest::new(file.content, file.filename.clone())
                .with_content_type(file.content_type)
                .with_destination_key(key)
                .with_metadata("document_id", document_id.to_string()),
        )
        .await?;

    info!(
        document_id = %document_id,
        key = %result.key,
        bucket = %result.bucket,
        size_bytes = result.size,
        "document uploaded"
    );

    Ok(Json(DocumentUploadResponse {
        message: "Document uploaded successfully".into(),
        document_id: document_id.to_string(),
        filename: file.filename,
        url: result.url,
    }))
}

/// `GET /api/v1/documents/` — most recently modified first.
pub async fn list_documents(
    State(storage): State<ObjectStorageService>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let objects = storage
        .list_objects(Some(DOCUMENTS_PREFIX), MAX_KEYS_PER_PAGE)
        .await?;

    let mut documents: Vec<DocumentInfo> = objects
        .into_iter()
        .filter(|obj| is_document_key(&obj.key))
        .map(DocumentInfo::from)
        .collect();
    // `None` sorts below any timestamp, so undated objects end up last.
    documents.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    Ok(Json(DocumentListResponse {
        total: documents.len(),
        documents,
    }))
}

/// `DELETE /api/v1/documents/{document_id}`
pub async fn delete_document(
    State(storage): State<ObjectStorageService>,
    Path(document_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let document_id = parse_document_id(&document_id)?;
    let deleted = storage.delete_prefix(&document_prefix(&document_id)).await?;
    if deleted == 0 {
        return Err(AppError::not_found("Document not found"));
    }

    info!(
        document_id = %document_id,
        objects = deleted,
        bucket = %storage.bucket(),
        "document deleted"
    );
    Ok(Json(MessageResponse::new("Document deleted successfully")))
}

/// `GET /api/v1/documents/{document_id}/url?expires_in=` — presigned download link.
pub async fn document_url(
    State(storage): State<ObjectStorageService>,
    Path(document_id): Path<String>,
    Query(query): Query<PresignQuery>,
) -> Result<Json<DocumentUrlResponse>, AppError> {
    let expires_in = query
        .expires_in
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_PRESIGN_EXPIRY);

    let document_id = parse_document_id(&document_id)?;
    let prefix = document_prefix(&document_id);
    let object = storage
        .list_objects(Some(prefix.as_str()), 1)
        .await?
        .into_iter()
        .find(|obj| document_id_of(&obj.key) == document_id.to_string())
        .ok_or_else(|| AppError::not_found("Document not found"))?;

    let url = storage
        .generate_presigned_url(&object.key, expires_in)
        .await?;

    Ok(Json(DocumentUrlResponse {
        document_id: document_id.to_string(),
        url,
        expires_in: expires_in.as_secs(),
    }))
}
