//! Outgoing JSON bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatResponse {
    /// Assistant reply.
    pub response: String,
    pub conversation_id: String,
    pub timestamp: DateTime<Utc>,
    /// Documents the reply was grounded on.
    pub sources: Option<Vec<String>>,
}

/// One stored document as listed from the bucket.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DocumentInfo {
    pub id: String,
    pub filename: String,
    pub url: Option<String>,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DocumentUploadResponse {
    pub message: String,
    pub document_id: String,
    /// Filename as sent by the client, before sanitization.
    pub filename: String,
    pub url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentInfo>,
    pub total: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DocumentUrlResponse {
    pub document_id: String,
    pub url: String,
    pub expires_in: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Plain `{"message": ...}` acknowledgement.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
