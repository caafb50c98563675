//! Incoming JSON bodies.

use serde::Deserialize;

/// Body of `POST /api/v1/chat/`.
#[derive(Deserialize, Clone, Debug)]
pub struct ChatRequest {
    /// User message.
    pub message: String,

    /// Conversation to continue; a new one is started when absent.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Query string of `GET /api/v1/documents/{id}/url`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PresignQuery {
    /// Lifetime of the URL in seconds.
    pub expires_in: Option<u64>,
}
