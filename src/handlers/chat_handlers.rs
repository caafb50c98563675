//! Chat endpoint. There is no model behind it yet: the message is echoed back.

use crate::models::{requests::ChatRequest, responses::ChatResponse};
use axum::Json;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

/// `POST /api/v1/chat/`
pub async fn chat(Json(request): Json<ChatRequest>) -> Json<ChatResponse> {
    let conversation_id = request
        .conversation_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    debug!(conversation_id = %conversation_id, "echoing chat message");

    Json(ChatResponse {
        response: format!("Echo: {}", request.message),
        conversation_id,
        timestamp: Utc::now(),
        sources: Some(vec!["mock_document.pdf".into()]),
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        models::responses::ChatResponse, routes::test_server, services::memory_bucket::MemoryBucket,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn echoes_message_and_keeps_conversation() {
        let server = test_server(Arc::new(MemoryBucket::new()));
        let response = server
            .post("/api/v1/chat/")
            .json(&json!({ "message": "hola", "conversation_id": "conv-1" }))
            .await;

        response.assert_status_ok();
        let body: ChatResponse = response.json();
        assert_eq!(body.response, "Echo: hola");
        assert_eq!(body.conversation_id, "conv-1");
        assert_eq!(body.sources, Some(vec!["mock_document.pdf".to_string()]));
    }

    #[tokio::test]
    async fn starts_new_conversation_when_absent() {
        let server = test_server(Arc::new(MemoryBucket::new()));
        let response = server
            .post("/api/v1/chat")
            .json(&json!({ "message": "hi" }))
            .await;

        response.assert_status_ok();
        let body: ChatResponse = response.json();
        assert!(Uuid::parse_str(&body.conversation_id).is_ok());
    }

    #[tokio::test]
    async fn rejects_body_without_message() {
        let server = test_server(Arc::new(MemoryBucket::new()));
        let response = server.post("/api/v1/chat/").json(&json!({})).await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
