pub mod chat_handlers;
pub mod document_handlers;
pub mod health_handlers;
