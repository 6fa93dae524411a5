//! HTTP handlers for chat-service.

pub mod archive;
pub mod chat;
pub mod health;
pub mod metrics;

pub use archive::{archive_status, chat_count, chat_history, chat_logs};
pub use chat::chat;
pub use health::{health_check, root};
pub use self::metrics::metrics;
