pub mod chat;

pub use chat::{ChatRecord, ChatRequest, ChatResponse, CHAT_KEY_SUFFIX};
