//! OpenAI-compatible chat transport

pub mod chat;
pub mod client;

pub use chat::{ChatMessage, ChatRequest, ChatResponse, ChatTool, MessageRole, ResponseFormat, ToolCall};
pub use client::{LlmClient, LlmConfig};
