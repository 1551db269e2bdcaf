//! AI assistant backend
//!
//! Provider configuration and request building ([`provider`]), the HTTP
//! client ([`client`]), prompt construction, reply parsing, markdown
//! rendering for the chat panel and the persisted conversation history.
//! Nothing here touches GTK; the panel drives [`AiClient`] on the tokio
//! runtime and marshals results back to the main loop.

pub mod client;
pub mod history;
pub mod markdown;
pub mod payload;
pub mod prompt;
pub mod provider;

pub use client::{AiClient, ModelInfo, SseEvent, http_error, parse_sse_line};
pub use history::{AiHistoryManager, Conversation, HistoryEntry, MAX_CONVERSATIONS, RECENT_MESSAGES};
pub use markdown::{CodeColors, escape_markup, markdown_to_pango};
pub use payload::{
    AssistantReply, SuggestedCommand, extract_partial_reply, parse_assistant_payload,
};
pub use prompt::{build_messages, default_system_prompt, system_prompt};
pub use provider::{
    AiConfig, AiProvider, ChatMessage, ChatRole, ProviderRequest, build_request,
    missing_configuration,
};
