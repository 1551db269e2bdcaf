//! Provider selection and request construction

use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::SettingsManager;
use crate::error::{AiError, AiResult};

/// Default base URL of a local OpenAI-compatible server (Ollama)
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const OPENROUTER_CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Supported AI backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// Groq cloud
    Groq,
    /// Google Gemini
    Gemini,
    /// OpenRouter
    #[serde(rename = "openrouter")]
    OpenRouter,
    /// Any OpenAI-compatible server, usually on localhost
    Local,
}

impl AiProvider {
    /// All providers in preferences order
    pub const ALL: [Self; 4] = [Self::Groq, Self::Gemini, Self::OpenRouter, Self::Local];

    /// Settings value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Gemini => "gemini",
            Self::OpenRouter => "openrouter",
            Self::Local => "local",
        }
    }

    /// Human readable name
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Groq => "Groq",
            Self::Gemini => "Google Gemini",
            Self::OpenRouter => "OpenRouter",
            Self::Local => "Local (Ollama / LM Studio)",
        }
    }

    /// Model used when none is configured
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Groq => "llama-3.1-8b-instant",
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenRouter => "openrouter/polaris-alpha",
            Self::Local => "llama3.2",
        }
    }

    /// Cloud providers refuse requests without a key
    #[must_use]
    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::Local)
    }

    /// Whether replies can be streamed token by token
    #[must_use]
    pub const fn supports_streaming(self) -> bool {
        !matches!(self, Self::Gemini)
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AiError::MissingConfiguration(vec!["provider".to_string()]))
    }
}

/// Names of the settings that must be filled in before a request can be
/// made: `provider`, `api_key` or `base_url`. Empty when ready.
#[must_use]
pub fn missing_configuration(settings: &SettingsManager) -> Vec<String> {
    let provider = settings.get_string("ai_assistant_provider", "");
    let Ok(provider) = provider.parse::<AiProvider>() else {
        return vec!["provider".to_string()];
    };
    let mut missing = Vec::new();
    let is_blank = |key: &str| settings.get_string(key, "").trim().is_empty();
    if provider.requires_api_key() && is_blank("ai_assistant_api_key") {
        missing.push("api_key".to_string());
    }
    if provider == AiProvider::Local && is_blank("ai_local_base_url") {
        missing.push("base_url".to_string());
    }
    missing
}

/// Resolved provider settings for one request
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Backend
    pub provider: AiProvider,
    /// Model id, never empty
    pub model: String,
    /// API key; optional for local servers
    pub api_key: Option<SecretString>,
    /// Sent as `HTTP-Referer` to OpenRouter
    pub openrouter_site_url: Option<String>,
    /// Sent as `X-Title` to OpenRouter
    pub openrouter_site_name: Option<String>,
    /// Base URL of the local server
    pub local_base_url: String,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl AiConfig {
    /// Config for `provider` with its default model and no key
    #[must_use]
    pub fn new(provider: AiProvider) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            api_key: None,
            openrouter_site_url: None,
            openrouter_site_name: None,
            local_base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
        }
    }

    /// Sets the API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = non_empty(key.into()).map(SecretString::from);
        self
    }

    /// Reads the `ai_*` settings.
    ///
    /// # Errors
    /// [`AiError::MissingConfiguration`] listing what is not set.
    pub fn from_settings(settings: &SettingsManager) -> AiResult<Self> {
        let missing = missing_configuration(settings);
        if !missing.is_empty() {
            return Err(AiError::MissingConfiguration(missing));
        }
        let provider: AiProvider = settings.get_string("ai_assistant_provider", "").parse()?;
        let mut config = Self::new(provider)
            .with_api_key(settings.get_string("ai_assistant_api_key", ""));
        if let Some(model) = non_empty(settings.get_string("ai_assistant_model", "")) {
            config.model = model;
        }
        config.openrouter_site_url = non_empty(settings.get_string("ai_openrouter_site_url", ""));
        config.openrouter_site_name = non_empty(settings.get_string("ai_openrouter_site_name", ""));
        if let Some(url) = non_empty(settings.get_string("ai_local_base_url", "")) {
            config.local_base_url = url;
        }
        Ok(config)
    }

    fn bearer(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|k| format!("Bearer {}", k.expose_secret()))
    }
}

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions
    System,
    /// The person typing
    User,
    /// The model
    Assistant,
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker
    pub role: ChatRole,
    /// Text
    pub content: String,
}

impl ChatMessage {
    /// Message with the given role
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A fully prepared HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    /// POST target
    pub url: String,
    /// Extra headers; `Content-Type: application/json` is implied
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Value,
    /// Response arrives as server-sent events
    pub stream: bool,
}

fn openai_messages(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .filter(|m| !m.content.is_empty())
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect()
}

/// Splits a conversation into Gemini's system instruction and contents.
/// Only the first system message is used.
#[must_use]
pub fn gemini_conversation(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
    let mut system = None;
    let mut contents = Vec::new();
    for message in messages.iter().filter(|m| !m.content.is_empty()) {
        match message.role {
            ChatRole::System if system.is_none() => system = Some(message.content.clone()),
            role => {
                let role = if role == ChatRole::Assistant { "model" } else { "user" };
                contents.push(json!({"role": role, "parts": [{"text": message.content}]}));
            }
        }
    }
    if contents.is_empty() {
        contents.push(json!({"role": "user", "parts": [{"text": ""}]}));
    }
    (system, contents)
}

/// Builds the request for `messages`. Streaming is ignored for providers
/// that do not support it.
#[must_use]
pub fn build_request(config: &AiConfig, messages: &[ChatMessage], stream: bool) -> ProviderRequest {
    let stream = stream && config.provider.supports_streaming();
    let mut headers = Vec::new();

    let (url, body) = match config.provider {
        AiProvider::Gemini => {
            if let Some(key) = &config.api_key {
                headers.push(("x-goog-api-key".to_string(), key.expose_secret().to_string()));
            }
            let (system, contents) = gemini_conversation(messages);
            let mut body = json!({"contents": contents});
            if let Some(system) = system {
                body["system_instruction"] = json!({"parts": [{"text": system}]});
            }
            (format!("{GEMINI_BASE_URL}/{}:generateContent", config.model), body)
        }
        provider => {
            let url = match provider {
                AiProvider::Groq => GROQ_CHAT_URL.to_string(),
                AiProvider::OpenRouter => OPENROUTER_CHAT_URL.to_string(),
                _ => format!("{}/chat/completions", config.local_base_url.trim_end_matches('/')),
            };
            if let Some(bearer) = config.bearer() {
                headers.push(("Authorization".to_string(), bearer));
            }
            if provider == AiProvider::OpenRouter {
                if let Some(site) = &config.openrouter_site_url {
                    headers.push(("HTTP-Referer".to_string(), site.clone()));
                }
                if let Some(name) = &config.openrouter_site_name {
                    headers.push(("X-Title".to_string(), name.clone()));
                }
            }
            let body = json!({
                "model": config.model,
                "messages": openai_messages(messages),
                "stream": stream,
            });
            (url, body)
        }
    };

    ProviderRequest {
        url,
        headers,
        body,
        stream,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(ChatRole::System, "be brief"),
            ChatMessage::new(ChatRole::User, "list files"),
            ChatMessage::new(ChatRole::Assistant, "ls"),
            ChatMessage::new(ChatRole::User, ""),
        ]
    }

    #[test]
    fn provider_names() {
        assert_eq!("OpenRouter".parse::<AiProvider>().unwrap(), AiProvider::OpenRouter);
        assert!("bard".parse::<AiProvider>().is_err());
        assert_eq!(AiProvider::Gemini.default_model(), "gemini-2.5-flash");
        assert!(!AiProvider::Local.requires_api_key());
        assert_eq!(serde_json::to_value(AiProvider::OpenRouter).unwrap(), "openrouter");
    }

    #[test]
    fn openai_compatible_requests() {
        let mut config = AiConfig::new(AiProvider::OpenRouter).with_api_key("sk-1");
        config.openrouter_site_url = Some("https://example.org".into());
        let request = build_request(&config, &conversation(), true);
        assert_eq!(request.url, OPENROUTER_CHAT_URL);
        assert!(request.stream);
        assert_eq!(request.body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(request.body["messages"][2]["role"], "assistant");
        assert!(request.headers.contains(&("Authorization".into(), "Bearer sk-1".into())));
        assert!(request.headers.iter().any(|(k, _)| k == "HTTP-Referer"));

        let mut local = AiConfig::new(AiProvider::Local);
        local.local_base_url = "http://127.0.0.1:1234/v1/".into();
        let request = build_request(&local, &conversation(), false);
        assert_eq!(request.url, "http://127.0.0.1:1234/v1/chat/completions");
        assert!(request.headers.is_empty());
        assert_eq!(request.body["model"], "llama3.2");
    }

    #[test]
    fn gemini_request_shape() {
        let config = AiConfig::new(AiProvider::Gemini).with_api_key("g");
        let request = build_request(&config, &conversation(), true);
        assert!(!request.stream);
        assert!(request.url.ends_with("/gemini-2.5-flash:generateContent"));
        assert_eq!(request.body["system_instruction"]["parts"][0]["text"], "be brief");
        assert_eq!(request.body["contents"][1]["role"], "model");
        assert_eq!(request.headers, vec![("x-goog-api-key".to_string(), "g".to_string())]);

        let (system, contents) = gemini_conversation(&[]);
        assert!(system.is_none());
        assert_eq!(contents.len(), 1);
    }

    #[test]
    fn blank_key_is_no_key() {
        assert!(AiConfig::new(AiProvider::Groq).with_api_key("  ").api_key.is_none());
    }
}
