//! HTTP client for the AI providers
//!
//! Requests run on the tokio runtime. Streaming replies are read as
//! server-sent events and each text chunk is handed to a callback; the GUI
//! forwards those to the main loop.

use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;

use crate::error::{AiError, AiResult};

use super::provider::{AiConfig, AiProvider, ChatMessage, ProviderRequest, build_request};

const OPENROUTER_MODELS_URL: &str = "https://openrouter.ai/api/v1/models";

/// One parsed line of an SSE stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A piece of the reply
    Chunk(String),
    /// `data: [DONE]`
    Done,
    /// Blank lines, comments, keep-alives and undecodable payloads
    Skip,
}

/// Parses one line of an OpenAI-style SSE stream
#[must_use]
pub fn parse_sse_line(line: &str) -> SseEvent {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return SseEvent::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    let Ok(value) = serde_json::from_str::<Value>(data) else {
        return SseEvent::Skip;
    };
    match value["choices"][0]["delta"]["content"].as_str() {
        Some(chunk) if !chunk.is_empty() => SseEvent::Chunk(chunk.to_string()),
        _ => SseEvent::Skip,
    }
}

fn join_text_parts(parts: &[Value]) -> String {
    parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts the reply text from a non-streaming response body
///
/// # Errors
/// [`AiError::Parse`] when there are no choices or candidates, and
/// [`AiError::EmptyResponse`] when they hold no text.
pub fn extract_completion(provider: AiProvider, body: &Value) -> AiResult<String> {
    let text = if provider == AiProvider::Gemini {
        let candidates = body["candidates"]
            .as_array()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AiError::Parse("response has no candidates".to_string()))?;
        candidates
            .iter()
            .filter_map(|c| c["content"]["parts"].as_array())
            .map(|parts| join_text_parts(parts))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        let choice = body["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| AiError::Parse("response has no choices".to_string()))?;
        match &choice["message"]["content"] {
            Value::String(s) => s.clone(),
            Value::Array(parts) => join_text_parts(parts),
            _ => String::new(),
        }
    };
    let text = text.trim();
    if text.is_empty() {
        Err(AiError::EmptyResponse)
    } else {
        Ok(text.to_string())
    }
}

/// Builds the error for a failed request. The provider's `error.message` is
/// preferred over the raw body, and OpenRouter's provider name and raw
/// detail are appended when present.
#[must_use]
pub fn http_error(status: u16, body: &str) -> AiError {
    let fallback = if body.trim().is_empty() {
        "Unknown error.".to_string()
    } else {
        body.trim().to_string()
    };
    let Ok(payload) = serde_json::from_str::<Value>(body) else {
        return AiError::Http {
            status,
            message: fallback,
        };
    };
    let error = &payload["error"];
    let Some(message) = error["message"].as_str().or_else(|| error.as_str()) else {
        return AiError::Http {
            status,
            message: fallback,
        };
    };
    let details: Vec<&str> = [
        error["metadata"]["provider_name"].as_str(),
        error["metadata"]["raw"].as_str(),
    ]
    .into_iter()
    .flatten()
    .filter(|d| !d.is_empty())
    .collect();
    let message = if details.is_empty() {
        message.to_string()
    } else {
        format!("{message} ({})", details.join(" | "))
    };
    AiError::Http { status, message }
}

/// Model advertised by OpenRouter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Id used in requests
    pub id: String,
    /// Display name, falls back to the id
    pub name: String,
}

/// Parses the `/models` listing, sorted by name case-insensitively
#[must_use]
pub fn parse_model_list(body: &Value) -> Vec<ModelInfo> {
    let mut models: Vec<ModelInfo> = body["data"]
        .as_array()
        .map(|data| {
            data.iter()
                .filter_map(|m| {
                    let id = m["id"].as_str().filter(|id| !id.is_empty())?;
                    let name = m["name"].as_str().unwrap_or(id);
                    Some(ModelInfo {
                        id: id.to_string(),
                        name: name.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    models.sort_by_key(|m| m.name.to_lowercase());
    models
}

/// Talks to the configured provider
#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::Client,
}

impl AiClient {
    /// Creates a client with the given request timeout
    ///
    /// # Errors
    /// [`AiError::Network`] if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> AiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("zashterminal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Client with the timeout suited to `provider`: local models get two
    /// minutes, cloud providers one
    ///
    /// # Errors
    /// See [`new`](Self::new).
    pub fn for_provider(provider: AiProvider) -> AiResult<Self> {
        let secs = if provider == AiProvider::Local { 120 } else { 60 };
        Self::new(Duration::from_secs(secs))
    }

    async fn send(&self, request: &ProviderRequest) -> AiResult<reqwest::Response> {
        let mut builder = self.http.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(http_error(status.as_u16(), &body))
    }

    /// Sends `messages` and returns the whole reply
    ///
    /// # Errors
    /// Network, HTTP and response shape errors.
    pub async fn complete(&self, config: &AiConfig, messages: &[ChatMessage]) -> AiResult<String> {
        let request = build_request(config, messages, false);
        tracing::debug!(provider = %config.provider, model = %config.model, "AI request");
        let response = self.send(&request).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;
        extract_completion(config.provider, &body)
    }

    /// Streams the reply, calling `on_chunk` for every piece of text.
    ///
    /// Providers without streaming support deliver the whole reply as one
    /// chunk. Returns the concatenated reply.
    ///
    /// # Errors
    /// Network and HTTP errors.
    pub async fn complete_streaming(
        &self,
        config: &AiConfig,
        messages: &[ChatMessage],
        mut on_chunk: impl FnMut(&str),
    ) -> AiResult<String> {
        if !config.provider.supports_streaming() {
            let reply = self.complete(config, messages).await?;
            on_chunk(&reply);
            return Ok(reply);
        }

        let request = build_request(config, messages, true);
        tracing::debug!(provider = %config.provider, model = %config.model, "AI streaming request");
        let response = self.send(&request).await?;
        let mut stream = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        let mut reply = String::new();

        'outer: while let Some(bytes) = stream.next().await {
            pending.extend_from_slice(&bytes?);
            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                match parse_sse_line(&String::from_utf8_lossy(&line)) {
                    SseEvent::Chunk(chunk) => {
                        on_chunk(&chunk);
                        reply.push_str(&chunk);
                    }
                    SseEvent::Done => break 'outer,
                    SseEvent::Skip => {}
                }
            }
        }
        if let SseEvent::Chunk(chunk) = parse_sse_line(&String::from_utf8_lossy(&pending)) {
            on_chunk(&chunk);
            reply.push_str(&chunk);
        }
        Ok(reply)
    }

    /// Lists the models OpenRouter offers
    ///
    /// # Errors
    /// Network and HTTP errors.
    pub async fn list_openrouter_models(&self, api_key: Option<&str>) -> AiResult<Vec<ModelInfo>> {
        let mut builder = self.http.get(OPENROUTER_MODELS_URL);
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_error(status.as_u16(), &body));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;
        Ok(parse_model_list(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sse_lines() {
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":"ls"}}]}"#),
            SseEvent::Chunk("ls".into())
        );
        assert_eq!(parse_sse_line("data: [DONE]"), SseEvent::Done);
        assert_eq!(parse_sse_line("data: {broken"), SseEvent::Skip);
        assert_eq!(parse_sse_line(": keep-alive"), SseEvent::Skip);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseEvent::Skip
        );
    }

    #[test]
    fn completion_bodies() {
        let openai = json!({"choices":[{"message":{"content":"  hello "}}]});
        assert_eq!(extract_completion(AiProvider::Groq, &openai).unwrap(), "hello");

        let parts = json!({"choices":[{"message":{"content":[{"text":"a"},{"text":"b"}]}}]});
        assert_eq!(extract_completion(AiProvider::Local, &parts).unwrap(), "a\nb");

        let gemini = json!({"candidates":[{"content":{"parts":[{"text":"hi"}]}}]});
        assert_eq!(extract_completion(AiProvider::Gemini, &gemini).unwrap(), "hi");

        assert!(matches!(
            extract_completion(AiProvider::Groq, &json!({"choices":[]})),
            Err(AiError::Parse(_))
        ));
        assert!(matches!(
            extract_completion(AiProvider::Groq, &json!({"choices":[{"message":{"content":" "}}]})),
            Err(AiError::EmptyResponse)
        ));
    }

    #[test]
    fn error_messages() {
        let body = r#"{"error":{"message":"Rate limited","metadata":{"provider_name":"Groq","raw":"slow down"}}}"#;
        assert_eq!(
            http_error(429, body).to_string(),
            "HTTP 429: Rate limited (Groq | slow down)"
        );
        assert_eq!(http_error(500, "").to_string(), "HTTP 500: Unknown error.");
        assert_eq!(http_error(502, "Bad gateway").to_string(), "HTTP 502: Bad gateway");
    }

    #[test]
    fn model_listing_sorted_by_name() {
        let body = json!({"data":[
            {"id":"z/model","name":"beta"},
            {"id":"a/model","name":"Alpha"},
            {"id":"","name":"skipped"},
            {"id":"c/model"}
        ]});
        let names: Vec<String> = parse_model_list(&body).into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Alpha", "beta", "c/model"]);
    }
}
