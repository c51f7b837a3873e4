//! External LLM provider completions.
//!
//! OpenAI and Groq share the chat-completions format. Anthropic uses the
//! Messages API, with the system prompt carried outside the message list.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use snit_core::{Error, Result};
use tracing::{debug, error};

use crate::config::{LLMConfig, ResolvedProvider};
use crate::types::{ChatMessage, CompletionOptions, LLMProvider};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Text completion over a message list. Shared read-only across requests.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], options: CompletionOptions)
        -> Result<String>;

    /// Whether a provider is configured at all.
    fn is_available(&self) -> bool;
}

/// `LanguageModel` backed by the provider resolved from `LLMConfig`.
pub struct HttpLanguageModel {
    client: Client,
    resolved: Option<ResolvedProvider>,
}

impl HttpLanguageModel {
    pub fn new(client: Client, config: &LLMConfig) -> Self {
        Self {
            client,
            resolved: config.resolve_provider(),
        }
    }

    pub fn provider(&self) -> Option<LLMProvider> {
        self.resolved.as_ref().map(|r| r.provider)
    }

    pub fn model(&self) -> Option<&str> {
        self.resolved.as_ref().map(|r| r.model.as_str())
    }

    async fn post(&self, request: reqwest::RequestBuilder, body: &Value) -> Result<Value> {
        let response = request
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("LLM API error {}", status);
            return Err(Error::Http(format!("API error {}: {}", status, text)));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String> {
        let resolved = self
            .resolved
            .as_ref()
            .ok_or_else(|| Error::Unavailable("no LLM provider configured".into()))?;

        debug!(
            "Completion from {} with model {} ({} messages)",
            resolved.provider,
            resolved.model,
            messages.len()
        );

        match resolved.provider {
            LLMProvider::OpenAI | LLMProvider::Groq => {
                let url = if resolved.provider == LLMProvider::OpenAI {
                    OPENAI_URL
                } else {
                    GROQ_URL
                };
                let body = openai_body(&resolved.model, messages, options);
                let request = self.client.post(url).bearer_auth(&resolved.api_key);
                let value = self.post(request, &body).await?;
                extract_openai_text(&value)
            }
            LLMProvider::Anthropic => {
                let body = anthropic_body(&resolved.model, messages, options);
                let request = self
                    .client
                    .post(ANTHROPIC_URL)
                    .header("x-api-key", &resolved.api_key)
                    .header("anthropic-version", "2023-06-01");
                let value = self.post(request, &body).await?;
                extract_anthropic_text(&value)
            }
        }
    }

    fn is_available(&self) -> bool {
        self.resolved.is_some()
    }
}

fn openai_body(model: &str, messages: &[ChatMessage], options: CompletionOptions) -> Value {
    let msgs: Vec<Value> = messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();
    json!({
        "model": model,
        "messages": msgs,
        "temperature": options.temperature,
        "max_tokens": options.max_tokens,
    })
}

fn anthropic_body(model: &str, messages: &[ChatMessage], options: CompletionOptions) -> Value {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();
    let conv: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": model,
        "messages": conv,
        "temperature": options.temperature,
        "max_tokens": options.max_tokens,
    });
    if !system.is_empty() {
        body["system"] = json!(system.join("\n\n"));
    }
    body
}

fn extract_openai_text(value: &Value) -> Result<String> {
    value["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Inference("completion response has no message content".into()))
}

fn extract_anthropic_text(value: &Value) -> Result<String> {
    let blocks = value["content"]
        .as_array()
        .ok_or_else(|| Error::Inference("completion response has no content blocks".into()))?;
    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("Phân loại câu hỏi."),
            ChatMessage::user("Tôi muốn đổi vé"),
        ]
    }

    #[test]
    fn test_openai_body_keeps_system_inline() {
        let body = openai_body("gpt-4o-mini", &prompt(), CompletionOptions::precise());
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn test_anthropic_body_splits_system() {
        let body = anthropic_body(
            "claude-3-5-haiku-20241022",
            &prompt(),
            CompletionOptions::default().with_temperature(0.1),
        );
        assert_eq!(body["system"], "Phân loại câu hỏi.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_extract_text() {
        let openai = json!({"choices": [{"message": {"role": "assistant", "content": "faq"}}]});
        assert_eq!(extract_openai_text(&openai).unwrap(), "faq");
        assert!(extract_openai_text(&json!({"choices": []})).is_err());

        let anthropic = json!({"content": [
            {"type": "text", "text": "after_"},
            {"type": "text", "text": "service"}
        ]});
        assert_eq!(extract_anthropic_text(&anthropic).unwrap(), "after_service");
    }

    #[tokio::test]
    async fn test_unconfigured_model_is_unavailable() {
        let model = HttpLanguageModel::new(Client::new(), &LLMConfig::default());
        assert!(!model.is_available());
        assert!(model.provider().is_none());
        let err = model
            .complete(&prompt(), CompletionOptions::precise())
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }
}
