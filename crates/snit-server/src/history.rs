//! Chat-history backend client (`/api/chat-history`).

use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use snit_chat::ChatMessage;
use snit_core::{Error, Result};
use tracing::debug;

pub struct HistoryClient {
    client: Client,
    base: Url,
}

/// Ids the web client sends when it has no conversation yet.
pub fn normalize_chat_id(chat_id: Option<String>) -> Option<String> {
    chat_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && id != "null" && id != "undefined")
}

impl HistoryClient {
    pub fn new(client: Client, backend_url: &str) -> Result<Self> {
        let base = Url::parse(backend_url)
            .map_err(|e| Error::Config(format!("invalid BACKEND_URL {:?}: {}", backend_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config("BACKEND_URL cannot be a base".into()));
        }
        Ok(Self { client, base })
    }

    /// `/api/chat-history/<tail...>`, each tail element escaped as one segment.
    fn url(&self, tail: &[&str]) -> Result<Url> {
        if let Some(bad) = tail.iter().find(|s| matches!(**s, "." | "..")) {
            return Err(Error::NotFound(format!("chat {:?}", bad)));
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("BACKEND_URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["api", "chat-history"])
            .extend(tail);
        Ok(url)
    }

    /// Create an empty conversation and return its id.
    pub async fn create_chat(&self) -> Result<String> {
        let response = self
            .client
            .post(self.url(&[""])?)
            .json(&json!({
                "title": "Chat conversation",
                "status": "active",
                "messages": [],
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Http(format!("chat create returned {}", response.status())));
        }
        let body: Value = response.json().await?;
        chat_id_of(&body).ok_or_else(|| Error::Http("chat create response has no id".into()))
    }

    /// Prior messages of a conversation; `Error::NotFound` when the backend
    /// does not know it.
    pub async fn messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>> {
        let response = self.client.get(self.url(&[chat_id])?).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("chat {}", chat_id))),
            status if status.is_success() => {
                let body: Value = response.json().await?;
                Ok(messages_of(&body))
            }
            status => Err(Error::Http(format!("chat lookup returned {}", status))),
        }
    }

    pub async fn append(&self, chat_id: &str, role: &str, content: &str) -> Result<()> {
        debug!("Appending {} message to chat {}", role, chat_id);
        let response = self
            .client
            .post(self.url(&[chat_id, "messages"])?)
            .json(&json!({
                "role": role,
                "content": content,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Http(format!("message append returned {}", response.status())));
        }
        Ok(())
    }
}

fn chat_id_of(body: &Value) -> Option<String> {
    match &body["data"]["id"] {
        Value::String(id) => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Entries that are not `{role, content}` objects are dropped.
fn messages_of(body: &Value) -> Vec<ChatMessage> {
    body["data"]["messages"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|m| serde_json::from_value(m.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chat_id() {
        assert_eq!(normalize_chat_id(None), None);
        assert_eq!(normalize_chat_id(Some("undefined".into())), None);
        assert_eq!(normalize_chat_id(Some("null".into())), None);
        assert_eq!(normalize_chat_id(Some("  ".into())), None);
        assert_eq!(normalize_chat_id(Some("665f1c".into())).as_deref(), Some("665f1c"));
    }

    #[test]
    fn test_response_parsing() {
        assert_eq!(chat_id_of(&json!({"data": {"id": "abc"}})).as_deref(), Some("abc"));
        assert_eq!(chat_id_of(&json!({"data": {"id": 7}})).as_deref(), Some("7"));
        assert!(chat_id_of(&json!({"data": {}})).is_none());

        let body = json!({"data": {"messages": [
            {"role": "user", "content": "đổi vé", "timestamp": "2024-05-01T08:00:00Z"},
            {"role": "assistant", "content": "Vui lòng cung cấp mã vé."},
            {"content": "missing role"}
        ]}});
        let messages = messages_of(&body);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], ChatMessage::assistant("Vui lòng cung cấp mã vé."));
        assert!(messages_of(&json!({})).is_empty());
    }

    #[test]
    fn test_urls() {
        let client = HistoryClient::new(Client::new(), "http://backend:3000/").unwrap();
        assert_eq!(
            client.url(&[""]).unwrap().as_str(),
            "http://backend:3000/api/chat-history/"
        );
        assert_eq!(
            client.url(&["665f1c", "messages"]).unwrap().as_str(),
            "http://backend:3000/api/chat-history/665f1c/messages"
        );
        assert!(HistoryClient::new(Client::new(), "not a url").is_err());
    }

    #[test]
    fn test_chat_id_stays_inside_history_path() {
        let client = HistoryClient::new(Client::new(), "http://backend:3000").unwrap();
        let id = normalize_chat_id(Some("../ticket/VX1".into())).unwrap();

        for url in [client.url(&[&id]).unwrap(), client.url(&[&id, "messages"]).unwrap()] {
            assert!(url.path().starts_with("/api/chat-history/"), "{}", url);
            assert!(url.path().contains("..%2Fticket%2FVX1"), "{}", url);
        }

        let request = client.client.get(client.url(&[&id]).unwrap()).build().unwrap();
        assert!(request.url().path().starts_with("/api/chat-history/"));

        for dots in [".", ".."] {
            assert!(matches!(client.url(&[dots]), Err(Error::NotFound(_))));
        }
    }
}
