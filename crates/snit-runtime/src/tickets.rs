//! Ticket backend collaborator.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use snit_core::{Error, Result};
use tracing::{debug, warn};

/// The backend stores optional fields as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payment state attached to a ticket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    #[serde(deserialize_with = "null_as_default")]
    pub done: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub gate: String,
}

/// A bus ticket as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Ticket {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_name: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub from: String,
    #[serde(deserialize_with = "null_as_default")]
    pub to: String,
    #[serde(deserialize_with = "null_as_default")]
    pub payment: Payment,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_at: String,
}

/// A found ticket from a lookup body. Only existence matters to callers, so
/// a record whose other fields do not fit `Ticket` still counts as found.
fn ticket_of(id: &str, value: Value) -> Option<Ticket> {
    match payload(value) {
        Value::Null => None,
        data => Some(serde_json::from_value(data).unwrap_or_else(|e| {
            warn!("Ticket {} has unexpected fields: {}", id, e);
            Ticket {
                id: id.to_string(),
                ..Ticket::default()
            }
        })),
    }
}

/// A change applied to an existing ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketUpdate {
    /// New departure time, as given by the customer.
    Time(String),
    Cancel,
}

impl TicketUpdate {
    pub fn body(&self) -> Value {
        match self {
            TicketUpdate::Time(time) => json!({ "time": time }),
            TicketUpdate::Cancel => json!({ "status": "cancelled" }),
        }
    }
}

#[async_trait]
pub trait TicketService: Send + Sync {
    /// `Ok(None)` when the backend answers but has no such ticket.
    async fn get(&self, id: &str) -> Result<Option<Ticket>>;

    /// `Ok(false)` when the backend rejects the change.
    async fn update(&self, id: &str, change: &TicketUpdate) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Ticket>>;
}

/// `TicketService` over the backend REST API (`/api/ticket`).
pub struct HttpTicketService {
    client: Client,
    base_url: Option<Url>,
}

impl HttpTicketService {
    /// `base_url` of `None` yields a service that reports itself unavailable.
    pub fn new(client: Client, base_url: Option<&str>) -> Result<Self> {
        let base_url = base_url
            .map(|raw| {
                Url::parse(raw).map_err(|e| Error::Config(format!("invalid BACKEND_URL {:?}: {}", raw, e)))
            })
            .transpose()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, id: Option<&str>) -> Result<Url> {
        let mut url = self
            .base_url
            .clone()
            .ok_or_else(|| Error::Unavailable("BACKEND_URL is not configured".into()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config("BACKEND_URL cannot be a base".into()))?;
            segments.pop_if_empty().extend(["api", "ticket"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

/// The backend wraps payloads in `{"data": ...}`; bare payloads are accepted too.
fn payload(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

#[async_trait]
impl TicketService for HttpTicketService {
    async fn get(&self, id: &str) -> Result<Option<Ticket>> {
        let url = self.url(Some(id))?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let value: Value = response.json().await?;
                Ok(ticket_of(id, value))
            }
            status => Err(Error::Http(format!("ticket lookup returned {}", status))),
        }
    }

    async fn update(&self, id: &str, change: &TicketUpdate) -> Result<bool> {
        let url = self.url(Some(id))?;
        debug!("PUT {} {}", url, change.body());
        let response = self.client.put(url).json(&change.body()).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Ticket {} update rejected with {}", id, status);
        }
        Ok(status.is_success())
    }

    async fn list(&self) -> Result<Vec<Ticket>> {
        let url = self.url(None)?;
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Http(format!("ticket list returned {}", response.status())));
        }
        let value: Value = response.json().await?;
        Ok(serde_json::from_value(payload(value))?)
    }
}
