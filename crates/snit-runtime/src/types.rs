//! Routing and response types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use snit_chat::ChatMessage;

/// Apology used whenever a request fails inside the pipeline.
pub const GENERIC_FAILURE: &str =
    "Xin lỗi, có lỗi xảy ra trong quá trình xử lý. Vui lòng thử lại sau.";

/// Top-level domain of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Faq,
    AfterService,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Faq => "faq",
            Route::AfterService => "after_service",
        }
    }

    /// Exact label match; callers normalize case and whitespace first.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "faq" => Some(Route::Faq),
            "after_service" => Some(Route::AfterService),
            _ => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the router arrived at a route.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// Near-duplicate of a stored question; the model was not consulted.
    FastPath { score: f64 },
    /// The model returned one of the two labels.
    Model(Route),
    /// The model returned something else; handled as a general inquiry.
    Unrecognized { raw: String },
}

impl RouteDecision {
    pub fn route(&self) -> Route {
        match self {
            RouteDecision::FastPath { .. } => Route::Faq,
            RouteDecision::Model(route) => *route,
            RouteDecision::Unrecognized { .. } => Route::AfterService,
        }
    }
}

/// After-sale intents understood by the ticket handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AfterServiceIntent {
    ChangeSchedule,
    CancelTicket,
    InvoiceRequest,
    Complaint,
    GeneralInquiry,
    /// Any other label, kept verbatim.
    Unrecognized(String),
}

impl AfterServiceIntent {
    pub fn as_str(&self) -> &str {
        match self {
            AfterServiceIntent::ChangeSchedule => "change_schedule",
            AfterServiceIntent::CancelTicket => "cancel_ticket",
            AfterServiceIntent::InvoiceRequest => "invoice_request",
            AfterServiceIntent::Complaint => "complaint",
            AfterServiceIntent::GeneralInquiry => "general_inquiry",
            AfterServiceIntent::Unrecognized(label) => label,
        }
    }
}

impl From<String> for AfterServiceIntent {
    fn from(label: String) -> Self {
        match label.trim().to_lowercase().as_str() {
            "change_schedule" => AfterServiceIntent::ChangeSchedule,
            "cancel_ticket" => AfterServiceIntent::CancelTicket,
            "invoice_request" => AfterServiceIntent::InvoiceRequest,
            "complaint" => AfterServiceIntent::Complaint,
            "general_inquiry" => AfterServiceIntent::GeneralInquiry,
            _ => AfterServiceIntent::Unrecognized(label),
        }
    }
}

impl From<AfterServiceIntent> for String {
    fn from(intent: AfterServiceIntent) -> Self {
        intent.as_str().to_string()
    }
}

/// Slot values extracted from a single message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, deserialize_with = "slot", skip_serializing_if = "Option::is_none")]
    pub ticket_code: Option<String>,
    /// Expected as `hh:mm AM/PM`; not re-validated.
    #[serde(default, deserialize_with = "slot", skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<String>,
    #[serde(default, deserialize_with = "slot", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Blank strings and placeholder words count as a missing slot.
fn slot<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Ok(None),
    };
    match text.to_lowercase().as_str() {
        "" | "null" | "none" | "value" => Ok(None),
        _ => Ok(Some(text)),
    }
}

fn entities_or_default<'de, D>(deserializer: D) -> Result<Entities, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Entities>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|c| (0.0..=1.0).contains(c)))
}

/// Structured reading of one after-service message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: AfterServiceIntent,
    #[serde(default, deserialize_with = "entities_or_default")]
    pub entities: Entities,
    /// Self-reported by the model when present; not relied on.
    #[serde(
        default,
        deserialize_with = "lenient_confidence",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
}

impl ClassificationResult {
    pub fn new(intent: AfterServiceIntent, entities: Entities) -> Self {
        Self {
            intent,
            entities,
            confidence: None,
        }
    }

    /// Used when no classification could be obtained.
    pub fn general_inquiry() -> Self {
        Self::new(AfterServiceIntent::GeneralInquiry, Entities::default())
    }

    /// Attached to responses for requests that failed in a handler.
    pub fn failed() -> Self {
        Self {
            intent: AfterServiceIntent::Unrecognized("error".into()),
            entities: Entities::default(),
            confidence: Some(0.0),
        }
    }
}

/// Uniform reply of both pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    /// Echo of the user message.
    pub message: String,
    pub intent: String,
    /// Text shown to the user.
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// Diagnostic detail; never meant for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_docs_count: Option<usize>,
}

impl ServiceResponse {
    pub fn new(message: &str, intent: &str, response: impl Into<String>) -> Self {
        Self {
            message: message.to_string(),
            intent: intent.to_string(),
            response: response.into(),
            classification: None,
            timestamp: None,
            chat_id: None,
            error: None,
            relevant_docs_count: None,
        }
    }

    /// The apologetic reply for a request that failed inside the pipeline.
    pub fn failure(message: &str, error: impl std::fmt::Display) -> Self {
        let mut response = Self::new(message, "error", GENERIC_FAILURE);
        response.error = Some(error.to_string());
        response.classification = Some(ClassificationResult::failed());
        response
    }

    /// Wrap an FAQ pipeline result.
    pub fn from_faq(answer: FaqAnswer) -> Self {
        let intent = if answer.success { "faq" } else { "error" };
        let mut response = Self::new(&answer.user_question, intent, answer.message);
        response.error = answer.error;
        response.relevant_docs_count = answer.relevant_docs_count;
        response.stamped()
    }

    pub fn with_classification(mut self, classification: ClassificationResult) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_chat_id(mut self, chat_id: Option<String>) -> Self {
        self.chat_id = chat_id;
        self
    }

    /// Set `timestamp` to the current local time.
    pub fn stamped(mut self) -> Self {
        self.timestamp = Some(chrono::Local::now().to_rfc3339());
        self
    }
}

/// Result of the FAQ pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqAnswer {
    pub success: bool,
    /// Answer or user-facing explanation.
    pub message: String,
    pub user_question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_docs_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One message to route, with whatever the caller knows about the conversation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteRequest {
    pub message: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    /// Prior turns assembled by the caller; not used for routing decisions.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl RouteRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}
