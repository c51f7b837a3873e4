//! Intent and entity extraction for after-service messages.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use snit_chat::{ChatMessage, CompletionOptions, LanguageModel};
use snit_core::{Error, Result};
use tracing::debug;

use crate::types::ClassificationResult;

const SYSTEM_PROMPT: &str = r#"Bạn là một hệ thống phân loại ý định cho dịch vụ hỗ trợ sau bán hàng của VeXeRe. Nhiệm vụ của bạn là phân tích tin nhắn của khách hàng và xác định ý định chính.

Các loại ý định:
1. change_schedule: Đổi giờ xe, thay đổi lịch trình
2. cancel_ticket: Hủy vé, hoàn tiền
3. invoice_request: Xuất hóa đơn, yêu cầu hóa đơn VAT
4. complaint: Khiếu nại, phản ánh dịch vụ
5. general_inquiry: Các câu hỏi chung không thuộc các loại trên

Trả về kết quả dưới dạng JSON:
{
    "intent": "tên_ý_định",
    "entities": {
        "ticket_code": "mã vé nếu có",
        "schedule_time": "thời gian mới nếu có",
        "reason": "lý do nếu có"
    }
}

Đối với "schedule_time" nếu có, phải tuân theo định dạng "hh:mm AM/PM".
Chỉ trả về JSON, không giải thích thêm."#;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid fence regex"));

/// Reads one after-service message into an intent with slot values.
#[derive(Clone)]
pub struct IntentExtractor {
    llm: Arc<dyn LanguageModel>,
}

impl IntentExtractor {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// One model call per message. Fails with `Error::MalformedOutput` when
    /// the reply holds no usable JSON object.
    pub async fn classify_intent(&self, message: &str) -> Result<ClassificationResult> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("Phân tích tin nhắn sau: '{}'", message)),
        ];
        let raw = self
            .llm
            .complete(&messages, CompletionOptions::precise().with_temperature(0.1))
            .await?;
        debug!("Extractor output: {}", raw);
        parse_classification(&raw)
    }
}

/// Parse model output, tolerating code fences and surrounding prose.
pub fn parse_classification(raw: &str) -> Result<ClassificationResult> {
    let text = CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());

    let (start, end) = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(Error::MalformedOutput(format!("no JSON object in {:?}", raw))),
    };

    serde_json::from_str(&text[start..=end]).map_err(|e| Error::MalformedOutput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AfterServiceIntent;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct ScriptedModel {
        reply: String,
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage], _: CompletionOptions) -> Result<String> {
            self.prompts.lock().push(messages.to_vec());
            Ok(self.reply.clone())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let result = parse_classification(
            r#"{"intent": "change_schedule", "entities": {"ticket_code": "VX123456789", "schedule_time": "10:00 AM", "reason": ""}}"#,
        )
        .unwrap();
        assert_eq!(result.intent, AfterServiceIntent::ChangeSchedule);
        assert_eq!(result.entities.ticket_code.as_deref(), Some("VX123456789"));
        assert_eq!(result.entities.schedule_time.as_deref(), Some("10:00 AM"));
        assert!(result.entities.reason.is_none());
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let raw = "Kết quả:\n```json\n{\"intent\": \"cancel_ticket\", \"entities\": {\"ticket_code\": \"VX987\"}}\n```\nXong.";
        let result = parse_classification(raw).unwrap();
        assert_eq!(result.intent, AfterServiceIntent::CancelTicket);
        assert_eq!(result.entities.ticket_code.as_deref(), Some("VX987"));
    }

    #[test]
    fn test_parse_missing_entities() {
        let result = parse_classification(r#"{"intent": "invoice_request"}"#).unwrap();
        assert_eq!(result.intent, AfterServiceIntent::InvoiceRequest);
        assert!(result.entities.ticket_code.is_none());
    }

    #[test]
    fn test_malformed_output() {
        assert!(matches!(
            parse_classification("Tôi không hiểu."),
            Err(Error::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_classification(r#"{"entities": {}}"#),
            Err(Error::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_prompt_carries_message() {
        let model = Arc::new(ScriptedModel {
            reply: r#"{"intent": "complaint", "entities": {"ticket_code": "VX1", "reason": "xe trễ"}}"#.into(),
            prompts: Mutex::new(Vec::new()),
        });
        let extractor = IntentExtractor::new(model.clone());

        let result = extractor.classify_intent("Xe VX1 trễ 2 tiếng").await.unwrap();
        assert_eq!(result.intent, AfterServiceIntent::Complaint);
        assert_eq!(result.entities.reason.as_deref(), Some("xe trễ"));

        let prompts = model.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0][0].role, "system");
        assert_eq!(prompts[0][1].content, "Phân tích tin nhắn sau: 'Xe VX1 trễ 2 tiếng'");
    }
}
