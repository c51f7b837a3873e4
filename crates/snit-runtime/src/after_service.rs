//! After-sale actions on tickets.
//!
//! Every required slot must be present in the current message; there is no
//! per-user session state. A missing slot yields a prompt asking for it.

use std::sync::Arc;

use snit_core::Result;
use tracing::{error, info, warn};

use crate::extractor::IntentExtractor;
use crate::tickets::{TicketService, TicketUpdate};
use crate::types::{AfterServiceIntent, ClassificationResult, Entities, ServiceResponse};

pub const CAPABILITY_MENU: &str = "Chúng tôi có thể hỗ trợ bạn:\n• Đổi giờ xe (vui lòng cung cấp mã vé và giờ mong muốn)\n• Hủy vé (vui lòng cung cấp mã vé)\n• Xuất hóa đơn (vui lòng cung cấp mã vé)\n• Khiếu nại dịch vụ (vui lòng cung cấp mã vé và lý do)\n\nBạn cần hỗ trợ gì?";

/// Output of one intent handler.
#[derive(Debug, Clone, PartialEq)]
struct Reply {
    intent: &'static str,
    text: String,
}

impl Reply {
    fn new(intent: &'static str, text: impl Into<String>) -> Self {
        Self {
            intent,
            text: text.into(),
        }
    }
}

fn not_found(code: &str) -> String {
    format!("Không tìm thấy vé {}. Vui lòng kiểm tra lại mã vé.", code)
}

#[derive(Clone)]
pub struct AfterServiceHandler {
    extractor: IntentExtractor,
    tickets: Arc<dyn TicketService>,
}

impl AfterServiceHandler {
    pub fn new(extractor: IntentExtractor, tickets: Arc<dyn TicketService>) -> Self {
        Self { extractor, tickets }
    }

    /// Classify `message` and run the matching action.
    pub async fn handle(&self, message: &str) -> ServiceResponse {
        let classification = match self.extractor.classify_intent(message).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!("Intent extraction failed, answering as general inquiry: {}", e);
                ClassificationResult::general_inquiry()
            }
        };
        self.respond(message, classification).await
    }

    /// Run the action for an already-known classification.
    pub async fn respond(&self, message: &str, classification: ClassificationResult) -> ServiceResponse {
        info!("After-service intent: {}", classification.intent.as_str());
        match self.dispatch(&classification.intent, &classification.entities).await {
            Ok(reply) => ServiceResponse::new(message, reply.intent, reply.text)
                .with_classification(classification)
                .stamped(),
            Err(e) => {
                error!("After-service handler failed: {}", e);
                ServiceResponse::failure(message, e)
            }
        }
    }

    /// The capability menu, without consulting the extractor.
    pub fn general_inquiry(&self, message: &str) -> ServiceResponse {
        ServiceResponse::new(message, "general_inquiry", CAPABILITY_MENU)
            .with_classification(ClassificationResult::general_inquiry())
            .stamped()
    }

    async fn dispatch(&self, intent: &AfterServiceIntent, entities: &Entities) -> Result<Reply> {
        match intent {
            AfterServiceIntent::ChangeSchedule => self.change_schedule(entities).await,
            AfterServiceIntent::CancelTicket => self.cancel_ticket(entities).await,
            AfterServiceIntent::InvoiceRequest => Ok(invoice_request(entities)),
            AfterServiceIntent::Complaint => Ok(complaint(entities)),
            AfterServiceIntent::GeneralInquiry | AfterServiceIntent::Unrecognized(_) => {
                Ok(Reply::new("general_inquiry", CAPABILITY_MENU))
            }
        }
    }

    async fn change_schedule(&self, entities: &Entities) -> Result<Reply> {
        const INTENT: &str = "change_schedule";
        let Some(code) = entities.ticket_code.as_deref() else {
            return Ok(Reply::new(INTENT, "Vui lòng cung cấp mã vé (ví dụ: VX123456789)."));
        };
        let Some(time) = entities.schedule_time.as_deref() else {
            return Ok(Reply::new(
                INTENT,
                format!("Bạn chưa cung cấp giờ muốn đổi cho vé {}.", code),
            ));
        };
        if self.tickets.get(code).await?.is_none() {
            return Ok(Reply::new(INTENT, not_found(code)));
        }

        if self.apply(code, &TicketUpdate::Time(time.to_string())).await {
            Ok(Reply::new(
                INTENT,
                format!("Đã đổi giờ vé {} sang {} thành công.", code, time),
            ))
        } else {
            Ok(Reply::new(INTENT, "Không thể đổi giờ vé lúc này."))
        }
    }

    async fn cancel_ticket(&self, entities: &Entities) -> Result<Reply> {
        const INTENT: &str = "cancel_ticket";
        let Some(code) = entities.ticket_code.as_deref() else {
            return Ok(Reply::new(INTENT, "Vui lòng cung cấp mã vé để hủy."));
        };
        if self.tickets.get(code).await?.is_none() {
            return Ok(Reply::new(INTENT, not_found(code)));
        }

        if self.apply(code, &TicketUpdate::Cancel).await {
            Ok(Reply::new(INTENT, format!("Vé {} đã được hủy thành công.", code)))
        } else {
            Ok(Reply::new(INTENT, "Không thể hủy vé lúc này."))
        }
    }

    /// Any update error counts as a failed update.
    async fn apply(&self, code: &str, change: &TicketUpdate) -> bool {
        match self.tickets.update(code, change).await {
            Ok(true) => true,
            Ok(false) => {
                error!("Ticket {} update rejected: {:?}", code, change);
                false
            }
            Err(e) => {
                error!("Ticket {} update failed: {}", code, e);
                false
            }
        }
    }
}

fn invoice_request(entities: &Entities) -> Reply {
    const INTENT: &str = "invoice_request";
    match entities.ticket_code.as_deref() {
        None => Reply::new(
            INTENT,
            "Bạn muốn xuất hóa đơn cho vé nào? Vui lòng cung cấp mã vé.",
        ),
        Some(code) => Reply::new(
            INTENT,
            format!("Chúng tôi đã tiếp nhận yêu cầu xuất hóa đơn cho vé {}.", code),
        ),
    }
}

fn complaint(entities: &Entities) -> Reply {
    const INTENT: &str = "complaint";
    match (entities.ticket_code.as_deref(), entities.reason.as_deref()) {
        (None, _) => Reply::new(INTENT, "Vui lòng cung cấp mã vé để khiếu nại."),
        (Some(code), None) => Reply::new(
            INTENT,
            format!("Bạn chưa cung cấp lý do khiếu nại cho vé {}.", code),
        ),
        (Some(code), Some(reason)) => Reply::new(
            INTENT,
            format!(
                "Chúng tôi đã ghi nhận khiếu nại cho vé {} với lý do: {}. Chúng tôi sẽ xem xét và phản hồi sớm nhất có thể.",
                code, reason
            ),
        ),
    }
}
