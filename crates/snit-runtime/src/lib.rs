//! Message routing and intent resolution.
//!
//! `Router` decides whether a message is an FAQ question or an after-sale
//! ticket request, then hands it to `FaqPipeline` or `AfterServiceHandler`.
//! Every entry point returns a response value; collaborator failures are
//! turned into apologetic replies instead of errors.

pub mod after_service;
pub mod extractor;
pub mod faq;
pub mod router;
pub mod tickets;
pub mod types;

pub use after_service::AfterServiceHandler;
pub use extractor::IntentExtractor;
pub use faq::{AnswerGenerator, FaqPipeline};
pub use router::{PipelineSettings, Router};
pub use tickets::{HttpTicketService, Ticket, TicketService, TicketUpdate};
pub use types::*;
